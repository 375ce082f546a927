//! Inline locally referenced images into an HTML document as base64 data URIs

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use regex::{Captures, NoExpand, Regex};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::EmbedError;
use crate::utils::{osc8_file_link, write_atomic};

/// Product images are referenced as `src="images/<file>"`
const IMAGE_SRC_PATTERN: &str = r#"src="images/([^"]+)""#;

/// MIME type from the file extension; anything unrecognised is labelled image/png
fn get_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "image/png",
    }
}

/// Read an image and return it as a `data:<mime>;base64,...` URI
pub fn encode_image(path: &Path) -> Result<String, EmbedError> {
    if !path.is_file() {
        return Err(EmbedError::ImageMissing(path.to_path_buf()));
    }

    let bytes = fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => EmbedError::ImageMissing(path.to_path_buf()),
        _ => EmbedError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "encoding image");

    Ok(format!(
        "data:{};base64,{}",
        get_mime_type(path),
        BASE64_STANDARD.encode(&bytes)
    ))
}

/// Result of rewriting one document
#[derive(Debug)]
pub struct Rewrite {
    pub html: String,
    pub embedded: usize,
    pub missing: usize,
}

/// Rewrites image references in a document using files from disk
pub struct Embedder {
    images_dir: PathBuf,
    logo: PathBuf,
    image_pattern: Regex,
    logo_pattern: Regex,
}

impl Embedder {
    /// `logo` is read from disk; pages reference it by file name, as `src="<name>"`
    pub fn new(images_dir: impl Into<PathBuf>, logo: impl Into<PathBuf>) -> Result<Self> {
        let logo = logo.into();
        let logo_name = logo
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_else(|| logo.to_string_lossy());
        let logo_src = format!(r#"src="{}""#, regex::escape(&logo_name));

        Ok(Self {
            images_dir: images_dir.into(),
            image_pattern: Regex::new(IMAGE_SRC_PATTERN).context("Invalid image pattern")?,
            logo_pattern: Regex::new(&logo_src).context("Invalid logo pattern")?,
            logo,
        })
    }

    /// Replace every resolvable image reference with an inline data URI.
    ///
    /// References whose file is missing are left untouched. Any other read
    /// failure aborts the rewrite.
    pub fn rewrite(&self, html: &str) -> Result<Rewrite, EmbedError> {
        let mut embedded = 0;
        let mut missing = 0;
        let mut failure = None;

        let html = self.image_pattern.replace_all(html, |caps: &Captures| {
            let filename = &caps[1];
            let path = self.images_dir.join(filename);

            match encode_image(&path) {
                Ok(uri) => {
                    println!("  ✓ Embedded: {}", filename);
                    embedded += 1;
                    format!(r#"src="{}""#, uri)
                }
                Err(EmbedError::ImageMissing(_)) => {
                    println!("  ✗ Not found: {}", filename);
                    debug!(path = %path.display(), "referenced image is missing");
                    missing += 1;
                    caps[0].to_string()
                }
                Err(err) => {
                    failure.get_or_insert(err);
                    caps[0].to_string()
                }
            }
        });

        if let Some(err) = failure {
            return Err(err);
        }

        // The logo is looked up once and every occurrence gets the same URI
        let logo_name = self.logo.display();
        let html = match encode_image(&self.logo) {
            Ok(uri) => {
                let replacement = format!(r#"src="{}""#, uri);
                let html = self
                    .logo_pattern
                    .replace_all(&html, NoExpand(&replacement))
                    .into_owned();
                println!("  ✓ Embedded: {}", logo_name);
                embedded += 1;
                html
            }
            Err(EmbedError::ImageMissing(_)) => {
                println!("  ✗ Logo not found: {}", logo_name);
                debug!(path = %logo_name, "logo is missing");
                missing += 1;
                html.into_owned()
            }
            Err(err) => return Err(err),
        };

        Ok(Rewrite {
            html,
            embedded,
            missing,
        })
    }
}

/// Write the standalone document and return its size in bytes
pub fn emit(output: &Path, content: &str) -> Result<u64> {
    write_atomic(output, content.as_bytes())?;
    let size = fs::metadata(output)
        .with_context(|| format!("Failed to stat {}", output.display()))?
        .len();
    Ok(size)
}

pub fn run_embed(input: &Path, output: &Path, images_dir: &Path, logo: &Path) -> Result<()> {
    if !input.exists() {
        bail!(
            "{} not found! Run `product-catalog generate` first to create it",
            input.display()
        );
    }

    let html = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let embedder = Embedder::new(images_dir, logo)?;

    println!("Embedding product images...");
    let rewrite = embedder.rewrite(&html)?;
    let size = emit(output, &rewrite.html)?;

    let output_str = output.display().to_string();
    println!(
        "\n✓ Created self-contained HTML: {}",
        osc8_file_link(output, &output_str)
    );
    println!("  File size: {:.1} KB", size as f64 / 1024.0);
    println!("  Images embedded: {}", rewrite.embedded);

    if rewrite.missing > 0 {
        println!(
            "\n{} image reference(s) could not be embedded and still point at local files.",
            rewrite.missing
        );
    } else {
        println!("\nThis file has no external image references and can be copied anywhere as-is.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Lay out `images/` and an optional logo in a temp directory
    fn fixture(images: &[(&str, &str)], logo: Option<&str>) -> (TempDir, Embedder) {
        let dir = tempfile::tempdir().unwrap();
        let images_dir = dir.path().join("images");
        for (name, bytes) in images {
            let path = images_dir.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, bytes).unwrap();
        }
        let logo_path = dir.path().join("srs_logo_white.png");
        if let Some(bytes) = logo {
            fs::write(&logo_path, bytes).unwrap();
        }

        let embedder = Embedder::new(&images_dir, &logo_path).unwrap();
        (dir, embedder)
    }

    #[test]
    fn test_mime_type_lookup() {
        assert_eq!(get_mime_type(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(get_mime_type(Path::new("a.JPEG")), "image/jpeg");
        assert_eq!(get_mime_type(Path::new("a.png")), "image/png");
        assert_eq!(get_mime_type(Path::new("a.gif")), "image/gif");
        assert_eq!(get_mime_type(Path::new("logo.svg")), "image/svg+xml");
        assert_eq!(get_mime_type(Path::new("photo.xyz")), "image/png");
        assert_eq!(get_mime_type(Path::new("no_extension")), "image/png");
    }

    #[test]
    fn test_encode_image_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let svg = dir.path().join("logo.svg");
        let unknown = dir.path().join("photo.xyz");
        fs::write(&svg, b"<svg/>").unwrap();
        fs::write(&unknown, b"hello").unwrap();

        assert_eq!(
            encode_image(&svg).unwrap(),
            "data:image/svg+xml;base64,PHN2Zy8+"
        );
        assert_eq!(
            encode_image(&unknown).unwrap(),
            "data:image/png;base64,aGVsbG8="
        );
    }

    #[test]
    fn test_encode_image_missing_is_signalled() {
        let dir = tempfile::tempdir().unwrap();
        let err = encode_image(&dir.path().join("gone.png")).unwrap_err();
        assert!(matches!(err, EmbedError::ImageMissing(_)));

        // a directory is not an image either
        let err = encode_image(dir.path()).unwrap_err();
        assert!(matches!(err, EmbedError::ImageMissing(_)));
    }

    #[test]
    fn test_rewrite_embeds_found_and_keeps_missing() {
        let (_dir, embedder) = fixture(&[("a.png", "hello"), ("sub/b.gif", "GIF")], None);
        let html = r#"<img src="images/a.png"><img src="images/missing.png"><img src="images/sub/b.gif">"#;

        let rewrite = embedder.rewrite(html).unwrap();
        assert_eq!(
            rewrite.html,
            r#"<img src="data:image/png;base64,aGVsbG8="><img src="images/missing.png"><img src="data:image/gif;base64,R0lG">"#
        );
        assert_eq!(rewrite.embedded, 2);
        // missing.png plus the absent logo
        assert_eq!(rewrite.missing, 2);
    }

    #[test]
    fn test_rewrite_replaces_every_logo_reference() {
        let (_dir, embedder) = fixture(&[], Some("hello"));
        let html = r#"<img src="srs_logo_white.png"><p>x</p><img src="srs_logo_white.png">"#;

        let rewrite = embedder.rewrite(html).unwrap();
        let uri = r#"src="data:image/png;base64,aGVsbG8=""#;
        assert_eq!(rewrite.html.matches(uri).count(), 2);
        assert!(!rewrite.html.contains("srs_logo_white.png"));
        assert_eq!(rewrite.embedded, 1);
        assert_eq!(rewrite.missing, 0);
    }

    #[test]
    fn test_rewrite_leaves_logo_when_missing() {
        let (_dir, embedder) = fixture(&[], None);
        let html = r#"<img src="srs_logo_white.png">"#;

        let rewrite = embedder.rewrite(html).unwrap();
        assert_eq!(rewrite.html, html);
        assert_eq!(rewrite.missing, 1);
    }

    #[test]
    fn test_logo_matched_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let logo = dir.path().join("assets").join("brand.svg");
        fs::create_dir_all(logo.parent().unwrap()).unwrap();
        fs::write(&logo, "<svg/>").unwrap();

        let embedder = Embedder::new(dir.path().join("images"), &logo).unwrap();
        let html = r#"<img src="brand.svg"><img src="assets/brand.svg">"#;

        let rewrite = embedder.rewrite(html).unwrap();
        assert_eq!(
            rewrite.html,
            r#"<img src="data:image/svg+xml;base64,PHN2Zy8+"><img src="assets/brand.svg">"#
        );
        assert_eq!(rewrite.embedded, 1);
    }

    #[test]
    fn test_rewrite_ignores_other_sources() {
        let (_dir, embedder) = fixture(&[("a.png", "hello")], Some("x"));
        let html = r#"<img src="https://example.com/images/a.png"><img src='images/a.png'><img src="other/a.png">"#;

        let rewrite = embedder.rewrite(html).unwrap();
        assert_eq!(rewrite.html, html);
        assert_eq!(rewrite.embedded, 1);
    }

    #[test]
    fn test_run_embed_is_repeatable_and_leaves_source_alone() {
        let dir = tempfile::tempdir().unwrap();
        let images_dir = dir.path().join("images");
        fs::create_dir_all(&images_dir).unwrap();
        fs::write(images_dir.join("001.jpg"), b"\xff\xd8\xff\xe0").unwrap();

        let input = dir.path().join("product_display.html");
        let output = dir.path().join("product_display_standalone.html");
        let source = r#"<img src="images/001.jpg"><img src="images/missing.png">"#;
        fs::write(&input, source).unwrap();

        let logo = dir.path().join("srs_logo_white.png");
        run_embed(&input, &output, &images_dir, &logo).unwrap();
        let first = fs::read(&output).unwrap();
        run_embed(&input, &output, &images_dir, &logo).unwrap();
        let second = fs::read(&output).unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read_to_string(&input).unwrap(), source);

        let standalone = String::from_utf8(first).unwrap();
        assert!(standalone.contains(r#"src="data:image/jpeg;base64,/9j/4A==""#));
        assert!(standalone.contains(r#"src="images/missing.png""#));
    }

    #[test]
    fn test_run_embed_requires_input() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.html");

        let err = run_embed(
            &dir.path().join("product_display.html"),
            &output,
            &dir.path().join("images"),
            &dir.path().join("srs_logo_white.png"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(!output.exists());
    }
}
