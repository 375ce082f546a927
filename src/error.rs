//! Error types for the two pipelines

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The product table could not be turned into records
#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("Could not read {}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not read {} with any supported encoding (tried {tried})", .path.display())]
    NoUsableEncoding { path: PathBuf, tried: String },

    #[error("{} has no `{column}` column", .path.display())]
    MissingColumn { path: PathBuf, column: String },
}

/// The template engine rejected the template or its bindings
#[derive(Error, Debug)]
#[error("Template rendering failed: {message}")]
pub struct RenderError {
    pub message: String,
}

impl From<tera::Error> for RenderError {
    fn from(err: tera::Error) -> Self {
        // tera's top-level message only names the template; the cause is further down
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        RenderError { message }
    }
}

#[derive(Error, Debug)]
pub enum EmbedError {
    /// Non-fatal: the reference is left as-is
    #[error("Image not found: {}", .0.display())]
    ImageMissing(PathBuf),

    #[error("Could not read image {}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
