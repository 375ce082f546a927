use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

mod embed;
mod error;
mod generate;
mod loader;
mod types;
mod utils;

pub const PRODUCTS_CSV: &str = "products.csv";
pub const TEMPLATE_FILE: &str = "template.html";
pub const DISPLAY_HTML: &str = "product_display.html";
pub const STANDALONE_HTML: &str = "product_display_standalone.html";
pub const IMAGES_DIR: &str = "images";
pub const LOGO_FILE: &str = "srs_logo_white.png";

#[derive(Parser)]
#[command(name = "product-catalog")]
#[command(about = "Static HTML product catalog generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the product table through the template into an HTML page
    Generate {
        /// Product table (CSV with a header row)
        #[arg(short, long, default_value = PRODUCTS_CSV)]
        input: PathBuf,
        /// Template file
        #[arg(short, long, default_value = TEMPLATE_FILE)]
        template: PathBuf,
        /// Rendered HTML output
        #[arg(short, long, default_value = DISPLAY_HTML)]
        output: PathBuf,
    },
    /// Inline local images into the rendered page as data URIs
    Embed {
        /// Rendered HTML to read
        #[arg(short, long, default_value = DISPLAY_HTML)]
        input: PathBuf,
        /// Self-contained HTML output
        #[arg(short, long, default_value = STANDALONE_HTML)]
        output: PathBuf,
        /// Directory that `src="images/..."` references resolve against
        #[arg(long, default_value = IMAGES_DIR)]
        images_dir: PathBuf,
        /// Logo file, matched in the page as `src="<file name>"`
        #[arg(long, default_value = LOGO_FILE)]
        logo: PathBuf,
    },
    /// Run generate then embed with the default paths
    Build,
}

fn init_logging() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            input,
            template,
            output,
        } => generate::run_generate(&input, &template, &output),
        Commands::Embed {
            input,
            output,
            images_dir,
            logo,
        } => embed::run_embed(&input, &output, &images_dir, &logo),
        Commands::Build => {
            generate::run_generate(
                Path::new(PRODUCTS_CSV),
                Path::new(TEMPLATE_FILE),
                Path::new(DISPLAY_HTML),
            )?;
            println!();
            embed::run_embed(
                Path::new(DISPLAY_HTML),
                Path::new(STANDALONE_HTML),
                Path::new(IMAGES_DIR),
                Path::new(LOGO_FILE),
            )
        }
    }
}
