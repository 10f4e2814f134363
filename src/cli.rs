use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bookcast")]
#[command(author, version, about = "Serve audiobook directories as podcast feeds")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the library and start the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Library root; may be repeated (replaces configured roots)
        #[arg(short, long = "root")]
        roots: Vec<PathBuf>,
    },

    /// Scan the library once and print books and issues
    Scan {
        /// Library root; may be repeated (replaces configured roots)
        #[arg(short, long = "root")]
        roots: Vec<PathBuf>,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render the feed for a single book directory to stdout
    Feed {
        /// Book directory
        #[arg(required = true)]
        dir: PathBuf,

        /// Base URL used for links in the feed
        #[arg(long, default_value = "http://localhost:8080")]
        base_url: String,
    },

    /// Write an override sidecar for a book directory from its tags
    Init {
        /// Book directory
        #[arg(required = true)]
        dir: PathBuf,

        /// Sidecar file name, relative to the book directory
        #[arg(short, long, default_value = "abook")]
        output: String,

        /// Overwrite an existing sidecar
        #[arg(long)]
        force: bool,

        /// Audacity label export to use as chapter marks
        #[arg(long)]
        labels: Option<PathBuf>,

        /// 1-based file position the label times are relative to
        #[arg(long, requires = "labels")]
        track: Option<usize>,
    },

    /// Check that the external encoder is available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default lookup if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
