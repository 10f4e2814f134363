mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use bc_av::Encoder;
use bc_core::config::{self, Config};
use bc_core::timecode::format_hms;
use bc_feed::{render_feed, FeedContext};
use bc_library::{
    manifest_yaml, parse_audacity_labels, validate_chapters, BookAssembler, LibraryIndex,
};
use bc_probe::{SymphoniaTagReader, TagReader};
use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "bookcast=debug,bc_server=debug,bc_library=debug,bc_feed=debug,bc_av=debug,\
             bc_probe=debug,tower_http=debug"
                .to_string()
        } else {
            "bookcast=info,bc_server=info,bc_library=info,bc_av=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { host, port, roots } => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if !roots.is_empty() {
                config.library.roots = roots;
            }

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(bc_server::start(config))?;
            Ok(())
        }
        Commands::Scan { roots, json } => scan(cli.config.as_deref(), roots, json),
        Commands::Feed { dir, base_url } => feed(cli.config.as_deref(), &dir, &base_url),
        Commands::Init {
            dir,
            output,
            force,
            labels,
            track,
        } => init(
            cli.config.as_deref(),
            &dir,
            &output,
            force,
            labels.as_deref(),
            track,
        ),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("bookcast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn assembler(config: &Config) -> BookAssembler {
    let reader: Arc<dyn TagReader> = Arc::new(SymphoniaTagReader::new());
    BookAssembler::new(reader, config.library.clone())
}

fn scan(config_path: Option<&Path>, roots: Vec<std::path::PathBuf>, json: bool) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;
    if !roots.is_empty() {
        config.library.roots = roots;
    }
    if config.library.roots.is_empty() {
        anyhow::bail!("No library roots configured; pass --root or set library.roots");
    }

    let index = LibraryIndex::new(assembler(&config));
    let report = index.rescan()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let snapshot = index.snapshot();
    for book in snapshot.books() {
        println!(
            "{}  {} - {} ({} files, {}, {} chapters)",
            book.id,
            book.author,
            book.title,
            book.files.len(),
            format_hms(book.total_duration()),
            book.chapters.len()
        );
    }

    if !report.issues.is_empty() {
        println!("\nIssues:");
        for issue in &report.issues {
            println!("  {issue}");
        }
    }

    println!(
        "\n{} books, {} issues in {} ms",
        report.books,
        report.issues.len(),
        report.duration_ms
    );
    Ok(())
}

fn feed(config_path: Option<&Path>, dir: &Path, base_url: &str) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let assembly = assembler(&config).assemble(dir)?;
    for issue in &assembly.issues {
        tracing::warn!("{issue}");
    }

    let ctx = FeedContext::new(base_url).with_ttl(config.feed.ttl_minutes);
    print!("{}", render_feed(&assembly.book, &ctx)?);
    Ok(())
}

fn init(
    config_path: Option<&Path>,
    dir: &Path,
    output: &str,
    force: bool,
    labels: Option<&Path>,
    track: Option<usize>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let target = dir.join(output);
    if target.exists() && !force {
        anyhow::bail!("{} already exists; pass --force to overwrite", target.display());
    }
    if !config.library.override_file_names.iter().any(|n| n == output) {
        tracing::warn!(
            "{output} is not in library.override_file_names; the server will not read it"
        );
    }

    let mut assembly = assembler(&config).derive(dir)?;
    for issue in &assembly.issues {
        tracing::warn!("{issue}");
    }
    let book = &mut assembly.book;

    if let Some(labels) = labels {
        let offsets = book.file_offsets();
        let offset = match track {
            None => 0.0,
            Some(n) => match n.checked_sub(1).and_then(|i| offsets.get(i)) {
                Some(offset) => *offset,
                None => anyhow::bail!(
                    "Track {n} does not exist; the book has {} files",
                    book.files.len()
                ),
            },
        };
        let content = std::fs::read_to_string(labels)?;
        let marks = parse_audacity_labels(labels, &content, offset)?;
        validate_chapters(&marks, book.total_duration())?;
        book.chapters = marks;
    }

    std::fs::write(&target, manifest_yaml(book)?)?;
    println!(
        "Wrote {} ({} files, {} chapters)",
        target.display(),
        book.files.len(),
        book.chapters.len()
    );
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let encoder = Encoder::discover(&config.transcode);

    let rt = tokio::runtime::Runtime::new()?;
    let info = rt.block_on(Encoder::check(encoder.as_ref()));

    let status = if info.available { "✓" } else { "✗" };
    print!("{status} {}", info.name);
    if let Some(ref version) = info.version {
        print!(" ({version})");
    }
    if let Some(ref path) = info.path {
        print!(" - {}", path.display());
    }
    println!();

    if !config.transcode.enabled {
        println!("\nTranscoding is disabled in the configuration.");
    } else if !info.available {
        println!("\nNo encoder available; ?format= requests will fail with 502.");
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            config::load_config(p)?
        }
        None => {
            println!("No config file specified; checking default lookup");
            config::load_config_or_default(None)?
        }
    };

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        for warning in &warnings {
            println!("! {warning}");
        }
    }
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Library roots: {}", config.library.roots.len());
    println!("  Watch enabled: {}", config.watch.enabled);
    println!("  Transcode enabled: {}", config.transcode.enabled);
    Ok(())
}
