use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use refedit::archive::extract_archive;
use refedit::{ArchiveConfig, ImportOutcome, Session};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a dataset and report what was found
    Inspect {
        /// Dataset archive (.zip) or unpacked dataset folder
        path: PathBuf,
    },
    /// Print the metadata an export of the dataset would contain
    Preview { path: PathBuf },
    /// Import a dataset and export it again in the canonical layout
    Repack {
        path: PathBuf,
        #[clap(short, long, default_value = ".")]
        out: PathBuf,
        /// Write the dataset folder instead of a zip archive
        #[clap(short, long)]
        unpacked: bool,
    },
    /// Extract an archive as-is, without re-exporting it
    Unpack {
        archive: PathBuf,
        #[clap(short, long, default_value = ".")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    let session = Session::new(ArchiveConfig::from_env());

    match args.command {
        Commands::Inspect { path } => {
            let outcome = load(&session, &path).await?;
            report(&outcome);

            let store = session.read().await;
            for entry in store.entries() {
                println!(
                    "{}  [{}] refs={} targets={}  {}",
                    entry.id,
                    entry.scope,
                    entry.references.len(),
                    entry.targets.len(),
                    entry.text.lines().next().unwrap_or("")
                );
            }
        }
        Commands::Preview { path } => {
            load(&session, &path).await?;
            let preview = session.preview().await;
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }
        Commands::Repack { path, out, unpacked } => {
            let outcome = load(&session, &path).await?;
            report(&outcome);

            let archive = session.export().await?;
            fs::create_dir_all(&out)
                .with_context(|| format!("Failed to create output directory {:?}", out))?;
            if unpacked {
                let written = extract_archive(&archive.bytes, &out)?;
                info!(
                    "Wrote {} file(s) under {:?}",
                    written.len(),
                    out.join(&archive.root_folder)
                );
            } else {
                let target = out.join(&archive.filename);
                fs::write(&target, &archive.bytes)
                    .with_context(|| format!("Failed to write {:?}", target))?;
                info!("Wrote {:?} ({} bytes)", target, archive.bytes.len());
            }
        }
        Commands::Unpack { archive, out } => {
            let bytes =
                fs::read(&archive).with_context(|| format!("Failed to read {:?}", archive))?;
            let written = extract_archive(&bytes, &out)?;
            info!("Extracted {} file(s) into {:?}", written.len(), out);
        }
    }

    Ok(())
}

async fn load(session: &Session, path: &Path) -> Result<ImportOutcome> {
    info!("Loading dataset from {:?}", path);
    let outcome = if path.is_dir() {
        session.import_directory(path).await?
    } else {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
        session.import(bytes).await?
    };
    Ok(outcome)
}

fn report(outcome: &ImportOutcome) {
    println!("Imported {} entries", outcome.imported_entries);
    for warning in &outcome.warnings {
        println!("  warning: {}", warning);
    }
    if outcome.needs_model_labels() {
        warn!(
            "{} target result(s) need a model name before the dataset can be exported",
            outcome.missing_model_labels
        );
    }
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level.to_string()))
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
