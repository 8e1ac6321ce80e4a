use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ink_storage::{storage_key, AnnotationRepository, MigrationStatus, StorageConfig};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "pdf-ink")]
#[command(about = "Inspect and transfer ink annotations stored for PDF documents")]
pub struct Cli {
    /// Annotation store directory (defaults to $PDF_INK_ANNOTATIONS_DIR or
    /// the platform data directory).
    #[arg(long, global = true, value_name = "DIR")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the storage key of a document.
    Key {
        #[arg(value_name = "PDF")]
        file: PathBuf,
    },
    /// Print machine-readable annotation summary.
    Info {
        #[arg(value_name = "PDF")]
        file: PathBuf,
    },
    /// Export stored annotations as XFDF.
    Export {
        #[arg(value_name = "PDF")]
        file: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replace stored annotations with an XFDF document.
    Import {
        #[arg(value_name = "PDF")]
        file: PathBuf,
        #[arg(value_name = "XFDF")]
        xfdf: PathBuf,
    },
    /// Remove stored annotations in every format.
    Delete {
        #[arg(value_name = "PDF")]
        file: PathBuf,
    },
    /// Convert a legacy JSON store to XFDF.
    Migrate {
        #[arg(value_name = "PDF")]
        file: PathBuf,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    key: String,
    has_annotations: bool,
    stroke_count: usize,
    pages: Vec<PageOutput>,
}

#[derive(Debug, Serialize)]
struct PageOutput {
    page: u32,
    strokes: usize,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Key { file } => {
            println!("{}", storage_key(&file));
            Ok(())
        }
        Commands::Info { file } => run_info(&repository(cli.store)?, &file),
        Commands::Export { file, output } => {
            run_export(&repository(cli.store)?, &file, output.as_deref())
        }
        Commands::Import { file, xfdf } => run_import(&repository(cli.store)?, &file, &xfdf),
        Commands::Delete { file } => {
            repository(cli.store)?
                .delete(&file)
                .with_context(|| format!("failed to delete annotations for {}", file.display()))?;
            println!("deleted");
            Ok(())
        }
        Commands::Migrate { file } => run_migrate(&repository(cli.store)?, &file),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn repository(store: Option<PathBuf>) -> Result<AnnotationRepository> {
    let config = match store {
        Some(root) => StorageConfig::with_root(root),
        None => StorageConfig::from_env().context("invalid storage configuration")?,
    };
    Ok(AnnotationRepository::from_config(&config))
}

fn run_info(repo: &AnnotationRepository, file: &Path) -> Result<()> {
    let has_annotations = repo.has_annotations(file);
    let annotations = repo
        .load(file)
        .with_context(|| format!("failed to load annotations for {}", file.display()))?;

    let payload = InfoOutput {
        path: file.display().to_string(),
        key: storage_key(file).to_string(),
        has_annotations,
        stroke_count: annotations.stroke_count(),
        pages: annotations
            .iter()
            .map(|(page, strokes)| PageOutput { page, strokes: strokes.len() })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    Ok(())
}

fn run_export(repo: &AnnotationRepository, file: &Path, output: Option<&Path>) -> Result<()> {
    let text = repo
        .export_as_string(file, None)
        .with_context(|| format!("failed to export annotations for {}", file.display()))?;

    match output {
        Some(output) => {
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(output, text)
                .with_context(|| format!("failed to write XFDF to {}", output.display()))?;
            println!("{}", output.display());
        }
        None => print!("{text}"),
    }

    Ok(())
}

fn run_import(repo: &AnnotationRepository, file: &Path, xfdf: &Path) -> Result<()> {
    ensure_file_exists(xfdf)?;

    let text = fs::read_to_string(xfdf)
        .with_context(|| format!("failed to read {}", xfdf.display()))?;
    let annotations = repo
        .import_from_string(file, &text)
        .with_context(|| format!("failed to import {}", xfdf.display()))?;

    println!("imported {} strokes", annotations.stroke_count());
    Ok(())
}

fn run_migrate(repo: &AnnotationRepository, file: &Path) -> Result<()> {
    let status = repo
        .migrate(file)
        .with_context(|| format!("failed to migrate annotations for {}", file.display()))?;

    match status {
        MigrationStatus::Migrated { strokes } => println!("migrated {strokes} strokes"),
        MigrationStatus::AlreadyXfdf => println!("already migrated"),
        MigrationStatus::NoLegacyStore => println!("no legacy annotations"),
        MigrationStatus::UnreadableLegacy => anyhow::bail!("legacy annotation store is unreadable"),
    }

    Ok(())
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}
