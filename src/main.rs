//! `signet` CLI - upload, sign and verify PDFs against a local store

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use signet_core::config::LOG_VAR;
use signet_core::features::hashes::sha256_file;
use signet_core::features::pipeline::PDF_MIME;
use signet_core::features::sample::agreement_pdf;
use signet_core::router::error_value;
use signet_core::{SignError, SignResult, SignetConfig, SigningPipeline, WireField};

#[derive(Parser)]
#[command(name = "signet")]
#[command(about = "Place signatures and form fields onto PDFs")]
#[command(version)]
struct Cli {
    /// Storage directory (overrides SIGNET_STORAGE_DIR)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a PDF and print its record
    Upload {
        pdf: PathBuf,

        /// Name to record instead of the file name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Bake the fields from a JSON array into a stored document
    Sign { id: String, fields: PathBuf },

    /// Compare a hash, or the hash of a local file, with the stored original
    Verify { id: String, hash_or_file: String },

    /// Print one document record
    Show { id: String },

    /// List stored documents, newest first
    List,

    /// Write the built-in sample agreement
    Sample { out: PathBuf },

    /// Write the signed artifact of a document
    Export { id: String, out: PathBuf },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or(LOG_VAR, "info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let SignError::Internal(detail) = &err {
                log::error!("{detail}");
            }
            eprintln!("{}", error_value(&err));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> SignResult<()> {
    let mut config = SignetConfig::from_env();
    if let Some(store) = cli.store {
        let db_name = config.db_path.file_name().map(|n| n.to_os_string());
        config.storage_dir = store;
        if let Some(db_name) = db_name {
            config.db_path = config.storage_dir.join(db_name);
        }
    }

    // The sample needs no store.
    if let Commands::Sample { out } = &cli.command {
        return write_sample(out);
    }
    let pipeline = SigningPipeline::open(&config)?;
    run_with_store(&pipeline, cli.command)
}

fn write_sample(out: &Path) -> SignResult<()> {
    let bytes = agreement_pdf()?;
    write_file(out, &bytes)?;
    log::info!("wrote sample agreement to {}", out.display());
    Ok(())
}

fn run_with_store(pipeline: &SigningPipeline, command: Commands) -> SignResult<()> {
    match command {
        Commands::Upload { pdf, name } => {
            let bytes = read_file(&pdf)?;
            let name = name.unwrap_or_else(|| {
                pdf.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            print_json(&pipeline.upload(&name, PDF_MIME, &bytes)?)
        }
        Commands::Sign { id, fields } => {
            let raw = read_file(&fields)?;
            let fields: Vec<WireField> = serde_json::from_slice(&raw)?;
            print_json(&pipeline.sign_wire(&id, &fields)?)
        }
        Commands::Verify { id, hash_or_file } => {
            let path = Path::new(&hash_or_file);
            let hash = if path.is_file() {
                sha256_file(path).map_err(SignError::Validation)?
            } else {
                hash_or_file
            };
            print_json(&pipeline.verify(&id, &hash)?)
        }
        Commands::Show { id } => print_json(&pipeline.document(&id)?),
        Commands::List => print_json(&pipeline.documents()?),
        Commands::Export { id, out } => {
            let bytes = pipeline.signed_artifact(&id)?;
            write_file(&out, &bytes)?;
            log::info!("exported {id} to {}", out.display());
            Ok(())
        }
        Commands::Sample { out } => write_sample(&out),
    }
}

fn read_file(path: &Path) -> SignResult<Vec<u8>> {
    fs::read(path).map_err(|e| SignError::Validation(format!("cannot read {}: {e}", path.display())))
}

fn write_file(path: &Path, bytes: &[u8]) -> SignResult<()> {
    fs::write(path, bytes)
        .map_err(|e| SignError::Internal(format!("cannot write {}: {e}", path.display())))
}

fn print_json<T: Serialize>(value: &T) -> SignResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| SignError::Internal(format!("encode_failed:{e}")))?;
    println!("{text}");
    Ok(())
}
