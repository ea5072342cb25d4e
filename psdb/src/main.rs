mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use output::{CatOutput, KindCountInfo, KindListing, LsOutput, OutputWriter, PruneOutput};
use psdb_core::{Hash, PayloadMode, PruneOptions, ResourceKind, Store};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// psdb - pipeline state database tooling
#[derive(Parser)]
#[command(name = "psdb")]
#[command(about = "Inspect and prune pipeline state databases", long_about = None)]
#[command(version)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log debug diagnostics (RUST_LOG takes precedence)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Log warnings and errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy only the records reachable from retained pipelines into a new database
    Prune {
        /// Database to read
        #[arg(long, value_name = "PATH")]
        input_db: PathBuf,

        /// Database to create (existing records there are discarded)
        #[arg(long, value_name = "PATH")]
        output_db: PathBuf,

        /// Keep only pipelines recorded under this application hash (hex)
        #[arg(long, value_name = "HASH")]
        filter_application: Option<Hash>,
    },

    /// List record hashes per resource kind
    Ls {
        /// Database to read
        #[arg(long, value_name = "PATH")]
        db: PathBuf,

        /// Only list this kind (e.g. graphics_pipeline)
        #[arg(long)]
        kind: Option<ResourceKind>,
    },

    /// Print the decoded payload of a record
    Cat {
        /// Database to read
        #[arg(long, value_name = "PATH")]
        db: PathBuf,

        /// Resource kind (e.g. pipeline_layout)
        kind: ResourceKind,

        /// Record hash (hex)
        hash: Hash,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let output = OutputWriter::new(cli.json);

    let result = match cli.command {
        Commands::Prune {
            input_db,
            output_db,
            filter_application,
        } => cmd_prune(&output, &input_db, &output_db, filter_application),
        Commands::Ls { db, kind } => cmd_ls(&output, &db, kind),
        Commands::Cat { db, kind, hash } => cmd_cat(&output, &db, kind, &hash),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output.write_error(&e, 1);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Whether two paths name the same existing location.
fn same_location(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn cmd_prune(
    output: &OutputWriter,
    input_db: &Path,
    output_db: &Path,
    filter_application: Option<Hash>,
) -> Result<()> {
    let input = Store::open(input_db)
        .with_context(|| format!("Failed to load database: {}", input_db.display()))?;

    if same_location(input_db, output_db) {
        anyhow::bail!(
            "Output database must differ from input database: {}",
            output_db.display()
        );
    }

    let pruned = Store::create(output_db).with_context(|| {
        format!(
            "Failed to open database for writing: {}",
            output_db.display()
        )
    })?;

    debug!(
        input = %input_db.display(),
        output = %output_db.display(),
        filter = ?filter_application,
        "pruning database"
    );
    let options = PruneOptions { filter_application };
    let stats = input
        .prune_into(&pruned, &options)
        .with_context(|| format!("Failed to prune {}", input_db.display()))?;

    let data = PruneOutput {
        success: true,
        result_code: 0,
        input: input_db.display().to_string(),
        output: output_db.display().to_string(),
        filter_application,
        kinds: stats.report().map(KindCountInfo::from).collect(),
    };

    output.write(&data, || {
        let mut text = String::new();
        for kind in stats.report() {
            let _ = writeln!(
                text,
                "Pruned {} entries: {} -> {} entries",
                kind.kind, kind.read, kind.written
            );
        }
        text
    })
}

fn cmd_ls(output: &OutputWriter, db: &Path, kind: Option<ResourceKind>) -> Result<()> {
    let store =
        Store::open(db).with_context(|| format!("Failed to load database: {}", db.display()))?;

    let kinds = match kind {
        Some(kind) => vec![kind],
        None => ResourceKind::ALL.to_vec(),
    };

    let mut listings = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let hashes = store
            .list_hashes(kind)
            .with_context(|| format!("Failed to list {} records", kind))?;
        listings.push(KindListing { kind, hashes });
    }

    let data = LsOutput {
        success: true,
        result_code: 0,
        kinds: listings,
    };

    output.write(&data, || {
        let mut text = String::new();
        for listing in &data.kinds {
            let _ = writeln!(text, "{} ({})", listing.kind, listing.hashes.len());
            for hash in &listing.hashes {
                let _ = writeln!(text, "  {}", hash);
            }
        }
        text
    })
}

fn cmd_cat(output: &OutputWriter, db: &Path, kind: ResourceKind, hash: &Hash) -> Result<()> {
    let store =
        Store::open(db).with_context(|| format!("Failed to load database: {}", db.display()))?;

    let payload = store
        .read_entry(kind, hash, PayloadMode::Decoded)
        .with_context(|| format!("Failed to read {} {}", kind, hash))?;

    let document: serde_json::Value = serde_json::from_slice(&payload)
        .with_context(|| format!("{} {} is not a JSON state document", kind, hash))?;

    let data = CatOutput {
        success: true,
        result_code: 0,
        kind,
        hash: *hash,
        document,
    };

    output.write(&data, || {
        serde_json::to_string_pretty(&data.document)
            .map(|json| format!("{}\n", json))
            .unwrap_or_default()
    })
}
