use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use ledgerdb::core::Address;
use ledgerdb::{CancellationToken, Client, ClientConfig, ReconstructionReport, ScanConfig};

#[derive(Parser)]
#[command(name = "ledgerdb", about = "Read tables and blobs back out of a transaction ledger")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// JSON-RPC endpoint of the ledger
    #[arg(long, env = "LEDGERDB_RPC_URL", global = true)]
    rpc_url: Option<String>,

    /// Program that owns the tables and upload sessions (base58)
    #[arg(long, env = "LEDGERDB_PROGRAM_ID", global = true)]
    program_id: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30, global = true)]
    timeout_secs: u64,

    /// Upper bound on signatures scanned per address
    #[arg(long, default_value_t = 1000, global = true)]
    max_signatures: usize,

    /// Transaction bodies fetched concurrently
    #[arg(long, default_value_t = 50, global = true)]
    batch_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Print every role address for a name
    Addresses {
        /// Owner key (base58)
        owner: String,
        /// Logical name (table, or table/rowId/extension)
        name: String,
    },
    /// Read table rows
    Rows {
        /// Owner key (base58)
        owner: String,
        /// Table name; omit to read the owner's root
        table: Option<String>,
        /// Row id of an extension table
        #[arg(long, requires = "extension", requires = "table")]
        row_id: Option<String>,
        /// Extension table name
        #[arg(long, requires = "row_id")]
        extension: Option<String>,
    },
    /// Reassemble an uploaded blob
    Reconstruct {
        /// Session descriptor address (base58)
        session: String,
        /// Write the decoded payload to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cli.global.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = client_config(&cli.global)?;
    let client = Client::connect(config)?;

    match cli.command {
        Command::Addresses { owner, name } => {
            print_json(&client.addresses(&owner, &name)?)?;
        }

        Command::Rows {
            owner,
            table,
            row_id,
            extension,
        } => {
            let read = match (table, row_id, extension) {
                (Some(table), Some(row_id), Some(extension)) => {
                    client
                        .read_extension_table(&owner, &table, &row_id, &extension)
                        .await?
                }
                (Some(table), _, _) => client.read_table(&owner, &table).await?,
                (None, _, _) => client.read_root(&owner).await?,
            };
            print_json(&read)?;
        }

        Command::Reconstruct { session, out } => {
            let address: Address = session
                .trim()
                .parse()
                .with_context(|| format!("invalid session address {session}"))?;
            let rec = client
                .reconstruct_blob(&address, &CancellationToken::new())
                .await?;

            if let Some(path) = out {
                std::fs::write(&path, &rec.processed.decoded)
                    .with_context(|| format!("writing {}", path.display()))?;
                tracing::info!(path = %path.display(), bytes = rec.processed.decoded.len(), "payload written");
            }
            print_json(&ReconstructionReport::new(address, &rec))?;
        }
    }

    Ok(())
}

fn client_config(args: &GlobalArgs) -> anyhow::Result<ClientConfig> {
    let rpc_url = args
        .rpc_url
        .clone()
        .context("no ledger endpoint: pass --rpc-url or set LEDGERDB_RPC_URL")?;
    let program_id: Address = args
        .program_id
        .as_deref()
        .context("no program id: pass --program-id or set LEDGERDB_PROGRAM_ID")?
        .parse()
        .context("invalid program id")?;

    let scan = ScanConfig::default()
        .with_batch_size(args.batch_size)
        .with_max_signatures(args.max_signatures);

    Ok(ClientConfig::new(rpc_url, program_id)
        .with_request_timeout(Duration::from_secs(args.timeout_secs))
        .with_scan(scan))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
