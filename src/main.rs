use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chain_proto::{Codec, OperationType, Schema, Settings, Transaction};
use clap::{Parser, Subcommand};
use tracing::{debug, info, Level};

// -----------------------------
// Command line
// -----------------------------

#[derive(Parser, Debug)]
#[clap(name = "chain-proto", about = "Encode and decode chain transactions", long_about = None)]
struct Cli {
    /// TOML settings file
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of settings
    #[clap(short, long)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the sample create-account transaction and print its encoded length
    Sample {
        /// Also print the encoding as hex and the transaction hash
        #[clap(long)]
        hex: bool,
    },
    /// Encode a transaction read from a JSON file
    Encode {
        #[clap(value_parser)]
        input: PathBuf,
        /// Prefix the output with its varint length
        #[clap(long)]
        length_delimited: bool,
    },
    /// Decode a hex-encoded transaction and print it as JSON
    Decode {
        #[clap(value_parser)]
        hex: String,
    },
    /// Print the active tag table as JSON
    Schema,
}

// -----------------------------
// Helpers
// -----------------------------

const SAMPLE_SOURCE: &str = "buQiu6i3aVP4SXBNmPsvJZxwYEcEBHUZd4Wj";
const SAMPLE_DEST: &str = "buQpCTN3x6K4pAyboF4C1CoUYbr2ooqRyCjZ";

fn sample_transaction() -> Transaction {
    let mut tx = Transaction::new(SAMPLE_SOURCE, 1)
        .with_fees(1000, 1_000_000)
        .with_metadata("test");

    let op = tx.add_operation(OperationType::CreateAccount);
    op.source_address = SAMPLE_SOURCE.to_string();
    op.metadata = "test".to_string();

    let create_account = op.create_account_mut();
    create_account.dest_address = SAMPLE_DEST.to_string();
    create_account.init_balance = 1_000_000_000;

    tx
}

fn init_logging(settings: &Settings, verbose: bool) -> Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else {
        settings
            .log_level
            .parse::<Level>()
            .with_context(|| format!("invalid log_level {:?}", settings.log_level))?
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn load_codec(settings: &Settings) -> Result<Codec> {
    let schema = match &settings.schema_path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading schema table {}", path.display()))?;
            info!(path = %path.display(), "using schema table from file");
            Schema::from_json(&text).context("parsing schema table")?
        }
        None => Schema::chain(),
    };
    Ok(Codec::with_config(schema, settings.codec.clone())?)
}

// -----------------------------
// Application
// -----------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    init_logging(&settings, cli.verbose)?;
    debug!(?settings, "settings loaded");

    let codec = load_codec(&settings)?;

    match cli.command {
        Command::Sample { hex } => {
            let tx = sample_transaction();
            let encoded = codec.encode(&tx)?;
            println!("{}", encoded.len());
            if hex {
                println!("{}", hex::encode(&encoded));
                println!("{}", codec.hash(&tx)?);
            }
        }
        Command::Encode {
            input,
            length_delimited,
        } => {
            let text = fs::read_to_string(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let tx: Transaction = serde_json::from_str(&text)
                .with_context(|| format!("parsing transaction JSON in {}", input.display()))?;
            let encoded = if length_delimited {
                codec.encode_length_delimited(&tx)?
            } else {
                codec.encode(&tx)?
            };
            info!(bytes = encoded.len(), operations = tx.operations.len(), "encoded transaction");
            println!("{}", hex::encode(&encoded));
        }
        Command::Decode { hex } => {
            let bytes = hex::decode(hex.trim()).context("input is not valid hex")?;
            let tx = codec.decode(&bytes)?;
            info!(hash = %codec.hash(&tx)?, "decoded transaction");
            println!("{}", serde_json::to_string_pretty(&tx)?);
        }
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(codec.schema())?);
        }
    }

    Ok(())
}
