//! hyperkv Inspector
//!
//! Prints headers and statistics of a path-backed storage, and converts
//! sub-stores to and from the legacy flat-file streams.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use hyperkv::export;
use hyperkv::{Config, Header, KeyRange, Storage, StorageSource, StoreName};
use tracing_subscriber::{fmt, EnvFilter};

/// hyperkv storage inspector
#[derive(Parser, Debug)]
#[command(name = "hyperkv-inspect")]
#[command(about = "Inspect a hyperkv storage directory")]
#[command(version)]
struct Args {
    /// Storage directory
    #[arg(short, long, default_value = "./hyperkv_data")]
    path: PathBuf,

    /// Bitfield page size for a storage that has no header yet
    #[arg(long, default_value_t = hyperkv::config::DEFAULT_BITFIELD_PAGE_SIZE)]
    page_size: u16,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the tree, signatures and bitfield headers
    Header,

    /// Write one sub-store as a flat stream
    Export {
        /// key, secret_key, tree, data, bitfield or signatures
        store: StoreName,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Load a flat stream into one sub-store
    Import {
        store: StoreName,

        /// Input file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print record counts for every sub-store
    Stats,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyperkv=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> hyperkv::Result<()> {
    let config = Config::builder()
        .bitfield_page_size(args.page_size)
        .build();
    let storage = Storage::new(StorageSource::path(&args.path), config)?;
    let state = storage.open()?;

    tracing::info!("Opened {}", args.path.display());

    let result = match args.command {
        Command::Header => print_headers(&storage),
        Command::Export { store, out } => {
            let stream = export::read_all(&storage, store)?;
            std::fs::write(&out, &stream)?;
            println!("{}: wrote {} bytes to {}", store, stream.len(), out.display());
            Ok(())
        }
        Command::Import { store, input } => {
            let stream = std::fs::read(&input)?;
            export::write_all(&storage, store, &stream)?;
            println!("{}: loaded {} bytes from {}", store, stream.len(), input.display());
            Ok(())
        }
        Command::Stats => {
            for name in StoreName::ALL {
                let records = storage.sub_store(name)?.scan(&KeyRange::all())?.len();
                println!("{:<12} {:>10} records", name.as_str(), records);
            }
            println!("bitfield pages loaded at open: {}", state.bitfield.len());
            println!("public key present:     {}", state.key.is_some());
            println!("secret key present:     {}", state.secret_key.is_some());
            Ok(())
        }
    };

    storage.close()?;
    result
}

fn print_headers(storage: &Storage) -> hyperkv::Result<()> {
    for name in [StoreName::Tree, StoreName::Signatures, StoreName::Bitfield] {
        let raw = storage
            .sub_store(name)?
            .get(&hyperkv::keys::encode(hyperkv::keys::HEADER_SLOT))?;
        match raw {
            Some(raw) => {
                let header = Header::parse(&raw)?;
                println!(
                    "{:<12} type={:?} version={} block_size={} algorithm={}",
                    name.as_str(),
                    header.store_type,
                    header.version,
                    header.block_size,
                    header.algorithm.as_deref().unwrap_or("-"),
                );
            }
            None => println!("{:<12} (no header)", name.as_str()),
        }
    }
    Ok(())
}
