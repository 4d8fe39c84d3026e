use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

mod store;

use store::ReadMode;

/// `carstore` inspects and extends CAR (Content Addressable aRchive) v1 files
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the root CIDs of a CAR file
    Roots {
        /// Path to the CAR file
        path: PathBuf,
    },
    /// List the blocks of a CAR file (CID and payload length)
    Ls {
        /// Path to the CAR file
        path: PathBuf,

        /// How the file is read
        /// Default: indexed
        #[arg(short, long, value_enum, default_value_t = ReadMode::Indexed)]
        mode: ReadMode,
    },
    /// Write the payload of a block to stdout
    Get {
        /// Path to the CAR file
        path: PathBuf,

        /// CID of the block, in hexadecimal
        cid: String,
    },
    /// Append the blocks of a CAR file to another one
    ///
    /// The destination is created with the roots of the source if it does not exist.
    Append {
        /// Destination CAR file
        dst: PathBuf,

        /// Source CAR file
        src: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging();

    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> store::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match command {
        Command::Roots { path } => {
            let count = store::list_roots(&path, &mut out)?;
            info!("{count} root(s) in {:?}", path);
        }
        Command::Ls { path, mode } => {
            let count = store::list_blocks(&path, mode, &mut out)?;
            info!("{count} block(s) in {:?}", path);
        }
        Command::Get { path, cid } => {
            store::get_block(&path, &cid, &mut out)?;
        }
        Command::Append { dst, src } => {
            store::append(&dst, &src)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::FmtSubscriber;

    const DEFAULT_LOGGING: &str = "carstore_cli=info,carstore=info,warn";

    let rust_log = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| if s.is_empty() { None } else { Some(s) })
        .unwrap_or_else(|| DEFAULT_LOGGING.to_owned());

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(rust_log)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("tracing setup failed: {err}");
    }
}
