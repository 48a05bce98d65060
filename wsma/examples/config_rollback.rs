//! Config example: apply a block with rollback on failure
//!
//! The default block contains a typo on purpose. With `rollback` the device
//! undoes the lines that did apply, and the outcome carries the device's
//! message for the line that failed.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example config_rollback -- --host 192.168.1.1 --user admin --password secret
//! cargo run --example config_rollback -- --host r1 --user admin --password secret \
//!     --action stop --config-file lab.cfg --persist
//! ```

use std::path::PathBuf;

use clap::Parser;
use wsma::{ActionOnFail, SessionBuilder, TransportKind};

const DEFAULT_BLOCK: &str = "interface Loopback99\n ip adress 10.99.99.99 255.255.255.255\nend";

#[derive(Parser, Debug)]
#[command(about = "Apply configuration through a WSMA agent")]
struct Args {
    #[arg(long, default_value = "localhost")]
    host: String,

    #[arg(long)]
    port: Option<u16>,

    #[arg(short, long)]
    user: String,

    #[arg(short = 'P', long, default_value = "")]
    password: String,

    #[arg(short, long, default_value = "https")]
    transport: TransportKind,

    #[arg(long)]
    insecure: bool,

    /// stop, continue or rollback
    #[arg(short, long, default_value = "rollback")]
    action: ActionOnFail,

    /// Read the block from a file instead of the built-in sample
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Save the running configuration when the block applied
    #[arg(long)]
    persist: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let block = match &args.config_file {
        Some(path) => std::fs::read_to_string(path)?,
        None => DEFAULT_BLOCK.to_string(),
    };

    let mut builder = SessionBuilder::new(&args.host)
        .username(&args.user)
        .password(&args.password)
        .transport(args.transport)
        .verify(!args.insecure);
    if let Some(port) = args.port {
        builder = builder.port(port);
    }

    let mut session = builder.build()?;
    session.open().await?;

    println!("Applying with action-on-fail={}:", args.action);
    for line in block.lines() {
        println!("  {}", line);
    }

    let outcome = session.config(&block, args.action).await?;
    if outcome.success {
        println!("\nApplied: {}", outcome.output);

        if args.persist {
            let outcome = session.config_persist().await?;
            if outcome.success {
                println!("Configuration saved");
            } else {
                eprintln!("Save failed: {}", outcome.output);
            }
        }
    } else {
        eprintln!("\nRejected: {}", outcome.output);
    }

    session.close().await?;
    Ok(())
}
