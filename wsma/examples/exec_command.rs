//! Basic example: connect to a device and run exec commands
//!
//! # Usage
//!
//! ```bash
//! cargo run --example exec_command -- --host 192.168.1.1 --user admin --password secret
//! ```
//!
//! Over SSH, with a self-signed certificate, or on a custom port:
//! ```bash
//! cargo run --example exec_command -- --host r1 --user admin --password secret --transport ssh
//! cargo run --example exec_command -- --host r1 --user admin --password secret --insecure
//! cargo run --example exec_command -- --host r1 --user admin --password secret --transport http --port 8080
//! ```

use std::time::Duration;

use clap::Parser;
use wsma::{SessionBuilder, TransportKind};

#[derive(Parser, Debug)]
#[command(about = "Run exec commands through a WSMA agent")]
struct Args {
    /// Device hostname or address
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Agent port [default: depends on transport]
    #[arg(long)]
    port: Option<u16>,

    /// Username
    #[arg(short, long)]
    user: String,

    /// Password
    #[arg(short = 'P', long, default_value = "")]
    password: String,

    /// http, https or ssh
    #[arg(short, long, default_value = "https")]
    transport: TransportKind,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Commands to run
    #[arg(default_values_t = ["show clock".to_string(), "show version".to_string()])]
    commands: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut builder = SessionBuilder::new(&args.host)
        .username(&args.user)
        .password(&args.password)
        .transport(args.transport)
        .verify(!args.insecure)
        .timeout(Duration::from_secs(args.timeout));
    if let Some(port) = args.port {
        builder = builder.port(port);
    }

    let mut session = builder.build()?;

    println!("Connecting to {} over {}...", args.host, args.transport);
    session.open().await?;
    println!("Connected!");

    for command in &args.commands {
        println!("\nExecuting: {}", command);
        println!("{}", "-".repeat(50));

        let outcome = session.exec(command, None).await?;
        if outcome.success {
            println!("{}", outcome.output);
        } else {
            eprintln!("Command failed: {}", outcome.output);
        }

        println!("{}", "-".repeat(50));
    }

    println!("\nClosing connection...");
    session.close().await?;
    println!("Done!");

    Ok(())
}
