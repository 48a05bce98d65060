//! Structured output example
//!
//! With a format spec the agent returns the command output as a tree
//! instead of plain text. The tree is available as JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example format_spec -- --host 192.168.1.1 --user admin --password secret
//! cargo run --example format_spec -- --host r1 --user admin --password secret \
//!     --command "show interfaces" --spec built-in
//! ```

use clap::Parser;
use wsma::{SessionBuilder, TransportKind};

#[derive(Parser, Debug)]
#[command(about = "Run an exec command with a format spec and print the tree")]
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

    /// Command to run
    #[arg(short, long, default_value = "show ip interface brief")]
    command: String,

    /// Format spec known to the device
    #[arg(short, long, default_value = "built-in")]
    spec: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut builder = SessionBuilder::new(&args.host)
        .username(&args.user)
        .password(&args.password)
        .transport(args.transport)
        .verify(!args.insecure);
    if let Some(port) = args.port {
        builder = builder.port(port);
    }

    let session = builder.build()?;

    let command = args.command.clone();
    let spec = args.spec.clone();
    let outcome = session
        .scoped(|s| {
            Box::pin(async move {
                let outcome = s.exec(&command, Some(&spec)).await?.clone();
                outcome.into_result()
            })
        })
        .await??;

    match outcome.format_result() {
        Some(tree) => println!("{}", serde_json::to_string_pretty(tree)?),
        None => {
            println!("No structured result, raw output follows");
            println!("{}", outcome.output);
        }
    }

    Ok(())
}
