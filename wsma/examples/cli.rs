//! Interactive shell over a WSMA session
//!
//! Every line is run as an exec command. Lines starting with `conf ` are
//! applied as configuration instead. Ctrl+D quits.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example cli -- 192.168.1.1 admin secret
//! cargo run --example cli -- 172.16.33.224 vagrant vagrant --port 2224 --no-tls
//! ```
//!
//! `--print-agent-config` prints the device configuration that enables the
//! agents and exits without connecting.

use clap::Parser;
use rustyline::error::ReadlineError;
use wsma::request::bootstrap::agent_config;
use wsma::{ActionOnFail, ListenerTransport, Session, SessionBuilder, TransportKind, WsmaTransport};

const CONFIG_PREFIX: &str = "conf ";

#[derive(Parser, Debug)]
#[command(about = "Simple interactive WSMA shell")]
struct Args {
    /// Device IP or DNS name
    host: String,

    /// Username
    #[arg(default_value = "cisco")]
    username: String,

    /// Password
    #[arg(default_value = "cisco")]
    password: String,

    /// Port of the agent
    #[arg(short, long, default_value_t = 80)]
    port: u16,

    /// Use plain HTTP
    #[arg(short, long)]
    no_tls: bool,

    /// Use the SSH subsystem instead of HTTP(S)
    #[arg(long, conflicts_with = "no_tls")]
    ssh: bool,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Print the agent enablement config for this listener and exit
    #[arg(long, value_name = "TRANSPORT")]
    print_agent_config: Option<ListenerTransport>,
}

async fn run_line(session: &mut Session<WsmaTransport>, line: &str) -> wsma::Result<()> {
    let (kind, outcome) = match line.strip_prefix(CONFIG_PREFIX) {
        Some(config) => ("CFG", session.config(config, ActionOnFail::Stop).await?),
        None => ("CLI", session.exec(line, None).await?),
    };

    print!("{}: '{}' ==> ", kind, line);
    if outcome.success {
        println!("OK\n{}", outcome.output);
    } else {
        println!("ERR:\n{}", outcome.output);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    if let Some(listener) = args.print_agent_config {
        print!("{}", agent_config(listener));
        return Ok(());
    }

    let transport = if args.ssh {
        TransportKind::Ssh
    } else if args.no_tls {
        TransportKind::Http
    } else {
        TransportKind::Https
    };

    let mut session = SessionBuilder::new(&args.host)
        .username(&args.username)
        .password(&args.password)
        .port(args.port)
        .transport(transport)
        .verify(!args.insecure)
        .build()?;

    if let Err(e) = session.open().await {
        eprintln!("something went wrong, aborting: {}", e);
        std::process::exit(1);
    }

    let mut rl = rustyline::DefaultEditor::new()?;
    eprintln!("enter command, Ctrl+D to quit");

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line).ok();

                if let Err(e) = run_line(&mut session, line).await {
                    eprintln!("error: {}", e);
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("(Use Ctrl+D to quit)");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(e) => {
                eprintln!("readline error: {}", e);
                break;
            }
        }
    }

    session.close().await?;
    Ok(())
}
