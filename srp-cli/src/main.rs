//! Range proof client CLI
//!
//! Connects to a verifier, authenticates with the configured device key and
//! proves that freshly sampled values lie in the requested range.

use anyhow::{Context, Result};
use clap::Parser;
use srp_interactive::{
    connect, ClientSession, InteractiveError, ProofPlan, RoundFailurePolicy, SessionOptions,
};
use srp_lib::range_proof::{MAX_BITLEN, MIN_BITLEN};
use std::path::PathBuf;
use std::time::Duration;

mod config;
mod ui;

#[derive(Parser)]
#[command(name = "srp-client")]
#[command(about = "Prove to a verifier that hidden values lie in a range", long_about = None)]
#[command(version)]
struct Cli {
    /// Verifier host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Verifier port
    #[arg(long, default_value_t = 9000)]
    port: u16,

    /// Client config file (key=value)
    #[arg(long, default_value = "config/client.conf")]
    config: PathBuf,

    /// Declared bit length of the range
    #[arg(long, default_value_t = 32,
          value_parser = clap::value_parser!(u32).range(MIN_BITLEN as i64..=MAX_BITLEN as i64))]
    bitlen: u32,

    /// Lower bound of the range
    #[arg(long, default_value_t = 0)]
    min: u32,

    /// Upper bound of the range (defaults to 2^bitlen - 1)
    #[arg(long)]
    max: Option<u32>,

    /// Number of proofs to send
    #[arg(long, default_value_t = 1)]
    requests: u32,

    /// Stop after the first rejected proof
    #[arg(long)]
    fail_fast: bool,

    /// Give up if the verifier is silent for this many seconds
    #[arg(long)]
    recv_timeout_secs: Option<u64>,

    /// Print the session report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn plan(&self) -> ProofPlan {
        let max = self
            .max
            .unwrap_or(((1u64 << self.bitlen) - 1) as u32);
        ProofPlan {
            min: self.min,
            max,
            bitlen: self.bitlen,
            rounds: self.requests,
        }
    }

    fn options(&self) -> SessionOptions {
        SessionOptions {
            recv_timeout: self.recv_timeout_secs.map(Duration::from_secs),
            failure_policy: if self.fail_fast {
                RoundFailurePolicy::Abort
            } else {
                RoundFailurePolicy::Continue
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("srp_cli=debug,srp_lib=debug,srp_interactive=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("srp_cli=info,srp_lib=warn,srp_interactive=warn")
            .init();
    }

    if let Err(e) = run(cli).await {
        ui::error(&format!("{:#}", e));
        if e
            .downcast_ref::<InteractiveError>()
            .is_some_and(InteractiveError::is_peer_violation)
        {
            ui::info("The verifier broke the protocol; check that it speaks the same wire version.");
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let identity = config::load_client_config(&cli.config)
        .and_then(|c| c.identity())
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let plan = cli.plan();
    ui::header("Range proof session");
    ui::key_value("Verifier", &format!("{}:{}", cli.host, cli.port));
    ui::key_value("Serial", &String::from_utf8_lossy(&identity.serial_id));
    ui::key_value(
        "Range",
        &format!("[{}, {}] ({} bits)", plan.min, plan.max, plan.bitlen),
    );
    ui::key_value("Requests", &plan.rounds.to_string());
    tracing::debug!(?plan, "starting session");

    let channel = connect((cli.host.as_str(), cli.port)).await?;
    let mut session = ClientSession::new(channel, identity, cli.options());
    let report = session.run(&plan).await?;

    ui::header("Results");
    for outcome in &report.rounds {
        ui::round(outcome);
    }
    if report.aborted {
        ui::warning("Stopped after the first rejected proof");
    }
    ui::info(&format!(
        "{} accepted, {} rejected",
        report.accepted(),
        report.rejected()
    ));

    if cli.json {
        ui::json(&serde_json::to_value(&report)?);
    }
    Ok(())
}
