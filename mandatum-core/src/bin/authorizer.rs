//! Mandatum Authorizer: verification and gating CLI.
//!
//! Runs on the untrusted side of the pipeline, next to the checkout it is
//! authorizing against. Reads the warrant from an argument, stdin, or the
//! transport env var; everything it compares against (bundle hash, repo,
//! commit) comes from its own flags/environment, never from the warrant.
//!
//! ```bash
//! # Verify a warrant and print the decision as JSON
//! mandatum-authorizer verify --warrant - --output json < warrant.json
//!
//! # Verify and gate in one step; exit code drives the job
//! mandatum-authorizer gate --action run_agent --target GrantFinder-001 --mode strict
//! ```

use clap::{Parser, Subcommand};
use mandatum_core::audit::{set_global_logger, StdoutLogger};
use mandatum_core::wire::{self, WARRANT_ENV};
use mandatum_core::{
    ActionRequest, GateMode, KeyProvider, PolicyGate, Verifier, VerifyPolicy, Warrant,
};
use std::io::{self, Read};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mandatum-authorizer")]
#[command(about = "Verify execution warrants against the local context", long_about = None)]
struct Cli {
    /// Trusted keys as a JSON object of key_id -> base64 public key
    #[arg(long, env = "WARRANT_TRUSTED_KEYS")]
    trusted_keys: Option<String>,

    /// Hex SHA-256 of the locally pinned policy bundle
    #[arg(long, env = "POLICY_BUNDLE_SHA256")]
    bundle_sha256: Option<String>,

    /// Repository the verifier observes locally
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repo: Option<String>,

    /// Commit the verifier observes locally
    #[arg(long, env = "GITHUB_SHA")]
    commit_sha: Option<String>,

    /// Maximum accepted warrant lifetime in seconds
    #[arg(long, env = "WARRANT_MAX_TTL_SECONDS", default_value_t = mandatum_core::DEFAULT_MAX_TTL_SECS)]
    max_ttl_seconds: i64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the verification pipeline and report the decision
    Verify {
        /// Warrant JSON or base64 (- or absent reads stdin, then $MANDATUM_WARRANT)
        #[arg(short, long)]
        warrant: Option<String>,

        /// Output format: exit-code, json, or quiet
        #[arg(short, long, default_value = "exit-code")]
        output: String,
    },

    /// Verify, then gate a requested action
    Gate {
        /// Warrant JSON or base64 (- or absent reads stdin, then $MANDATUM_WARRANT)
        #[arg(short, long)]
        warrant: Option<String>,

        /// Requested action
        #[arg(long, default_value = "run_agent")]
        action: String,

        /// Requested target (agent name)
        #[arg(long)]
        target: String,

        /// Gate mode: strict, warn, or off
        #[arg(long, env = "WARRANT_GATE_MODE", default_value = "strict")]
        mode: String,
    },

    /// Shape-check an unsigned local receipt (informational fallback only)
    Receipt {
        /// Receipt JSON (- or absent reads stdin)
        #[arg(short, long)]
        receipt: Option<String>,
    },

    /// Print authorizer configuration
    Info,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    set_global_logger(Arc::new(StdoutLogger::new()));
    let cli = Cli::parse();

    match &cli.command {
        Commands::Verify { warrant, output } => {
            let verifier = build_verifier(&cli)?;
            let raw = read_warrant(warrant.clone())?;
            let decision = verifier.verify_slice(raw.as_bytes());

            match output.as_str() {
                "exit-code" => {
                    if decision.ok {
                        println!("OK payload_sha256={}", decision.payload_sha256.unwrap_or_default());
                    } else {
                        eprintln!("verification failed: {}", decision.reason);
                        std::process::exit(1);
                    }
                }
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&decision)?);
                    if !decision.ok {
                        std::process::exit(1);
                    }
                }
                "quiet" => {
                    if !decision.ok {
                        std::process::exit(1);
                    }
                }
                other => return Err(format!("unknown output format: {other}").into()),
            }
        }

        Commands::Gate {
            warrant,
            action,
            target,
            mode,
        } => {
            let mode: GateMode = mode.parse()?;

            // Off mode skips verification entirely; don't even require the
            // verifier inputs to be configured.
            if mode == GateMode::Off {
                tracing::warn!("gate mode off: skipping warrant verification");
                return Ok(());
            }

            let gate = PolicyGate::with_mode(mode);
            let request = ActionRequest::new(action.clone(), target.clone());
            let verifier = build_verifier(&cli)?;
            let raw = read_warrant(warrant.clone())?;
            let parsed: Warrant = parse_warrant(&raw)?;
            let decision = verifier.verify(&parsed);
            let outcome = gate.enforce(&parsed.scope, &decision, &request);

            println!(
                "{}",
                serde_json::json!({
                    "verdict": outcome.verdict,
                    "proceed": outcome.proceed,
                    "reason": decision.reason.code(),
                })
            );
            if !outcome.proceed {
                std::process::exit(1);
            }
        }

        Commands::Receipt { receipt } => {
            let raw = read_warrant(receipt.clone())?;
            let value: serde_json::Value = serde_json::from_str(&raw).unwrap_or(serde_json::Value::Null);
            let decision = mandatum_core::receipt::verify_receipt(&value);
            println!("{}", serde_json::to_string_pretty(&decision)?);
            if !decision.ok {
                std::process::exit(1);
            }
        }

        Commands::Info => {
            println!("mandatum-authorizer v{}", env!("CARGO_PKG_VERSION"));
            match &cli.trusted_keys {
                Some(raw) => match KeyProvider::from_json(raw) {
                    Ok(keys) => println!("trusted keys: {} configured", keys.len()),
                    Err(e) => println!("trusted keys: INVALID ({e})"),
                },
                None => println!("trusted keys: none configured"),
            }
            println!(
                "observed repo: {}",
                cli.repo.as_deref().unwrap_or("(not configured)")
            );
            println!("max ttl: {}s", cli.max_ttl_seconds);
        }
    }

    Ok(())
}

fn build_verifier(cli: &Cli) -> Result<Verifier, Box<dyn std::error::Error>> {
    let keys = match &cli.trusted_keys {
        Some(raw) => KeyProvider::from_json(raw)?,
        None => return Err("WARRANT_TRUSTED_KEYS is required for verification".into()),
    };
    let bundle = cli
        .bundle_sha256
        .clone()
        .ok_or("POLICY_BUNDLE_SHA256 is required for verification")?;
    let repo = cli
        .repo
        .clone()
        .ok_or("observed repo is required (GITHUB_REPOSITORY or --repo)")?;
    let commit = cli
        .commit_sha
        .clone()
        .ok_or("observed commit is required (GITHUB_SHA or --commit-sha)")?;

    let policy = VerifyPolicy::new(bundle, repo, commit).with_max_ttl(cli.max_ttl_seconds);
    Ok(Verifier::new(keys, policy)?)
}

fn read_warrant(arg: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    match arg {
        Some(w) if w != "-" => Ok(w),
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            let trimmed = buf.trim().to_string();
            if !trimmed.is_empty() {
                return Ok(trimmed);
            }
            std::env::var(WARRANT_ENV)
                .map_err(|_| format!("no warrant on stdin and ${WARRANT_ENV} is unset").into())
        }
    }
}

fn parse_warrant(raw: &str) -> Result<Warrant, Box<dyn std::error::Error>> {
    if raw.trim_start().starts_with('{') {
        Ok(wire::from_json_str(raw)?)
    } else {
        Ok(wire::decode_base64(raw)?)
    }
}
