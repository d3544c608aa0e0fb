//! Warrant minting CLI.
//!
//! Runs in the trusted side of a CI pipeline. Every input arrives through
//! flags or the conventional environment variables, the signed warrant goes
//! to stdout as pretty JSON, and the payload hash is echoed on a trailing
//! comment line so the job log carries an audit anchor:
//!
//! ```bash
//! export WARRANT_ISSUER=stegverse-ci
//! export WARRANT_PUBLIC_KEY_ID=ci-signer-1
//! export WARRANT_ED25519_PRIVATE_B64=...   # CI secret
//! export AGENT_NAME=GrantFinder-001
//! export POLICY_BUNDLE_SHA256=9f86d0...
//! mandatum-mint > warrant.json
//! ```

use clap::Parser;
use mandatum_core::audit::{set_global_logger, StdoutLogger};
use mandatum_core::canonical;
use mandatum_core::ci::CiContext;
use mandatum_core::crypto::SigningKey;
use mandatum_core::{Warrant, DEFAULT_TTL_SECS};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mandatum-mint")]
#[command(about = "Mint a signed execution warrant from the CI environment", long_about = None)]
struct Cli {
    /// Identity string of the minting authority
    #[arg(long, env = "WARRANT_ISSUER")]
    issuer: String,

    /// Key id the verifier will resolve through its key provider
    #[arg(long, env = "WARRANT_PUBLIC_KEY_ID")]
    public_key_id: String,

    /// Base64 Ed25519 private key (keep this in a CI secret)
    #[arg(long, env = "WARRANT_ED25519_PRIVATE_B64", hide_env_values = true)]
    private_key_b64: String,

    /// Agent the warrant authorizes
    #[arg(long, env = "AGENT_NAME")]
    agent: String,

    /// Module path recorded in the scope
    #[arg(long, env = "WARRANT_MODULE")]
    module: Option<String>,

    /// Hex SHA-256 of the policy bundle to pin
    #[arg(long, env = "POLICY_BUNDLE_SHA256")]
    bundle_sha256: String,

    /// Warrant lifetime in seconds
    #[arg(long, env = "WARRANT_TTL_SECONDS", default_value_t = DEFAULT_TTL_SECS)]
    ttl_seconds: i64,

    /// Explicit warrant id (defaults to a unique derived id)
    #[arg(long, env = "WARRANT_ID")]
    warrant_id: Option<String>,

    /// Emit audit events to stdout as JSON lines
    #[arg(long, default_value_t = false)]
    audit: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    if cli.audit {
        set_global_logger(Arc::new(StdoutLogger::new()));
    }

    let context = CiContext::from_env();
    if !context.is_complete() {
        return Err(
            "missing repo/commit_sha (need GITHUB_REPOSITORY and GITHUB_SHA, \
             or REPO and COMMIT_SHA)"
                .into(),
        );
    }

    let key = SigningKey::from_base64(&cli.private_key_b64)?;

    let mut builder = Warrant::builder()
        .issuer(cli.issuer)
        .public_key_id(cli.public_key_id)
        .agent(cli.agent)
        .policy_bundle(cli.bundle_sha256)
        .claims(context.claims())
        .ttl_seconds(cli.ttl_seconds);
    if let Some(module) = cli.module {
        builder = builder.module(module);
    }
    if let Some(id) = cli.warrant_id {
        builder = builder.warrant_id(id);
    }

    let warrant = builder.issue(&key)?;

    println!("{}", mandatum_core::wire::to_json_pretty(&warrant)?);

    // Audit anchor for the CI log.
    let payload = canonical::canonical_payload(&warrant.to_value()?);
    println!("\n# warrant_payload_sha256={}", canonical::sha256_hex(&payload));

    Ok(())
}
