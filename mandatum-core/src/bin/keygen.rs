//! Key Generation Utility
//!
//! Generates an Ed25519 keypair for warrant minting and prints both halves
//! as standard base64, plus the fingerprint to use as `public_key_id`.
//!
//! Usage:
//!   cargo run --bin mandatum-keygen
//!   cargo run --bin mandatum-keygen -- --name issuer
//!
//! Output (shell-sourceable):
//!   export ISSUER_ED25519_PRIVATE_B64=<base64>
//!   export ISSUER_ED25519_PUBLIC_B64=<base64>
//!   export ISSUER_PUBLIC_KEY_ID=<hex fingerprint>

use mandatum_core::crypto::SigningKey;
use std::env;

fn main() {
    let args: Vec<String> = env::args().collect();
    let name = if args.len() > 2 && args[1] == "--name" {
        args[2].to_uppercase()
    } else {
        "WARRANT".to_string()
    };

    let key = SigningKey::generate();
    let public = key.public_key();

    println!("export {}_ED25519_PRIVATE_B64={}", name, key.to_base64());
    println!("export {}_ED25519_PUBLIC_B64={}", name, public.to_base64());
    println!("export {}_PUBLIC_KEY_ID={}", name, public.fingerprint());
}
