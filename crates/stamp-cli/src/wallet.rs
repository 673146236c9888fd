//! # Wallet Subcommand
//!
//! `keygen`: create an anchoring wallet seed for `LEDGER_WALLET_SECRET`.
//! Runs offline; no collaborator is contacted.

use anyhow::Result;
use clap::Args;
use serde_json::json;
use stamp_client::ledger::transaction::sender_address;
use stamp_client::WalletSecret;

use crate::print_json;

/// Arguments for `stamp keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {}

/// Generate a wallet seed and print it with the sender address.
pub fn run_keygen(_args: &KeygenArgs, out: &mut dyn std::io::Write) -> Result<u8> {
    let secret = WalletSecret::generate();
    print_json(
        out,
        &json!({
            "walletSecret": secret.to_hex(),
            "senderAddress": sender_address(&secret),
        }),
    )?;
    Ok(0)
}
