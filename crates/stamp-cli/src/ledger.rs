//! # Ledger Subcommands
//!
//! `anchor` and `sync`: the two writers of the stamp log.

use anyhow::Result;
use clap::Args;
use serde_json::json;
use stamp_anchor::StampService;
use stamp_core::ContentId;

use crate::print_json;

/// Arguments for `stamp anchor`.
#[derive(Args, Debug)]
pub struct AnchorArgs {
    /// Content id to anchor.
    #[arg(value_name = "CID")]
    pub cid: String,
}

/// Anchor a content id and print the transaction.
pub async fn run_anchor(args: &AnchorArgs, service: &StampService, out: &mut dyn std::io::Write) -> Result<u8> {
    let cid = ContentId::new(args.cid.as_str())?;
    let outcome = service.broadcast_cid(&cid).await?;
    let explorer_link = service.services().ledger.explorer_link(&outcome.ledger_tx_id);
    print_json(
        out,
        &json!({
            "contentId": outcome.content_id,
            "ledgerTxId": outcome.ledger_tx_id,
            "explorerLink": explorer_link,
            "state": outcome.state.as_str(),
        }),
    )?;
    Ok(0)
}

/// Arguments for `stamp sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {}

/// Reconcile the stamp log. Exit code 1 if any content id was skipped.
pub async fn run_sync(_args: &SyncArgs, service: &StampService, out: &mut dyn std::io::Write) -> Result<u8> {
    let report = service.synchronize_log().await?;
    print_json(
        out,
        &json!({
            "attempted": report.attempted,
            "reconciled": report.reconciled,
            "skipped": report.skipped,
        }),
    )?;
    Ok(u8::from(report.skipped > 0))
}
