//! # Content Subcommands
//!
//! `list`, `dedup` and `pin`: operations on the stamped directory.

use anyhow::Result;
use clap::Args;
use serde_json::json;
use stamp_anchor::StampService;
use stamp_core::ContentId;

use crate::print_json;

/// Arguments for `stamp list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show files without a stamp record.
    #[arg(long)]
    pub unstamped: bool,
}

/// Print the stamped-file projection.
pub async fn run_list(args: &ListArgs, service: &StampService, out: &mut dyn std::io::Write) -> Result<u8> {
    let mut views = service.list_stamped_files().await?;
    if args.unstamped {
        views.retain(|v| v.stamped.is_none());
    }
    print_json(out, &serde_json::to_value(&views)?)?;
    Ok(0)
}

/// Arguments for `stamp dedup`.
#[derive(Args, Debug)]
pub struct DedupArgs {}

/// Run one deduplication pass. Exit code 1 if any removal failed.
pub async fn run_dedup(_args: &DedupArgs, service: &StampService, out: &mut dyn std::io::Write) -> Result<u8> {
    let report = service.remove_duplicates().await?;
    print_json(
        out,
        &json!({
            "scanned": report.scanned,
            "removed": report.removed,
            "failed": report.failed,
        }),
    )?;
    Ok(u8::from(report.failed > 0))
}

/// Arguments for `stamp pin`.
#[derive(Args, Debug)]
pub struct PinArgs {
    /// Content id to pin or unpin.
    #[arg(value_name = "CID")]
    pub cid: String,

    /// New pin state.
    #[arg(long, action = clap::ArgAction::Set)]
    pub state: bool,
}

/// Set the pin state of a content id.
pub async fn run_pin(args: &PinArgs, service: &StampService, out: &mut dyn std::io::Write) -> Result<u8> {
    let cid = ContentId::new(args.cid.as_str())?;
    service.set_pin(&cid, args.state).await?;
    print_json(out, &json!({ "contentId": cid, "pinned": args.state }))?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture, output_json};
    use stamp_client::ContentStore;

    fn cid(s: &str) -> ContentId {
        ContentId::new(s).unwrap()
    }

    #[tokio::test]
    async fn list_prints_projection() {
        let f = fixture().await;
        f.store.insert_entry("x_a.txt", cid("bafy1"), 10);
        f.store.insert_entry("y_b.txt", cid("bafy2"), 20);
        f.service.broadcast_cid(&cid("bafy1")).await.unwrap();

        let mut out = Vec::new();
        let code = run_list(&ListArgs { unstamped: false }, &f.service, &mut out)
            .await
            .unwrap();
        assert_eq!(code, 0);
        let listed = output_json(&out);
        assert_eq!(listed.as_array().unwrap().len(), 2);
        assert!(listed[0]["stamped"]["ledgerTxId"].is_string());

        let mut out = Vec::new();
        run_list(&ListArgs { unstamped: true }, &f.service, &mut out)
            .await
            .unwrap();
        let unstamped = output_json(&out);
        assert_eq!(unstamped.as_array().unwrap().len(), 1);
        assert_eq!(unstamped[0]["contentId"], "bafy2");
    }

    #[tokio::test]
    async fn dedup_reports_failures_in_exit_code() {
        let f = fixture().await;
        f.store.insert_entry("x_a.txt", cid("bafy1"), 1);
        f.store.insert_entry("y_a.txt", cid("bafy1"), 1);
        f.store.insert_entry("z_a.txt", cid("bafy1"), 1);
        f.store.fail_removal_of("z_a.txt");

        let mut out = Vec::new();
        let code = run_dedup(&DedupArgs {}, &f.service, &mut out).await.unwrap();
        assert_eq!(code, 1);
        let report = output_json(&out);
        assert_eq!(report["removed"], 1);
        assert_eq!(report["failed"], 1);
    }

    #[tokio::test]
    async fn pin_sets_state() {
        let f = fixture().await;
        f.store.insert_entry("x_a.txt", cid("bafy1"), 1);

        let mut out = Vec::new();
        let args = PinArgs {
            cid: "bafy1".into(),
            state: true,
        };
        assert_eq!(run_pin(&args, &f.service, &mut out).await.unwrap(), 0);
        assert!(f.store.list_pinned().await.unwrap().contains(&cid("bafy1")));
        assert_eq!(output_json(&out)["pinned"], true);
    }

    #[tokio::test]
    async fn pin_rejects_invalid_cid() {
        let f = fixture().await;
        let args = PinArgs {
            cid: "../x".into(),
            state: true,
        };
        assert!(run_pin(&args, &f.service, &mut Vec::new()).await.is_err());
    }
}
