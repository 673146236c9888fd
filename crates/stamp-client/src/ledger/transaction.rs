//! Anchoring transaction construction and signing.
//!
//! Byte layout signed and hashed (little-endian integers):
//!
//! | Field | Size |
//! |-------|------|
//! | header `0xff` | 1 |
//! | version | 1 |
//! | type group | 4 |
//! | type | 2 |
//! | nonce (version 2 only) | 8 |
//! | sender public key | 32 |
//! | fee | 8 |
//! | asset length | 1 |
//! | asset (content id bytes) | n |
//! | signature (signed form only) | 64 |
//!
//! The signature is Ed25519 over SHA-256 of the unsigned form. The
//! transaction id is hex SHA-256 of the signed form.

use ed25519_dalek::{Signer, SigningKey};
use serde::Serialize;
use sha2::{Digest, Sha256};
use stamp_core::{ContentId, LedgerTxId};

use super::NetworkParameters;
use crate::config::WalletSecret;
use crate::error::LedgerError;

/// Transaction type carrying a content id.
pub const TYPE_IPFS: u16 = 5;

/// Core transaction type group.
pub const TYPE_GROUP_CORE: u32 = 1;

const HEADER: u8 = 0xff;

/// Asset payload of an anchoring transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpfsAsset {
    /// The anchored content id.
    pub ipfs: String,
}

/// A signed anchoring transaction in its wire representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorTransaction {
    pub version: u8,
    pub type_group: u32,
    #[serde(rename = "type")]
    pub kind: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    pub sender_public_key: String,
    pub fee: String,
    pub asset: IpfsAsset,
    pub signature: String,
    pub id: String,
}

impl AnchorTransaction {
    /// Transaction id as a [`LedgerTxId`].
    pub fn tx_id(&self) -> LedgerTxId {
        LedgerTxId::new(self.id.clone())
    }
}

/// Address the ledger knows the wallet by: hex of its public key.
pub fn sender_address(secret: &WalletSecret) -> String {
    hex::encode(SigningKey::from_bytes(secret.as_bytes()).verifying_key().to_bytes())
}

/// Build and sign an anchoring transaction.
///
/// `nonce` is the wallet's next nonce (current + 1). It is ignored for
/// version 1 transactions.
pub fn build_anchor_transaction(
    params: &NetworkParameters,
    secret: &WalletSecret,
    fee: u64,
    nonce: u64,
    cid: &ContentId,
) -> Result<AnchorTransaction, LedgerError> {
    let payload = cid.as_str().as_bytes();
    let asset_len = u8::try_from(payload.len())
        .map_err(|_| LedgerError::Signing(format!("content id {cid} exceeds 255 bytes")))?;

    let version = params.transaction_version();
    let key = SigningKey::from_bytes(secret.as_bytes());
    let public_key = key.verifying_key().to_bytes();

    let mut unsigned = Vec::with_capacity(64 + payload.len());
    unsigned.push(HEADER);
    unsigned.push(version);
    unsigned.extend_from_slice(&TYPE_GROUP_CORE.to_le_bytes());
    unsigned.extend_from_slice(&TYPE_IPFS.to_le_bytes());
    if version >= 2 {
        unsigned.extend_from_slice(&nonce.to_le_bytes());
    }
    unsigned.extend_from_slice(&public_key);
    unsigned.extend_from_slice(&fee.to_le_bytes());
    unsigned.push(asset_len);
    unsigned.extend_from_slice(payload);

    let signature = key.sign(&Sha256::digest(&unsigned)).to_bytes();

    let mut signed = unsigned;
    signed.extend_from_slice(&signature);
    let id = hex::encode(Sha256::digest(&signed));

    Ok(AnchorTransaction {
        version,
        type_group: TYPE_GROUP_CORE,
        kind: TYPE_IPFS,
        nonce: (version >= 2).then(|| nonce.to_string()),
        sender_public_key: hex::encode(public_key),
        fee: fee.to_string(),
        asset: IpfsAsset {
            ipfs: cid.to_string(),
        },
        signature: hex::encode(signature),
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Milestone;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    fn params(aip11: bool) -> NetworkParameters {
        NetworkParameters {
            network: "devnet".into(),
            height: 10,
            milestones: vec![Milestone { height: 1, aip11 }],
        }
    }

    fn secret() -> WalletSecret {
        WalletSecret::from_bytes([7u8; 32])
    }

    fn cid() -> ContentId {
        ContentId::new("bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi").unwrap()
    }

    #[test]
    fn version_two_carries_nonce() {
        let tx = build_anchor_transaction(&params(true), &secret(), 100, 4, &cid()).unwrap();
        assert_eq!(tx.version, 2);
        assert_eq!(tx.nonce.as_deref(), Some("4"));
        assert_eq!(tx.kind, TYPE_IPFS);
        assert_eq!(tx.type_group, TYPE_GROUP_CORE);
        assert_eq!(tx.fee, "100");
    }

    #[test]
    fn version_one_omits_nonce() {
        let tx = build_anchor_transaction(&params(false), &secret(), 100, 4, &cid()).unwrap();
        assert_eq!(tx.version, 1);
        assert!(tx.nonce.is_none());
        let json = serde_json::to_value(&tx).unwrap();
        assert!(json.get("nonce").is_none());
        assert_eq!(json["type"], 5);
        assert_eq!(json["asset"]["ipfs"], cid().as_str());
    }

    #[test]
    fn signature_verifies_against_sender_key() {
        let tx = build_anchor_transaction(&params(true), &secret(), 100, 1, &cid()).unwrap();
        let pk_bytes: [u8; 32] = hex::decode(&tx.sender_public_key)
            .unwrap()
            .try_into()
            .unwrap();
        let sig_bytes: [u8; 64] = hex::decode(&tx.signature).unwrap().try_into().unwrap();
        let vk = VerifyingKey::from_bytes(&pk_bytes).unwrap();

        let mut unsigned = vec![HEADER, 2];
        unsigned.extend_from_slice(&TYPE_GROUP_CORE.to_le_bytes());
        unsigned.extend_from_slice(&TYPE_IPFS.to_le_bytes());
        unsigned.extend_from_slice(&1u64.to_le_bytes());
        unsigned.extend_from_slice(&pk_bytes);
        unsigned.extend_from_slice(&100u64.to_le_bytes());
        unsigned.push(cid().as_str().len() as u8);
        unsigned.extend_from_slice(cid().as_str().as_bytes());

        let digest = Sha256::digest(&unsigned);
        assert!(vk
            .verify(&digest, &Signature::from_bytes(&sig_bytes))
            .is_ok());
    }

    #[test]
    fn id_changes_with_nonce() {
        let a = build_anchor_transaction(&params(true), &secret(), 100, 1, &cid()).unwrap();
        let b = build_anchor_transaction(&params(true), &secret(), 100, 2, &cid()).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 64);
    }

    #[test]
    fn sender_address_matches_public_key() {
        let tx = build_anchor_transaction(&params(true), &secret(), 100, 1, &cid()).unwrap();
        assert_eq!(sender_address(&secret()), tx.sender_public_key);
    }
}
