//! Ledger client for an ARK-style public REST API.
//!
//! | Endpoint | Used by |
//! |----------|---------|
//! | `GET /blockchain` | [`AnchorLedger::initialize`] (height) |
//! | `GET /node/configuration/crypto` | [`AnchorLedger::initialize`] (network, milestones) |
//! | `GET /wallets/{address}` | nonce lookup before each broadcast |
//! | `POST /transactions` | [`AnchorLedger::broadcast`] |
//! | `POST /transactions/search` | [`AnchorLedger::find_anchor_transaction_id`] |
//!
//! Reads are retried on transport errors. Submission is not: a retried
//! submit could put a second transaction in the pool.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use stamp_core::{ContentId, LedgerTxId};

use super::transaction::{self, AnchorTransaction, TYPE_GROUP_CORE, TYPE_IPFS};
use super::{classify_rejection, AnchorLedger, BroadcastOutcome, Milestone, NetworkParameters, RejectionKind};
use crate::config::{StampConfig, WalletSecret};
use crate::error::LedgerError;
use crate::retry::{Collaborator, RetryPolicy};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct BlockchainData {
    block: BlockHeight,
}

#[derive(Debug, Deserialize)]
struct BlockHeight {
    height: u64,
}

#[derive(Debug, Deserialize)]
struct CryptoConfig {
    network: NetworkInfo,
    #[serde(default)]
    milestones: Vec<Milestone>,
}

#[derive(Debug, Deserialize)]
struct NetworkInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WalletData {
    #[serde(default)]
    nonce: Option<NonceRepr>,
}

/// Nonces are strings on current nodes and numbers on older ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NonceRepr {
    Text(String),
    Number(u64),
}

#[derive(Debug, Default, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    data: Option<SubmitData>,
    #[serde(default)]
    errors: Option<HashMap<String, SubmitErrors>>,
}

#[derive(Debug, Default, Deserialize)]
struct SubmitData {
    #[serde(default)]
    accept: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SubmitErrors {
    One(SubmitError),
    Many(Vec<SubmitError>),
}

#[derive(Debug, Deserialize)]
struct SubmitError {
    #[serde(rename = "type", default)]
    kind: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
}

/// HTTP client for the anchoring ledger.
#[derive(Debug)]
pub struct HttpLedgerClient {
    http: reqwest::Client,
    base_url: url::Url,
    explorer_url: url::Url,
    fee: u64,
    secret: WalletSecret,
    params: RwLock<Option<NetworkParameters>>,
    /// Held from nonce lookup until the ledger answers, so two broadcasts
    /// from this wallet never sign with the same nonce.
    submit: tokio::sync::Mutex<()>,
    retry: RetryPolicy,
}

impl HttpLedgerClient {
    /// Create a client from collaborator configuration.
    ///
    /// Does not contact the ledger; call [`AnchorLedger::initialize`] next.
    pub fn new(config: &StampConfig) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LedgerError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self {
            http,
            base_url: config.ledger_api_url.clone(),
            explorer_url: config.explorer_url.clone(),
            fee: config.transaction_fee,
            secret: config.wallet_secret.clone(),
            params: RwLock::new(None),
            submit: tokio::sync::Mutex::new(()),
            retry: RetryPolicy::new(Collaborator::Ledger),
        })
    }

    /// Address of the anchoring wallet.
    pub fn sender_address(&self) -> String {
        transaction::sender_address(&self.secret)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, LedgerError> {
        let url = self.url(path);
        let endpoint = format!("GET /{path}");
        let resp = self.retry.send(&endpoint, || self.http.get(&url).send())
            .await
            .map_err(|e| LedgerError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;
        decode(&endpoint, check_status(&endpoint, resp).await?).await
    }

    /// Current nonce of the anchoring wallet. An unknown wallet has nonce 0.
    async fn wallet_nonce(&self) -> Result<u64, LedgerError> {
        let address = self.sender_address();
        let path = format!("wallets/{address}");
        let url = self.url(&path);
        let endpoint = "GET /wallets/{address}".to_string();
        let resp = self.retry.send(&endpoint, || self.http.get(&url).send())
            .await
            .map_err(|e| LedgerError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(0);
        }
        let wallet: Envelope<WalletData> = decode(&endpoint, check_status(&endpoint, resp).await?).await?;
        match wallet.data.nonce {
            None => Ok(0),
            Some(NonceRepr::Number(n)) => Ok(n),
            Some(NonceRepr::Text(s)) => s.parse().map_err(|e| LedgerError::Deserialization {
                endpoint,
                reason: format!("nonce {s:?}: {e}"),
            }),
        }
    }

    fn build(&self, nonce: u64, cid: &ContentId) -> Result<AnchorTransaction, LedgerError> {
        let params = self.params.read();
        let params = params.as_ref().ok_or(LedgerError::NotInitialized)?;
        transaction::build_anchor_transaction(params, &self.secret, self.fee, nonce, cid)
    }
}

async fn check_status(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, LedgerError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(LedgerError::Api {
        endpoint: endpoint.into(),
        status,
        body,
    })
}

async fn decode<T: DeserializeOwned>(endpoint: &str, resp: reqwest::Response) -> Result<T, LedgerError> {
    resp.json().await.map_err(|e| LedgerError::Deserialization {
        endpoint: endpoint.into(),
        reason: e.to_string(),
    })
}

/// Turn a submission response into a verdict for transaction `tx_id`.
fn classify_submission(tx_id: &str, response: SubmitResponse) -> BroadcastOutcome {
    let accepted = response
        .data
        .as_ref()
        .is_some_and(|d| d.accept.iter().any(|id| id == tx_id));
    if accepted {
        return BroadcastOutcome::Accepted {
            tx_id: LedgerTxId::new(tx_id),
        };
    }

    let first_error = response.errors.and_then(|mut errors| {
        // Keyed by transaction id; fall back to any entry if the node keys
        // differently.
        let entry = match errors.remove(tx_id) {
            Some(e) => Some(e),
            None => errors.into_values().next(),
        };
        match entry? {
            SubmitErrors::One(e) => Some(e),
            SubmitErrors::Many(list) => list.into_iter().next(),
        }
    });

    match first_error {
        Some(err) => {
            tracing::debug!(error_type = %err.kind, "ledger rejected transaction");
            BroadcastOutcome::Rejected {
                kind: classify_rejection(&err.message),
                message: err.message,
            }
        }
        None => BroadcastOutcome::Rejected {
            kind: RejectionKind::Unknown,
            message: "ledger neither accepted the transaction nor reported an error".to_string(),
        },
    }
}

#[async_trait]
impl AnchorLedger for HttpLedgerClient {
    async fn initialize(&self) -> Result<NetworkParameters, LedgerError> {
        let chain: Envelope<BlockchainData> = self.get_json("blockchain").await?;
        let crypto: Envelope<CryptoConfig> = self.get_json("node/configuration/crypto").await?;
        let params = NetworkParameters {
            network: crypto.data.network.name,
            height: chain.data.block.height,
            milestones: crypto.data.milestones,
        };
        tracing::info!(
            network = %params.network,
            height = params.height,
            transaction_version = params.transaction_version(),
            "ledger client initialized"
        );
        *self.params.write() = Some(params.clone());
        Ok(params)
    }

    fn is_initialized(&self) -> bool {
        self.params.read().is_some()
    }

    async fn broadcast(&self, cid: &ContentId) -> Result<BroadcastOutcome, LedgerError> {
        if !self.is_initialized() {
            return Err(LedgerError::NotInitialized);
        }
        let _submit = self.submit.lock().await;
        let nonce = self.wallet_nonce().await? + 1;
        let tx = self.build(nonce, cid)?;

        let endpoint = "POST /transactions";
        let resp = self
            .http
            .post(self.url("transactions"))
            .json(&serde_json::json!({ "transactions": [&tx] }))
            .send()
            .await
            .map_err(|e| LedgerError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        // Rejections arrive as 422 with the same body shape as acceptance.
        let status = resp.status();
        let body = resp.text().await.map_err(|e| LedgerError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;
        let parsed: SubmitResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(LedgerError::Api {
                    endpoint: endpoint.into(),
                    status: status.as_u16(),
                    body,
                })
            }
            Err(e) => {
                return Err(LedgerError::Deserialization {
                    endpoint: endpoint.into(),
                    reason: e.to_string(),
                })
            }
        };

        let outcome = classify_submission(&tx.id, parsed);
        tracing::debug!(cid = %cid, nonce, tx_id = %tx.id, ?outcome, "anchor transaction submitted");
        Ok(outcome)
    }

    async fn find_anchor_transaction_id(&self, cid: &ContentId) -> Result<LedgerTxId, LedgerError> {
        let url = self.url("transactions/search");
        let endpoint = "POST /transactions/search";
        let query = serde_json::json!({
            "type": TYPE_IPFS,
            "typeGroup": TYPE_GROUP_CORE,
            "asset": { "ipfs": cid.as_str() },
        });
        let resp = self.retry.send(endpoint, || self.http.post(&url).json(&query).send())
            .await
            .map_err(|e| LedgerError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;
        let hits: Envelope<Vec<SearchHit>> = decode(endpoint, check_status(endpoint, resp).await?).await?;
        hits.data
            .into_iter()
            .next()
            .map(|hit| LedgerTxId::new(hit.id))
            .ok_or_else(|| LedgerError::NotFound(cid.clone()))
    }

    fn explorer_link(&self, tx_id: &LedgerTxId) -> Option<String> {
        super::explorer_link(&self.explorer_url, tx_id)
    }
}
