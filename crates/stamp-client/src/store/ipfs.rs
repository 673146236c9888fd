//! Content store client for a Kubo-compatible RPC API.
//!
//! Every RPC is a `POST {base_url}api/v0/<command>?arg=...`.
//!
//! | Command | Used by |
//! |---------|---------|
//! | `version` | [`ContentStore::version`] |
//! | `files/stat`, `files/mkdir` | [`ContentStore::ensure_directory`] |
//! | `files/ls` | [`ContentStore::list`] |
//! | `files/write` | [`ContentStore::write`] |
//! | `files/rm` | [`ContentStore::remove`] |
//! | `pin/add`, `pin/rm`, `pin/ls` | pinning |
//!
//! Errors come back as a non-2xx status with `{"Message": "...", "Code": 0, "Type": "error"}`.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use stamp_core::{ContentEntry, ContentId};

use super::{ContentStore, StoreVersion};
use crate::error::StoreError;
use crate::retry::{Collaborator, RetryPolicy};

/// RPC path prefix.
const API_PREFIX: &str = "api/v0";

/// `files/ls` entry type for directories.
const ENTRY_TYPE_DIRECTORY: u8 = 1;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LsResponse {
    #[serde(default)]
    entries: Option<Vec<LsEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LsEntry {
    name: String,
    #[serde(rename = "Type", default)]
    kind: u8,
    #[serde(default)]
    size: u64,
    hash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatResponse {
    hash: String,
    #[serde(default)]
    size: u64,
    #[serde(rename = "Type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PinLsResponse {
    #[serde(default)]
    keys: std::collections::HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RpcError {
    message: String,
}

/// HTTP client for the content store RPC API.
#[derive(Debug, Clone)]
pub struct IpfsContentStore {
    http: reqwest::Client,
    base_url: url::Url,
    directory: String,
    retry: RetryPolicy,
}

impl IpfsContentStore {
    /// Create a client for `base_url`, scoped to `directory` (e.g. `/stamped`).
    pub fn new(
        base_url: url::Url,
        directory: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StoreError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self {
            http,
            base_url,
            directory: directory.into(),
            retry: RetryPolicy::new(Collaborator::ContentStore),
        })
    }

    fn url(&self, command: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            API_PREFIX,
            command
        )
    }

    fn file_path(&self, name: &str) -> String {
        format!("{}/{}", self.directory, name)
    }

    /// Issue a read-only RPC, retrying transport failures.
    async fn read_rpc(
        &self,
        command: &'static str,
        args: &[(&str, &str)],
    ) -> Result<reqwest::Response, StoreError> {
        let url = self.url(command);
        let resp = self
            .retry
            .send(command, || self.http.post(&url).query(args).send())
            .await
            .map_err(|e| StoreError::Http {
                endpoint: command.into(),
                source: e,
            })?;
        check_status(command, resp).await
    }

    /// Issue a mutating RPC exactly once.
    async fn write_rpc(
        &self,
        command: &'static str,
        args: &[(&str, &str)],
    ) -> Result<reqwest::Response, StoreError> {
        let resp = self
            .http
            .post(self.url(command))
            .query(args)
            .send()
            .await
            .map_err(|e| StoreError::Http {
                endpoint: command.into(),
                source: e,
            })?;
        check_status(command, resp).await
    }

    async fn stat(&self, path: &str) -> Result<StatResponse, StoreError> {
        let resp = self.read_rpc("files/stat", &[("arg", path)]).await?;
        decode("files/stat", resp).await
    }
}

async fn check_status(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, StoreError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<RpcError>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    Err(StoreError::Api {
        endpoint: endpoint.into(),
        status,
        message,
    })
}

async fn decode<T: DeserializeOwned>(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<T, StoreError> {
    resp.json().await.map_err(|e| StoreError::Deserialization {
        endpoint: endpoint.into(),
        reason: e.to_string(),
    })
}

fn is_missing_file(err: &StoreError) -> bool {
    matches!(err, StoreError::Api { message, .. } if message.contains("does not exist"))
}

#[async_trait]
impl ContentStore for IpfsContentStore {
    fn directory(&self) -> &str {
        &self.directory
    }

    async fn version(&self) -> Result<StoreVersion, StoreError> {
        let resp = self.read_rpc("version", &[]).await?;
        decode("version", resp).await
    }

    async fn ensure_directory(&self) -> Result<(), StoreError> {
        let stat = match self.stat(&self.directory).await {
            Ok(stat) => stat,
            Err(e) if is_missing_file(&e) => {
                tracing::info!(directory = %self.directory, "creating stamped directory");
                self.write_rpc(
                    "files/mkdir",
                    &[("arg", self.directory.as_str()), ("parents", "true")],
                )
                .await?;
                self.stat(&self.directory).await?
            }
            Err(e) => return Err(e),
        };
        if stat.kind != "directory" {
            return Err(StoreError::DirectoryConflict {
                path: self.directory.clone(),
            });
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ContentEntry>, StoreError> {
        let resp = self
            .read_rpc("files/ls", &[("arg", self.directory.as_str()), ("long", "true")])
            .await?;
        let ls: LsResponse = decode("files/ls", resp).await?;
        ls.entries
            .unwrap_or_default()
            .into_iter()
            .map(|e| -> Result<ContentEntry, StoreError> {
                Ok(ContentEntry {
                    content_id: ContentId::new(e.hash)?,
                    name: e.name,
                    size_bytes: e.size,
                    is_directory: e.kind == ENTRY_TYPE_DIRECTORY,
                })
            })
            .collect()
    }

    async fn write(&self, name: &str, bytes: Vec<u8>) -> Result<ContentEntry, StoreError> {
        let endpoint = "files/write";
        let path = self.file_path(name);
        let part = reqwest::multipart::Part::bytes(bytes).file_name(name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        // Not retried: the multipart body is consumed by the first attempt.
        let resp = self
            .http
            .post(self.url(endpoint))
            .query(&[
                ("arg", path.as_str()),
                ("create", "true"),
                ("parents", "true"),
                ("truncate", "true"),
            ])
            .multipart(form)
            .send()
            .await
            .map_err(|e| StoreError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;
        check_status(endpoint, resp).await?;

        let stat = self.stat(&path).await?;
        Ok(ContentEntry {
            name: name.to_string(),
            content_id: ContentId::new(stat.hash)?,
            size_bytes: stat.size,
            is_directory: false,
        })
    }

    async fn remove(&self, name: &str) -> Result<(), StoreError> {
        let path = self.file_path(name);
        match self.write_rpc("files/rm", &[("arg", path.as_str())]).await {
            Ok(_) => Ok(()),
            Err(e) if is_missing_file(&e) => Err(StoreError::FileNotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    async fn pin(&self, cid: &ContentId) -> Result<(), StoreError> {
        self.write_rpc("pin/add", &[("arg", cid.as_str())]).await?;
        Ok(())
    }

    async fn unpin(&self, cid: &ContentId) -> Result<(), StoreError> {
        self.write_rpc("pin/rm", &[("arg", cid.as_str())]).await?;
        Ok(())
    }

    async fn list_pinned(&self) -> Result<HashSet<ContentId>, StoreError> {
        let resp = self.read_rpc("pin/ls", &[]).await?;
        let pins: PinLsResponse = decode("pin/ls", resp).await?;
        // Pins outside our identifier alphabet cannot match a listed file.
        Ok(pins
            .keys
            .into_keys()
            .filter_map(|k| ContentId::new(k).ok())
            .collect())
    }
}
