//! RomM HTTP client.
//!
//! Async client using `reqwest`, with HTTP basic credentials when a username
//! is configured.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogFuture, ProgressFn};
use crate::error::CatalogError;
use crate::types::{Asset, PlatformRecord, RomRecord, RommConfig};

/// Minimum interval between two download progress reports.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// RomM API client.
pub struct RommClient {
    http: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl RommClient {
    /// Creates a client from connection settings.
    pub fn new(config: &RommConfig) -> Result<Self, CatalogError> {
        let base_url = config
            .address
            .as_deref()
            .map(|a| a.trim_end_matches('/').to_string())
            .filter(|a| !a.is_empty())
            .ok_or(CatalogError::NotConfigured)?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("gameshelf/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            username: config.username.clone().filter(|u| !u.is_empty()),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let req = self.http.get(url);
        match &self.username {
            Some(user) => req.basic_auth(user, self.password.as_deref()),
            None => req,
        }
    }

    /// Sends a GET request and fails on non-success status codes.
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, CatalogError> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CatalogError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CatalogError> {
        let resp = self.send(self.request(path)).await?;
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn download(
        &self,
        id: i64,
        dest_dir: &Path,
        cancel: CancellationToken,
        on_progress: ProgressFn<'_>,
    ) -> Result<PathBuf, CatalogError> {
        tokio::fs::create_dir_all(dest_dir).await?;
        let dest = dest_dir.join(format!("{id}.zip"));

        let req = self
            .request("/api/roms/download")
            .query(&[("rom_ids", id.to_string())]);
        let resp = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CatalogError::Cancelled),
            resp = self.send(req) => resp?,
        };

        let total = resp.content_length().filter(|len| *len > 0);
        info!(rom_id = id, bytes = ?total, path = %dest.display(), "downloading rom");

        // The server does not support resuming, so always start over.
        let file = tokio::fs::File::create(&dest).await?;
        match Self::write_body(resp, file, total, &cancel, on_progress).await {
            Ok(received) => {
                on_progress(100.0);
                debug!(rom_id = id, bytes = received, "download finished");
                Ok(dest)
            }
            Err(e) => {
                if let Err(remove) = tokio::fs::remove_file(&dest).await {
                    warn!(path = %dest.display(), error = %remove, "failed to remove partial download");
                }
                Err(e)
            }
        }
    }

    /// Streams the response body into `file`, returning the byte count. The
    /// file is closed on return.
    async fn write_body(
        resp: reqwest::Response,
        mut file: tokio::fs::File,
        total: Option<u64>,
        cancel: &CancellationToken,
        on_progress: ProgressFn<'_>,
    ) -> Result<u64, CatalogError> {
        let mut stream = resp.bytes_stream();
        let mut received = 0u64;
        let mut last_report: Option<Instant> = None;

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CatalogError::Cancelled),
                next = stream.next() => next,
            };
            let Some(chunk) = chunk else { break };
            let bytes = chunk?;
            file.write_all(&bytes).await?;
            received += bytes.len() as u64;

            if let Some(total) = total {
                let due = last_report.is_none_or(|t| t.elapsed() >= PROGRESS_INTERVAL);
                if due && received < total {
                    on_progress(received as f64 / total as f64 * 100.0);
                    last_report = Some(Instant::now());
                }
            }
        }
        file.flush().await?;
        Ok(received)
    }
}

impl Catalog for RommClient {
    fn get_rom(&self, id: i64) -> CatalogFuture<'_, RomRecord> {
        Box::pin(async move { self.get_json(&format!("/api/roms/{id}")).await })
    }

    fn get_platform(&self, id: i64) -> CatalogFuture<'_, PlatformRecord> {
        Box::pin(async move { self.get_json(&format!("/api/platforms/{id}")).await })
    }

    fn fetch_asset<'a>(&'a self, path: &'a str) -> CatalogFuture<'a, Asset> {
        Box::pin(async move {
            let resp = self.send(self.request(path)).await?;
            let content_type = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let data = resp.bytes().await?.to_vec();
            debug!(path, bytes = data.len(), "asset fetched");
            Ok(Asset { data, content_type })
        })
    }

    fn download_rom<'a>(
        &'a self,
        id: i64,
        dest_dir: &'a Path,
        cancel: CancellationToken,
        on_progress: ProgressFn<'a>,
    ) -> CatalogFuture<'a, PathBuf> {
        Box::pin(self.download(id, dest_dir, cancel, on_progress))
    }
}
