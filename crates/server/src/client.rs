//! HTTP implementation of the replication calls.

use std::time::Duration;

use async_trait::async_trait;
use corelib::Node;
use replication::{PeerClient, ReplicaError, ReplicaWrite};
use reqwest::{StatusCode, Url};
use storage::VersionedRecord;

use crate::protocol::{ReplicaGetResponse, ReplicateRequest, ReplicateResponse};

/// Default bound on a single peer call.
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(5);

/// Talks to `/internal/storage/{key}` on other nodes.
#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }

    fn storage_url(target: &Node, key: &str) -> Result<Url, ReplicaError> {
        let base = if target.address.contains("://") {
            target.address.clone()
        } else {
            format!("http://{}", target.address)
        };
        let mut url = Url::parse(&base)
            .map_err(|err| ReplicaError::Transport(format!("bad address {}: {}", target.address, err)))?;
        url.path_segments_mut()
            .map_err(|_| ReplicaError::Transport(format!("bad address {}", target.address)))?
            .clear()
            .extend(["internal", "storage", key]);
        Ok(url)
    }

    fn transport_error(&self, err: reqwest::Error) -> ReplicaError {
        if err.is_timeout() {
            ReplicaError::Timeout(self.timeout)
        } else {
            ReplicaError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn put_replica(
        &self,
        target: &Node,
        key: &str,
        write: &ReplicaWrite,
    ) -> Result<(), ReplicaError> {
        let url = Self::storage_url(target, key)?;
        let response = self
            .client
            .put(url)
            .json(&ReplicateRequest::from_write(key, write))
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        let body: Option<ReplicateResponse> = response.json().await.ok();
        match body {
            Some(ReplicateResponse { success: true, .. }) if status.is_success() => Ok(()),
            Some(ReplicateResponse {
                error: Some(error), ..
            }) => Err(ReplicaError::Rejected(error)),
            _ if !status.is_success() => Err(ReplicaError::Status(status.as_u16())),
            _ => Err(ReplicaError::Decode("unexpected replicate response".into())),
        }
    }

    async fn get_replica(
        &self,
        target: &Node,
        key: &str,
    ) -> Result<Vec<VersionedRecord>, ReplicaError> {
        let url = Self::storage_url(target, key)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status if status.is_success() => {
                let body: ReplicaGetResponse = response
                    .json()
                    .await
                    .map_err(|err| ReplicaError::Decode(err.to_string()))?;
                Ok(body.into_records())
            }
            status => Err(ReplicaError::Status(status.as_u16())),
        }
    }
}
