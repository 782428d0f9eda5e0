//! Search cluster health probe.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::config::Config;
use crate::error::ProbeError;

/// Cluster status as reported by `_cluster/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Green,
    Yellow,
    Red,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            HealthStatus::Green => "green",
            HealthStatus::Yellow => "yellow",
            HealthStatus::Red => "red",
        };
        f.write_str(status)
    }
}

/// One round trip to a cluster health endpoint.
#[async_trait]
pub trait ClusterHealthProbe: Send + Sync {
    async fn cluster_health(&self) -> Result<HealthStatus, ProbeError>;
}

#[derive(Debug, Deserialize)]
struct ClusterHealthResponse {
    status: HealthStatus,
}

/// Elasticsearch `GET /_cluster/health` over HTTP.
pub struct ElasticsearchProbe {
    client: Client,
    endpoint: Url,
    username: String,
    password: Option<String>,
}

impl ElasticsearchProbe {
    pub fn new(
        node_url: &str,
        username: String,
        password: Option<String>,
    ) -> Result<Self, ProbeError> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            endpoint: health_endpoint(node_url)?,
            username,
            password,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ProbeError> {
        Self::new(
            &config.elastic_search_url,
            config.elastic_search_username.clone(),
            config.elastic_search_password.clone(),
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ClusterHealthProbe for ElasticsearchProbe {
    async fn cluster_health(&self) -> Result<HealthStatus, ProbeError> {
        let mut request = self.client.get(self.endpoint.clone());
        if let Some(password) = &self.password {
            request = request.basic_auth(&self.username, Some(password));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Unavailable(format!("http status {status}")));
        }

        let body: ClusterHealthResponse = response.json().await?;
        Ok(body.status)
    }
}

/// `<node>/_cluster/health`, keeping any path prefix on the node URL.
fn health_endpoint(node_url: &str) -> Result<Url, url::ParseError> {
    let mut base = Url::parse(node_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("_cluster/health")
}
