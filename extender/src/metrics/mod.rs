//! Upstream metric client: instant PromQL queries against a Prometheus-style
//! time-series backend, parsed into a [`ResourceMap`].
//!
//! One query per [`ResourceKind`], fired concurrently by the refresh
//! scheduler — this module only knows how to issue a single query and parse
//! a single response.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::model::{ResourceKind, ResourceMap};

const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// PromQL expressions for the four tracked resources. Each result vector is
/// expected to carry a `job` label naming the node.
fn query_for(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Cpu => {
            r#"(1 - avg(rate(node_cpu_seconds_total{mode="idle"}[30s])) by (job))"#
        }
        ResourceKind::Mem => {
            r#"(1 - (node_memory_MemAvailable_bytes / (node_memory_MemTotal_bytes)))"#
        }
        ResourceKind::NetIo => {
            r#"(max(irate(node_network_receive_bytes_total[30s])*8/1000) by (job)) > (max(irate(node_network_transmit_bytes_total[30s])*8/1024) by (job)) or (max(irate(node_network_transmit_bytes_total[30s])*8/1024) by (job))"#
        }
        ResourceKind::DiskIo => {
            r#"(max(irate(node_disk_written_bytes_total[30s])) by (job)) > (max(irate(node_disk_read_bytes_total[30s])) by (job)) or (max(irate(node_disk_read_bytes_total[30s])) by (job))"#
        }
    }
}

/// CPU/Mem are usage ratios in `[0,1]` and are scaled to integer percent;
/// NET_IO/DISK_IO expressions already yield the desired unit. All four are
/// stored as `i64` — see [`ResourceMap`].
fn base_multiplier(kind: ResourceKind) -> f64 {
    match kind {
        ResourceKind::Cpu | ResourceKind::Mem => 100.0,
        ResourceKind::NetIo | ResourceKind::DiskIo => 1.0,
    }
}

#[derive(Debug, Error)]
pub enum MetricError {
    #[error("upstream metric backend unavailable for {kind}: {source}")]
    UpstreamUnavailable {
        kind: ResourceKind,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream metric backend returned non-success status {status} for {kind}")]
    UpstreamStatus {
        kind: ResourceKind,
        status: reqwest::StatusCode,
    },

    #[error("upstream response for {kind} has an unexpected shape: {reason}")]
    BadUpstreamShape { kind: ResourceKind, reason: String },
}

#[derive(Debug, Deserialize)]
struct PromResponse {
    status: String,
    data: Option<PromData>,
}

#[derive(Debug, Deserialize)]
struct PromData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: Vec<PromSample>,
}

#[derive(Debug, Deserialize)]
struct PromSample {
    metric: PromMetric,
    /// `[unix_timestamp, "value-as-string"]` — Prometheus always encodes the
    /// sample value as a JSON string to avoid float-precision drift.
    value: (f64, String),
}

#[derive(Debug, Deserialize)]
struct PromMetric {
    job: Option<String>,
}

/// Thin client over a Prometheus-compatible `/api/v1/query` endpoint.
pub struct MetricClient {
    http: Client,
    base_url: String,
    user: String,
    password: String,
}

impl MetricClient {
    pub fn new(base_url: impl Into<String>, user: &str, password: &str) -> Self {
        MetricClient {
            http: Client::builder()
                .timeout(QUERY_TIMEOUT)
                .build()
                .expect("metric client builder is infallible for these options"),
            base_url: base_url.into(),
            user: user.to_string(),
            password: password.to_string(),
        }
    }

    /// Runs the instant query for `kind` and parses the result vector into a
    /// `node name → value` map.
    pub async fn query(&self, kind: ResourceKind) -> Result<ResourceMap, MetricError> {
        let mut request = self
            .http
            .get(format!("{}/api/v1/query", self.base_url))
            .query(&[("query", query_for(kind))]);

        if !self.user.is_empty() || !self.password.is_empty() {
            request = request.basic_auth(&self.user, Some(&self.password));
        }

        let response = request
            .send()
            .await
            .map_err(|source| MetricError::UpstreamUnavailable { kind, source })?;

        if !response.status().is_success() {
            return Err(MetricError::UpstreamStatus {
                kind,
                status: response.status(),
            });
        }

        let body: PromResponse = response
            .json()
            .await
            .map_err(|source| MetricError::UpstreamUnavailable { kind, source })?;

        if body.status != "success" {
            return Err(MetricError::BadUpstreamShape {
                kind,
                reason: format!("status field was '{}'", body.status),
            });
        }

        let data = body.data.ok_or_else(|| MetricError::BadUpstreamShape {
            kind,
            reason: "missing data field".to_string(),
        })?;

        if data.result_type != "vector" {
            return Err(MetricError::BadUpstreamShape {
                kind,
                reason: format!("resultType was '{}', expected 'vector'", data.result_type),
            });
        }

        let mult = base_multiplier(kind);
        let mut out = ResourceMap::new();
        for sample in data.result {
            let Some(job) = sample.metric.job else {
                warn!(?kind, "skipping sample with no job label");
                continue;
            };
            let Ok(raw) = sample.value.1.parse::<f64>() else {
                warn!(?kind, job = %job, raw_value = %sample.value.1, "skipping non-numeric sample");
                continue;
            };
            out.insert(job, (raw * mult).round() as i64);
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_multiplier_scales_usage_ratios_to_percent() {
        assert_eq!(base_multiplier(ResourceKind::Cpu), 100.0);
        assert_eq!(base_multiplier(ResourceKind::Mem), 100.0);
    }

    #[test]
    fn base_multiplier_is_unity_for_already_scaled_resources() {
        assert_eq!(base_multiplier(ResourceKind::NetIo), 1.0);
        assert_eq!(base_multiplier(ResourceKind::DiskIo), 1.0);
    }

    #[test]
    fn query_expressions_are_distinct_per_kind() {
        let exprs: Vec<&str> = ResourceKind::ALL.iter().map(|&k| query_for(k)).collect();
        let mut unique = exprs.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), exprs.len());
    }
}
