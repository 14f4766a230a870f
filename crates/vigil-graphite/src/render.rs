use crate::error::RenderError;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One sample: `[value-or-null, unix seconds]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DataPoint(pub Option<f64>, pub i64);

impl DataPoint {
    pub fn value(&self) -> Option<f64> {
        self.0
    }

    pub fn timestamp(&self) -> i64 {
        self.1
    }
}

/// One series of a render response.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderSeries {
    pub target: String,
    pub datapoints: Vec<DataPoint>,
}

impl RenderSeries {
    /// The sample to compare thresholds against: scanning from the tail,
    /// at most `max_null_points` nulls are skipped. `None` means the value
    /// counts as absent.
    pub fn last_non_null(&self, max_null_points: u32) -> Option<(f64, i64)> {
        self.datapoints
            .iter()
            .rev()
            .take(max_null_points as usize + 1)
            .find_map(|dp| dp.0.map(|value| (value, dp.1)))
    }
}

/// Client for the render API
/// (`{base}/render/?target=...&from=...&until=...&format=json`).
pub struct RenderClient {
    client: reqwest::Client,
}

impl RenderClient {
    pub fn new() -> Self {
        RenderClient {
            client: reqwest::Client::new(),
        }
    }

    /// Issues one render query bounded by the absolute `deadline`. An
    /// already-elapsed deadline fails without touching the network; an
    /// in-flight request is aborted when the deadline passes.
    pub async fn query(
        &self,
        base_url: &str,
        target: &str,
        from: &str,
        until: &str,
        deadline: DateTime<Utc>,
    ) -> Result<Vec<RenderSeries>, RenderError> {
        let remaining = (deadline - Utc::now())
            .to_std()
            .map_err(|_| RenderError::DeadlineElapsed)?;

        let url = format!("{}/render/", base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .query(&[
                ("target", target),
                ("from", from),
                ("until", until),
                ("format", "json"),
            ])
            .timeout(remaining)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RenderError::DeadlineElapsed
                } else {
                    RenderError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                RenderError::DeadlineElapsed
            } else {
                RenderError::Http(e)
            }
        })?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl Default for RenderClient {
    fn default() -> Self {
        Self::new()
    }
}
