use crate::Registry;
use chrono::Utc;
use std::time::Duration;
use vigil_graphite::CarbonClient;

/// Periodically pushes a snapshot of the registry to carbon.
///
/// Runs as its own task; the owner aborts it on shutdown. Push failures are
/// logged and the next tick retries with a fresh connection.
pub struct Reporter {
    registry: Registry,
    client: CarbonClient,
    interval: Duration,
}

impl Reporter {
    pub fn new(registry: Registry, client: CarbonClient, interval: Duration) -> Self {
        Reporter {
            registry,
            client,
            interval,
        }
    }

    pub async fn run(&self) {
        let mut tick = tokio::time::interval(self.interval);
        loop {
            tick.tick().await;
            let metrics = self.registry.sample(Utc::now().timestamp());
            if let Err(e) = self.client.send(&metrics).await {
                tracing::warn!(error = %e, "Failed to push internal metrics");
            }
        }
    }
}
