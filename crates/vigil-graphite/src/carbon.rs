use std::io;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// One sample for the carbon plaintext protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    pub timestamp: i64,
}

/// Writes `prefix.name value timestamp` lines to a carbon endpoint.
///
/// The connection is opened lazily and dropped on any write error, so the
/// next send reconnects. Failures never propagate past the caller's log
/// line; internal metrics are best effort.
pub struct CarbonClient {
    addr: String,
    prefix: String,
    stream: Mutex<Option<TcpStream>>,
}

impl CarbonClient {
    /// `url` accepts `tcp://host:port` or a bare `host:port`; `prefix` is
    /// prepended verbatim to every metric name.
    pub fn new(url: &str, prefix: &str) -> Self {
        let addr = url
            .strip_prefix("tcp://")
            .unwrap_or(url)
            .trim_end_matches('/')
            .to_string();
        CarbonClient {
            addr,
            prefix: prefix.to_string(),
            stream: Mutex::new(None),
        }
    }

    pub async fn send(&self, metrics: &[Metric]) -> io::Result<()> {
        if metrics.is_empty() {
            return Ok(());
        }

        let mut payload = String::new();
        for metric in metrics {
            payload.push_str(&format!(
                "{}{} {} {}\n",
                self.prefix, metric.name, metric.value, metric.timestamp
            ));
        }

        let mut guard = self.stream.lock().await;
        let mut stream = match guard.take() {
            Some(stream) => stream,
            None => TcpStream::connect(&self.addr).await?,
        };

        // a failed stream stays dropped; the next send reconnects
        stream.write_all(payload.as_bytes()).await?;
        *guard = Some(stream);
        Ok(())
    }

    pub async fn close(&self) {
        let mut guard = self.stream.lock().await;
        if let Some(mut stream) = guard.take() {
            let _ = stream.shutdown().await;
        }
    }
}
