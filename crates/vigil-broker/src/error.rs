/// Errors raised by the broker boundary.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Could not reach the broker at all.
    #[error("broker: connect failed: {0}")]
    Connect(String),

    /// Topic/channel setup failed; fatal for the worker that needed it.
    #[error("broker: subscribe failed: {0}")]
    Subscribe(String),

    /// The broker did not accept a published payload.
    #[error("broker: publish failed: {0}")]
    Publish(String),

    /// Receiving from an established subscription failed.
    #[error("broker: consume failed: {0}")]
    Consume(String),
}
