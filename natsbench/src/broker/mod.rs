//! The broker seam and its NATS implementation.

mod client;
mod error;
#[cfg(test)]
pub(crate) mod mock;
mod uri;
mod worker;

pub use client::NatsClient;
pub use error::BrokerError;
pub use uri::BrokerUri;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::sync::mpsc::UnboundedReceiver;

/// Called on the delivery path for every message of a subscription with the
/// concrete subject and the payload. Must return quickly.
pub type MessageHandler = Box<dyn Fn(&str, &[u8]) + Send + Sync>;

/// Errors the connection reports outside of any request, like `-ERR` lines
/// from the server or the loss of the socket.
pub type BrokerEvents = UnboundedReceiver<BrokerError>;

/// What publishers and subscribers need from a broker connection.
pub trait Broker: Send + Sync {
    /// Queues `payload` for `subject`. The returned future is the
    /// acknowledgement: it resolves once the message was handed to the
    /// transport, and may be dropped by callers that do not care.
    fn publish(&self, subject: &str, payload: Bytes) -> BoxFuture<'_, Result<(), BrokerError>>;

    /// Registers `handler` for `subject`, resolving to the subscription id.
    fn subscribe(&self, subject: &str, handler: MessageHandler) -> BoxFuture<'_, Result<u64, BrokerError>>;

    /// Messages written to the connection so far.
    fn messages_sent(&self) -> u64;

    /// Messages delivered by the connection so far.
    fn messages_received(&self) -> u64;
}
