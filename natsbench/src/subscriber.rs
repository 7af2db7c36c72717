use crate::broker::{Broker, BrokerError};
use crate::config::SubscriberSpec;
use crate::stats::RunningStats;
use std::sync::Arc;
use tracing::{debug, info};

/// Counts whatever arrives on one subject.
#[derive(Debug)]
pub struct Subscriber {
    spec: SubscriberSpec,
}

impl Subscriber {
    pub fn new(spec: SubscriberSpec) -> Self {
        Subscriber { spec }
    }

    pub fn spec(&self) -> &SubscriberSpec {
        &self.spec
    }

    /// Registers the handler and resolves to the subscription id. The handler
    /// runs on the delivery path so it only counts and logs.
    pub async fn execute(&self, broker: &dyn Broker, stats: Arc<RunningStats>) -> Result<u64, BrokerError> {
        let handler = Box::new(move |subject: &str, payload: &[u8]| {
            stats.record_received(payload.len());
            debug!("Received [{}]: {} bytes", subject, payload.len());
        });
        let sid = broker.subscribe(&self.spec.subject, handler).await?;
        info!(sid, "Subscribed to [{}]", self.spec.subject);
        Ok(sid)
    }
}
