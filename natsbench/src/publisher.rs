use crate::broker::Broker;
use crate::config::PublisherSpec;
use crate::scheduler::{Scheduler, TimerHandle};
use crate::stats::RunningStats;
use bytes::Bytes;
use natsbench_proto::prelude::MAX_PAYLOAD;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

/// Replaced by a fresh uuid on every send.
pub const GUID_PLACEHOLDER: &str = "{guid}";

/// Byte every payload is filled with.
const FILLER: u8 = b'a';

/// Sends to one subject template forever, waiting a sampled delay between two
/// sends.
#[derive(Debug)]
pub struct Publisher {
    spec: PublisherSpec,
}

impl Publisher {
    pub fn new(spec: PublisherSpec) -> Self {
        Publisher { spec }
    }

    pub fn spec(&self) -> &PublisherSpec {
        &self.spec
    }

    /// The subject for the next send. All placeholders of one send share the
    /// same uuid.
    pub fn resolve_subject(&self) -> String {
        if !self.spec.subject_template.contains(GUID_PLACEHOLDER) {
            return self.spec.subject_template.clone();
        }
        let guid = Uuid::new_v4().to_hyphenated().to_string();
        self.spec.subject_template.replace(GUID_PLACEHOLDER, &guid)
    }

    pub fn payload(&self) -> Bytes {
        self.payload_with(&mut rand::thread_rng())
    }

    /// A sampled size above what any NATS server accepts is cut down to
    /// that limit, with a warning.
    pub fn payload_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Bytes {
        let sampled = self.spec.payload.sample_with(rng);
        let size = match usize::try_from(sampled) {
            Ok(size) if size <= MAX_PAYLOAD => size,
            _ => {
                warn!(
                    subject = &*self.spec.subject_template,
                    "Sampled payload of {} bytes, sending {} bytes instead",
                    sampled,
                    MAX_PAYLOAD
                );
                MAX_PAYLOAD
            }
        };
        Bytes::from(vec![FILLER; size])
    }

    /// One send. Failures are logged and swallowed, the chain keeps going.
    pub async fn publish_once(&self, broker: &dyn Broker, stats: &RunningStats) {
        let subject = self.resolve_subject();
        let payload = self.payload();
        let size = payload.len();
        match broker.publish(&subject, payload).await {
            Ok(()) => {
                stats.record_sent(size);
                debug!("Published [{}]: {} bytes", subject, size);
            }
            Err(e) => error!("Failed to publish [{}]: {}", subject, e),
        }
    }

    /// Starts the publish loop on `scheduler`. The delay before the next send
    /// is sampled once the current send is acknowledged.
    pub fn schedule(
        self: Arc<Self>,
        scheduler: &Scheduler,
        broker: Arc<dyn Broker>,
        stats: Arc<RunningStats>,
    ) -> TimerHandle {
        let name = format!("publisher {}", self.spec.subject_template);
        scheduler.spawn(&name, move |token| async move {
            let mut rng = SmallRng::from_entropy();
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = self.publish_once(&*broker, &stats) => (),
                }
                let delay = self.next_delay(&mut rng);
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = sleep(delay) => (),
                }
            }
        })
    }

    #[instrument(name = "Publisher::next_delay", skip_all, fields(subject = &*self.spec.subject_template))]
    fn next_delay(&self, rng: &mut SmallRng) -> Duration {
        let ms = self.spec.interval.sample_with(rng);
        debug!("Next publish in {}ms", ms);
        Duration::from_millis(ms)
    }
}
