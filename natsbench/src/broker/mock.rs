use super::{Broker, BrokerError, MessageHandler};
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use natsbench_proto::prelude::is_wildcard;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// In-memory broker recording what publishers send and letting tests push
/// deliveries to subscribers.
#[derive(Default)]
pub(crate) struct RecordingBroker {
    published: Mutex<Vec<(String, usize)>>,
    handlers: Mutex<Vec<(String, MessageHandler)>>,
    sent: AtomicU64,
    received: AtomicU64,
    fail_publish: AtomicBool,
    reject_subscribe: AtomicBool,
}

impl RecordingBroker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn published(&self) -> Vec<(String, usize)> {
        self.published.lock().clone()
    }

    pub(crate) fn publish_count(&self) -> usize {
        self.published.lock().len()
    }

    pub(crate) fn subscriptions(&self) -> Vec<String> {
        self.handlers.lock().iter().map(|(s, _)| s.clone()).collect()
    }

    pub(crate) fn fail_publishes(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn reject_subscribes(&self, reject: bool) {
        self.reject_subscribe.store(reject, Ordering::SeqCst);
    }

    /// Delivers to every handler registered for exactly `subject`, or through
    /// a wildcard subscription. Returns how many handlers ran.
    pub(crate) fn deliver(&self, subject: &str, payload: &[u8]) -> usize {
        let handlers = self.handlers.lock();
        let mut ran = 0;
        for (pattern, handler) in handlers.iter() {
            if pattern == subject || (is_wildcard(pattern) && matches(pattern, subject)) {
                self.received.fetch_add(1, Ordering::SeqCst);
                handler(subject, payload);
                ran += 1;
            }
        }
        ran
    }
}

fn matches(pattern: &str, subject: &str) -> bool {
    let mut subject = subject.split('.');
    for token in pattern.split('.') {
        match (token, subject.next()) {
            (">", Some(_)) => return true,
            ("*", Some(_)) => (),
            (t, Some(s)) if t == s => (),
            _ => return false,
        }
    }
    subject.next().is_none()
}

impl Broker for RecordingBroker {
    fn publish(&self, subject: &str, payload: Bytes) -> BoxFuture<'_, Result<(), BrokerError>> {
        let res = if self.fail_publish.load(Ordering::SeqCst) {
            Err(BrokerError::Disconnected)
        } else {
            self.published.lock().push((subject.to_owned(), payload.len()));
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        futures::future::ready(res).boxed()
    }

    fn subscribe(&self, subject: &str, handler: MessageHandler) -> BoxFuture<'_, Result<u64, BrokerError>> {
        let res = if self.reject_subscribe.load(Ordering::SeqCst) {
            Err(BrokerError::Server(format!("Permissions Violation for Subscription to {}", subject)))
        } else {
            let mut handlers = self.handlers.lock();
            handlers.push((subject.to_owned(), handler));
            Ok(handlers.len() as u64)
        };
        futures::future::ready(res).boxed()
    }

    fn messages_sent(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }

    fn messages_received(&self) -> u64 {
        self.received.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_matching() {
        assert!(matches("foo.*", "foo.bar"));
        assert!(!matches("foo.*", "foo.bar.baz"));
        assert!(matches("foo.>", "foo.bar.baz"));
        assert!(!matches("foo.>", "foo"));
        assert!(!matches("foo.*", "bar.baz"));
    }
}
