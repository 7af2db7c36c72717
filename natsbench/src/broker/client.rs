use super::worker::{Connection, ConnectionWorker, Counters, Outgoing, Subscriptions};
use super::{Broker, BrokerError, BrokerEvents, BrokerUri, MessageHandler};
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use natsbench_proto::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedSender},
    oneshot, RwLock,
};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

const CLIENT_NAME: &str = "natsbench";
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

struct Inner {
    outgoing: UnboundedSender<Outgoing>,
    subscriptions: Subscriptions,
    next_sid: AtomicU64,
    counters: Arc<Counters>,
    info: ServerInfo,
    shutdown: CancellationToken,
}

/// A single connection to a NATS server, shared by every publisher and
/// subscriber of a run. Cloning is cheap.
#[derive(Clone)]
pub struct NatsClient {
    inner: Arc<Inner>,
}

async fn handshake(conn: &mut Connection, uri: &BrokerUri) -> Result<ServerInfo, BrokerError> {
    let info = match conn.recv().await? {
        Op::Info(info) => info,
        Op::Err(e) => return Err(BrokerError::Server(e)),
        other => {
            return Err(BrokerError::Server(format!(
                "expected INFO, received {:?}",
                other
            )))
        }
    };
    trace!("{:?}", info);
    conn.set_max_payload(info.max_payload);
    if info.ssl_required {
        return Err(BrokerError::Server("server requires TLS".to_owned()));
    }
    let mut connect = Connect::new();
    connect.set_name(CLIENT_NAME);
    if let Some(user) = &uri.user {
        connect.set_credentials(user, uri.pass.as_deref());
    }
    conn.send(&connect.build()).await?;
    conn.send(&Op::Ping).await?;
    loop {
        match conn.recv().await? {
            Op::Pong => return Ok(info),
            Op::Err(e) => return Err(BrokerError::Server(e)),
            other => trace!("During handshake {:?}", other),
        }
    }
}

impl NatsClient {
    /// Connects and authenticates. The handshake is complete when the server
    /// answered our first `PING`, so a rejected `CONNECT` fails here.
    #[instrument(name = "NatsClient::connect", skip_all, fields(uri = %uri))]
    pub async fn connect(uri: &BrokerUri) -> Result<(NatsClient, BrokerEvents), BrokerError> {
        let addr = uri.addr();
        let failed = |e: BrokerError| BrokerError::Connect {
            addr: addr.clone(),
            reason: e.to_string(),
        };
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| failed(e.into()))?;
        let mut conn = Connection::new(stream);
        let info = match timeout(HANDSHAKE_TIMEOUT, handshake(&mut conn, uri)).await {
            Ok(res) => res.map_err(failed)?,
            Err(_) => {
                return Err(BrokerError::Connect {
                    addr,
                    reason: "handshake timed out".to_owned(),
                })
            }
        };
        info!(
            server_id = &*info.server_id,
            version = &*info.version,
            "Connected to {}",
            addr
        );

        let (outgoing, rx) = unbounded_channel();
        let (events_tx, events) = unbounded_channel();
        let subscriptions: Subscriptions = Arc::new(RwLock::new(HashMap::new()));
        let counters = Arc::new(Counters::default());
        let shutdown = CancellationToken::new();
        let worker = ConnectionWorker::new(
            conn,
            rx,
            subscriptions.clone(),
            counters.clone(),
            events_tx,
            shutdown.clone(),
        );
        tokio::spawn(worker.run());
        let client = NatsClient {
            inner: Arc::new(Inner {
                outgoing,
                subscriptions,
                next_sid: AtomicU64::new(1),
                counters,
                info,
                shutdown,
            }),
        };
        Ok((client, events))
    }

    pub fn info(&self) -> &ServerInfo {
        &self.inner.info
    }

    /// Stops the connection worker, pending requests fail with `Closed`.
    pub fn close(&self) {
        debug!("Closing connection");
        self.inner.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shutdown.is_cancelled() || self.inner.outgoing.is_closed()
    }

    fn enqueue(&self, op: Op) -> oneshot::Receiver<Result<(), BrokerError>> {
        let (done, ack) = oneshot::channel();
        if self.inner.shutdown.is_cancelled() {
            // dropping `done` makes the ack resolve to Closed
            return ack;
        }
        let out = Outgoing {
            op,
            done: Some(done),
        };
        if self.inner.outgoing.send(out).is_err() {
            trace!("Connection worker is gone");
        }
        ack
    }

    async fn acked(ack: oneshot::Receiver<Result<(), BrokerError>>) -> Result<(), BrokerError> {
        match ack.await {
            Ok(res) => res,
            Err(_) => Err(BrokerError::Closed),
        }
    }
}

impl Broker for NatsClient {
    fn publish(&self, subject: &str, payload: Bytes) -> BoxFuture<'_, Result<(), BrokerError>> {
        let max = self.inner.info.max_payload;
        if payload.len() > max {
            let size = payload.len();
            return futures::future::ready(Err(BrokerError::PayloadTooBig { size, max })).boxed();
        }
        let op = Publish::new(subject).map(|mut publish| {
            publish.set_payload(payload);
            publish.build()
        });
        let ack = op.map(|op| self.enqueue(op));
        async move { Self::acked(ack?).await }.boxed()
    }

    fn subscribe(&self, subject: &str, handler: MessageHandler) -> BoxFuture<'_, Result<u64, BrokerError>> {
        let sid = self.inner.next_sid.fetch_add(1, Ordering::Relaxed);
        let op = Subscribe::new(subject, sid).map(Subscribe::build);
        async move {
            let op = op?;
            self.inner.subscriptions.write().await.insert(sid, handler);
            if let Err(e) = Self::acked(self.enqueue(op)).await {
                self.inner.subscriptions.write().await.remove(&sid);
                return Err(e);
            }
            Ok(sid)
        }
        .boxed()
    }

    fn messages_sent(&self) -> u64 {
        self.inner.counters.sent.load(Ordering::Relaxed)
    }

    fn messages_received(&self) -> u64 {
        self.inner.counters.received.load(Ordering::Relaxed)
    }
}
