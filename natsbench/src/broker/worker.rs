use super::{BrokerError, MessageHandler};
use bytes::{Buf, BytesMut};
use natsbench_proto::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{
    tcp::{OwnedReadHalf, OwnedWriteHalf},
    TcpStream,
};
use tokio::sync::{
    mpsc::{UnboundedReceiver, UnboundedSender},
    oneshot, RwLock,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, trace, warn};

pub(super) type Subscriptions = Arc<RwLock<HashMap<u64, MessageHandler>>>;

#[derive(Debug, Default)]
pub(super) struct Counters {
    pub(super) sent: AtomicU64,
    pub(super) received: AtomicU64,
}

/// An op waiting for the worker, `done` learns whether it reached the socket.
pub(super) struct Outgoing {
    pub(super) op: Op,
    pub(super) done: Option<oneshot::Sender<Result<(), BrokerError>>>,
}

/// Framed access to the broker socket.
pub(super) struct Connection {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    bytes: BytesMut,
    max_payload: usize,
    saddr: Option<SocketAddr>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NatsConnection({:?})", self.saddr)
    }
}

impl Connection {
    pub(super) fn new(stream: TcpStream) -> Self {
        let saddr = stream.peer_addr().ok();
        let (reader, writer) = stream.into_split();
        Connection {
            reader,
            writer,
            bytes: BytesMut::with_capacity(4096),
            max_payload: MAX_PAYLOAD,
            saddr,
        }
    }

    /// Inbound payloads longer than `max` fail `recv` instead of being
    /// buffered.
    pub(super) fn set_max_payload(&mut self, max: usize) {
        self.max_payload = max.min(MAX_PAYLOAD);
    }

    /// Reads until a complete op is buffered. Cancel safe: a partially read op
    /// stays in the buffer for the next call.
    pub(super) async fn recv(&mut self) -> Result<Op, BrokerError> {
        loop {
            match Op::parse_limited(&self.bytes[..], self.max_payload) {
                Ok((op, len)) => {
                    self.bytes.advance(len);
                    return Ok(op);
                }
                Err(ProtoError::InsufficientBuffer {
                    needed: _,
                    available: _,
                }) => {
                    if self.reader.read_buf(&mut self.bytes).await? == 0 {
                        return Err(BrokerError::Disconnected);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub(super) async fn send(&mut self, op: &Op) -> Result<(), BrokerError> {
        let mut bytes = BytesMut::with_capacity(op.size());
        op.to_bytes(&mut bytes)?;
        self.writer.write_all_buf(&mut bytes).await?;
        Ok(())
    }
}

/// Owns the socket once the handshake is done: writes queued ops, dispatches
/// deliveries to their handlers and answers server pings.
pub(super) struct ConnectionWorker {
    conn: Connection,
    outgoing: UnboundedReceiver<Outgoing>,
    subscriptions: Subscriptions,
    counters: Arc<Counters>,
    events: UnboundedSender<BrokerError>,
    shutdown: CancellationToken,
}

impl ConnectionWorker {
    pub(super) fn new(
        conn: Connection,
        outgoing: UnboundedReceiver<Outgoing>,
        subscriptions: Subscriptions,
        counters: Arc<Counters>,
        events: UnboundedSender<BrokerError>,
        shutdown: CancellationToken,
    ) -> Self {
        ConnectionWorker {
            conn,
            outgoing,
            subscriptions,
            counters,
            events,
            shutdown,
        }
    }

    async fn deliver(&self, msg: Message) {
        self.counters.received.fetch_add(1, Ordering::Relaxed);
        match self.subscriptions.read().await.get(&msg.sid()) {
            Some(handler) => handler(msg.subject(), &msg.payload()[..]),
            None => trace!(sid = msg.sid(), "Message for an unknown subscription"),
        }
    }

    async fn process(&mut self, op: Op) -> Result<(), BrokerError> {
        match op {
            Op::Msg(msg) => self.deliver(msg).await,
            Op::Ping => self.conn.send(&Op::Pong).await?,
            Op::Pong | Op::Ok => trace!("{:?}", op),
            Op::Err(e) => {
                warn!("Server reported an error: {}", e);
                if self.events.send(BrokerError::Server(e)).is_err() {
                    debug!("Nobody is listening to broker events");
                }
            }
            Op::Info(info) => debug!(server_id = &*info.server_id, "Server sent a new INFO"),
            other => warn!("Unexpected op from server {:?}", other),
        }
        Ok(())
    }

    async fn write(&mut self, out: Outgoing) -> Result<(), BrokerError> {
        let res = self.conn.send(&out.op).await;
        if res.is_ok() {
            if let Op::Pub(_) = out.op {
                self.counters.sent.fetch_add(1, Ordering::Relaxed);
            }
        }
        if let Some(done) = out.done {
            // the requester may have stopped waiting
            let _ = done.send(match &res {
                Ok(()) => Ok(()),
                Err(_) => Err(BrokerError::Disconnected),
            });
        }
        res
    }

    async fn listen(&mut self) -> Result<(), BrokerError> {
        tokio::select! {
            op = self.conn.recv() => {
                let op = op?;
                self.process(op).await?;
            }
            out = self.outgoing.recv() => {
                let out = out.ok_or(BrokerError::Closed)?;
                self.write(out).await?;
            }
        }
        Ok(())
    }

    async fn listen_forever(&mut self) -> BrokerError {
        loop {
            if let Err(e) = self.listen().await {
                return e;
            }
        }
    }

    #[instrument(name = "ConnectionWorker::run", skip_all, fields(conn = ?self.conn))]
    pub(super) async fn run(mut self) {
        let shutdown = self.shutdown.clone();
        let e = tokio::select! {
            _ = shutdown.cancelled() => return,
            e = self.listen_forever() => e,
        };
        let e = match e {
            BrokerError::Closed => {
                debug!("All client handles dropped");
                return;
            }
            BrokerError::Io(_) | BrokerError::Proto(_) => {
                error!("Connection failed, {}", e);
                BrokerError::Disconnected
            }
            other => other,
        };
        if self.events.send(e).is_err() {
            debug!("Nobody is listening to broker events");
        }
    }
}
