use crate::broker::{Broker, BrokerError, BrokerEvents, BrokerUri, NatsClient};
use crate::config::Config;
use crate::error::Result;
use crate::publisher::Publisher;
use crate::scheduler::{Faults, Scheduler};
use crate::stats::{RunningStats, StatsAggregator, STATS_PERIOD};
use crate::subscriber::Subscriber;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Drives one workload from connect to shutdown.
pub struct Runner {
    cfg: Arc<Config>,
    scheduler: Scheduler,
    faults: Faults,
    stats: Arc<RunningStats>,
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for ctrl-c, only faults stop the run: {}", e);
        futures::future::pending::<()>().await;
    }
    info!("Interrupted");
}

impl Runner {
    pub fn new(cfg: Config) -> Self {
        let (scheduler, faults) = Scheduler::new();
        Runner {
            cfg: Arc::new(cfg),
            scheduler,
            faults,
            stats: Arc::new(RunningStats::new()),
        }
    }

    pub fn stats(&self) -> &RunningStats {
        &self.stats
    }

    /// Connects and runs until interrupted, until the connection is lost or
    /// until a task faults. Only the last case is an error: a broker that
    /// cannot be reached ends the run cleanly.
    pub async fn run(self) -> Result<()> {
        info!(
            pubs = self.cfg.pubs.len(),
            subs = self.cfg.subs.len(),
            "Starting load generator"
        );
        let uri: BrokerUri = self.cfg.broker_uri.parse()?;
        info!("Connecting to {}", uri);
        let (client, events) = match NatsClient::connect(&uri).await {
            Ok(connected) => connected,
            Err(e) => {
                error!(fatal = true, "{}", e);
                return Ok(());
            }
        };
        let res = self.drive(Arc::new(client.clone()), events, interrupted()).await;
        client.close();
        res
    }

    /// Subscribes every subscriber, then starts every publisher chain and the
    /// stats tick.
    #[instrument(name = "Runner::start", skip_all)]
    pub async fn start(&self, broker: Arc<dyn Broker>) -> std::result::Result<(), BrokerError> {
        for spec in &self.cfg.subs {
            let sub = Subscriber::new(spec.clone());
            match sub.execute(&*broker, self.stats.clone()).await {
                Ok(_) => (),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => error!("Cannot subscribe to [{}]: {}", spec.subject, e),
            }
        }
        for spec in &self.cfg.pubs {
            let publisher = Arc::new(Publisher::new(spec.clone()));
            publisher.schedule(&self.scheduler, broker.clone(), self.stats.clone());
        }
        let mut aggregator = StatsAggregator::new(STATS_PERIOD);
        let counters = broker.clone();
        self.scheduler.every("stats", STATS_PERIOD, move || {
            aggregator
                .tick(counters.messages_sent(), counters.messages_received())
                .log();
            futures::future::ready(())
        });
        Ok(())
    }

    /// Cancels everything scheduled. Returns `false` when already shut down.
    pub fn shutdown(&self) -> bool {
        let first = self.scheduler.shutdown();
        if first {
            info!("Shutting down");
        }
        first
    }

    async fn steady_state<F>(&mut self, mut events: BrokerEvents, interrupt: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);
        loop {
            tokio::select! {
                _ = &mut interrupt => return Ok(()),
                fault = self.faults.recv() => {
                    if let Some(fault) = fault {
                        error!(fatal = true, "{}", fault);
                        return Err(fault.into());
                    }
                }
                event = events.recv() => match event {
                    Some(e) if e.is_fatal() => {
                        error!(fatal = true, "{}", e);
                        return Ok(());
                    }
                    Some(e) => error!("{}", e),
                    None => {
                        warn!("Connection worker stopped");
                        return Ok(());
                    }
                },
            }
        }
    }

    pub(crate) async fn drive<F>(mut self, broker: Arc<dyn Broker>, events: BrokerEvents, interrupt: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let res = match self.start(broker.clone()).await {
            Ok(()) => self.steady_state(events, interrupt).await,
            Err(e) => {
                error!(fatal = true, "{}", e);
                Ok(())
            }
        };
        self.shutdown();
        self.scheduler.wait().await;
        info!(
            sent = broker.messages_sent(),
            received = broker.messages_received(),
            bytes_sent = self.stats.bytes_sent(),
            bytes_received = self.stats.bytes_received(),
            "Stopped"
        );
        res
    }
}
