// Background poller: fetch counters, build the next snapshot + delta, publish.
// Sleep between cycles is corrected for fetch latency; shutdown waits for the
// in-flight cycle.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::FetchError;
use crate::fetcher::CounterFetcher;
use crate::models::{DeltaSet, PortId, Snapshot, now_ms};
use crate::store::{CounterStore, PollerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerStatus {
    Stopped,
    Running,
    Stopping,
}

impl PollerStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => PollerStatus::Running,
            2 => PollerStatus::Stopping,
            _ => PollerStatus::Stopped,
        }
    }
}

/// What one successful cycle published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub fresh_ports: usize,
    pub stale_ports: usize,
    pub aborted: bool,
}

/// Owned handle to the running poll loop.
pub struct Poller {
    control: Mutex<Option<(oneshot::Sender<()>, JoinHandle<()>)>>,
    status: Arc<AtomicU8>,
}

impl Poller {
    /// Starts the poll loop on its own task. The first cycle runs immediately.
    pub fn start(store: Arc<CounterStore>, fetcher: CounterFetcher) -> Self {
        let status = Arc::new(AtomicU8::new(PollerStatus::Running as u8));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run(store, fetcher, shutdown_rx, status.clone()));
        tracing::info!("poller started");
        Self {
            control: Mutex::new(Some((shutdown_tx, handle))),
            status,
        }
    }

    pub fn status(&self) -> PollerStatus {
        PollerStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Stops the loop and waits for it to exit. A fetch already in progress
    /// completes and publishes first. Later calls return immediately.
    pub async fn cleanup(&self) {
        let control = self
            .control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some((shutdown_tx, handle)) = control else {
            tracing::debug!("poller already stopped");
            return;
        };
        self.status
            .store(PollerStatus::Stopping as u8, Ordering::Release);
        let _ = shutdown_tx.send(());
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, operation = "poller_join", "poller task ended abnormally");
        }
        self.status
            .store(PollerStatus::Stopped as u8, Ordering::Release);
        tracing::info!("poller stopped");
    }
}

#[tracing::instrument(name = "poller", skip_all, fields(ports = store.port_table().len()))]
async fn run(
    store: Arc<CounterStore>,
    fetcher: CounterFetcher,
    mut shutdown_rx: oneshot::Receiver<()>,
    status: Arc<AtomicU8>,
) {
    loop {
        let started = Instant::now();
        match run_cycle(&store, &fetcher).await {
            Ok(report) => tracing::debug!(
                fresh = report.fresh_ports,
                stale = report.stale_ports,
                aborted = report.aborted,
                "counters published"
            ),
            Err(e) => tracing::warn!(
                error = %e,
                operation = "fetch_counters",
                "counter fetch failed; keeping last published state"
            ),
        }

        let elapsed = started.elapsed();
        let wait = store.interval_duration().saturating_sub(elapsed);
        tracing::debug!(
            elapsed_ms = elapsed.as_millis() as u64,
            wait_ms = wait.as_millis() as u64,
            "cycle complete"
        );

        tokio::select! {
            biased;
            _ = &mut shutdown_rx => break,
            _ = tokio::time::sleep(wait) => {}
        }
    }

    status.store(PollerStatus::Stopped as u8, Ordering::Release);
    tracing::debug!("poller loop exiting");
}

/// One fetch + publish. On error nothing is published.
///
/// Ports the fetch did not reach keep their previous totals and their last
/// published delta. Reads the current state without holding any lock, which
/// is sound because the poller is the only publisher.
pub async fn run_cycle(
    store: &CounterStore,
    fetcher: &CounterFetcher,
) -> Result<CycleReport, FetchError> {
    let fetched = fetcher.fetch().await?;
    let table = store.port_table();
    let last = store.state();

    let fresh: BTreeSet<PortId> = fetched
        .counters
        .keys()
        .copied()
        .filter(|id| table.contains(*id))
        .collect();
    let next = Arc::new(Snapshot::merge(
        table,
        &fetched.counters,
        &last.current,
        now_ms(),
    ));
    let delta = DeltaSet::between(&next, &last.current).keep_stale(&last.delta, &fresh);

    for (port, d) in delta.iter() {
        if let Some(c) = next.get(*port) {
            tracing::debug!(
                port = *port,
                in_packets = c.in_packets,
                in_delta = d.in_delta,
                out_packets = c.out_packets,
                out_delta = d.out_delta,
                "port counters"
            );
        }
    }

    store.publish(PollerState {
        previous: last.current.clone(),
        current: next,
        delta,
    });

    Ok(CycleReport {
        fresh_ports: fresh.len(),
        stale_ports: table.len() - fresh.len(),
        aborted: fetched.aborted.is_some(),
    })
}
