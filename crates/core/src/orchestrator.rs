//! Collection orchestrator
//!
//! Owns the registry and runs the three sub-collectors as one cycle,
//! either on demand or as a resilient periodic loop. A failed cycle is
//! logged and retried after a short fixed delay, indefinitely; the loop
//! never terminates on its own. Cancellation is cooperative and coarse:
//! stopping prevents future cycles but lets an in-flight cycle finish.

use std::sync::Arc;
use std::time::{Duration, Instant};

use couchstat_domain::config::CollectionConfig;
use couchstat_domain::{CouchstatError, Result};
use parking_lot::RwLock;
use regex::Regex;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::collectors::{BucketStatCollector, ClusterStatCollector, ReplicationStatCollector};
use crate::ports::ClusterAdmin;
use crate::registry::MetricRegistry;

/// Type alias for the tracked loop handle.
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Observable state of the periodic loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// No loop has run yet
    Idle,
    /// A cycle is in flight
    Collecting,
    /// Waiting out the poll interval after a successful cycle
    Scheduled,
    /// Waiting out the retry delay after a failed cycle
    Retrying,
    /// The loop has exited
    Stopped,
}

/// Durations of one completed cycle, for observability.
#[derive(Debug, Clone, Copy)]
pub struct CycleReport {
    /// Bucket sub-collector duration
    pub bucket: Duration,
    /// Cluster sub-collector duration
    pub cluster: Duration,
    /// Replication sub-collector duration
    pub xdcr: Duration,
    /// Whole cycle, including the bucket listing
    pub total: Duration,
}

/// Shared pieces the cycle and the loop both need.
struct CycleContext {
    admin: Arc<dyn ClusterAdmin>,
    registry: Arc<MetricRegistry>,
    ignore_buckets: Regex,
    // Serializes cycles between the loop and on-demand collection.
    cycle_lock: Mutex<()>,
}

/// Runs collection cycles, periodically or on demand.
pub struct CollectionOrchestrator {
    context: Arc<CycleContext>,
    config: CollectionConfig,
    state: Arc<RwLock<CycleState>>,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl CollectionOrchestrator {
    /// Create an orchestrator.
    ///
    /// # Errors
    /// Returns [`CouchstatError::Config`] when the bucket ignore pattern
    /// is not a valid regular expression.
    pub fn new(
        admin: Arc<dyn ClusterAdmin>,
        registry: Arc<MetricRegistry>,
        config: CollectionConfig,
    ) -> Result<Self> {
        let ignore_buckets = Regex::new(&config.ignore_buckets).map_err(|err| {
            CouchstatError::Config(format!("invalid bucket ignore pattern: {err}"))
        })?;

        Ok(Self {
            context: Arc::new(CycleContext {
                admin,
                registry,
                ignore_buckets,
                cycle_lock: Mutex::new(()),
            }),
            config,
            state: Arc::new(RwLock::new(CycleState::Idle)),
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        })
    }

    /// Current loop state.
    pub fn state(&self) -> CycleState {
        *self.state.read()
    }

    /// Whether the periodic loop is running.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }

    /// Run one cycle on demand and return once the registry reflects the
    /// latest values.
    ///
    /// # Errors
    /// Surfaces the first sub-collector failure; the registry may hold a
    /// partially collected cycle, overwritten on the next one.
    pub async fn collect(&self) -> Result<CycleReport> {
        Self::run_cycle(&self.context).await
    }

    /// Start the periodic loop.
    ///
    /// # Errors
    /// Returns [`CouchstatError::InvalidInput`] when already running.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(CouchstatError::InvalidInput("collection loop already running".into()));
        }

        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            retry_delay_ms = self.config.retry_delay.as_millis() as u64,
            "starting collection loop"
        );

        // Fresh token so the loop can be restarted after a stop.
        self.cancellation_token = CancellationToken::new();

        let context = Arc::clone(&self.context);
        let config = self.config.clone();
        let state = Arc::clone(&self.state);
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::collection_loop(context, config, state, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        Ok(())
    }

    /// Stop the periodic loop.
    ///
    /// Cancels an armed timer; a cycle already in flight finishes first.
    ///
    /// # Errors
    /// Returns [`CouchstatError::InvalidInput`] when not running, or
    /// [`CouchstatError::Internal`] when the loop does not exit in time.
    pub async fn stop(&mut self) -> Result<()> {
        if !self.is_running() {
            return Err(CouchstatError::InvalidInput("collection loop not running".into()));
        }

        info!("stopping collection loop");
        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = Duration::from_secs(30);
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| {
                    CouchstatError::Internal(format!(
                        "collection loop did not stop within {}s",
                        join_timeout.as_secs()
                    ))
                })?
                .map_err(|err| CouchstatError::Internal(format!("loop task failed: {err}")))?;
        }

        info!("collection loop stopped");
        Ok(())
    }

    /// One full cycle: evict the previous cycle's instruments, list
    /// buckets once, fan out the three sub-collectors concurrently.
    async fn run_cycle(context: &Arc<CycleContext>) -> Result<CycleReport> {
        let _guard = context.cycle_lock.lock().await;
        let start = Instant::now();

        context.registry.clear();
        let buckets = context.admin.list_buckets().await?;

        let bucket_collector = BucketStatCollector::new(
            Arc::clone(&context.admin),
            Arc::clone(&context.registry),
            context.ignore_buckets.clone(),
        );
        let cluster_collector =
            ClusterStatCollector::new(Arc::clone(&context.admin), Arc::clone(&context.registry));
        let xdcr_collector = ReplicationStatCollector::new(
            Arc::clone(&context.admin),
            Arc::clone(&context.registry),
        );

        let (bucket, cluster, xdcr) = tokio::try_join!(
            bucket_collector.collect(&buckets),
            cluster_collector.collect(&buckets),
            xdcr_collector.collect(),
        )?;

        let report = CycleReport { bucket, cluster, xdcr, total: start.elapsed() };
        info!(
            bucket_metrics_duration_ms = report.bucket.as_millis() as u64,
            cluster_metrics_duration_ms = report.cluster.as_millis() as u64,
            xdcr_metrics_duration_ms = report.xdcr.as_millis() as u64,
            total_metrics_duration_ms = report.total.as_millis() as u64,
            "collected stats"
        );
        Ok(report)
    }

    /// The periodic loop. The should-run check happens only at cycle
    /// start, so cancellation never aborts an in-flight cycle.
    async fn collection_loop(
        context: Arc<CycleContext>,
        config: CollectionConfig,
        state: Arc<RwLock<CycleState>>,
        cancel: CancellationToken,
    ) {
        loop {
            if cancel.is_cancelled() {
                debug!("collection loop cancelled");
                break;
            }

            *state.write() = CycleState::Collecting;
            match Self::run_cycle(&context).await {
                Ok(_) => {
                    *state.write() = CycleState::Scheduled;
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(config.poll_interval) => {}
                    }
                }
                Err(err) => {
                    error!(error = %err, "collection cycle failed");
                    *state.write() = CycleState::Retrying;
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(config.retry_delay) => {}
                    }
                }
            }
        }

        *state.write() = CycleState::Stopped;
    }
}

/// Best-effort cancellation when the orchestrator is dropped mid-run.
impl Drop for CollectionOrchestrator {
    fn drop(&mut self) {
        if self.is_running() && !self.cancellation_token.is_cancelled() {
            warn!("CollectionOrchestrator dropped while running; cancelling");
            self.cancellation_token.cancel();
        }
    }
}
