//! Crawler coordinator - main crawl orchestration logic
//!
//! This module runs the query plan through a bounded pool of workers:
//! - Removing the previous run's output
//! - Spawning one task per query, limited by a semaphore
//! - Writing periodic checkpoints while tasks run
//! - Handling interrupts without dropping in-flight results
//! - Writing the final snapshot

use crate::classify::Ruleset;
use crate::config::{validate, Config};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::pagination::{crawl_query, QueryContext, QueryOutcome, QueryStatus};
use crate::output::{output_path, write_snapshot};
use crate::query::QueryPlan;
use crate::store::{CrawlStats, InstitutionStore, StatsSnapshot};
use crate::CrawlError;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

/// Final account of a crawl run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Counters at the end of the run
    pub stats: StatsSnapshot,

    /// One entry per worker task that returned normally
    pub outcomes: Vec<QueryOutcome>,

    /// Worker tasks that panicked or were cancelled
    pub failed_tasks: usize,

    /// Wall-clock duration of the run
    pub elapsed: Duration,

    /// Where the snapshot was written
    pub output_path: PathBuf,

    /// Records in the final snapshot
    pub records_written: usize,

    /// Error from the final write, if it failed
    pub final_write_error: Option<String>,

    /// Whether the run was cut short by an interrupt
    pub interrupted: bool,
}

impl CrawlReport {
    pub fn succeeded(&self) -> bool {
        self.final_write_error.is_none()
    }

    /// Number of tasks that ended with the given status
    pub fn count_status(&self, status: QueryStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    ctx: QueryContext,
    output_path: PathBuf,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration; it is validated again here
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlError)` - The configuration is invalid or the HTTP client
    ///   could not be built
    pub fn new(config: Config) -> Result<Self, CrawlError> {
        validate(&config)?;

        let stats = Arc::new(CrawlStats::new());
        let fetcher = Fetcher::new(
            &config.crawler,
            config.endpoint.clone(),
            &config.user_agent,
            Arc::clone(&stats),
        )?;

        let ctx = QueryContext {
            fetcher,
            ruleset: Arc::new(Ruleset::from_config(&config.rules)),
            store: Arc::new(InstitutionStore::new()),
            crawler: Arc::new(config.crawler.clone()),
            country: config.endpoint.country.clone(),
            shutdown: Arc::new(AtomicBool::new(false)),
        };
        let output_path = output_path(&config.output, &config.endpoint.country);

        Ok(Self {
            config: Arc::new(config),
            ctx,
            output_path,
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn store(&self) -> &Arc<InstitutionStore> {
        &self.ctx.store
    }

    pub fn stats(&self) -> &Arc<CrawlStats> {
        self.ctx.fetcher.stats()
    }

    /// The query plan this coordinator will run
    pub fn query_plan(&self) -> QueryPlan {
        QueryPlan::generate(&self.config.queries, self.config.country_keywords())
    }

    fn stats_snapshot(&self) -> StatsSnapshot {
        let store = &self.ctx.store;
        self.stats().snapshot(store.saved(), store.duplicates())
    }

    /// Runs the crawl to completion or until `shutdown` resolves
    ///
    /// When `shutdown` resolves, queued tasks are abandoned and running
    /// tasks stop after their in-flight request returns. The final snapshot
    /// is written in every case; a failed write is reported in the
    /// [`CrawlReport`] rather than returned as an error.
    pub async fn run<F>(self, shutdown: F) -> Result<CrawlReport, CrawlError>
    where
        F: Future<Output = ()>,
    {
        let start = Instant::now();
        remove_previous_output(&self.output_path);

        let plan = self.query_plan();
        let total = plan.len();
        let workers = self.config.crawler.workers as usize;
        tracing::info!(
            "Processing {} queries for {} with {} workers",
            total,
            self.config.endpoint.country,
            workers
        );

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();
        for query in plan {
            let ctx = self.ctx.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return QueryOutcome::new(&query, QueryStatus::Interrupted);
                };
                if ctx.shutdown_requested() {
                    return QueryOutcome::new(&query, QueryStatus::Interrupted);
                }
                crawl_query(&ctx, &query).await
            });
        }

        let mut checkpoint = tokio::time::interval(self.config.crawler.checkpoint_interval());
        checkpoint.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        checkpoint.tick().await;

        tokio::pin!(shutdown);
        let mut interrupted = false;
        let mut outcomes = Vec::with_capacity(total);
        let mut failed_tasks = 0;

        loop {
            tokio::select! {
                joined = tasks.join_next() => {
                    let Some(joined) = joined else { break };
                    match joined {
                        Ok(outcome) => {
                            self.log_progress(&outcome, outcomes.len() + failed_tasks + 1, total, start);
                            outcomes.push(outcome);
                        }
                        Err(e) => {
                            failed_tasks += 1;
                            tracing::error!("Worker task failed: {}", e);
                        }
                    }
                }
                _ = checkpoint.tick() => {
                    self.write_checkpoint();
                }
                _ = &mut shutdown, if !interrupted => {
                    interrupted = true;
                    self.ctx.shutdown.store(true, Ordering::SeqCst);
                    tracing::warn!(
                        "Interrupt received; waiting for {} in-flight tasks before saving",
                        tasks.len()
                    );
                }
            }
        }

        let records = self.ctx.store.snapshot();
        let (records_written, final_write_error) = match write_snapshot(&self.output_path, &records) {
            Ok(written) => (written, None),
            Err(e) => {
                tracing::error!(
                    "Failed to write final snapshot to {}: {}",
                    self.output_path.display(),
                    e
                );
                (0, Some(e.to_string()))
            }
        };

        let report = CrawlReport {
            stats: self.stats_snapshot(),
            outcomes,
            failed_tasks,
            elapsed: start.elapsed(),
            output_path: self.output_path.clone(),
            records_written,
            final_write_error,
            interrupted,
        };

        tracing::info!(
            "Crawl finished in {:.1}s: {} unique institutions, {} requests",
            report.elapsed.as_secs_f64(),
            report.stats.institutions_saved,
            report.stats.total_requests
        );

        Ok(report)
    }

    fn log_progress(&self, outcome: &QueryOutcome, completed: usize, total: usize, start: Instant) {
        let marker = match outcome.status {
            QueryStatus::Skipped => "skip",
            QueryStatus::Interrupted => "stop",
            _ if outcome.accepted > 0 => "new",
            _ => "none",
        };
        let progress = if total > 0 {
            completed as f64 / total as f64 * 100.0
        } else {
            100.0
        };
        tracing::info!(
            "[{:>4}] {:>3}/{} | saved {:>5} | {:>4.0}s | {:>5.1}% | {:?}",
            marker,
            completed,
            total,
            self.ctx.store.saved(),
            start.elapsed().as_secs_f64(),
            progress,
            outcome.query
        );
    }

    /// Writes the current snapshot; failures are logged and the run continues
    fn write_checkpoint(&self) {
        let records = self.ctx.store.snapshot();
        match write_snapshot(&self.output_path, &records) {
            Ok(written) => tracing::debug!(
                "Checkpoint: {} institutions written to {}",
                written,
                self.output_path.display()
            ),
            Err(e) => tracing::warn!(
                "Checkpoint write to {} failed: {}",
                self.output_path.display(),
                e
            ),
        }
    }
}

/// Deletes the output of a previous run; results never carry across runs
fn remove_previous_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::info!("Deleted previous output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not delete {}: {}", path.display(), e),
    }
}
