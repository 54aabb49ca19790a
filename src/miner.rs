use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex};
use tracing::{error, info};

use crate::maven::DescriptorFetcher;
use crate::maven::coordinates::ArtifactIdentifier;
use crate::miner::batch::{BatchReport, BatchResolver};
use crate::resolver::provider::ResolverProvider;
use crate::storage::artifact_storage::ArtifactStorage;

pub mod batch;

/// totals of a mining run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningReport {
    pub num_batches: usize,
    pub totals: BatchReport,
    pub elapsed: Duration,
}

/// Distributes batches of artifacts over a fixed number of long-lived workers. A batch is
///  processed by a single worker, strictly sequentially; there is no ordering across batches.
pub struct Miner {
    provider: ResolverProvider,
    fetcher: Arc<dyn DescriptorFetcher>,
    storage: Arc<dyn ArtifactStorage>,
    num_workers: usize,
}
impl Miner {
    pub fn new(provider: ResolverProvider, fetcher: Arc<dyn DescriptorFetcher>, storage: Arc<dyn ArtifactStorage>, num_workers: usize) -> Miner {
        Miner {
            provider,
            fetcher,
            storage,
            num_workers: num_workers.max(1),
        }
    }

    /// `num_artifacts` is only used for progress reporting
    pub async fn process_artifacts(&self, batches: Vec<Vec<ArtifactIdentifier>>, num_artifacts: usize) -> MiningReport {
        let start = Instant::now();
        let num_batches = batches.len();
        info!("processing {} artifacts in {} batches with {} workers", num_artifacts, num_batches, self.num_workers);
        if self.provider.backup_resolver_enabled() {
            info!("artifacts failing with the primary resolver are retried with the backup resolver");
        }

        let (job_sender, job_receiver) = mpsc::channel::<Vec<ArtifactIdentifier>>(self.num_workers);
        let job_receiver = Arc::new(Mutex::new(job_receiver));
        let (report_sender, mut report_receiver) = mpsc::unbounded_channel::<BatchReport>();

        let workers = (0..self.num_workers)
            .map(|worker_id| {
                let batch_resolver = Arc::new(BatchResolver::new(&self.provider, self.fetcher.clone(), self.storage.clone()));
                tokio::spawn(run_worker(worker_id, batch_resolver, self.storage.clone(), job_receiver.clone(), report_sender.clone()))
            })
            .collect::<Vec<_>>();
        drop(report_sender);

        let feeder = tokio::spawn(async move {
            for batch in batches {
                if job_sender.send(batch).await.is_err() {
                    error!("all workers terminated, dropping remaining batches");
                    break;
                }
            }
        });

        let mut totals = BatchReport::default();
        let mut num_finished = 0;
        while let Some(report) = report_receiver.recv().await {
            totals += report;
            num_finished += 1;
            info!("finished {} of {} batches, processed {} of {} artifacts", num_finished, num_batches, totals.num_processed, num_artifacts);
        }

        if let Err(e) = feeder.await {
            error!("batch feeder terminated abnormally: {}", e);
        }
        for worker in futures::future::join_all(workers).await {
            if let Err(e) = worker {
                error!("worker terminated abnormally: {}", e);
            }
        }

        MiningReport {
            num_batches,
            totals,
            elapsed: start.elapsed(),
        }
    }
}

async fn run_worker(
    worker_id: usize,
    batch_resolver: Arc<BatchResolver>,
    storage: Arc<dyn ArtifactStorage>,
    jobs: Arc<Mutex<mpsc::Receiver<Vec<ArtifactIdentifier>>>>,
    reports: mpsc::UnboundedSender<BatchReport>,
) {
    loop {
        // the lock is released before the batch is processed
        let batch = jobs.lock().await.recv().await;
        let batch = match batch {
            Some(batch) => batch,
            None => break,
        };

        let lost = batch.clone();
        let resolver = batch_resolver.clone();
        let report = match tokio::spawn(async move { resolver.process_batch(batch).await }).await {
            Ok(report) => report,
            Err(e) => {
                error!("worker {} lost a batch of {} artifacts: {}", worker_id, lost.len(), e);
                let report = BatchReport::failed_batch(lost.len());
                if let Err(e) = storage.store_failed_identifiers(lost).await {
                    error!("failed to store identifiers of lost batch: {:#}", e);
                }
                report
            }
        };

        if reports.send(report).is_err() {
            break;
        }
    }
}
