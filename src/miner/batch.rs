use std::ops::AddAssign;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, info, trace, warn};

use crate::maven::{DescriptorFetcher, FetchError};
use crate::maven::coordinates::ArtifactIdentifier;
use crate::resolver::DependencyResolver;
use crate::resolver::provider::ResolverProvider;
use crate::resolver::result::ResolverResult;
use crate::storage::artifact_storage::{ArtifactStorage, StoredArtifact};

/// counters for one batch, or summed up for a whole run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub num_processed: usize,
    pub num_succeeded: usize,
    pub num_failed: usize,
    /// errors recorded in the adopted results
    pub num_resolver_errors: usize,
    /// artifacts whose adopted result has download errors
    pub num_download_errors: usize,
    pub num_backup_retries: usize,
}
impl BatchReport {
    /// a batch that was lost as a whole
    pub fn failed_batch(len: usize) -> BatchReport {
        BatchReport {
            num_processed: len,
            num_failed: len,
            ..BatchReport::default()
        }
    }
}

impl AddAssign for BatchReport {
    fn add_assign(&mut self, other: BatchReport) {
        self.num_processed += other.num_processed;
        self.num_succeeded += other.num_succeeded;
        self.num_failed += other.num_failed;
        self.num_resolver_errors += other.num_resolver_errors;
        self.num_download_errors += other.num_download_errors;
        self.num_backup_retries += other.num_backup_retries;
    }
}

/// the adopted result for one artifact, and whether the backup resolver was involved
pub struct ResolvedArtifact {
    pub result: ResolverResult,
    pub retried_with_backup: bool,
}

/// Resolves batches of artifacts one after the other with its own resolver instances, and
///  stores each batch's outcome in two writes.
pub struct BatchResolver {
    fetcher: Arc<dyn DescriptorFetcher>,
    storage: Arc<dyn ArtifactStorage>,
    primary: Box<dyn DependencyResolver>,
    backup: Option<Box<dyn DependencyResolver>>,
}
impl BatchResolver {
    pub fn new(provider: &ResolverProvider, fetcher: Arc<dyn DescriptorFetcher>, storage: Arc<dyn ArtifactStorage>) -> BatchResolver {
        BatchResolver {
            fetcher,
            storage,
            primary: provider.build_resolver(),
            backup: provider.build_backup_resolver(),
        }
    }

    pub async fn process_batch(&self, batch: Vec<ArtifactIdentifier>) -> BatchReport {
        let mut report = BatchReport::default();
        let mut succeeded = vec![];
        let mut failed = vec![];

        for identifier in batch {
            report.num_processed += 1;

            match self.process_identifier(&identifier).await {
                Some(resolved) => {
                    if resolved.retried_with_backup {
                        report.num_backup_retries += 1;
                    }
                    report.num_resolver_errors += resolved.result.errors.len();
                    if resolved.result.has_download_errors() {
                        report.num_download_errors += 1;
                    }

                    if resolved.result.has_results() {
                        report.num_succeeded += 1;
                        succeeded.push(StoredArtifact::from_result(&resolved.result));
                    }
                    else {
                        warn!("no results for artifact {}", identifier);
                        report.num_failed += 1;
                        failed.push(identifier);
                    }
                }
                None => {
                    report.num_failed += 1;
                    failed.push(identifier);
                }
            }
        }

        if let Err(e) = self.storage.store_artifact_batch(succeeded).await {
            error!("failed to store results of batch: {:#}", e);
        }
        if let Err(e) = self.storage.store_failed_identifiers(failed).await {
            error!("failed to store failed identifiers of batch: {:#}", e);
        }

        info!("finished processing batch of {} artifacts ({} failed)", report.num_processed, report.num_failed);
        report
    }

    /// `None` if the artifact's own descriptor can not be retrieved
    async fn process_identifier(&self, identifier: &ArtifactIdentifier) -> Option<ResolvedArtifact> {
        trace!("processing identifier {}", identifier);

        match self.resolve_identifier(identifier).await {
            Ok(resolved) => Some(resolved),
            Err(FetchError::NotFound(_)) => {
                warn!("failed to locate descriptor of {} in repository", identifier);
                None
            }
            Err(e) => {
                warn!("failed to download descriptor of {}: {}", identifier, e);
                None
            }
        }
    }

    pub async fn resolve_identifier(&self, identifier: &ArtifactIdentifier) -> Result<ResolvedArtifact, FetchError> {
        let descriptor = self.fetcher.fetch(identifier).await?;

        let mut resolved = resolve_with_fallback(
            self.primary.as_ref(),
            self.backup.as_deref(),
            descriptor.data,
            identifier,
        ).await;
        resolved.result.last_modified = descriptor.last_modified;
        Ok(resolved)
    }
}

/// Runs the primary resolver, and the backup resolver if the primary one produced a result
///  with errors that are not caused by missing files.
pub async fn resolve_with_fallback(
    primary: &dyn DependencyResolver,
    backup: Option<&dyn DependencyResolver>,
    descriptor: Bytes,
    identifier: &ArtifactIdentifier,
) -> ResolvedArtifact {
    let result = primary.resolve(descriptor.clone(), identifier).await;

    if result.has_download_errors() {
        warn!("got download errors for {}", identifier);
        return ResolvedArtifact { result, retried_with_backup: false };
    }
    if !result.has_errors() {
        return ResolvedArtifact { result, retried_with_backup: false };
    }

    warn!("got {} errors while resolving {}", result.errors.len(), identifier);

    // a resolver that failed completely is not expected to do better on a second attempt
    let backup = match backup {
        Some(backup) if result.has_results() => backup,
        _ => return ResolvedArtifact { result, retried_with_backup: false },
    };

    trace!("retrying artifact with backup resolver: {}", identifier);
    let backup_result = backup.resolve(descriptor, identifier).await;
    ResolvedArtifact {
        result: adopt_backup_result(result, backup_result),
        retried_with_backup: true,
    }
}

fn adopt_backup_result(primary: ResolverResult, mut backup: ResolverResult) -> ResolverResult {
    if !backup.has_results() {
        error!("backup resolver failed to produce any results for {}", primary.root_identifier);
        return primary;
    }

    if !backup.has_parent_identifier() {
        backup.parent_identifier = primary.parent_identifier;
    }

    if backup.has_errors() {
        warn!("backup resolver also produced errors while resolving {}", backup.root_identifier);
    }
    else {
        info!("backup resolver successfully corrected resolver errors for {}", backup.root_identifier);
    }
    backup
}
