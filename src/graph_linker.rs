use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::storage::artifact_storage::{ArtifactRelation, ArtifactStorage, StoredArtifact};

/// Totals of a linking pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LinkReport {
    pub num_nodes: usize,
    pub num_relations: usize,
    /// stored artifacts with a dependency entry that could not be interpreted
    pub num_errors: usize,
    pub num_artifacts_with_unmatched_dependencies: usize,
    pub num_unmatched_dependencies: usize,
    pub num_unmatched_parents: usize,
}

/// Turns the dependency and parent coordinates recorded for each stored artifact into explicit
///  relations between stored artifacts. References to artifacts that were not mined (or failed)
///  are counted, not linked.
pub struct GraphLinker {
    storage: Arc<dyn ArtifactStorage>,
}
impl GraphLinker {
    pub fn new(storage: Arc<dyn ArtifactStorage>) -> GraphLinker {
        GraphLinker { storage }
    }

    pub async fn link(&self) -> anyhow::Result<LinkReport> {
        info!("start processing relations between stored artifacts");

        let artifacts = self.storage.load_artifacts().await?;
        let (relations, report) = link_artifacts(&artifacts);
        self.storage.store_relations(relations).await?;

        info!("finished processing {} artifacts with {} errors, created {} relations",
            report.num_nodes, report.num_errors, report.num_relations);
        info!("got {} unmatched dependencies for a total of {} artifacts",
            report.num_unmatched_dependencies, report.num_artifacts_with_unmatched_dependencies);
        info!("got a total of {} unmatched parents", report.num_unmatched_parents);

        Ok(report)
    }
}

fn link_artifacts(artifacts: &[StoredArtifact]) -> (Vec<ArtifactRelation>, LinkReport) {
    let known = artifacts.iter()
        .map(|a| a.coordinates.as_str())
        .collect::<HashSet<_>>();

    let mut relations = vec![];
    let mut report = LinkReport::default();

    for artifact in artifacts {
        if report.num_nodes % 1000 == 0 {
            debug!("processing relations of artifact #{}", report.num_nodes);
        }
        report.num_nodes += 1;

        let mut unmatched = 0;
        let mut is_malformed = false;
        for dependency in &artifact.dependencies {
            let parts = dependency.split(':').collect::<Vec<_>>();
            if parts.len() != 4 {
                warn!("malformed dependency {:?} stored for {}", dependency, artifact.coordinates);
                is_malformed = true;
                continue;
            }

            let target = format!("{}:{}:{}", parts[0], parts[1], parts[2]);
            if known.contains(target.as_str()) {
                relations.push(ArtifactRelation::DependsOn {
                    from: artifact.coordinates.clone(),
                    to: target,
                    scope: parts[3].to_string(),
                });
            }
            else {
                unmatched += 1;
            }
        }

        if is_malformed {
            report.num_errors += 1;
        }
        if unmatched > 0 {
            debug!("got {} unmatched dependencies for {}", unmatched, artifact.coordinates);
            report.num_artifacts_with_unmatched_dependencies += 1;
            report.num_unmatched_dependencies += unmatched;
        }

        if let Some(parent) = &artifact.parent_coordinates {
            if known.contains(parent.as_str()) {
                relations.push(ArtifactRelation::ChildOf {
                    child: artifact.coordinates.clone(),
                    parent: parent.clone(),
                });
            }
            else {
                debug!("failed to locate parent {} for {}", parent, artifact.coordinates);
                report.num_unmatched_parents += 1;
            }
        }
    }

    report.num_relations = relations.len();
    (relations, report)
}
