use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::maven::coordinates::{ArtifactDependency, ArtifactIdentifier};
use crate::resolver::DependencyResolver;
use crate::resolver::error::ResolverError;
use crate::resolver::result::ResolverResult;

const RESOLVED_FILES_MARKER: &str = "the following files have been resolved:";
const ERROR_LOG_NAME: &str = "resolver-errors.log";

/// Resolves direct dependencies by running Maven's dependency plugin on the descriptor. This is
///  slow and needs a local Maven installation, but it is exact where the recursive resolver
///  approximates.
pub struct MvnPluginResolver {
    working_directory: PathBuf,
    mvn_command: String,
}
impl MvnPluginResolver {
    pub fn new(working_directory: impl Into<PathBuf>, mvn_command: impl Into<String>) -> MvnPluginResolver {
        MvnPluginResolver {
            working_directory: working_directory.into(),
            mvn_command: mvn_command.into(),
        }
    }

    fn scratch_dir(&self, identifier: &ArtifactIdentifier) -> PathBuf {
        self.working_directory.join(format!("{}-{}-{}", identifier.group_id, identifier.artifact_id, identifier.version))
    }

    async fn run_plugin(&self, descriptor: &[u8], scratch_dir: &Path) -> Result<BTreeSet<ArtifactDependency>, ResolverError> {
        tokio::fs::create_dir_all(scratch_dir).await
            .map_err(|e| ResolverError::new("failed to create scratch directory").with_cause(e))?;
        tokio::fs::write(scratch_dir.join("pom.xml"), descriptor).await
            .map_err(|e| ResolverError::new("failed to write descriptor to scratch directory").with_cause(e))?;

        debug!("running {} dependency:list in {:?}", self.mvn_command, scratch_dir);
        let output = Command::new(&self.mvn_command)
            .args(["dependency:list", "-DexcludeTransitive", "-B", "--no-transfer-progress", "-N"])
            .current_dir(scratch_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ResolverError::new(format!("failed to invoke {}", self.mvn_command)).with_cause(e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let log_file = scratch_dir.join(ERROR_LOG_NAME);
            if let Err(e) = tokio::fs::write(&log_file, stdout.as_bytes()).await {
                warn!("failed to write {:?}: {}", log_file, e);
            }
            return Err(ResolverError::new(format!("maven dependency plugin failed with {}", output.status)));
        }

        parse_dependency_list(&stdout)
            .map_err(|e| ResolverError::new("unexpected maven dependency plugin output").with_cause(e))
    }
}

#[async_trait]
impl DependencyResolver for MvnPluginResolver {
    async fn resolve(&self, descriptor: Bytes, identifier: &ArtifactIdentifier) -> ResolverResult {
        let mut result = ResolverResult::new(identifier.clone());
        let scratch_dir = self.scratch_dir(identifier);

        match self.run_plugin(&descriptor, &scratch_dir).await {
            Ok(dependencies) => {
                result.results = Some(dependencies);
                if let Err(e) = tokio::fs::remove_dir_all(&scratch_dir).await {
                    warn!("failed to remove scratch directory {:?}: {}", scratch_dir, e);
                }
            }
            Err(e) => result.append_error(e),
        }
        result
    }
}

/// Extracts the dependencies from the 'resolved files' block of `mvn dependency:list` output.
///  Each entry is `g:a:type:v:scope` or `g:a:type:classifier:v:scope`, optionally followed by
///  further text; a block consisting of `none` is empty.
pub fn parse_dependency_list(output: &str) -> anyhow::Result<BTreeSet<ArtifactDependency>> {
    let mut result = BTreeSet::new();
    let mut in_block = false;

    for line in output.lines() {
        let content = line.strip_prefix("[INFO]").unwrap_or(line).trim();

        if !in_block {
            in_block = content.to_ascii_lowercase().contains(RESOLVED_FILES_MARKER);
            continue;
        }
        if content.is_empty() {
            in_block = false;
            continue;
        }

        let entry = content.split_whitespace().next().unwrap_or_default();
        if entry.eq_ignore_ascii_case("none") {
            continue;
        }
        result.insert(parse_composite_identifier(entry)?);
    }
    Ok(result)
}

fn parse_composite_identifier(entry: &str) -> anyhow::Result<ArtifactDependency> {
    let parts = entry.split(':').collect::<Vec<_>>();
    let (version, scope) = match parts.len() {
        5 => (parts[3], parts[4]),
        6 => (parts[4], parts[5]),
        _ => return Err(anyhow!("invalid composite identifier: {}", entry)),
    };
    Ok(ArtifactDependency::new(
        ArtifactIdentifier::new(parts[0], parts[1], version),
        Some(scope.to_string()),
    ))
}
