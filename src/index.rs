use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, warn};

use crate::maven::coordinates::ArtifactIdentifier;
use crate::maven::paths::parse_maven_path;

/// The artifacts to process in a mining run, deduplicated, in the order they were first listed.
pub struct ArtifactIndex {
    identifiers: Vec<ArtifactIdentifier>,
}
impl ArtifactIndex {
    pub async fn read(path: &Path) -> anyhow::Result<ArtifactIndex> {
        let content = tokio::fs::read_to_string(path).await
            .with_context(|| format!("failed to read artifact index {:?}", path))?;
        Ok(ArtifactIndex::parse(&content))
    }

    /// One artifact per line, either as `g:a:v` coordinates or as a repository relative path
    ///  to its descriptor. Blank lines and lines starting with '#' are skipped, and so are lines
    ///  that are neither.
    pub fn parse(content: &str) -> ArtifactIndex {
        let mut seen = HashSet::new();
        let mut identifiers = vec![];

        for (line_number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parsed = if line.ends_with(".pom") {
                parse_maven_path(line)
            }
            else {
                line.parse::<ArtifactIdentifier>()
            };

            match parsed {
                Ok(identifier) => {
                    if seen.insert(identifier.clone()) {
                        identifiers.push(identifier);
                    }
                    else {
                        debug!("skipping duplicate artifact {} in line {}", identifier, line_number + 1);
                    }
                }
                Err(e) => warn!("skipping line {} of artifact index: {:#}", line_number + 1, e),
            }
        }

        ArtifactIndex { identifiers }
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// splits the index into batches of at most `batch_size` artifacts
    pub fn into_batches(self, batch_size: usize) -> Vec<Vec<ArtifactIdentifier>> {
        self.identifiers
            .chunks(batch_size.max(1))
            .map(|chunk| chunk.to_vec())
            .collect()
    }
}
