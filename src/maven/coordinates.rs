use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SCOPE: &str = "compile";

/// The (groupId, artifactId, version) triple identifying one published artifact. Equality is
///  exactly the triple.
#[derive(PartialEq, Eq, Hash, Clone, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactIdentifier {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}
impl ArtifactIdentifier {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>, version: impl Into<String>) -> ArtifactIdentifier {
        ArtifactIdentifier {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }

    /// canonical `g:a:v`
    pub fn coordinates(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

impl Display for ArtifactIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

impl FromStr for ArtifactIdentifier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s.trim().split(':').collect::<Vec<_>>();
        match parts.as_slice() {
            [g, a, v] if !g.is_empty() && !a.is_empty() && !v.is_empty() => {
                Ok(ArtifactIdentifier::new(*g, *a, *v))
            }
            _ => Err(anyhow!("not valid artifact coordinates (expected groupId:artifactId:version): {:?}", s)),
        }
    }
}

/// A resolved dependency of an artifact. Equality includes the scope.
#[derive(PartialEq, Eq, Hash, Clone, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactDependency {
    pub identifier: ArtifactIdentifier,
    pub scope: String,
}
impl ArtifactDependency {
    pub fn new(identifier: ArtifactIdentifier, scope: Option<String>) -> ArtifactDependency {
        ArtifactDependency {
            identifier,
            scope: scope.unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
        }
    }

    /// canonical `g:a:v:scope`
    pub fn coordinates(&self) -> String {
        format!("{}:{}", self.identifier.coordinates(), self.scope)
    }

    /// The key under which at most one entry may exist in a resolved dependency set.
    pub fn dedup_key(&self) -> (&str, &str, &str) {
        (&self.identifier.group_id, &self.identifier.artifact_id, &self.scope)
    }
}

impl Display for ArtifactDependency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.identifier, self.scope)
    }
}
