use async_trait::async_trait;
use bytes::Bytes;

use crate::maven::coordinates::ArtifactIdentifier;
use crate::resolver::result::ResolverResult;

pub mod classifier;
pub mod error;
pub mod hierarchy;
pub mod mvn_plugin;
pub mod parent_chain;
pub mod provider;
pub mod recursive;
pub mod result;

/// A strategy for determining an artifact's direct dependencies from its descriptor.
///
/// Implementations never fail as a whole: every problem is recorded as an error in the result,
///  and a result without a dependency set signals that resolution failed entirely.
#[async_trait]
pub trait DependencyResolver: Send + Sync {
    async fn resolve(&self, descriptor: Bytes, identifier: &ArtifactIdentifier) -> ResolverResult;
}
