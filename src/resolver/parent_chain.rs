use std::collections::HashSet;

use tracing::warn;

use crate::maven::{DescriptorFetcher, FetchError};
use crate::maven::coordinates::ArtifactIdentifier;
use crate::pom::PomDocument;
use crate::resolver::error::ResolverError;
use crate::resolver::hierarchy::HierarchyLevel;

/// Walks the `<parent>` references starting at the artifact's own document, nearest first. Any
///  failure along the way is fatal for the artifact: without the complete chain there is no
///  reliable result.
pub async fn build_parent_chain(
    fetcher: &dyn DescriptorFetcher,
    identifier: ArtifactIdentifier,
    document: PomDocument,
) -> Result<Vec<HierarchyLevel>, ResolverError> {
    let mut visited = HashSet::new();
    visited.insert(identifier.clone());

    let mut chain = vec![HierarchyLevel::new(identifier, document)];

    loop {
        let current = &chain[chain.len() - 1];
        let parent_identifier = match parent_reference(&current.document, &current.identifier)? {
            None => break,
            Some(parent_identifier) => parent_identifier,
        };

        if !visited.insert(parent_identifier.clone()) {
            return Err(ResolverError::parsing("cyclic parent chain", parent_identifier.coordinates()));
        }

        let parent_document = fetch_document(fetcher, &parent_identifier, "parent POM").await?;
        chain.push(HierarchyLevel::new(parent_identifier, parent_document));
    }

    Ok(chain)
}

/// the identifier in the document's `<parent>` section, if there is one
fn parent_reference(document: &PomDocument, identifier: &ArtifactIdentifier) -> Result<Option<ArtifactIdentifier>, ResolverError> {
    let mut parents = document.children(document.root())
        .filter(|&child| document.name(child).eq_ignore_ascii_case("parent"));

    let parent = match parents.next() {
        None => return Ok(None),
        Some(parent) => parent,
    };
    if parents.next().is_some() {
        warn!("more than one parent element detected for artifact {}", identifier);
    }

    match (
        document.child_text(parent, "groupId"),
        document.child_text(parent, "artifactId"),
        document.child_text(parent, "version"),
    ) {
        (Some(g), Some(a), Some(v)) => Ok(Some(ArtifactIdentifier::new(g, a, v))),
        _ => Err(ResolverError::new(format!("incomplete parent definition in POM file of {}", identifier))),
    }
}

/// Downloads and parses an ancestor or import document. `what` names the document's role in
///  error messages.
pub async fn fetch_document(fetcher: &dyn DescriptorFetcher, identifier: &ArtifactIdentifier, what: &str) -> Result<PomDocument, ResolverError> {
    let descriptor = match fetcher.fetch(identifier).await {
        Ok(descriptor) => descriptor,
        Err(e @ FetchError::NotFound(_)) => {
            return Err(ResolverError::parsing(format!("{} not found in repository", what), identifier.coordinates())
                .with_cause(e)
                .missing_file());
        }
        Err(e @ FetchError::Io(_)) => {
            return Err(ResolverError::parsing(format!("failed to download {}", what), identifier.coordinates())
                .with_cause(e)
                .missing_file());
        }
    };

    PomDocument::parse(descriptor.data.as_ref())
        .map_err(|e| ResolverError::parsing(format!("failed to parse {}", what), identifier.coordinates()).with_cause(e))
}
