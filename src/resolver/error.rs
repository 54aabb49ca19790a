use std::fmt::{Display, Formatter};

/// A problem encountered while resolving one artifact's dependencies. Errors are recorded in the
///  `ResolverResult` rather than returned, so a single broken declaration does not cost the
///  whole artifact.
#[derive(Debug)]
pub struct ResolverError {
    pub message: String,
    pub cause: Option<anyhow::Error>,
    /// set if a remote file (the artifact's own descriptor, an ancestor or an import target)
    ///  could not be downloaded
    pub is_caused_by_missing_file: bool,
    /// the element or reference that triggered the error - only set for parsing related errors
    pub affected_element: Option<String>,
}
impl ResolverError {
    pub fn new(message: impl Into<String>) -> ResolverError {
        ResolverError {
            message: message.into(),
            cause: None,
            is_caused_by_missing_file: false,
            affected_element: None,
        }
    }

    pub fn parsing(message: impl Into<String>, affected_element: impl Into<String>) -> ResolverError {
        ResolverError {
            affected_element: Some(affected_element.into()),
            ..ResolverError::new(message)
        }
    }

    pub fn with_cause(self, cause: impl Into<anyhow::Error>) -> ResolverError {
        ResolverError {
            cause: Some(cause.into()),
            ..self
        }
    }

    pub fn missing_file(self) -> ResolverError {
        ResolverError {
            is_caused_by_missing_file: true,
            ..self
        }
    }

    pub fn is_parsing_related(&self) -> bool {
        self.affected_element.is_some()
    }
}

impl Display for ResolverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.affected_element {
            Some(element) => write!(f, "Error while parsing element '{}': {}", element, self.message)?,
            None => write!(f, "Error while resolving dependencies: {}", self.message)?,
        }
        if let Some(cause) = &self.cause {
            write!(f, " ({:#})", cause)?;
        }
        Ok(())
    }
}
