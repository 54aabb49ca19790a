use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use hyper::Uri;
use serde::Deserialize;

use crate::resolver::provider::ResolverKind;

/// Settings of a mining run, read from a TOML file. Every key is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// scratch space for the Maven plugin resolver
    pub working_directory: PathBuf,

    /// where mined results and relations are stored
    pub output_directory: PathBuf,

    /// base URI of a repository in Maven layout
    pub repository_url: String,

    pub worker_threads: usize,

    /// number of artifacts handed to a worker at once
    pub batch_size: usize,

    /// whether dependencies declared inside `<profile>` sections count as dependencies
    pub include_profile_dependencies: bool,

    pub primary_resolver: ResolverKind,

    /// retried with if the primary resolver reports errors other than missing files
    pub backup_resolver: Option<ResolverKind>,

    /// executable used by the Maven plugin resolver
    pub mvn_command: String,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            working_directory: PathBuf::from("."),
            output_directory: PathBuf::from("miner-output"),
            repository_url: "https://repo1.maven.org/maven2".to_string(),
            worker_threads: 4,
            batch_size: 1000,
            include_profile_dependencies: false,
            primary_resolver: ResolverKind::Recursive,
            backup_resolver: None,
            mvn_command: "mvn".to_string(),
        }
    }
}

impl MinerConfig {
    /// Reads the configuration file, or returns the defaults if there is none.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            None => MinerConfig::default(),
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read configuration file {:?}", path))?;
                toml::from_str(&content)
                    .with_context(|| format!("invalid configuration file {:?}", path))?
            }
        };
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.worker_threads == 0 {
            return Err(anyhow!("worker_threads must be greater than 0"));
        }
        if self.batch_size == 0 {
            return Err(anyhow!("batch_size must be greater than 0"));
        }
        let uri: Uri = self.repository_url.parse()
            .with_context(|| format!("invalid repository_url {}", self.repository_url))?;
        if uri.scheme().is_none() || uri.host().is_none() {
            return Err(anyhow!("repository_url must be an absolute URI: {}", self.repository_url));
        }
        Ok(())
    }
}
