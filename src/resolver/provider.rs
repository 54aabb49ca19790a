use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::config::MinerConfig;
use crate::maven::DescriptorFetcher;
use crate::resolver::DependencyResolver;
use crate::resolver::mvn_plugin::MvnPluginResolver;
use crate::resolver::recursive::RecursiveResolver;

/// the available resolution strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ResolverKind {
    /// parses descriptors and their parents / imports directly
    Recursive,
    /// invokes Maven's dependency plugin
    MvnPlugin,
}

/// Builds the configured primary and (optional) backup resolver. Every worker builds its own
///  instances, so no resolver state is shared between workers.
#[derive(Clone)]
pub struct ResolverProvider {
    primary: ResolverKind,
    backup: Option<ResolverKind>,
    fetcher: Arc<dyn DescriptorFetcher>,
    config: Arc<MinerConfig>,
}
impl ResolverProvider {
    pub fn new(config: Arc<MinerConfig>, fetcher: Arc<dyn DescriptorFetcher>) -> ResolverProvider {
        ResolverProvider {
            primary: config.primary_resolver,
            backup: config.backup_resolver,
            fetcher,
            config,
        }
    }

    pub fn backup_resolver_enabled(&self) -> bool {
        self.backup.is_some()
    }

    pub fn build_resolver(&self) -> Box<dyn DependencyResolver> {
        self.build(self.primary)
    }

    pub fn build_backup_resolver(&self) -> Option<Box<dyn DependencyResolver>> {
        self.backup.map(|kind| self.build(kind))
    }

    fn build(&self, kind: ResolverKind) -> Box<dyn DependencyResolver> {
        match kind {
            ResolverKind::Recursive => Box::new(RecursiveResolver::new(
                self.fetcher.clone(),
                self.config.include_profile_dependencies,
            )),
            ResolverKind::MvnPlugin => Box::new(MvnPluginResolver::new(
                &self.config.working_directory,
                self.config.mvn_command.clone(),
            )),
        }
    }
}
