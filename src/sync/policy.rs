//! Network policy driven by configuration.

use crate::sync::traits::NetworkPolicy;
use async_trait::async_trait;
use std::path::PathBuf;

/// Allows sync when enabled in config and, if given, the remote root is mounted.
#[derive(Debug, Clone)]
pub struct ConfigNetworkPolicy {
    sync_enabled: bool,
    remote_root: Option<PathBuf>,
}

impl ConfigNetworkPolicy {
    pub fn new(sync_enabled: bool) -> Self {
        Self {
            sync_enabled,
            remote_root: None,
        }
    }

    /// Also require `root` to be a reachable directory.
    pub fn with_remote_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.remote_root = Some(root.into());
        self
    }
}

#[async_trait]
impl NetworkPolicy for ConfigNetworkPolicy {
    async fn can_sync(&self) -> bool {
        if !self.sync_enabled {
            return false;
        }
        match &self.remote_root {
            Some(root) => tokio::fs::metadata(root).await.is_ok_and(|m| m.is_dir()),
            None => true,
        }
    }
}
