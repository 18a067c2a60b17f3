//! Config - backend selection at construction time
//!
//! ```toml
//! backend = "local"
//! root = "/var/lib/imgstage"   # omit for an in-memory store
//! save_policy = "overwrite"    # or "reject"
//! ```
//!
//! ```toml
//! backend = "remote"
//! api = "http://127.0.0.1:8080/rpc"
//! timeout_secs = 30
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::SavePolicy;
use crate::impls::{FsBlobStorage, InMemoryBlobStorage, LocalStore};
use crate::ports::ImageStore;
use crate::rpc::RpcStore;

/// StoreConfig picks the `ImageStore` implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    Local {
        #[serde(default)]
        root: Option<PathBuf>,
        #[serde(default)]
        save_policy: SavePolicy,
    },
    Remote {
        api: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Local {
            root: None,
            save_policy: SavePolicy::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("remote backend needs a non-empty api url")]
    MissingApi,

    #[error("remote backend timeout must be positive")]
    ZeroTimeout,

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl StoreConfig {
    /// Build the configured backend.
    pub fn build(&self) -> Result<Arc<dyn ImageStore>, ConfigError> {
        match self {
            StoreConfig::Local {
                root: Some(root),
                save_policy,
            } => {
                tracing::info!(root = %root.display(), ?save_policy, "using filesystem image store");
                let store = LocalStore::new(FsBlobStorage::new(root)).with_save_policy(*save_policy);
                Ok(Arc::new(store))
            }
            StoreConfig::Local {
                root: None,
                save_policy,
            } => {
                tracing::info!(?save_policy, "using in-memory image store");
                let store =
                    LocalStore::new(InMemoryBlobStorage::new()).with_save_policy(*save_policy);
                Ok(Arc::new(store))
            }
            StoreConfig::Remote { api, timeout_secs } => {
                if api.trim().is_empty() {
                    return Err(ConfigError::MissingApi);
                }
                if *timeout_secs == 0 {
                    return Err(ConfigError::ZeroTimeout);
                }
                tracing::info!(api = %api, timeout_secs, "using remote image store");
                let store = RpcStore::with_timeout(api.clone(), Duration::from_secs(*timeout_secs))?;
                Ok(Arc::new(store))
            }
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, StoreConfig::Remote { .. })
    }

    /// True when the store lives only as long as the process.
    pub fn is_in_memory(&self) -> bool {
        matches!(self, StoreConfig::Local { root: None, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImageId;

    #[test]
    fn remote_config_parses_with_default_timeout() {
        let cfg: StoreConfig =
            serde_json::from_str(r#"{"backend":"remote","api":"http://localhost:8080/rpc"}"#)
                .unwrap();
        assert_eq!(
            cfg,
            StoreConfig::Remote {
                api: "http://localhost:8080/rpc".into(),
                timeout_secs: 30
            }
        );
        assert!(cfg.is_remote());
    }

    #[test]
    fn local_config_defaults() {
        let cfg: StoreConfig = serde_json::from_str(r#"{"backend":"local"}"#).unwrap();
        assert_eq!(cfg, StoreConfig::default());
    }

    #[test]
    fn empty_api_is_rejected() {
        let cfg = StoreConfig::Remote {
            api: " ".into(),
            timeout_secs: 5,
        };
        assert!(matches!(cfg.build(), Err(ConfigError::MissingApi)));
    }

    #[tokio::test]
    async fn reject_policy_reaches_the_built_store() {
        let cfg = StoreConfig::Local {
            root: None,
            save_policy: SavePolicy::Reject,
        };
        let store = cfg.build().unwrap();
        let id = ImageId::from("a");
        store.save(&id, b"1").await.unwrap();
        assert!(store.save(&id, b"2").await.is_err());
    }

    #[tokio::test]
    async fn fs_root_is_used() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = StoreConfig::Local {
            root: Some(dir.path().to_path_buf()),
            save_policy: SavePolicy::Overwrite,
        };
        let store = cfg.build().unwrap();
        store.save(&ImageId::from("a"), b"1").await.unwrap();
        assert!(dir.path().join("staging").join("a").is_file());
    }
}
