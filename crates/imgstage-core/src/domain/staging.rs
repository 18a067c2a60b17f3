//! Staging - view of the staging area

use serde::{Deserialize, Serialize};

use super::ids::ImageId;
use super::timestamp::Timestamp;

/// StagingSnapshot is what `get_staging_images` returns.
///
/// - `ids`: the staging set at call time (never cached)
/// - `last_cleanup`: time of the most recent successful cleanup, zero if none ran
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingSnapshot {
    pub ids: Vec<ImageId>,
    pub last_cleanup: Timestamp,
}

impl StagingSnapshot {
    pub fn new(ids: Vec<ImageId>, last_cleanup: Timestamp) -> Self {
        Self { ids, last_cleanup }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|staged| staged.as_str() == id)
    }
}
