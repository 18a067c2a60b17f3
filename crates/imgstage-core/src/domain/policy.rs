//! Policy - behaviour switches of the local backend

use serde::{Deserialize, Serialize};

/// SavePolicy decides what `save` does with an id that is already staged.
///
/// - `Overwrite`: replace the staged bytes (and refresh the arrival time)
/// - `Reject`: fail with `StoreError::AlreadyStaged`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavePolicy {
    #[default]
    Overwrite,
    Reject,
}
