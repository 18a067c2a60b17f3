//! Domain model (ids, timestamps, staging view, policies, errors).

pub mod errors;
pub mod ids;
pub mod policy;
pub mod staging;
pub mod timestamp;

pub use self::errors::{ErrorKind, StoreError, StoreResult};
pub use self::ids::ImageId;
pub use self::policy::SavePolicy;
pub use self::staging::StagingSnapshot;
pub use self::timestamp::Timestamp;
