//! Domain model (tabs, groups, task state, errors, ...).

pub mod errors;
pub mod group;
pub mod ids;
pub mod state;
pub mod tab;
pub mod url;

pub use self::errors::{ErrorKind, OrganizeError, StartError};
pub use self::group::{GroupColor, GroupSpec};
pub use self::ids::RunId;
pub use self::state::{TaskPhase, TaskState};
pub use self::tab::{TabId, TabIndexMapping, TabRecord};
pub use self::url::sanitize_url;
