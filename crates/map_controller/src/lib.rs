//! Map interaction core: interaction modes, author filtering, marker derivation,
//! initial camera placement and the session object that ties them to the memo store.

pub mod color;
pub mod events;
pub mod filter;
pub mod markers;
pub mod mode;
pub mod session;
pub mod viewport;

pub use color::{MarkerColor, UserColorAssigner};
pub use events::{SessionAlert, SyncFailure, SyncOutcome, SyncRequest};
pub use filter::{AuthorSummary, FilterSet, FilterSummary};
pub use markers::{derive_markers, Marker, MarkerRegistry};
pub use mode::{EditSession, Mode, ModeController, ModeError, ModeKind};
pub use session::{DeleteStep, LoadStatus, MapSession, SessionConfig, SessionError};
pub use viewport::{CameraPosition, MapStyle, ViewportConfig, ViewportController};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod tests_support;
