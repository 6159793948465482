//! View accounting for portfolio reads.
//!
//! A read resolves a [`ViewerIdentity`], skips counting for the owner, checks
//! the [`RecencyGate`] (or the per-viewer [`ViewerLedger`]) and, when the view
//! qualifies, hands an atomic increment to a background task.

pub mod clock;
pub mod gate;
pub mod identity;
pub mod ledger;
pub mod ownership;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use gate::{RecencyGate, VIEW_COOLDOWN_SECS};
pub use identity::{resolve_viewer, ViewerIdentity, ANONYMOUS};
pub use ledger::ViewerLedger;
pub use ownership::is_owner_exempt;
pub use service::{FetchedPortfolio, RecordOutcome, ViewAccounting, ViewDecision, ViewError};
