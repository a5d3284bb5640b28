//! Incremental synchronization engine
//!
//! Each polling cycle runs sequentially:
//!
//! ```text
//! ┌────────────┐   ┌───────────┐   ┌──────────────┐   ┌─────────────┐
//! │  progress  │──▶│ scheduler │──▶│   executor   │──▶│ termination │
//! │  report    │   │ (pending) │   │  (fan-out)   │   │  (decide)   │
//! └────────────┘   └───────────┘   └──────────────┘   └─────────────┘
//!       ▲                                                    │
//!       └──────────────── sleep(delay) ◀─────────────────────┤
//!                                                            ▼
//!                                               end-of-game stats + metadata
//! ```
//!
//! The executor settles every fetch of a cycle before the next report is
//! requested, so cycles never overlap.

pub mod events;
pub mod executor;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod termination;

#[cfg(test)]
pub(crate) mod testing;

pub use events::{EventReceiver, EventSender, SpectatorEvent};
pub use executor::{CycleSummary, FetchExecutor};
pub use scheduler::PendingIds;
pub use session::{SessionHandle, SessionOutcome, SpectatorSession};
pub use state::SessionState;
pub use termination::{CycleDecision, TerminationReason};
