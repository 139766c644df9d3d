//! Error types for the kingdoms-economy crate.
//!
//! Only lifecycle misuse is an error here. A cancelled consume or sleep is
//! a normal exit path and is reported through return values instead.

use kingdoms_types::AgentKind;

/// Errors from kingdom lifecycle operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KingdomError {
    /// `start` was called on a kingdom that is already running.
    #[error("{kingdom} is already running")]
    AlreadyStarted {
        /// Kingdom name.
        kingdom: String,
    },

    /// The kingdom has been stopped and cannot be started or stepped again.
    #[error("{kingdom} has been stopped")]
    Stopped {
        /// Kingdom name.
        kingdom: String,
    },

    /// A manual step was requested while the agents run on their own.
    #[error("cannot step {kind} in {kingdom} while the kingdom is running")]
    Running {
        /// Kingdom name.
        kingdom: String,
        /// The agent kind that was requested.
        kind: AgentKind,
    },

    /// The agent is mid-step on another caller, so it can be neither
    /// stepped again nor spawned by `start`.
    #[error("{kingdom} {kind} is busy")]
    AgentBusy {
        /// Kingdom name.
        kingdom: String,
        /// The agent kind that was requested.
        kind: AgentKind,
    },
}
