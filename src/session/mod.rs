//! Recording session sequencing.
//!
//! [`state`] holds the pure phase/event/action machine, [`controller`] the
//! interpreter that runs it against real (or mocked) devices.

pub mod controller;
pub mod state;

use crate::audio::AudioError;
use crate::store::PersistenceError;
use thiserror::Error;

pub use controller::{SessionController, SessionOutcome, SessionTiming};
pub use state::{transition, Action, SessionEvent, SessionPhase};

/// Errors a recording session can surface. Upload problems never appear
/// here; they are logged by the upload agent instead.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Permission refusal or device failure; the session holds no resources
    /// when this is returned.
    #[error(transparent)]
    Audio(#[from] AudioError),
    /// The finished recording could not be written to the entry store.
    #[error("failed to persist the recording entry: {0}")]
    Persistence(#[from] PersistenceError),
}
