//! Recording session state machine.
//!
//! The machine is a pure function from (phase, event) to (phase, actions).
//! It owns no devices and performs no I/O; the controller feeds it events
//! and executes the returned actions against real hardware. Unexpected
//! events leave the phase unchanged and request nothing, so stray timer
//! fires or double key presses cannot corrupt a session.

use std::fmt;

/// Phase of one recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No session running; microphone and speaker are released.
    Idle,
    /// Capturing room tone before the probe tone is played.
    AmbientCapture,
    /// Probe tone is playing (or its nominal duration elapsing) while
    /// capture continues; auto-stop is armed.
    SweepPlayback,
    /// Capture is being flushed to disk and an entry written.
    Finalizing,
}

/// External stimuli the controller translates into transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    StartRequested,
    /// The ambient capture window elapsed.
    AmbientElapsed,
    /// The user asked for an early stop; the recording is still kept.
    StopRequested,
    /// The auto-stop timer (tone length plus reflection buffer) fired.
    AutoStopFired,
    /// The user abandoned the session; nothing may be persisted.
    CancelRequested,
    /// The capture or playback device failed mid-session.
    DeviceFailed,
    /// Finalization finished (successfully or not).
    Finalized,
}

/// Side effects a transition asks the controller to perform, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Acquire the microphone and start capturing.
    StartCapture,
    /// Start the ambient window timer.
    BeginAmbientWindow,
    /// Start probe tone playback at full volume.
    StartSweep,
    /// Arm the auto-stop timer for tone length plus the reflection buffer.
    ArmAutoStop,
    /// Stop playback, flush capture to disk and persist an entry.
    FinishCapture,
    /// Release all devices and discard captured audio without persisting.
    Abort,
}

/// Applies `event` in `phase`. Unknown combinations are ignored: the phase
/// is returned unchanged with an empty action list.
pub fn transition(phase: SessionPhase, event: SessionEvent) -> (SessionPhase, &'static [Action]) {
    use Action::*;
    use SessionEvent::*;
    use SessionPhase::*;

    match (phase, event) {
        (Idle, StartRequested) => (AmbientCapture, &[StartCapture, BeginAmbientWindow]),

        (AmbientCapture, AmbientElapsed) => (SweepPlayback, &[StartSweep, ArmAutoStop]),

        (AmbientCapture, StopRequested) | (SweepPlayback, StopRequested) => {
            (Finalizing, &[FinishCapture])
        }
        (SweepPlayback, AutoStopFired) => (Finalizing, &[FinishCapture]),

        (AmbientCapture, CancelRequested)
        | (SweepPlayback, CancelRequested)
        | (AmbientCapture, DeviceFailed)
        | (SweepPlayback, DeviceFailed) => (Idle, &[Abort]),

        (Finalizing, Finalized) => (Idle, &[]),

        (unchanged, _) => (unchanged, &[]),
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::AmbientCapture => "ambient capture",
            SessionPhase::SweepPlayback => "sweep playback",
            SessionPhase::Finalizing => "finalizing",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_reaches_idle_again() {
        let (phase, actions) = transition(SessionPhase::Idle, SessionEvent::StartRequested);
        assert_eq!(phase, SessionPhase::AmbientCapture);
        assert_eq!(actions, &[Action::StartCapture, Action::BeginAmbientWindow]);

        let (phase, actions) = transition(phase, SessionEvent::AmbientElapsed);
        assert_eq!(phase, SessionPhase::SweepPlayback);
        assert_eq!(actions, &[Action::StartSweep, Action::ArmAutoStop]);

        let (phase, actions) = transition(phase, SessionEvent::AutoStopFired);
        assert_eq!(phase, SessionPhase::Finalizing);
        assert_eq!(actions, &[Action::FinishCapture]);

        let (phase, actions) = transition(phase, SessionEvent::Finalized);
        assert_eq!(phase, SessionPhase::Idle);
        assert!(actions.is_empty());
    }

    #[test]
    fn test_manual_stop_finalizes_from_either_capture_phase() {
        for phase in [SessionPhase::AmbientCapture, SessionPhase::SweepPlayback] {
            let (next, actions) = transition(phase, SessionEvent::StopRequested);
            assert_eq!(next, SessionPhase::Finalizing);
            assert_eq!(actions, &[Action::FinishCapture]);
        }
    }

    #[test]
    fn test_cancel_aborts_without_finalizing() {
        for phase in [SessionPhase::AmbientCapture, SessionPhase::SweepPlayback] {
            let (next, actions) = transition(phase, SessionEvent::CancelRequested);
            assert_eq!(next, SessionPhase::Idle);
            assert_eq!(actions, &[Action::Abort]);
        }
    }

    #[test]
    fn test_device_failure_aborts() {
        let (next, actions) = transition(SessionPhase::SweepPlayback, SessionEvent::DeviceFailed);
        assert_eq!(next, SessionPhase::Idle);
        assert_eq!(actions, &[Action::Abort]);
    }

    #[test]
    fn test_unexpected_events_are_ignored() {
        let cases = [
            (SessionPhase::Idle, SessionEvent::AutoStopFired),
            (SessionPhase::Idle, SessionEvent::CancelRequested),
            (SessionPhase::AmbientCapture, SessionEvent::AutoStopFired),
            (SessionPhase::AmbientCapture, SessionEvent::StartRequested),
            (SessionPhase::SweepPlayback, SessionEvent::AmbientElapsed),
            (SessionPhase::Finalizing, SessionEvent::StopRequested),
            (SessionPhase::Finalizing, SessionEvent::CancelRequested),
        ];

        for (phase, event) in cases {
            let (next, actions) = transition(phase, event);
            assert_eq!(next, phase, "{phase} should ignore {event:?}");
            assert!(actions.is_empty());
        }
    }
}
