//! Session controller.
//!
//! Drives one recording session: it feeds stimuli (timers, stop/cancel
//! signals, device failures) into the pure transition function and executes
//! the actions it returns against the `Capture`/`Playback` traits, the
//! entry store and the upload agent. The controller runs on the task that
//! awaits it; audio streams are not `Send`, so it is never spawned.

use super::state::{transition, Action, SessionEvent, SessionPhase};
use super::SessionError;
use crate::audio::{AudioError, Capture, Playback, ToneSpec};
use crate::store::{build_file_name, Entry, EntryStore, EntryTags};
use crate::upload::UploadAgent;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// How often the external stop flag and device health are polled while a
/// session waits on its timers.
const SIGNAL_POLL: Duration = Duration::from_millis(100);

/// Timer configuration of the recorded sequence.
#[derive(Debug, Clone)]
pub struct SessionTiming {
    /// Room-tone window recorded before the probe tone starts.
    pub ambient_window: Duration,
    /// Extra time after the tone ends, capturing reflections.
    pub reflection_buffer: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            ambient_window: Duration::from_millis(1500),
            reflection_buffer: Duration::from_millis(2000),
        }
    }
}

/// How a session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The recording was finalized and appended to the store. `upload`
    /// holds the background upload task when a backend is configured.
    Saved {
        entry: Entry,
        upload: Option<JoinHandle<()>>,
    },
    /// The user cancelled; nothing was persisted.
    Cancelled,
}

/// Owns the device resources and collaborators for recording sessions.
pub struct SessionController<C: Capture, P: Playback> {
    capture: C,
    playback: P,
    tone: ToneSpec,
    timing: SessionTiming,
    store: EntryStore,
    uploader: UploadAgent,
    recordings_dir: PathBuf,
    output_extension: String,
}

struct Timers {
    ambient: Option<Instant>,
    auto_stop: Option<Instant>,
    tone_duration: Duration,
}

impl<C: Capture, P: Playback> SessionController<C, P> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        capture: C,
        playback: P,
        tone: ToneSpec,
        timing: SessionTiming,
        store: EntryStore,
        uploader: UploadAgent,
        recordings_dir: PathBuf,
        output_extension: String,
    ) -> Self {
        Self {
            capture,
            playback,
            tone,
            timing,
            store,
            uploader,
            recordings_dir,
            output_extension,
        }
    }

    /// Runs one session to completion.
    ///
    /// `cancel` flips to true when the user abandons the session (nothing is
    /// saved); `stop` requests an early finalize (the recording is kept).
    ///
    /// # Errors
    /// - `SessionError::Audio` for permission refusal or device failure
    /// - `SessionError::Persistence` when the finished entry cannot be saved
    pub async fn run_session(
        &mut self,
        tags: EntryTags,
        mut cancel: watch::Receiver<bool>,
        stop: Arc<AtomicBool>,
    ) -> Result<SessionOutcome, SessionError> {
        // Probe before acquiring anything, so permission problems surface
        // as such instead of as mid-session stream errors.
        self.capture.ensure_permission()?;

        let mut phase = SessionPhase::Idle;
        let mut timers = Timers {
            ambient: None,
            auto_stop: None,
            tone_duration: self.tone.nominal_duration(),
        };
        let mut saved: Option<(Entry, Option<JoinHandle<()>>)> = None;
        let mut device_failure: Option<String> = None;

        let mut event = SessionEvent::StartRequested;

        loop {
            let (next, actions) = transition(phase, event);
            debug!("Session: {} --{:?}--> {}", phase, event, next);
            phase = next;

            for action in actions {
                match action {
                    Action::StartCapture => self.capture.start()?,
                    Action::BeginAmbientWindow => {
                        timers.ambient = Some(Instant::now() + self.timing.ambient_window);
                        debug!("Ambient window: {:?}", self.timing.ambient_window);
                    }
                    Action::StartSweep => match self.playback.play(&self.tone) {
                        Ok(duration) => timers.tone_duration = duration,
                        Err(err) => {
                            // The session still terminates: the auto-stop
                            // timer is armed from the nominal tone length.
                            warn!("Probe tone unavailable ({}); recording continues without it", err);
                            timers.tone_duration = self.tone.nominal_duration();
                        }
                    },
                    Action::ArmAutoStop => {
                        let span = timers.tone_duration + self.timing.reflection_buffer;
                        timers.auto_stop = Some(Instant::now() + span);
                        debug!("Auto-stop armed for {:?} from now", span);
                    }
                    Action::FinishCapture => {
                        saved = Some(self.finalize(&tags).await?);
                    }
                    Action::Abort => {
                        self.playback.stop();
                        self.capture.abort();
                        info!("Session aborted; nothing was saved");
                    }
                }
            }

            match phase {
                SessionPhase::Idle => break,
                SessionPhase::Finalizing => event = SessionEvent::Finalized,
                SessionPhase::AmbientCapture | SessionPhase::SweepPlayback => {
                    event = next_stimulus(&mut timers, &mut cancel, &stop, &self.capture).await;
                    if event == SessionEvent::DeviceFailed {
                        device_failure = self.capture.failure();
                    }
                }
            }
        }

        if let Some(message) = device_failure {
            return Err(AudioError::Device(message).into());
        }

        match saved {
            Some((entry, upload)) => Ok(SessionOutcome::Saved { entry, upload }),
            None => Ok(SessionOutcome::Cancelled),
        }
    }

    /// Stops playback, flushes the capture to its final file and appends the
    /// entry. The upload is submitted fire-and-forget.
    async fn finalize(
        &mut self,
        tags: &EntryTags,
    ) -> Result<(Entry, Option<JoinHandle<()>>), SessionError> {
        self.playback.stop();

        let timestamp = Utc::now();
        let file_name = build_file_name(tags, timestamp, &self.output_extension);
        let local_path = self.recordings_dir.join(&file_name);

        let summary = self.capture.finish(&local_path)?;
        info!(
            "Recorded {:.2}s to {}",
            summary.duration_secs,
            local_path.display()
        );

        let entry = Entry::new(local_path, file_name, tags.clone(), timestamp);
        self.store.append(entry.clone()).await?;

        let upload = self.uploader.submit(entry.clone());
        Ok((entry, upload))
    }
}

/// Waits for the next session stimulus: a timer firing, the cancel channel
/// flipping, the stop flag being set, or the capture device failing.
async fn next_stimulus<C: Capture>(
    timers: &mut Timers,
    cancel: &mut watch::Receiver<bool>,
    stop: &AtomicBool,
    capture: &C,
) -> SessionEvent {
    if *cancel.borrow_and_update() {
        return SessionEvent::CancelRequested;
    }
    if stop.load(Ordering::Relaxed) {
        return SessionEvent::StopRequested;
    }

    let mut poll = interval(SIGNAL_POLL);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cancel_open = true;

    loop {
        tokio::select! {
            _ = sleep_until(deadline(timers.ambient)), if timers.ambient.is_some() => {
                timers.ambient = None;
                return SessionEvent::AmbientElapsed;
            }
            _ = sleep_until(deadline(timers.auto_stop)), if timers.auto_stop.is_some() => {
                timers.auto_stop = None;
                return SessionEvent::AutoStopFired;
            }
            changed = cancel.changed(), if cancel_open => {
                match changed {
                    Ok(()) if *cancel.borrow_and_update() => return SessionEvent::CancelRequested,
                    Ok(()) => {}
                    // Sender gone: cancellation can no longer arrive
                    Err(_) => cancel_open = false,
                }
            }
            _ = poll.tick() => {
                if stop.load(Ordering::Relaxed) {
                    return SessionEvent::StopRequested;
                }
                if capture.failure().is_some() {
                    return SessionEvent::DeviceFailed;
                }
            }
        }
    }
}

fn deadline(value: Option<Instant>) -> Instant {
    value.unwrap_or_else(|| Instant::now() + Duration::from_secs(86_400))
}
