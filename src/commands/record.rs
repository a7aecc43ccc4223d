//! Audio recording session command.
//!
//! Runs one full measurement session: prompts for object tags, captures room
//! tone, plays the probe sweep, keeps recording through the reflection window,
//! then saves the take and hands it to the upload agent.
//! Supports external stop triggers via SIGUSR1; Ctrl-C cancels and discards.

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use cliclack::{input, intro, outro, select};
use console::style;

use crate::audio::{self, AudioError, CpalCapture, CpalPlayback, ToneSpec};
use crate::config;
use crate::session::{SessionController, SessionError, SessionOutcome, SessionTiming};
use crate::store::{EntryStore, EntryTags, Material, Shape, Size};
use crate::upload::{HttpBackend, UploadAgent};

/// Handles one recording session end to end.
///
/// Tags missing from the command line are prompted for interactively unless
/// `--defaults` was passed. SIGUSR1 stops the session early (still saved),
/// Ctrl-C cancels it (nothing saved).
pub async fn handle_record(
    description: Option<String>,
    material: Option<Material>,
    size: Option<Size>,
    shape: Option<Shape>,
    use_defaults: bool,
    no_upload: bool,
) -> Result<(), anyhow::Error> {
    tracing::info!("=== echotag Recording Session Started ===");

    let config_data = match config::EchotagConfig::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err}");
            eprintln!("Configuration error: {err}");
            eprintln!("Please check your ~/.config/echotag/echotag.toml file and try again.");
            return Err(anyhow::anyhow!("Configuration error: {err}"));
        }
    };

    tracing::info!(
        "Configuration loaded: device={}, sample_rate={}Hz, ambient={}ms, sweep={}ms, reflection={}ms",
        config_data.audio.device,
        config_data.audio.sample_rate,
        config_data.session.ambient_capture_ms,
        config_data.session.sweep_duration_ms,
        config_data.session.reflection_buffer_ms
    );

    // Ctrl-C discards the take without saving anything
    let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
    {
        let cancel_tx = cancel_tx.clone();
        ctrlc::set_handler(move || {
            let _ = cancel_tx.send(true);
        })
        .map_err(|e| anyhow::anyhow!("Failed to set Ctrl-C handler: {e}"))?;
    }

    // SIGUSR1 ends the session early but still saves the recording
    let stop = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, stop.clone())
        .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"))?;

    let tags = resolve_tags(description, material, size, shape, use_defaults)?;
    tracing::info!(
        "Session tags: material={}, size={}, shape={}, description={:?}",
        tags.material,
        tags.size,
        tags.shape,
        tags.description
    );

    if *cancel_rx.borrow() {
        println!("Cancelled, nothing recorded.");
        return Ok(());
    }

    let store = EntryStore::open(config::entries_path()?);
    let recordings_dir = config::recordings_dir()?;
    std::fs::create_dir_all(&recordings_dir)?;

    let upload_config = config_data.upload.with_env_overrides();
    let uploader = if no_upload {
        tracing::info!("Upload disabled for this session (--no-upload)");
        UploadAgent::disabled(store.clone())
    } else if upload_config.is_configured() {
        let backend = HttpBackend::new(
            &upload_config.endpoint,
            &upload_config.api_key,
            &upload_config.bucket,
            &upload_config.table,
        );
        UploadAgent::new(Some(Arc::new(backend)), store.clone())
    } else {
        tracing::debug!("No upload endpoint configured; recordings stay local");
        UploadAgent::disabled(store.clone())
    };

    let tone = ToneSpec {
        duration: Duration::from_millis(config_data.session.sweep_duration_ms),
        start_hz: config_data.session.sweep_start_hz,
        end_hz: config_data.session.sweep_end_hz,
        file: config_data.session.tone_file.clone(),
    };
    let timing = SessionTiming {
        ambient_window: Duration::from_millis(config_data.session.ambient_capture_ms),
        reflection_buffer: Duration::from_millis(config_data.session.reflection_buffer_ms),
    };

    let capture = CpalCapture::new(
        config_data.audio.sample_rate,
        config_data.audio.device.clone(),
        config_data.audio.output_format.clone(),
    );
    let playback = CpalPlayback::new();
    let output_extension =
        audio::extension_for_format(&config_data.audio.output_format).to_string();

    let mut controller = SessionController::new(
        capture,
        playback,
        tone,
        timing,
        store,
        uploader,
        recordings_dir,
        output_extension,
    );

    println!(
        "Recording {} / {} / {}: {}ms of room tone, then the probe sweep at full scale.",
        tags.material, tags.size, tags.shape, config_data.session.ambient_capture_ms
    );
    println!("The session stops on its own once the reflections settle. Ctrl-C discards the take.");

    match controller.run_session(tags, cancel_rx, stop).await {
        Ok(SessionOutcome::Saved { entry, upload }) => {
            println!("Saved {}", entry.file_name);
            if let Some(handle) = upload {
                println!("Uploading in the background...");
                // Keep the process alive until the task settles; its outcome
                // never changes the saved entry.
                let _ = handle.await;
            }
            tracing::info!("=== echotag Recording Session Exited Successfully ===");
            Ok(())
        }
        Ok(SessionOutcome::Cancelled) => {
            println!("Recording cancelled, nothing saved.");
            tracing::info!("Session cancelled by user");
            Ok(())
        }
        Err(e) => {
            if let SessionError::Audio(AudioError::PermissionDenied(detail)) = &e {
                eprintln!("Microphone access was denied: {detail}");
                eprintln!("Grant this terminal access to the microphone and try again.");
            } else {
                eprintln!("Recording failed: {e}");
            }
            tracing::error!("Recording session failed: {e}");
            Err(e.into())
        }
    }
}

/// Merges CLI-provided tags with interactive prompts for the missing ones.
/// With `--defaults`, missing values fall back to the stock tags instead.
fn resolve_tags(
    description: Option<String>,
    material: Option<Material>,
    size: Option<Size>,
    shape: Option<Shape>,
    use_defaults: bool,
) -> anyhow::Result<EntryTags> {
    let stock = EntryTags::default();

    if use_defaults {
        return Ok(EntryTags {
            description: description.unwrap_or(stock.description),
            material: material.unwrap_or(stock.material),
            size: size.unwrap_or(stock.size),
            shape: shape.unwrap_or(stock.shape),
        });
    }

    let needs_prompt =
        description.is_none() || material.is_none() || size.is_none() || shape.is_none();
    if needs_prompt {
        intro(style(" record ").on_white().black())?;
    }

    let material = match material {
        Some(m) => m,
        None => prompt_choice("Material of the tagged object:", Material::all())?,
    };
    let size = match size {
        Some(s) => s,
        None => prompt_choice("Size:", Size::all())?,
    };
    let shape = match shape {
        Some(s) => s,
        None => prompt_choice("Shape:", Shape::all())?,
    };
    let description = match description {
        Some(d) => d,
        None => input("Short description (Enter to skip):")
            .placeholder("e.g. ceramic mug")
            .required(false)
            .interact()
            .map_err(|e| anyhow::anyhow!("Description input cancelled: {e}"))?,
    };

    if needs_prompt {
        outro(format!("{} / {} / {}", material, size, shape))?;
    }

    Ok(EntryTags {
        description,
        material,
        size,
        shape,
    })
}

/// Single-select prompt over a fixed option set.
fn prompt_choice<T: Copy + fmt::Display>(
    question: &str,
    options: &'static [T],
) -> anyhow::Result<T> {
    let mut prompt = select(question);
    for (i, option) in options.iter().enumerate() {
        prompt = prompt.item(i, option, "");
    }
    let selected: usize = prompt
        .interact()
        .map_err(|e| anyhow::anyhow!("Selection cancelled: {e}"))?;
    Ok(options[selected])
}
