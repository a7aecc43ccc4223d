//! Edit the configuration file.

use std::process::Command;

/// Opens `~/.config/echotag/echotag.toml` in the user's editor and waits for
/// it to exit. `$VISUAL` wins over `$EDITOR`; without either, nano then vi
/// are probed on PATH.
pub fn handle_config() -> anyhow::Result<()> {
    let config_path = crate::config::get_config_path()?;
    let editor = resolve_editor()?;

    tracing::info!("Editing {} with {}", config_path.display(), editor);

    let status = Command::new(&editor)
        .arg(&config_path)
        .status()
        .map_err(|err| anyhow::anyhow!("Could not launch '{editor}': {err}"))?;

    if !status.success() {
        anyhow::bail!(
            "'{editor}' exited with status {}",
            status.code().unwrap_or(-1)
        );
    }

    println!("Edited {}", config_path.display());
    Ok(())
}

fn resolve_editor() -> anyhow::Result<String> {
    for var in ["VISUAL", "EDITOR"] {
        if let Ok(editor) = std::env::var(var) {
            if !editor.trim().is_empty() {
                return Ok(editor);
            }
        }
    }

    ["nano", "vi"]
        .iter()
        .find(|candidate| on_path(candidate))
        .map(|candidate| candidate.to_string())
        .ok_or_else(|| anyhow::anyhow!("No editor found; set $EDITOR and try again"))
}

fn on_path(binary: &str) -> bool {
    Command::new("which")
        .arg(binary)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
