//! List available audio input devices.

use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait};

use crate::audio::suppress_alsa_warnings;

/// Prints one line per input device. Both the ID and the name are accepted
/// by the `device` field in echotag.toml.
pub fn handle_list_devices() -> Result<(), anyhow::Error> {
    let (default_name, devices) = suppress_alsa_warnings(|| -> anyhow::Result<_> {
        let host = cpal::default_host();
        let default_name = host.default_input_device().and_then(|d| d.name().ok());

        // Devices that refuse to even report a name are skipped
        let devices: Vec<(String, Option<cpal::SupportedStreamConfig>)> = host
            .input_devices()
            .map_err(|e| anyhow!("Failed to enumerate audio devices: {e}"))?
            .filter_map(|device| {
                let name = device.name().ok()?;
                let config = device.default_input_config().ok();
                Some((name, config))
            })
            .collect();

        Ok((default_name, devices))
    })?;

    if devices.is_empty() {
        println!("No audio input devices found on this system.");
        return Ok(());
    }

    println!("{:>3}  {:<40} {}", "ID", "NAME", "CONFIG");
    for (index, (name, config)) in devices.iter().enumerate() {
        let config_column = match config {
            Some(config) => format!(
                "{}Hz, {} ch",
                config.sample_rate().0,
                config.channels()
            ),
            None => "unavailable".to_string(),
        };
        let marker = if default_name.as_deref() == Some(name.as_str()) {
            " (default)"
        } else {
            ""
        };

        println!("{index:>3}  {:<40} {config_column}{marker}", name);
    }

    Ok(())
}
