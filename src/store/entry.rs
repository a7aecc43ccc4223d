//! Recording entry model and filename derivation.
//!
//! An [`Entry`] is one persisted recording plus its user-supplied tags. The
//! on-disk JSON uses camelCase field names so documents written by earlier
//! builds of the collection app remain readable.

use chrono::{DateTime, SecondsFormat, Utc};
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Material of the sampled object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Material {
    Plastic,
    Glass,
    Metal,
    Paper,
}

/// Rough size class of the sampled object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Size {
    Small,
    Medium,
    Large,
}

/// Overall shape of the sampled object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Shape {
    Flat,
    Cylindrical,
    Spherical,
    Irregular,
}

impl Material {
    pub fn label(&self) -> &'static str {
        match self {
            Material::Plastic => "Plastic",
            Material::Glass => "Glass",
            Material::Metal => "Metal",
            Material::Paper => "Paper",
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Material::Plastic,
            Material::Glass,
            Material::Metal,
            Material::Paper,
        ]
    }
}

impl Size {
    pub fn label(&self) -> &'static str {
        match self {
            Size::Small => "Small",
            Size::Medium => "Medium",
            Size::Large => "Large",
        }
    }

    pub fn all() -> &'static [Self] {
        &[Size::Small, Size::Medium, Size::Large]
    }
}

impl Shape {
    pub fn label(&self) -> &'static str {
        match self {
            Shape::Flat => "Flat",
            Shape::Cylindrical => "Cylindrical",
            Shape::Spherical => "Spherical",
            Shape::Irregular => "Irregular",
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Shape::Flat,
            Shape::Cylindrical,
            Shape::Spherical,
            Shape::Irregular,
        ]
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// User-supplied tags collected before a recording session starts.
#[derive(Debug, Clone)]
pub struct EntryTags {
    /// Free-text description; may be empty
    pub description: String,
    pub material: Material,
    pub size: Size,
    pub shape: Shape,
}

impl Default for EntryTags {
    fn default() -> Self {
        Self {
            description: String::new(),
            material: Material::Plastic,
            size: Size::Small,
            shape: Shape::Flat,
        }
    }
}

/// One persisted recording plus its metadata.
///
/// Entries are created when a recording session completes, mutated at most
/// once (the upload agent attaching `remote_url`) and removed only by an
/// explicit delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Path of the audio file on local storage
    pub local_path: PathBuf,
    /// Stable display/storage name; doubles as the remote object key
    pub file_name: String,
    pub description: String,
    pub material: Material,
    pub size: Size,
    pub shape: Shape,
    /// Creation time, set once at save
    pub timestamp: DateTime<Utc>,
    /// Set by the upload agent after a successful mirror; absent until then
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
}

impl Entry {
    /// Builds the entry for a freshly finalized recording.
    pub fn new(local_path: PathBuf, file_name: String, tags: EntryTags, timestamp: DateTime<Utc>) -> Self {
        Self {
            local_path,
            file_name,
            description: tags.description,
            material: tags.material,
            size: tags.size,
            shape: tags.shape,
            timestamp,
            remote_url: None,
        }
    }

    /// Short human-readable title for listings: the description, or a
    /// placeholder when none was entered.
    pub fn title(&self) -> &str {
        let trimmed = self.description.trim();
        if trimmed.is_empty() {
            "(untitled recording)"
        } else {
            trimmed
        }
    }
}

/// Derives the stable file name for a recording:
/// `{material}_{size}_{shape}_{description-or-"recording"}_{timestamp}.{ext}`.
///
/// The description and timestamp components are sanitized so the name is
/// legal on common filesystems and usable as a remote object key.
pub fn build_file_name(tags: &EntryTags, timestamp: DateTime<Utc>, extension: &str) -> String {
    let description = tags.description.trim();
    let description = if description.is_empty() {
        "recording"
    } else {
        description
    };

    let stamp = timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);

    format!(
        "{}_{}_{}_{}_{}.{}",
        tags.material.label(),
        tags.size.label(),
        tags.shape.label(),
        sanitize_component(description),
        sanitize_component(&stamp),
        extension
    )
}

/// Replaces every character outside `[A-Za-z0-9._-]` with `-`.
///
/// Applied to the free-text description and the ISO timestamp (whose `:`
/// separators are illegal on some filesystems).
pub fn sanitize_component(raw: &str) -> String {
    let pattern = Regex::new(r"[^A-Za-z0-9._-]").expect("sanitize pattern is valid");
    pattern.replace_all(raw, "-").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_tags() -> EntryTags {
        EntryTags {
            description: "tap test".to_string(),
            material: Material::Glass,
            size: Size::Medium,
            shape: Shape::Cylindrical,
        }
    }

    #[test]
    fn test_file_name_contains_all_components() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let name = build_file_name(&sample_tags(), ts, "wav");
        assert_eq!(name, "Glass_Medium_Cylindrical_tap-test_2026-03-14T15-09-26.000Z.wav");
    }

    #[test]
    fn test_file_name_empty_description_falls_back() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let tags = EntryTags {
            description: "   ".to_string(),
            ..EntryTags::default()
        };
        let name = build_file_name(&tags, ts, "wav");
        assert!(name.starts_with("Plastic_Small_Flat_recording_"));
    }

    #[test]
    fn test_sanitize_strips_illegal_characters() {
        assert_eq!(sanitize_component("a/b\\c:d e"), "a-b-c-d-e");
        assert_eq!(sanitize_component("2026-03-14T15:09:26.123Z"), "2026-03-14T15-09-26.123Z");
        assert_eq!(sanitize_component("plain-name_1.wav"), "plain-name_1.wav");
    }

    #[test]
    fn test_entry_json_uses_camel_case_and_omits_absent_remote_url() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let entry = Entry::new(
            PathBuf::from("/data/recordings/x.wav"),
            "x.wav".to_string(),
            sample_tags(),
            ts,
        );

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["localPath"], "/data/recordings/x.wav");
        assert_eq!(json["fileName"], "x.wav");
        assert_eq!(json["material"], "Glass");
        assert!(json.get("remoteUrl").is_none());

        let back: Entry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
        assert!(back.remote_url.is_none());
    }
}
