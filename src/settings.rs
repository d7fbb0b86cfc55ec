use crate::theme::ThemeKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("USERPROFILE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn lexius_dir() -> PathBuf {
    home_dir().join(".lexius")
}

pub fn files_dir() -> PathBuf {
    lexius_dir().join("files")
}

fn settings_path() -> PathBuf {
    lexius_dir().join("settings.json")
}

/// The two reserved persisted keys beside the file documents: the theme
/// name and the autosave flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub theme: ThemeKind,
    #[serde(default = "default_autosave")]
    pub autosave: bool,
}

fn default_autosave() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: ThemeKind::default(),
            autosave: true,
        }
    }
}

impl Settings {
    /// Loads persisted settings, falling back to defaults with a warning
    /// when the file is missing or unreadable.
    pub fn load() -> (Self, Option<String>) {
        let path = settings_path();
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return (Self::default(), None);
            }
            Err(err) => {
                return (
                    Self::default(),
                    Some(format!("failed to read {}: {err}", path.display())),
                );
            }
        };

        match serde_json::from_slice(&data) {
            Ok(settings) => (settings, None),
            Err(err) => (
                Self::default(),
                Some(format!("failed to parse {}: {err}", path.display())),
            ),
        }
    }

    pub fn save(&self) -> io::Result<()> {
        let dir = lexius_dir();
        fs::create_dir_all(&dir)?;

        let final_path = settings_path();
        let tmp_path = dir.join("settings.json.tmp");
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;

        fs::write(&tmp_path, bytes)?;
        match fs::rename(&tmp_path, &final_path) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                if final_path.exists() {
                    fs::remove_file(&final_path)?;
                    fs::rename(&tmp_path, &final_path)?;
                    Ok(())
                } else {
                    Err(rename_err)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: Settings =
            serde_json::from_str("{}").expect("empty settings should deserialize");
        assert_eq!(settings.theme, ThemeKind::Light);
        assert!(settings.autosave);
    }

    #[test]
    fn settings_round_trip() {
        let settings = Settings {
            theme: ThemeKind::Dark,
            autosave: false,
        };
        let json = serde_json::to_string(&settings).expect("settings should serialize");
        let back: Settings = serde_json::from_str(&json).expect("settings should deserialize");
        assert_eq!(back.theme, ThemeKind::Dark);
        assert!(!back.autosave);
    }
}
