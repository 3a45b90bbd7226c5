//! Session Handoff: passes a document between surfaces through a
//! string key-value store.
//!
//! The key names are a stable contract with existing stores; changing
//! them strands previously saved sessions.

use serde_json::Value;

use crate::error::{Result, SessionError};
use crate::render::EnvironmentPreset;
use crate::svg::VectorDocument;

/// Raw markup of the active document.
pub const KEY_DOCUMENT: &str = "svgData";
/// Display name of the source file.
pub const KEY_FILENAME: &str = "fileName";
/// Last selected environment preset.
pub const KEY_PRESET: &str = "environmentPreset";
/// Whether the user chose to continue on a small-screen device.
pub const KEY_CONTINUE_ON_MOBILE: &str = "continueOnMobile";

/// Fallback display name when the store has a document but no filename.
pub const DEFAULT_FILENAME: &str = "untitled.svg";

/// String key-value persistence, e.g. browser local storage or a file
/// backed map.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// Everything one surface persists for the next one to pick up.
#[derive(Debug, Clone)]
pub struct SessionHandoff {
    pub document: VectorDocument,
    pub preset: Option<EnvironmentPreset>,
    pub continue_on_mobile: bool,
}

impl SessionHandoff {
    /// Reads a handoff from the store.
    ///
    /// A missing or unknown preset falls back to `None`; a missing
    /// filename falls back to [`DEFAULT_FILENAME`]. Only the document
    /// itself is mandatory.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissingDocument`] when no document is
    /// stored.
    pub fn read(store: &dyn KeyValueStore) -> Result<Self> {
        let Some(text) = store.get(KEY_DOCUMENT) else {
            return Err(SessionError::MissingDocument.into());
        };
        let filename = store
            .get(KEY_FILENAME)
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string());

        let preset = store
            .get(KEY_PRESET)
            .and_then(|raw| serde_json::from_value(Value::String(raw)).ok());

        let continue_on_mobile = store
            .get(KEY_CONTINUE_ON_MOBILE)
            .is_some_and(|v| v == "true");

        Ok(Self {
            document: VectorDocument::new(&text, &filename),
            preset,
            continue_on_mobile,
        })
    }

    /// Writes the handoff into the store.
    pub fn write(&self, store: &mut dyn KeyValueStore) {
        store.set(KEY_DOCUMENT, self.document.text());
        store.set(KEY_FILENAME, self.document.filename());
        match self.preset.and_then(|p| serde_json::to_value(p).ok()) {
            Some(Value::String(token)) => store.set(KEY_PRESET, &token),
            _ => store.remove(KEY_PRESET),
        }
        if self.continue_on_mobile {
            store.set(KEY_CONTINUE_ON_MOBILE, "true");
        } else {
            store.remove(KEY_CONTINUE_ON_MOBILE);
        }
    }

    /// Removes every handoff key from the store.
    pub fn clear(store: &mut dyn KeyValueStore) {
        for key in [KEY_DOCUMENT, KEY_FILENAME, KEY_PRESET, KEY_CONTINUE_ON_MOBILE] {
            store.remove(key);
        }
    }
}
