//! Boundaries to the host: key-value persistence, the asset store, the
//! notification surface, and upload validation.

use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use serde_json::Value;
use kurbo::Vec2;
use crate::config::EditorConfig;
use crate::error::{Result, StudioError};
use crate::objects::{Background, Layer};
use crate::types::{ArtboardPreset, BrushState, Severity, Tool};

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

/// `window.localStorage`. Storage failures (quota, private mode) are
/// logged and otherwise ignored.
pub struct LocalStorageStore;

impl LocalStorageStore {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok()?
    }
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok()?
    }

    fn set(&mut self, key: &str, value: &str) {
        match Self::storage() {
            Some(storage) => {
                if let Err(e) = storage.set_item(key, value) {
                    log::warn!("localStorage write failed: {:?}", e);
                }
            }
            None => log::warn!("localStorage unavailable"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct AssetEntry {
    pub name: String,
    pub url: String,
}

/// Remote object store for uploaded images. The editor only ever keeps the
/// returned URL.
pub trait AssetStore {
    fn list(&self, folder: &str) -> Result<Vec<AssetEntry>>;
    fn upload(&mut self, bytes: &[u8], name: &str) -> Result<String>;
}

pub trait Notifier {
    fn notify(&mut self, message: &str, severity: Severity);
}

/// A file picked by the user, before it reaches the asset store.
#[derive(Clone, Debug)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

pub fn validate_upload(size: u64, mime_type: &str, config: &EditorConfig) -> Result<()> {
    if !config.allowed_mime_types.iter().any(|m| m == mime_type) {
        return Err(StudioError::UnsupportedFileType(mime_type.to_string()));
    }
    if size > config.max_upload_bytes {
        return Err(StudioError::FileTooLarge { size, max: config.max_upload_bytes });
    }
    Ok(())
}

/// The persisted editor blob, stored as JSON under one key.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<Layer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brush: Option<BrushState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_tool: Option<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pan_offset: Option<Vec2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_preset: Option<ArtboardPreset>,
}

impl PersistedState {
    /// Parse leniently: every field is decoded on its own and a field that
    /// is missing or malformed is left as `None`. An unparsable blob yields
    /// the empty state.
    pub fn parse(json: &str) -> PersistedState {
        let value: Value = match serde_json::from_str(json) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("ignoring unparsable editor state: {}", e);
                return PersistedState::default();
            }
        };
        let Value::Object(map) = value else {
            log::warn!("ignoring editor state that is not an object");
            return PersistedState::default();
        };
        fn field<T: serde::de::DeserializeOwned>(map: &serde_json::Map<String, Value>, key: &str) -> Option<T> {
            let raw = map.get(key)?.clone();
            match serde_json::from_value(raw) {
                Ok(v) => Some(v),
                Err(e) => {
                    log::warn!("ignoring persisted field {}: {}", key, e);
                    None
                }
            }
        }
        PersistedState {
            layers: field(&map, "layers"),
            background: field(&map, "background"),
            brush: field(&map, "brush"),
            active_tool: field(&map, "activeTool"),
            zoom: field(&map, "zoom"),
            pan_offset: field(&map, "panOffset"),
            active_preset: field(&map, "activePreset"),
        }
    }

    pub fn load(store: &dyn KeyValueStore, key: &str) -> PersistedState {
        match store.get(key) {
            Some(json) => PersistedState::parse(&json),
            None => PersistedState::default(),
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore, key: &str) -> Result<()> {
        let json = serde_json::to_string(self)?;
        store.set(key, &json);
        Ok(())
    }
}
