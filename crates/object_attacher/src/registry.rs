//! Object Registry - статические descriptors для attachable props
//!
//! # Архитектура
//!
//! **ObjectDescriptor** - immutable blueprint (model + bone + offsets):
//! - Хранится в `ObjectRegistry` resource (HashMap lookup по имени)
//! - Загружается один раз при старте из JSON
//!
//! # Формат файла
//!
//! ```json
//! {
//!   "beer": {
//!     "objectName": "prop_cs_beer_bot_01",
//!     "boneId": 57005,
//!     "position": { "x": 0.13, "y": -0.12, "z": -0.05 },
//!     "rotation": { "x": 100.0, "y": -220.0, "z": 180.0 }
//!   }
//! }
//! ```
//!
//! Тот же формат уходит в debug view (`setRegisteredObjects`).

use crate::host::AttachOffsets;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// 3D offset в формате registry файла (`{x, y, z}`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Offset3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Offset3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<Offset3> for Vec3 {
    fn from(offset: Offset3) -> Self {
        Vec3::new(offset.x, offset.y, offset.z)
    }
}

impl From<Vec3> for Offset3 {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Static descriptor одного attachable объекта
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDescriptor {
    /// Unique key в registry
    pub name: String,
    /// Имя модели для движка
    pub model: String,
    pub bone_id: i32,
    pub position: Vec3,
    /// Градусы
    pub rotation: Vec3,
}

impl ObjectDescriptor {
    pub fn offsets(&self) -> AttachOffsets {
        AttachOffsets {
            position: self.position,
            rotation: self.rotation,
        }
    }
}

/// Одна запись в registry файле
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryEntry {
    /// Отсутствует → model = ключ записи
    #[serde(default, skip_serializing_if = "Option::is_none")]
    object_name: Option<String>,
    bone_id: i32,
    #[serde(default)]
    position: Offset3,
    #[serde(default)]
    rotation: Offset3,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read object registry {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid object registry JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("registry entry `{0}` has an empty model name")]
    EmptyModel(String),
}

/// Resource: name → ObjectDescriptor
#[derive(Resource, Debug, Clone, Default)]
pub struct ObjectRegistry {
    objects: BTreeMap<String, ObjectDescriptor>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, descriptor: ObjectDescriptor) {
        self.objects.insert(descriptor.name.clone(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&ObjectDescriptor> {
        self.objects.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let entries: BTreeMap<String, RegistryEntry> = serde_json::from_str(json)?;
        let mut registry = Self::new();

        for (name, entry) in entries {
            let model = entry.object_name.unwrap_or_else(|| name.clone());
            if model.trim().is_empty() {
                return Err(RegistryError::EmptyModel(name));
            }

            registry.add(ObjectDescriptor {
                name,
                model,
                bone_id: entry.bone_id,
                position: entry.position.into(),
                rotation: entry.rotation.into(),
            });
        }

        Ok(registry)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Registry в исходном формате (payload для debug view)
    pub fn to_json(&self) -> serde_json::Value {
        let entries: BTreeMap<&str, RegistryEntry> = self
            .objects
            .iter()
            .map(|(name, descriptor)| {
                (
                    name.as_str(),
                    RegistryEntry {
                        object_name: Some(descriptor.model.clone()),
                        bone_id: descriptor.bone_id,
                        position: descriptor.position.into(),
                        rotation: descriptor.rotation.into(),
                    },
                )
            })
            .collect();

        serde_json::to_value(entries).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "beer": {
            "objectName": "prop_cs_beer_bot_01",
            "boneId": 57005,
            "position": { "x": 0.13, "y": -0.12, "z": -0.05 },
            "rotation": { "x": 100.0, "y": -220.0, "z": 180.0 }
        },
        "prop_cap": { "boneId": 31086 }
    }"#;

    #[test]
    fn test_registry_parses_original_format() {
        let registry = ObjectRegistry::from_json_str(SAMPLE).unwrap();
        assert_eq!(registry.len(), 2);

        let beer = registry.get("beer").unwrap();
        assert_eq!(beer.model, "prop_cs_beer_bot_01");
        assert_eq!(beer.bone_id, 57005);
        assert_eq!(beer.position, Vec3::new(0.13, -0.12, -0.05));
        assert_eq!(beer.rotation, Vec3::new(100.0, -220.0, 180.0));
    }

    #[test]
    fn test_missing_object_name_falls_back_to_key() {
        let registry = ObjectRegistry::from_json_str(SAMPLE).unwrap();
        let cap = registry.get("prop_cap").unwrap();

        assert_eq!(cap.model, "prop_cap");
        assert_eq!(cap.position, Vec3::ZERO);
    }

    #[test]
    fn test_empty_model_rejected() {
        let json = r#"{ "broken": { "objectName": " ", "boneId": 1 } }"#;
        assert!(matches!(
            ObjectRegistry::from_json_str(json),
            Err(RegistryError::EmptyModel(name)) if name == "broken"
        ));
    }

    #[test]
    fn test_to_json_keeps_original_shape() {
        let registry = ObjectRegistry::from_json_str(SAMPLE).unwrap();
        let json = registry.to_json();

        assert_eq!(json["beer"]["objectName"], "prop_cs_beer_bot_01");
        assert_eq!(json["beer"]["boneId"], 57005);
        assert_eq!(json["prop_cap"]["objectName"], "prop_cap");
    }
}
