//! Video presets and the preset catalog.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Catalog bundled into the binary.
const EMBEDDED_PRESETS: &str = include_str!("../data/presets.json");

/// Target frame orientation of a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[serde(alias = "horizontal")]
    Landscape,
    #[serde(alias = "vertical")]
    Portrait,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }

    /// Aspect ratio string understood by the generation provider.
    pub fn aspect_ratio(&self) -> &'static str {
        match self {
            Orientation::Landscape => "16:9",
            Orientation::Portrait => "9:16",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A video template: fixed orientation, duration, style and the text
/// fields a user must fill in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Preset {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Required field names, in display and prompt order.
    pub fields: Vec<String>,
    pub orientation: Orientation,
    /// Target length in seconds.
    pub duration: u32,
    pub style: String,
}

/// Errors raised while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read preset file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse presets: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid preset catalog: {0}")]
    Invalid(String),
}

impl CatalogError {
    fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Immutable lookup of presets, loaded once at startup.
#[derive(Debug, Clone)]
pub struct PresetCatalog {
    presets: Vec<Preset>,
}

impl PresetCatalog {
    /// Build a catalog from already-parsed presets.
    pub fn new(presets: Vec<Preset>) -> Result<Self, CatalogError> {
        Self::check(&presets)?;
        Ok(Self { presets })
    }

    /// Catalog compiled into the crate.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(EMBEDDED_PRESETS)
    }

    /// Parse a JSON array of presets.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let presets: Vec<Preset> = serde_json::from_str(json)?;
        Self::new(presets)
    }

    /// Load a catalog from a JSON file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Load from `PRESETS_PATH` when set, otherwise the embedded catalog.
    pub fn from_env() -> Result<Self, CatalogError> {
        match std::env::var("PRESETS_PATH") {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim()),
            _ => Self::embedded(),
        }
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id == id)
    }

    /// All presets in catalog order.
    pub fn all(&self) -> &[Preset] {
        &self.presets
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    fn check(presets: &[Preset]) -> Result<(), CatalogError> {
        if presets.is_empty() {
            return Err(CatalogError::invalid("catalog contains no presets"));
        }

        let mut ids = HashSet::new();
        for preset in presets {
            if preset.id.trim().is_empty() {
                return Err(CatalogError::invalid("preset id cannot be empty"));
            }
            if !ids.insert(preset.id.as_str()) {
                return Err(CatalogError::invalid(format!("duplicate preset id '{}'", preset.id)));
            }
            if preset.name.trim().is_empty() {
                return Err(CatalogError::invalid(format!("preset '{}' has no name", preset.id)));
            }
            if preset.duration == 0 {
                return Err(CatalogError::invalid(format!(
                    "preset '{}' must have a positive duration",
                    preset.id
                )));
            }

            let mut fields = HashSet::new();
            for field in &preset.fields {
                if field.trim().is_empty() {
                    return Err(CatalogError::invalid(format!(
                        "preset '{}' has an empty field name",
                        preset.id
                    )));
                }
                if !fields.insert(field.as_str()) {
                    return Err(CatalogError::invalid(format!(
                        "preset '{}' declares field '{}' twice",
                        preset.id, field
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn preset(id: &str) -> Preset {
        Preset {
            id: id.to_string(),
            name: "Test".to_string(),
            description: "A test preset".to_string(),
            fields: vec!["Product Name".to_string()],
            orientation: Orientation::Landscape,
            duration: 8,
            style: "modern".to_string(),
        }
    }

    #[test]
    fn test_embedded_catalog_loads() {
        let catalog = PresetCatalog::embedded().unwrap();
        assert!(!catalog.is_empty());
        let promo = catalog.find_by_id("promo").unwrap();
        assert_eq!(promo.orientation, Orientation::Landscape);
        assert_eq!(promo.duration, 8);
        assert_eq!(promo.fields[0], "Product Name");
    }

    #[test]
    fn test_find_unknown_preset() {
        let catalog = PresetCatalog::embedded().unwrap();
        assert!(catalog.find_by_id("does-not-exist").is_none());
        assert!(catalog.find_by_id("").is_none());
    }

    #[test]
    fn test_orientation_aliases() {
        let o: Orientation = serde_json::from_str("\"vertical\"").unwrap();
        assert_eq!(o, Orientation::Portrait);
        let o: Orientation = serde_json::from_str("\"horizontal\"").unwrap();
        assert_eq!(o, Orientation::Landscape);
        assert_eq!(Orientation::Portrait.aspect_ratio(), "9:16");
        assert_eq!(Orientation::Landscape.aspect_ratio(), "16:9");
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let err = PresetCatalog::new(vec![preset("a"), preset("a")]).unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(_)));
    }

    #[test]
    fn test_rejects_zero_duration() {
        let mut p = preset("a");
        p.duration = 0;
        assert!(PresetCatalog::new(vec![p]).is_err());
    }

    #[test]
    fn test_rejects_blank_and_duplicate_fields() {
        let mut p = preset("a");
        p.fields = vec!["  ".to_string()];
        assert!(PresetCatalog::new(vec![p]).is_err());

        let mut p = preset("b");
        p.fields = vec!["Topic".to_string(), "Topic".to_string()];
        assert!(PresetCatalog::new(vec![p]).is_err());
    }

    #[test]
    fn test_rejects_empty_catalog() {
        assert!(PresetCatalog::new(vec![]).is_err());
        assert!(PresetCatalog::from_json("[]").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":"x","name":"X","description":"d","fields":["Topic"],"orientation":"vertical","duration":5,"style":"minimal"}}]"#
        )
        .unwrap();

        let catalog = PresetCatalog::from_file(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.find_by_id("x").unwrap().orientation, Orientation::Portrait);
    }

    #[test]
    fn test_from_missing_file() {
        let err = PresetCatalog::from_file("/nonexistent/presets.json").unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
