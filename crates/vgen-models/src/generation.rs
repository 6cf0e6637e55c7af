//! Generation request model.

use std::collections::HashMap;

use crate::preset::Preset;

/// Longest title accepted, in characters.
pub const MAX_TITLE_LEN: usize = 500;

/// Title used when neither the request nor its fields provide one.
pub const DEFAULT_TITLE: &str = "Untitled Video";

/// Fields consulted, in order, to derive a title.
const TITLE_SOURCE_FIELDS: &[&str] = &["Product Name", "Topic", "Message"];

/// A user's request to generate one video from a preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub user_id: String,
    pub preset_id: String,
    pub field_values: HashMap<String, String>,
    pub title: Option<String>,
}

impl GenerationRequest {
    pub fn new(
        user_id: impl Into<String>,
        preset_id: impl Into<String>,
        field_values: HashMap<String, String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            preset_id: preset_id.into(),
            field_values,
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Names of preset fields that are absent or blank, in preset order.
    pub fn missing_fields(&self, preset: &Preset) -> Vec<String> {
        preset
            .fields
            .iter()
            .filter(|field| {
                self.field_values
                    .get(field.as_str())
                    .map(|v| v.trim().is_empty())
                    .unwrap_or(true)
            })
            .cloned()
            .collect()
    }

    /// Validate the request against its preset.
    pub fn validate_against(&self, preset: &Preset) -> Result<(), String> {
        let missing = self.missing_fields(preset);
        if !missing.is_empty() {
            return Err(format!("Missing required fields: {}", missing.join(", ")));
        }

        if let Some(title) = &self.title {
            if title.trim().chars().count() > MAX_TITLE_LEN {
                return Err(format!("Title must be at most {} characters", MAX_TITLE_LEN));
            }
        }

        Ok(())
    }

    /// Explicit title, else the first filled title-bearing field the preset
    /// declares, else the default. Derived titles are cut to `MAX_TITLE_LEN`.
    pub fn resolved_title(&self, preset: &Preset) -> String {
        if let Some(title) = self.title.as_deref().map(str::trim) {
            if !title.is_empty() {
                return title.to_string();
            }
        }

        TITLE_SOURCE_FIELDS
            .iter()
            .filter(|field| preset.fields.iter().any(|f| f == *field))
            .filter_map(|field| self.field_values.get(*field))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
            .map(|v| v.chars().take(MAX_TITLE_LEN).collect())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string())
    }
}
