//! Prompt construction for the generation provider.
//!
//! `build_prompt` is pure: the same preset and field values always produce
//! the same text.

use std::collections::HashMap;

use crate::preset::Preset;

const NAME_FIELDS: &[&str] = &["product name", "name", "brand name", "company name", "business name"];
const HEADLINE_FIELDS: &[&str] = &["headline", "title", "tagline"];
const COLOR_FIELDS: &[&str] = &["color", "colors", "brand color", "primary color"];

/// Expand a known style key into a richer visual direction.
fn style_clause(style: &str) -> String {
    let enhanced = match style.trim().to_lowercase().as_str() {
        "modern" => Some("modern and sleek, with clean lines and smooth transitions"),
        "energetic" => Some("energetic and fast-paced, with dynamic cuts and bold motion"),
        "minimal" => Some("minimal and uncluttered, with plenty of negative space and subtle motion"),
        "cinematic" => Some("cinematic, with dramatic lighting, shallow depth of field and sweeping camera moves"),
        "playful" => Some("playful and colorful, with bouncy animation and a lighthearted tone"),
        "corporate" => Some("professional and polished, with a trustworthy corporate look"),
        "elegant" => Some("elegant and refined, with soft lighting and graceful movement"),
        _ => None,
    };

    match enhanced {
        Some(text) => format!("Style: {}.", text),
        None => format!("Style: {}.", style.trim()),
    }
}

fn field_clause(field: &str, value: &str) -> String {
    let key = field.trim().to_lowercase();
    if NAME_FIELDS.contains(&key.as_str()) {
        format!("Feature the name \"{}\" prominently.", value)
    } else if HEADLINE_FIELDS.contains(&key.as_str()) {
        format!("Display the headline \"{}\" as on-screen text.", value)
    } else if COLOR_FIELDS.contains(&key.as_str()) {
        format!("Use {} as the dominant color.", value)
    } else {
        format!("{}: {}.", field, value)
    }
}

/// Assemble the provider prompt for a preset and the user's field values.
///
/// Fields are emitted in the preset's declared order. Blank values and
/// values for fields the preset does not declare are left out.
pub fn build_prompt(preset: &Preset, field_values: &HashMap<String, String>) -> String {
    let mut parts = vec![
        format!(
            "Generate a {} second {} video.",
            preset.duration, preset.orientation
        ),
        style_clause(&preset.style),
    ];

    let description = preset.description.trim();
    if !description.is_empty() {
        parts.push(format!("Description: {}.", description.trim_end_matches('.')));
    }

    for field in &preset.fields {
        let Some(value) = field_values.get(field) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        parts.push(field_clause(field, value));
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::{Orientation, PresetCatalog};

    fn promo() -> Preset {
        Preset {
            id: "promo".to_string(),
            name: "Promo".to_string(),
            description: "Product showcase".to_string(),
            fields: vec!["Product Name".to_string()],
            orientation: Orientation::Landscape,
            duration: 8,
            style: "modern".to_string(),
        }
    }

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_promo_prompt_mentions_name_and_orientation() {
        let prompt = build_prompt(&promo(), &values(&[("Product Name", "Acme Widget")]));
        assert!(prompt.contains("Acme Widget"));
        assert!(prompt.contains("landscape"));
        assert!(prompt.starts_with("Generate a 8 second landscape video."));
    }

    #[test]
    fn test_deterministic_for_all_presets() {
        let catalog = PresetCatalog::embedded().unwrap();
        for preset in catalog.all() {
            let fields: HashMap<String, String> = preset
                .fields
                .iter()
                .map(|f| (f.clone(), format!("value for {}", f)))
                .collect();
            let a = build_prompt(preset, &fields);
            let b = build_prompt(preset, &fields.clone());
            assert_eq!(a, b, "prompt for {} changed between calls", preset.id);
            assert!(!a.is_empty());
        }
    }

    #[test]
    fn test_blank_values_are_skipped() {
        let mut preset = promo();
        preset.fields.push("Key Feature".to_string());
        let prompt = build_prompt(
            &preset,
            &values(&[("Product Name", "Acme"), ("Key Feature", "   ")]),
        );
        assert!(!prompt.contains("Key Feature"));
        assert!(prompt.contains("Acme"));
    }

    #[test]
    fn test_undeclared_fields_are_ignored() {
        let prompt = build_prompt(
            &promo(),
            &values(&[("Product Name", "Acme"), ("Injected", "ignore me")]),
        );
        assert!(!prompt.contains("ignore me"));
    }

    #[test]
    fn test_field_order_follows_preset() {
        let mut preset = promo();
        preset.fields = vec!["Topic".to_string(), "Message".to_string()];
        let prompt = build_prompt(
            &preset,
            &values(&[("Message", "second"), ("Topic", "first")]),
        );
        let topic = prompt.find("Topic: first.").unwrap();
        let message = prompt.find("Message: second.").unwrap();
        assert!(topic < message);
    }

    #[test]
    fn test_specialized_clauses() {
        let mut preset = promo();
        preset.fields = vec![
            "Brand Name".to_string(),
            "Headline".to_string(),
            "Brand Color".to_string(),
        ];
        let prompt = build_prompt(
            &preset,
            &values(&[
                ("Brand Name", "Northwind"),
                ("Headline", "Fresh every day"),
                ("Brand Color", "teal"),
            ]),
        );
        assert!(prompt.contains("Feature the name \"Northwind\" prominently."));
        assert!(prompt.contains("Display the headline \"Fresh every day\" as on-screen text."));
        assert!(prompt.contains("Use teal as the dominant color."));
    }

    #[test]
    fn test_unknown_style_falls_back_to_raw() {
        let mut preset = promo();
        preset.style = "retro vaporwave".to_string();
        let prompt = build_prompt(&preset, &HashMap::new());
        assert!(prompt.contains("Style: retro vaporwave."));
    }

    #[test]
    fn test_known_style_is_enhanced() {
        let prompt = build_prompt(&promo(), &HashMap::new());
        assert!(prompt.contains("Style: modern and sleek"));
    }
}
