/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the session, the local store and the UI layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Width/height bounds in pixels
pub const DIMENSION_MIN: u32 = 256;
pub const DIMENSION_MAX: u32 = 1024;
pub const DIMENSION_STEP: u32 = 64;

/// Denoising step bounds
pub const STEPS_MIN: u32 = 10;
pub const STEPS_MAX: u32 = 50;

/// Guidance scale bounds
pub const GUIDANCE_MIN: f32 = 1.0;
pub const GUIDANCE_MAX: f32 = 20.0;
pub const GUIDANCE_STEP: f32 = 0.5;

/// Parameters handed to the image-generation boundary
///
/// `Copy`, so every record holds its own snapshot and later edits
/// can never reach back into history.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    /// Output width in pixels (256 to 1024, step 64)
    pub width: u32,

    /// Output height in pixels (256 to 1024, step 64)
    pub height: u32,

    /// Number of denoising steps (10 to 50)
    pub steps: u32,

    /// Prompt guidance scale (1.0 to 20.0, step 0.5)
    pub guidance: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            steps: 20,
            guidance: 7.5,
        }
    }
}

/// A single settings edit coming from one of the sliders
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setting {
    Width(u32),
    Height(u32),
    Steps(u32),
    Guidance(f32),
}

impl GenerationSettings {
    /// Apply one edit, clamped into bounds and snapped to the slider grid
    pub fn apply(&mut self, setting: Setting) {
        match setting {
            Setting::Width(value) => self.width = snap_dimension(value),
            Setting::Height(value) => self.height = snap_dimension(value),
            Setting::Steps(value) => self.steps = value.clamp(STEPS_MIN, STEPS_MAX),
            Setting::Guidance(value) => self.guidance = snap_guidance(value),
        }
    }
}

fn snap_dimension(value: u32) -> u32 {
    let clamped = value.clamp(DIMENSION_MIN, DIMENSION_MAX);
    let offset = clamped - DIMENSION_MIN;
    let steps = (offset + DIMENSION_STEP / 2) / DIMENSION_STEP;
    (DIMENSION_MIN + steps * DIMENSION_STEP).min(DIMENSION_MAX)
}

fn snap_guidance(value: f32) -> f32 {
    if !value.is_finite() {
        return GenerationSettings::default().guidance;
    }
    let snapped = (value / GUIDANCE_STEP).round() * GUIDANCE_STEP;
    snapped.clamp(GUIDANCE_MIN, GUIDANCE_MAX)
}

/// One completed generation result
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeneratedImageRecord {
    /// Time-derived token (e.g., "img_1718000000000")
    pub id: String,
    /// Resolvable image location
    pub url: String,
    /// Prompt that produced the image
    pub prompt: String,
    /// When the generation completed
    pub timestamp: DateTime<Utc>,
    /// Settings in effect when the generation started
    pub settings: GenerationSettings,
}

impl GeneratedImageRecord {
    pub fn new(url: String, prompt: String, settings: GenerationSettings) -> Self {
        let timestamp = Utc::now();
        Self {
            id: format!("img_{}", timestamp.timestamp_millis()),
            url,
            prompt,
            timestamp,
            settings,
        }
    }
}

/// Summary shown in the history panel
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStats {
    pub total: usize,
    pub last_generated: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = GenerationSettings::default();
        assert_eq!(settings.width, 512);
        assert_eq!(settings.height, 512);
        assert_eq!(settings.steps, 20);
        assert_eq!(settings.guidance, 7.5);
    }

    #[test]
    fn test_dimensions_clamp_and_snap() {
        let mut settings = GenerationSettings::default();

        settings.apply(Setting::Width(100));
        assert_eq!(settings.width, 256);

        settings.apply(Setting::Width(4096));
        assert_eq!(settings.width, 1024);

        settings.apply(Setting::Height(700));
        assert_eq!(settings.height, 704);

        settings.apply(Setting::Height(640));
        assert_eq!(settings.height, 640);
    }

    #[test]
    fn test_steps_and_guidance_bounds() {
        let mut settings = GenerationSettings::default();

        settings.apply(Setting::Steps(5));
        assert_eq!(settings.steps, 10);
        settings.apply(Setting::Steps(99));
        assert_eq!(settings.steps, 50);

        settings.apply(Setting::Guidance(7.3));
        assert_eq!(settings.guidance, 7.5);
        settings.apply(Setting::Guidance(0.0));
        assert_eq!(settings.guidance, 1.0);
        settings.apply(Setting::Guidance(f32::NAN));
        assert_eq!(settings.guidance, 7.5);
    }

    #[test]
    fn test_record_json_shape() {
        let record = GeneratedImageRecord::new(
            "https://picsum.photos/512/512?random=1".to_string(),
            "a neon cat".to_string(),
            GenerationSettings::default(),
        );
        let value = serde_json::to_value(&record).unwrap();

        assert!(record.id.starts_with("img_"));
        assert_eq!(value["prompt"], "a neon cat");
        assert_eq!(value["settings"]["width"], 512);
        assert!(value["timestamp"].is_string());
    }
}
