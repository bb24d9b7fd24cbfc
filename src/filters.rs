//! Non-destructive filter composition for image layers and the background.
//!
//! A render-time filter is a CSS-style filter string: the named preset first,
//! then the numeric adjustments. Nothing here touches pixels.

use serde::{Serialize, Deserialize};

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSettings {
    /// 0..=200, 100 is neutral.
    pub brightness: f64,
    /// 0..=200, 100 is neutral.
    pub contrast: f64,
    /// 0..=200, 100 is neutral.
    pub saturation: f64,
    /// 0..=20 px.
    pub blur: f64,
    pub preset: String,
    /// 0..=100, only scales single-parameter presets.
    pub intensity: f64,
}

impl Default for FilterSettings {
    fn default() -> Self {
        FilterSettings {
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            blur: 0.0,
            preset: String::new(),
            intensity: 100.0,
        }
    }
}

impl FilterSettings {
    pub fn clamped(&self) -> FilterSettings {
        FilterSettings {
            brightness: self.brightness.clamp(0.0, 200.0),
            contrast: self.contrast.clamp(0.0, 200.0),
            saturation: self.saturation.clamp(0.0, 200.0),
            blur: self.blur.clamp(0.0, 20.0),
            preset: self.preset.clone(),
            intensity: self.intensity.clamp(0.0, 100.0),
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.preset.is_empty()
            && self.brightness == 100.0
            && self.contrast == 100.0
            && self.saturation == 100.0
            && self.blur == 0.0
    }
}

#[derive(Serialize, Clone, Copy, Debug)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Recipe {
    /// One filter function whose amount scales with intensity.
    Scaled { function: &'static str, full: f64, unit: &'static str },
    /// Several functions applied at their declared strength.
    Fixed { filter: &'static str },
}

#[derive(Serialize, Clone, Copy, Debug)]
pub struct FilterPreset {
    pub id: &'static str,
    pub label: &'static str,
    pub recipe: Recipe,
}

pub const FILTER_PRESETS: &[FilterPreset] = &[
    FilterPreset { id: "grayscale", label: "Grayscale", recipe: Recipe::Scaled { function: "grayscale", full: 1.0, unit: "" } },
    FilterPreset { id: "sepia", label: "Sepia", recipe: Recipe::Scaled { function: "sepia", full: 1.0, unit: "" } },
    FilterPreset { id: "invert", label: "Invert", recipe: Recipe::Scaled { function: "invert", full: 1.0, unit: "" } },
    FilterPreset { id: "blur-soft", label: "Soft Focus", recipe: Recipe::Scaled { function: "blur", full: 2.0, unit: "px" } },
    FilterPreset { id: "vivid", label: "Vivid", recipe: Recipe::Fixed { filter: "contrast(1.2) saturate(1.4) brightness(1.05)" } },
    FilterPreset { id: "dramatic", label: "Dramatic", recipe: Recipe::Fixed { filter: "contrast(1.5) saturate(0.8) brightness(0.9)" } },
    FilterPreset { id: "fade", label: "Fade", recipe: Recipe::Fixed { filter: "contrast(0.85) saturate(0.7) brightness(1.1)" } },
    FilterPreset { id: "warm", label: "Warm", recipe: Recipe::Fixed { filter: "sepia(0.3) saturate(1.3) brightness(1.05)" } },
    FilterPreset { id: "cool", label: "Cool", recipe: Recipe::Fixed { filter: "hue-rotate(15deg) saturate(0.9) contrast(1.05)" } },
    FilterPreset { id: "vintage", label: "Vintage", recipe: Recipe::Fixed { filter: "sepia(0.5) contrast(1.1) brightness(0.95)" } },
];

pub fn find_preset(id: &str) -> Option<&'static FilterPreset> {
    FILTER_PRESETS.iter().find(|p| p.id == id)
}

/// Filter string for a named preset. Intensity (0..=100) only affects
/// single-parameter presets; combination presets always apply in full.
pub fn preset_filter(preset: &str, intensity: f64) -> String {
    if preset.is_empty() {
        return String::new();
    }
    match find_preset(preset) {
        Some(FilterPreset { recipe: Recipe::Scaled { function, full, unit }, .. }) => {
            let amount = full * intensity.clamp(0.0, 100.0) / 100.0;
            format!("{}({}{})", function, amount, unit)
        }
        Some(FilterPreset { recipe: Recipe::Fixed { filter }, .. }) => filter.to_string(),
        None => {
            log::debug!("unknown filter preset {:?}", preset);
            String::new()
        }
    }
}

pub fn adjustment_filter(brightness: f64, contrast: f64, saturation: f64, blur: f64) -> String {
    format!(
        "brightness({}%) contrast({}%) saturate({}%) blur({}px)",
        brightness, contrast, saturation, blur
    )
}

/// The complete filter for a layer or background, preset first.
pub fn compose_filter(settings: &FilterSettings) -> String {
    let s = settings.clamped();
    let preset = preset_filter(&s.preset, s.intensity);
    let adjustments = adjustment_filter(s.brightness, s.contrast, s.saturation, s.blur);
    format!("{} {}", preset, adjustments).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_preset_yields_adjustments_only() {
        assert_eq!(preset_filter("", 100.0), "");
        assert_eq!(
            compose_filter(&FilterSettings::default()),
            "brightness(100%) contrast(100%) saturate(100%) blur(0px)"
        );
    }

    #[test]
    fn single_parameter_presets_scale_with_intensity() {
        assert_eq!(preset_filter("grayscale", 50.0), "grayscale(0.5)");
        assert_eq!(preset_filter("sepia", 100.0), "sepia(1)");
        assert_eq!(preset_filter("blur-soft", 50.0), "blur(1px)");
        assert_eq!(preset_filter("invert", 0.0), "invert(0)");
    }

    #[test]
    fn combination_presets_ignore_intensity() {
        assert_eq!(preset_filter("vivid", 10.0), preset_filter("vivid", 100.0));
        assert_eq!(preset_filter("dramatic", 0.0), "contrast(1.5) saturate(0.8) brightness(0.9)");
    }

    #[test]
    fn unknown_preset_is_dropped() {
        assert_eq!(preset_filter("lomo", 100.0), "");
    }

    #[test]
    fn composed_filter_puts_preset_first_and_clamps() {
        let settings = FilterSettings {
            brightness: 250.0,
            contrast: 80.0,
            saturation: 120.0,
            blur: 40.0,
            preset: "grayscale".into(),
            intensity: 50.0,
        };
        assert_eq!(
            compose_filter(&settings),
            "grayscale(0.5) brightness(200%) contrast(80%) saturate(120%) blur(20px)"
        );
    }

    #[test]
    fn neutral_detection() {
        assert!(FilterSettings::default().is_neutral());
        let tinted = FilterSettings { preset: "sepia".into(), ..Default::default() };
        assert!(!tinted.is_neutral());
    }
}
