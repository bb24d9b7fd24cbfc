use serde::{Serialize, Deserialize};

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Select,
    Text,
    Brush,
    Eraser,
    Line,
    Pan,
}

impl Tool {
    pub fn parse(name: &str) -> Option<Tool> {
        match name {
            "select" => Some(Tool::Select),
            "text" => Some(Tool::Text),
            "brush" => Some(Tool::Brush),
            "eraser" => Some(Tool::Eraser),
            "line" => Some(Tool::Line),
            "pan" => Some(Tool::Pan),
            _ => None,
        }
    }

    pub fn is_drawing(self) -> bool {
        matches!(self, Tool::Brush | Tool::Eraser | Tool::Line)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum HandleType {
    TopLeft, TopRight, BottomLeft, BottomRight,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

impl PointerButton {
    /// DOM `MouseEvent.button` numbering.
    pub fn from_dom(button: i16) -> PointerButton {
        match button {
            1 => PointerButton::Middle,
            2 => PointerButton::Secondary,
            _ => PointerButton::Primary,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { shift: false, ctrl: false, meta: false, alt: false };
    pub const SHIFT: Modifiers = Modifiers { shift: true, ctrl: false, meta: false, alt: false };

    /// Ctrl on Windows/Linux, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct Artboard {
    pub width: f64,
    pub height: f64,
}

impl Artboard {
    pub fn center(&self) -> kurbo::Point {
        kurbo::Point::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn contains(&self, p: kurbo::Point) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x <= self.width && p.y <= self.height
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ArtboardPreset {
    pub id: String,
    pub label: String,
    pub width: f64,
    pub height: f64,
    pub platform: String,
}

impl ArtboardPreset {
    fn new(id: &str, label: &str, width: f64, height: f64, platform: &str) -> Self {
        ArtboardPreset {
            id: id.to_string(),
            label: label.to_string(),
            width,
            height,
            platform: platform.to_string(),
        }
    }

    pub fn custom(width: f64, height: f64) -> Self {
        ArtboardPreset::new("custom", "Custom", width.max(1.0), height.max(1.0), "custom")
    }

    pub fn artboard(&self) -> Artboard {
        Artboard { width: self.width, height: self.height }
    }

    /// Built-in size presets. The first entry is the default.
    pub fn catalogue() -> Vec<ArtboardPreset> {
        vec![
            ArtboardPreset::new("instagram-post", "Instagram Post", 1080.0, 1080.0, "instagram"),
            ArtboardPreset::new("instagram-story", "Instagram Story", 1080.0, 1920.0, "instagram"),
            ArtboardPreset::new("facebook-post", "Facebook Post", 1200.0, 630.0, "facebook"),
            ArtboardPreset::new("x-post", "X Post", 1600.0, 900.0, "x"),
            ArtboardPreset::new("linkedin-post", "LinkedIn Post", 1200.0, 627.0, "linkedin"),
            ArtboardPreset::new("youtube-thumbnail", "YouTube Thumbnail", 1280.0, 720.0, "youtube"),
            ArtboardPreset::new("pinterest-pin", "Pinterest Pin", 1000.0, 1500.0, "pinterest"),
        ]
    }

    pub fn find(id: &str) -> Option<ArtboardPreset> {
        ArtboardPreset::catalogue().into_iter().find(|p| p.id == id)
    }
}

impl Default for ArtboardPreset {
    fn default() -> Self {
        ArtboardPreset::new("instagram-post", "Instagram Post", 1080.0, 1080.0, "instagram")
    }
}

/// Brush settings captured into every new stroke.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(default)]
pub struct BrushState {
    pub color: String,
    pub size: f64,
    pub opacity: f64,
    pub blur: f64,
}

impl Default for BrushState {
    fn default() -> Self {
        BrushState {
            color: "#000000".to_string(),
            size: 10.0,
            opacity: 1.0,
            blur: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_round_trip_through_serde() {
        assert_eq!(serde_json::to_string(&Tool::Eraser).unwrap(), "\"eraser\"");
        assert_eq!(Tool::parse("line"), Some(Tool::Line));
        assert_eq!(Tool::parse("lasso"), None);
    }

    #[test]
    fn default_preset_is_first_in_catalogue() {
        assert_eq!(ArtboardPreset::catalogue()[0], ArtboardPreset::default());
        assert_eq!(ArtboardPreset::find("x-post").map(|p| p.width), Some(1600.0));
    }

    #[test]
    fn custom_preset_rejects_degenerate_sizes() {
        let p = ArtboardPreset::custom(0.0, 500.0);
        assert_eq!(p.width, 1.0);
        assert_eq!(p.height, 500.0);
    }
}
