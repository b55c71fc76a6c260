use serde::{Deserialize, Serialize};

use crate::net::messages::MAX_COLOR_LEN;

/// Body, eye and pupil colors of a fish, as CSS hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FishColors {
    pub color: String,
    pub eye_color: String,
    pub pupil_color: String,
}

impl Default for FishColors {
    fn default() -> Self {
        Self::from_palette(0)
    }
}

impl FishColors {
    /// Predefined body colors.
    pub const PALETTE: &[&str] = &[
        "#ff5757", // Red
        "#4ecdc4", // Teal
        "#ffc312", // Yellow
        "#8258ff", // Purple
        "#2ed573", // Green
        "#ff944d", // Orange
        "#5398ff", // Blue
        "#ff6baf", // Pink
    ];

    pub fn from_palette(index: usize) -> Self {
        Self {
            color: Self::PALETTE[index % Self::PALETTE.len()].to_string(),
            eye_color: "#ffffff".to_string(),
            pupil_color: "#000000".to_string(),
        }
    }
}

/// Trim and bound a display name. Empty names become `"Fish"`.
pub fn sanitize_name(name: &str, max_len: usize) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(max_len)
        .collect();
    if cleaned.is_empty() {
        "Fish".to_string()
    } else {
        cleaned
    }
}

/// Client-supplied color: control characters stripped and bounded to
/// `MAX_COLOR_LEN`. Blank values fall back to `fallback`.
pub fn sanitize_color(value: &str, fallback: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_COLOR_LEN)
        .collect();
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}
