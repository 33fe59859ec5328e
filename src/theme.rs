use serde::{Deserialize, Serialize};

/// Styling a subplot is drawn with. This is the per-spec render object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Theme {
    pub background: String,
    pub fill: String,
    pub fill_opacity: f32,
    pub stroke: String,
    pub stroke_width: f32,
    pub line_color: String,
    pub line_width: f32,
    pub point_color: String,
    pub point_radius: f32,
    pub placeholder_color: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            background: "#FFFFFF".to_string(),
            fill: "#E8E4D8".to_string(),
            fill_opacity: 1.0,
            stroke: "#5C5C5C".to_string(),
            stroke_width: 0.8,
            line_color: "#3A6EA5".to_string(),
            line_width: 1.2,
            point_color: "#B23A48".to_string(),
            point_radius: 2.5,
            placeholder_color: "#D0D0D0".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            background: "#F8FAFF".to_string(),
            fill: "#DCE6F2".to_string(),
            fill_opacity: 0.9,
            stroke: "#7A8AA6".to_string(),
            stroke_width: 0.6,
            line_color: "#1C2430".to_string(),
            line_width: 1.0,
            point_color: "#E4572E".to_string(),
            point_radius: 2.0,
            placeholder_color: "#C7D2E5".to_string(),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "modern" => Some(Self::modern()),
            "classic" | "default" | "base" => Some(Self::classic()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}
