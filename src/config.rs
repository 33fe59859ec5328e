use crate::configuration::DEFAULT_MARGIN;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutOptions {
    /// Canvas width over height.
    pub full_ratio: f64,
    /// Gap between an anchored inset and the canvas edge, as a canvas fraction.
    pub margin: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            full_ratio: 1.0,
            margin: DEFAULT_MARGIN,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: Option<f64>,
    pub height: Option<f64>,
    /// Multiplies the main ratio when deriving a missing output dimension,
    /// leaving room for legends and other chrome.
    pub ratio_scale: f64,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            ratio_scale: 1.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

/// Frame drawn around every inset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorderStyle {
    pub color: String,
    pub width: f32,
    pub fill: Option<String>,
}

impl Default for BorderStyle {
    fn default() -> Self {
        Self {
            color: "#1C2430".to_string(),
            width: 1.5,
            fill: Some("#FFFFFF".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutOptions,
    pub render: RenderConfig,
    pub border: BorderStyle,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    render: Option<RenderConfigFile>,
    border: Option<BorderConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    background: Option<String>,
    fill: Option<String>,
    fill_opacity: Option<f32>,
    stroke: Option<String>,
    stroke_width: Option<f32>,
    line_color: Option<String>,
    line_width: Option<f32>,
    point_color: Option<String>,
    point_radius: Option<f32>,
    placeholder_color: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    full_ratio: Option<f64>,
    margin: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f64>,
    height: Option<f64>,
    ratio_scale: Option<f64>,
    background: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct BorderConfigFile {
    color: Option<String>,
    width: Option<f32>,
    fill: Option<String>,
    no_fill: Option<bool>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = Theme::by_name(theme_name)
            .ok_or_else(|| anyhow::anyhow!("Unknown theme: {theme_name}"))?;
    }

    if let Some(vars) = parsed.theme_variables {
        apply_theme_variables(&mut config.theme, vars);
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.full_ratio {
            config.layout.full_ratio = v;
        }
        if let Some(v) = layout.margin {
            config.layout.margin = v;
        }
    }

    if let Some(render) = parsed.render {
        if render.width.is_some() {
            config.render.width = render.width;
        }
        if render.height.is_some() {
            config.render.height = render.height;
        }
        if let Some(v) = render.ratio_scale {
            config.render.ratio_scale = v;
        }
        if let Some(v) = render.background {
            config.render.background = v;
        }
    }

    if let Some(border) = parsed.border {
        if let Some(v) = border.color {
            config.border.color = v;
        }
        if let Some(v) = border.width {
            config.border.width = v;
        }
        if border.fill.is_some() {
            config.border.fill = border.fill;
        }
        if border.no_fill == Some(true) {
            config.border.fill = None;
        }
    }

    Ok(config)
}

fn apply_theme_variables(theme: &mut Theme, vars: ThemeVariables) {
    if let Some(v) = vars.background {
        theme.background = v;
    }
    if let Some(v) = vars.fill {
        theme.fill = v;
    }
    if let Some(v) = vars.fill_opacity {
        theme.fill_opacity = v;
    }
    if let Some(v) = vars.stroke {
        theme.stroke = v;
    }
    if let Some(v) = vars.stroke_width {
        theme.stroke_width = v;
    }
    if let Some(v) = vars.line_color {
        theme.line_color = v;
    }
    if let Some(v) = vars.line_width {
        theme.line_width = v;
    }
    if let Some(v) = vars.point_color {
        theme.point_color = v;
    }
    if let Some(v) = vars.point_radius {
        theme.point_radius = v;
    }
    if let Some(v) = vars.placeholder_color {
        theme.placeholder_color = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_keeps_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.layout.full_ratio, 1.0);
        assert_eq!(config.layout.margin, DEFAULT_MARGIN);
        assert_eq!(config.theme, Theme::classic());
        assert_eq!(config.render.ratio_scale, 1.0);
    }

    #[test]
    fn overrides_sections() {
        let config = parse_config(
            r##"{
                "theme": "modern",
                "themeVariables": { "fill": "#00FF00", "pointRadius": 4 },
                "layout": { "fullRatio": 1.5 },
                "render": { "width": 900, "ratioScale": 1.2 },
                "border": { "color": "#FF0000", "noFill": true }
            }"##,
        )
        .unwrap();
        assert_eq!(config.theme.fill, "#00FF00");
        assert_eq!(config.theme.point_radius, 4.0);
        assert_eq!(config.theme.stroke, Theme::modern().stroke);
        assert_eq!(config.layout.full_ratio, 1.5);
        assert_eq!(config.render.width, Some(900.0));
        assert_eq!(config.render.height, None);
        assert_eq!(config.render.ratio_scale, 1.2);
        assert_eq!(config.border.color, "#FF0000");
        assert_eq!(config.border.fill, None);
    }

    #[test]
    fn unknown_theme_is_an_error() {
        assert!(parse_config(r#"{ "theme": "neon" }"#).is_err());
    }
}
