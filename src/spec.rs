use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::bbox::{BoundingBox, PartialBox};
use crate::error::{self, Advisory, InsetError, Result};
use crate::theme::Theme;

static POSITION_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s,_-]+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VAlign {
    Bottom,
    Center,
    Top,
}

/// Symbolic on-canvas anchor, resolved independently per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Anchor {
    pub horizontal: HAlign,
    pub vertical: VAlign,
}

impl Anchor {
    pub const fn new(horizontal: HAlign, vertical: VAlign) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    /// Parse strings like `"left bottom"`, `"top-right"` or `"center"`.
    ///
    /// Tokens are case-insensitive. Two tokens may come in either order as
    /// long as the reading is unambiguous; `center` fills whichever axis the
    /// other token does not name.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || InsetError::InvalidPosition(input.to_string());
        let lowered = input.trim().to_ascii_lowercase();
        let tokens: Vec<&str> = POSITION_TOKEN_RE
            .split(&lowered)
            .filter(|t| !t.is_empty())
            .collect();

        match tokens.as_slice() {
            ["center"] => Ok(Self::new(HAlign::Center, VAlign::Center)),
            [first, second] => {
                if let (Some(h), Some(v)) = (h_token(first), v_token(second)) {
                    return Ok(Self::new(h, v));
                }
                // "top left": vertical word first.
                match (v_token(first), h_token(second)) {
                    (Some(v), Some(h)) => Ok(Self::new(h, v)),
                    _ => Err(invalid()),
                }
            }
            _ => Err(invalid()),
        }
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Self::new(HAlign::Left, VAlign::Bottom)
    }
}

fn h_token(token: &str) -> Option<HAlign> {
    match token {
        "left" => Some(HAlign::Left),
        "center" | "centre" => Some(HAlign::Center),
        "right" => Some(HAlign::Right),
        _ => None,
    }
}

fn v_token(token: &str) -> Option<VAlign> {
    match token {
        "bottom" => Some(VAlign::Bottom),
        "center" | "centre" => Some(VAlign::Center),
        "top" => Some(VAlign::Top),
        _ => None,
    }
}

/// Where an inset sits on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    Anchor(Anchor),
    /// Bottom-left corner in normalized canvas coordinates.
    Explicit { left: f64, bottom: f64 },
}

impl Default for Position {
    fn default() -> Self {
        Position::Anchor(Anchor::default())
    }
}

/// How an inset's on-canvas size is derived. Chosen once at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeMode {
    Width(f64),
    Height(f64),
    /// Both dimensions kept literally, even when that distorts the inset.
    Both { width: f64, height: f64 },
    ScaleFactor(f64),
}

impl Default for SizeMode {
    fn default() -> Self {
        SizeMode::ScaleFactor(1.0)
    }
}

/// Declarative description of one subplot, validated at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SubplotSpec {
    requested_bbox: PartialBox,
    is_main: bool,
    position: Position,
    size: SizeMode,
    theme: Option<Theme>,
    advisories: Vec<Advisory>,
}

impl SubplotSpec {
    /// The main subplot. Its bbox is always the overall extent and it
    /// always fills the canvas.
    pub fn main() -> SubplotSpecBuilder {
        SubplotSpecBuilder {
            is_main: true,
            ..SubplotSpecBuilder::default()
        }
    }

    pub fn inset() -> SubplotSpecBuilder {
        SubplotSpecBuilder::default()
    }

    pub fn requested_bbox(&self) -> &PartialBox {
        &self.requested_bbox
    }

    pub fn is_main(&self) -> bool {
        self.is_main
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn size(&self) -> SizeMode {
        self.size
    }

    /// Per-spec render object override.
    pub fn theme(&self) -> Option<&Theme> {
        self.theme.as_ref()
    }

    /// Non-fatal notices raised while validating this spec.
    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubplotSpecBuilder {
    bbox: PartialBox,
    is_main: bool,
    position: Option<String>,
    anchor: Option<Anchor>,
    loc_left: Option<f64>,
    loc_bottom: Option<f64>,
    width: Option<f64>,
    height: Option<f64>,
    scale_factor: Option<f64>,
    theme: Option<Theme>,
}

impl SubplotSpecBuilder {
    pub fn xmin(mut self, value: f64) -> Self {
        self.bbox.xmin = Some(value);
        self
    }

    pub fn xmax(mut self, value: f64) -> Self {
        self.bbox.xmax = Some(value);
        self
    }

    pub fn ymin(mut self, value: f64) -> Self {
        self.bbox.ymin = Some(value);
        self
    }

    pub fn ymax(mut self, value: f64) -> Self {
        self.bbox.ymax = Some(value);
        self
    }

    pub fn bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = bbox.into();
        self
    }

    pub fn partial_bbox(mut self, bbox: PartialBox) -> Self {
        self.bbox = bbox;
        self
    }

    /// Symbolic position string, parsed when the spec is built.
    pub fn position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn loc(mut self, left: f64, bottom: f64) -> Self {
        self.loc_left = Some(left);
        self.loc_bottom = Some(bottom);
        self
    }

    pub fn loc_left(mut self, left: f64) -> Self {
        self.loc_left = Some(left);
        self
    }

    pub fn loc_bottom(mut self, bottom: f64) -> Self {
        self.loc_bottom = Some(bottom);
        self
    }

    pub fn width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    pub fn scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = Some(scale_factor);
        self
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn build(self) -> Result<SubplotSpec> {
        self.bbox.validate()?;

        if self.is_main {
            // Position, size and bbox are fixed for the main subplot.
            return Ok(SubplotSpec {
                requested_bbox: PartialBox::pending(),
                is_main: true,
                position: Position::Explicit {
                    left: 0.0,
                    bottom: 0.0,
                },
                size: SizeMode::Both {
                    width: 1.0,
                    height: 1.0,
                },
                theme: self.theme,
                advisories: Vec::new(),
            });
        }

        let position = self.resolve_position()?;
        let mut advisories = Vec::new();
        let size = self.resolve_size(&mut advisories)?;
        for advisory in &advisories {
            error::emit(advisory);
        }

        Ok(SubplotSpec {
            requested_bbox: self.bbox,
            is_main: false,
            position,
            size,
            theme: self.theme,
            advisories,
        })
    }

    fn resolve_position(&self) -> Result<Position> {
        match (self.loc_left, self.loc_bottom) {
            (Some(left), Some(bottom)) => {
                check_unit("loc_left", left)?;
                check_unit("loc_bottom", bottom)?;
                Ok(Position::Explicit { left, bottom })
            }
            (Some(_), None) | (None, Some(_)) => Err(InsetError::IncompletePosition),
            (None, None) => {
                if let Some(raw) = &self.position {
                    Anchor::parse(raw).map(Position::Anchor)
                } else {
                    Ok(Position::Anchor(self.anchor.unwrap_or_default()))
                }
            }
        }
    }

    fn resolve_size(&self, advisories: &mut Vec<Advisory>) -> Result<SizeMode> {
        if let Some(width) = self.width {
            check_size("width", width)?;
        }
        if let Some(height) = self.height {
            check_size("height", height)?;
        }

        if let Some(scale_factor) = self.scale_factor {
            if !(scale_factor.is_finite() && scale_factor > 0.0) {
                return Err(InsetError::ScaleFactorOutOfRange(scale_factor));
            }
            if self.width.is_some() || self.height.is_some() {
                advisories.push(Advisory::ScaleFactorOverridesSize { scale_factor });
            }
            return Ok(SizeMode::ScaleFactor(scale_factor));
        }

        Ok(match (self.width, self.height) {
            (Some(width), Some(height)) => {
                advisories.push(Advisory::RedundantSize { width, height });
                SizeMode::Both { width, height }
            }
            (Some(width), None) => SizeMode::Width(width),
            (None, Some(height)) => SizeMode::Height(height),
            (None, None) => {
                advisories.push(Advisory::DefaultScaleFactor);
                SizeMode::ScaleFactor(1.0)
            }
        })
    }
}

fn check_unit(name: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(InsetError::PositionOutOfRange { name, value })
    }
}

fn check_size(name: &'static str, value: f64) -> Result<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(InsetError::SizeOutOfRange { name, value })
    }
}
