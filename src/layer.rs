//! Background layer descriptors as understood by the host window configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What a layer draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerSource {
    /// Solid color, e.g. `#1e1e2e`.
    Color(String),
    /// Image file on disk.
    File(PathBuf),
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Repeat {
    #[default]
    Repeat,
    Mirror,
    NoRepeat,
}

/// Size of a layer along one axis.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum LayerSize {
    /// Scale to cover the whole window.
    Cover,
    /// Scale to fit inside the window.
    Contain,
    /// Exact size in pixels.
    Pixels(f64),
    /// Percentage of the window size.
    Percent(f64),
    /// The image's own size.
    #[default]
    Native,
}

/// One entry of the host's ordered `background` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackgroundLayer {
    pub source: LayerSource,
    #[serde(default)]
    pub horizontal_align: HorizontalAlign,
    #[serde(default)]
    pub vertical_align: VerticalAlign,
    #[serde(default)]
    pub repeat_x: Repeat,
    #[serde(default)]
    pub repeat_y: Repeat,
    #[serde(default = "full_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub width: LayerSize,
    #[serde(default)]
    pub height: LayerSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_offset: Option<f64>,
    /// Marks layers managed by catpack so toggles leave user layers alone.
    #[serde(default, skip_serializing_if = "is_false")]
    pub pack_owned: bool,
}

impl BackgroundLayer {
    /// A plain user layer drawing `source` with host defaults.
    pub fn new(source: LayerSource) -> Self {
        Self {
            source,
            horizontal_align: HorizontalAlign::default(),
            vertical_align: VerticalAlign::default(),
            repeat_x: Repeat::default(),
            repeat_y: Repeat::default(),
            opacity: full_opacity(),
            width: LayerSize::default(),
            height: LayerSize::default(),
            horizontal_offset: None,
            vertical_offset: None,
            pack_owned: false,
        }
    }
}

fn full_opacity() -> f32 {
    1.0
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Set the opacity of every pack-owned layer, leaving the rest untouched.
///
/// Returns the number of layers changed.
pub fn set_pack_opacity(layers: &mut [BackgroundLayer], opacity: f32) -> usize {
    let mut changed = 0;
    for layer in layers.iter_mut().filter(|layer| layer.pack_owned) {
        layer.opacity = opacity;
        changed += 1;
    }
    changed
}
