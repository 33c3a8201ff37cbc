//! Builds the pack-owned overlay layer and merges it into a layer list.

use std::path::Path;

use crate::error::PackError;
use crate::layer::{BackgroundLayer, HorizontalAlign, LayerSize, LayerSource, Repeat, VerticalAlign};
use crate::probe::ImageProbe;

/// Pixel size of the host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDimensions {
    pub pixel_width: u32,
    pub pixel_height: u32,
}

/// Display size computed for an overlay image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub width: f64,
    pub height: f64,
}

/// Scale a `native` image for a window `window_height` pixels tall.
///
/// The height is capped by both `max_fraction` of the window and the native
/// height, so images are never upscaled. The width follows from the aspect
/// ratio.
pub fn fit_geometry(window_height: u32, native: (u32, u32), max_fraction: f64) -> Geometry {
    let (native_width, native_height) = native;
    let height = (f64::from(window_height) * max_fraction).min(f64::from(native_height));
    let width = f64::from(native_width) * (height / f64::from(native_height));
    Geometry { width, height }
}

/// Inputs for [`add_image`] that come from settings and visibility state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    /// Largest share of the window height the image may take.
    pub max_fraction: f64,
    /// Opacity used while the overlay is visible.
    pub opacity: f32,
    /// Whether the overlay is currently shown.
    pub visible: bool,
}

impl OverlayStyle {
    /// Opacity to apply right now.
    pub fn effective_opacity(&self) -> f32 {
        if self.visible { self.opacity } else { 0.0 }
    }
}

/// Return a copy of `layers` with a pack-owned layer for `image` inserted.
///
/// `index` defaults to the end of the list (topmost). `layers` is never
/// modified; any probe failure leaves the caller with the original list.
pub fn add_image(
    layers: &[BackgroundLayer],
    window: WindowDimensions,
    image: &Path,
    index: Option<usize>,
    probe: &dyn ImageProbe,
    style: OverlayStyle,
) -> Result<Vec<BackgroundLayer>, PackError> {
    let index = index.unwrap_or(layers.len());
    if index > layers.len() {
        return Err(PackError::LayerIndex {
            index,
            len: layers.len(),
        });
    }

    let native = probe.dimensions(image)?;
    if native.1 == 0 {
        return Err(PackError::probe(image, "image reports zero height"));
    }
    let geometry = fit_geometry(window.pixel_height, native, style.max_fraction);
    tracing::debug!(
        "overlay {} native {}x{} -> {:.0}x{:.0}",
        image.display(),
        native.0,
        native.1,
        geometry.width,
        geometry.height
    );

    let layer = BackgroundLayer {
        horizontal_align: HorizontalAlign::Right,
        vertical_align: VerticalAlign::Bottom,
        repeat_x: Repeat::NoRepeat,
        repeat_y: Repeat::NoRepeat,
        opacity: style.effective_opacity(),
        width: LayerSize::Pixels(geometry.width),
        height: LayerSize::Pixels(geometry.height),
        pack_owned: true,
        ..BackgroundLayer::new(LayerSource::File(image.to_path_buf()))
    };

    let mut updated = layers.to_vec();
    updated.insert(index, layer);
    Ok(updated)
}
