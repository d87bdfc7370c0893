// Fixed crop widget - Non-interactive crop box for terminal use

use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::domain::model::*;
use crate::ports::CropWidget;

#[derive(Debug)]
struct CropBox {
    rect: CropInfo,
    ratio: AspectRatio,
    destroyed: bool,
}

/// Crop box over a frame of known size, positioned programmatically
///
/// Applying an aspect ratio shrinks the current box to the largest box of that
/// ratio centered inside it. Dimensions are kept even so the result is always
/// accepted by 4:2:0 encoders.
#[derive(Debug)]
pub struct FixedCropWidget {
    frame: VideoInfo,
    inner: Mutex<CropBox>,
}

impl FixedCropWidget {
    /// Box covering the whole frame, unconstrained
    pub fn new(frame: VideoInfo) -> Self {
        Self::with_rect(frame, frame.full_frame())
    }

    /// Box at `rect`, clamped to the frame
    pub fn with_rect(frame: VideoInfo, rect: CropInfo) -> Self {
        Self {
            frame,
            inner: Mutex::new(CropBox {
                rect: clamp_to_frame(rect, &frame),
                ratio: AspectRatio::Custom,
                destroyed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CropBox> {
        // a panic mid-update leaves a plain rectangle behind, still usable
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CropWidget for FixedCropWidget {
    fn get_data(&self) -> CropInfo {
        self.lock().rect
    }

    fn set_aspect_ratio(&self, ratio: AspectRatio) {
        let mut crop = self.lock();
        if crop.destroyed {
            return;
        }

        crop.ratio = ratio;
        if let Some(value) = ratio.value() {
            crop.rect = clamp_to_frame(fit_ratio(crop.rect, value), &self.frame);
        }
        debug!(ratio = %ratio, rect = %crop.rect, "Crop aspect ratio set");
    }

    fn aspect_ratio(&self) -> AspectRatio {
        self.lock().ratio
    }

    fn destroy(&self) {
        let mut crop = self.lock();
        if !crop.destroyed {
            crop.destroyed = true;
            debug!("Crop widget destroyed");
        }
    }

    fn is_destroyed(&self) -> bool {
        self.lock().destroyed
    }
}

/// Largest box with width/height == `ratio` centered inside `rect`
fn fit_ratio(rect: CropInfo, ratio: f64) -> CropInfo {
    let (width, height) = if rect.width / rect.height > ratio {
        (rect.height * ratio, rect.height)
    } else {
        (rect.width, rect.width / ratio)
    };

    CropInfo::new(
        width,
        height,
        rect.x + (rect.width - width) / 2.0,
        rect.y + (rect.height - height) / 2.0,
    )
}

fn even_floor(value: f64) -> f64 {
    ((value / 2.0).floor() * 2.0).max(2.0)
}

fn clamp_to_frame(rect: CropInfo, frame: &VideoInfo) -> CropInfo {
    let frame_width = frame.width as f64;
    let frame_height = frame.height as f64;

    // never larger than the frame, even if that leaves an odd edge
    let width = even_floor(rect.width.min(frame_width)).min(frame_width);
    let height = even_floor(rect.height.min(frame_height)).min(frame_height);
    let x = rect.x.floor().clamp(0.0, (frame_width - width).max(0.0));
    let y = rect.y.floor().clamp(0.0, (frame_height - height).max(0.0));

    CropInfo::new(width, height, x, y)
}
