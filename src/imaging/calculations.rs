//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::types::TargetBox;

/// Largest size with the source aspect ratio that fits inside `bounds`.
///
/// Scales up as well as down. Neither edge is ever rounded to zero.
///
/// # Examples
/// ```
/// # use glance::imaging::calculations::fit_within;
/// # use glance::types::TargetBox;
/// // Landscape into a square box: width is the limiting edge
/// assert_eq!(fit_within((400, 200), TargetBox::new(100, 100)), (100, 50));
///
/// // Small portrait into a large box: scaled up until height matches
/// assert_eq!(fit_within((30, 60), TargetBox::new(500, 120)), (60, 120));
/// ```
pub fn fit_within(source: (u32, u32), bounds: TargetBox) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 || bounds.width == 0 || bounds.height == 0 {
        return (src_w.max(1), src_h.max(1));
    }

    let scale_w = bounds.width as f64 / src_w as f64;
    let scale_h = bounds.height as f64 / src_h as f64;

    if scale_w <= scale_h {
        // Width is the limiting edge
        let h = (src_h as f64 * scale_w).round() as u32;
        (bounds.width, h.clamp(1, bounds.height))
    } else {
        // Height is the limiting edge
        let w = (src_w as f64 * scale_h).round() as u32;
        (w.clamp(1, bounds.width), bounds.height)
    }
}

/// Like [`fit_within`], but never enlarges: a source already inside
/// `bounds` keeps its size.
pub fn shrink_within(source: (u32, u32), bounds: TargetBox) -> (u32, u32) {
    if source.0 <= bounds.width && source.1 <= bounds.height {
        source
    } else {
        fit_within(source, bounds)
    }
}

/// Distance of `index` from the cursor `position`, used to order work so
/// images next to the current one come first.
pub fn distance_from(position: usize, index: usize) -> usize {
    position.abs_diff(index)
}
