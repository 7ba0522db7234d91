//! EXIF orientation: the tag-to-transform table and its inverses.
//!
//! | Tag | Stored image is | Correction applied |
//! |-----|-----------------|--------------------|
//! | 1 | upright | none |
//! | 2 | mirrored left-right | horizontal flip |
//! | 3 | upside down | 180° rotation |
//! | 4 | mirrored top-bottom | vertical flip |
//! | 5 | transposed | vertical flip, then 90° clockwise |
//! | 6 | rotated 90° counter-clockwise | 90° clockwise |
//! | 7 | transversed | horizontal flip, then 90° clockwise |
//! | 8 | rotated 90° clockwise | 270° clockwise (90° counter-clockwise) |
//!
//! Any other value maps to [`Orientation::Normal`]. A file *needs*
//! correction whenever the tag is present and not `1`, even if the value is
//! unrecognized; [`needs_correction`] encodes that rule separately from the
//! transform table.

use image::DynamicImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Normal,
    MirroredHorizontal,
    Rotated180,
    MirroredVertical,
    MirroredVerticalAnd90CW,
    Rotated90CW,
    MirroredHorizontalAnd90CW,
    Rotated270CW,
}

impl Orientation {
    pub fn from_tag(tag: Option<u32>) -> Self {
        match tag {
            Some(2) => Self::MirroredHorizontal,
            Some(3) => Self::Rotated180,
            Some(4) => Self::MirroredVertical,
            Some(5) => Self::MirroredVerticalAnd90CW,
            Some(6) => Self::Rotated90CW,
            Some(7) => Self::MirroredHorizontalAnd90CW,
            Some(8) => Self::Rotated270CW,
            _ => Self::Normal,
        }
    }

    /// Correct a stored image so it displays upright.
    #[must_use]
    pub fn apply(self, img: DynamicImage) -> DynamicImage {
        match self {
            Self::Normal => img,
            Self::MirroredHorizontal => img.fliph(),
            Self::Rotated180 => img.rotate180(),
            Self::MirroredVertical => img.flipv(),
            Self::MirroredVerticalAnd90CW => img.flipv().rotate90(),
            Self::Rotated90CW => img.rotate90(),
            Self::MirroredHorizontalAnd90CW => img.fliph().rotate90(),
            Self::Rotated270CW => img.rotate270(),
        }
    }

    /// Undo [`apply`](Self::apply).
    #[must_use]
    pub fn invert(self, img: DynamicImage) -> DynamicImage {
        match self {
            Self::Normal => img,
            Self::MirroredHorizontal => img.fliph(),
            Self::Rotated180 => img.rotate180(),
            Self::MirroredVertical => img.flipv(),
            Self::MirroredVerticalAnd90CW => img.rotate270().flipv(),
            Self::Rotated90CW => img.rotate270(),
            Self::MirroredHorizontalAnd90CW => img.rotate270().fliph(),
            Self::Rotated270CW => img.rotate90(),
        }
    }

    /// Whether the transform swaps width and height.
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Self::MirroredVerticalAnd90CW
                | Self::Rotated90CW
                | Self::MirroredHorizontalAnd90CW
                | Self::Rotated270CW
        )
    }
}

/// A tag that is present and not `1` requires correction.
pub fn needs_correction(tag: Option<u32>) -> bool {
    tag.is_some_and(|value| value != 1)
}
