//! Console front-end and CLI output formatting.
//!
//! The binary has no window and no thumbnail grid. [`ConsoleFrontEnd`]
//! answers the pipeline's questions from fixed settings and turns every
//! notification into a [`FrontEndEvent`] sent over a channel; a printer
//! thread on the other end formats and prints them.
//!
//! # Output Format
//!
//! ## Thumbnails
//!
//! ```text
//! /photos/001.jpg
//!     Size: 4000 x 3000
//!     Thumbnail: /home/me/.cache/glance/thumbs/120/3f8a…c1.jpg
//! /photos/002.jpg
//!     Skipped: cannot be thumbnailed
//! ```
//!
//! ## Show
//!
//! ```text
//! /photos/001.jpg (fit)
//!     Decoded: 1067 x 800
//!     Source: library
//!     Oriented: yes
//! ```
//!
//! # Architecture
//!
//! `format_*` functions return `Vec<String>` and do no I/O, so they are unit
//! tested directly. The front-end never blocks: a send to a dropped
//! receiver is silently ignored.

use crate::decode::Source;
use crate::front_end::FrontEnd;
use crate::types::{ImageRef, TargetBox, ZoomMode};
use crate::viewer::Shown;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Mutex, PoisonError};

/// A notification from the pipeline, as seen by the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontEndEvent {
    Dimensions {
        image: ImageRef,
        width: u32,
        height: u32,
    },
    Thumbnail {
        image: ImageRef,
        path: PathBuf,
    },
    Removed {
        image: ImageRef,
    },
    Selected {
        image: ImageRef,
    },
}

/// Headless [`FrontEnd`] for the command-line tool.
pub struct ConsoleFrontEnd {
    viewport: TargetBox,
    single_image: bool,
    selection: Mutex<Option<ImageRef>>,
    events: Sender<FrontEndEvent>,
}

impl ConsoleFrontEnd {
    pub fn new(viewport: TargetBox, single_image: bool, events: Sender<FrontEndEvent>) -> Self {
        Self {
            viewport,
            single_image,
            selection: Mutex::new(None),
            events,
        }
    }

    fn emit(&self, event: FrontEndEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }
}

impl FrontEnd for ConsoleFrontEnd {
    fn current_selection(&self) -> Option<ImageRef> {
        self.selection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn viewport(&self) -> TargetBox {
        self.viewport
    }

    fn in_single_image_mode(&self) -> bool {
        self.single_image
    }

    fn set_dimensions(&self, image: &ImageRef, width: u32, height: u32) {
        self.emit(FrontEndEvent::Dimensions {
            image: image.clone(),
            width,
            height,
        });
    }

    fn add_image_thumbnail(&self, image: &ImageRef, thumbnail: &Path) {
        self.emit(FrontEndEvent::Thumbnail {
            image: image.clone(),
            path: thumbnail.to_path_buf(),
        });
    }

    fn remove_image_entry(&self, image: &ImageRef) {
        self.emit(FrontEndEvent::Removed {
            image: image.clone(),
        });
    }

    fn select_in_browser(&self, image: &ImageRef) {
        *self.selection.lock().unwrap_or_else(PoisonError::into_inner) = Some(image.clone());
        self.emit(FrontEndEvent::Selected {
            image: image.clone(),
        });
    }
}

// ============================================================================
// Formatting
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Format one front-end event as context lines under its image.
///
/// Dimensions and thumbnails are context lines; the image header is printed
/// with the first of them. Selections are not interesting on a console.
pub fn format_event(event: &FrontEndEvent) -> Vec<String> {
    match event {
        FrontEndEvent::Dimensions {
            image,
            width,
            height,
        } => vec![
            image.to_string(),
            format!("{}Size: {} x {}", indent(1), width, height),
        ],
        FrontEndEvent::Thumbnail { path, .. } => {
            vec![format!("{}Thumbnail: {}", indent(1), path.display())]
        }
        FrontEndEvent::Removed { image } => vec![
            image.to_string(),
            format!("{}Skipped: cannot be thumbnailed", indent(1)),
        ],
        FrontEndEvent::Selected { .. } => Vec::new(),
    }
}

/// Format the result of a show.
pub fn format_shown(shown: &Shown, zoom: ZoomMode) -> Vec<String> {
    let (width, height) = shown.decoded.image.dimensions();
    let source = match shown.decoded.source {
        Source::Cache => "cache".to_string(),
        Source::Strategy(strategy) => strategy.to_string(),
    };
    vec![
        format!("{} ({})", shown.image, zoom),
        format!("{}Decoded: {} x {}", indent(1), width, height),
        format!("{}Source: {}", indent(1), source),
        format!("{}Oriented: {}", indent(1), yes_no(shown.decoded.was_oriented())),
    ]
}

/// Closing line of the `thumbs` command.
pub fn format_thumbs_summary(total: usize, prepared: usize) -> String {
    format!("Thumbnails: {} of {} images processed", prepared, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{Decoded, Strategy};
    use crate::pixel_cache::DecodedImage;
    use image::DynamicImage;
    use std::sync::mpsc;

    #[test]
    fn console_front_end_forwards_notifications() {
        let (tx, rx) = mpsc::channel();
        let front_end = ConsoleFrontEnd::new(TargetBox::new(1280, 800), false, tx);
        let image = ImageRef::new("/p/a.jpg");

        front_end.set_dimensions(&image, 10, 20);
        front_end.remove_image_entry(&image);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                FrontEndEvent::Dimensions {
                    image: image.clone(),
                    width: 10,
                    height: 20
                },
                FrontEndEvent::Removed { image },
            ]
        );
    }

    #[test]
    fn selecting_updates_current_selection() {
        let (tx, _rx) = mpsc::channel();
        let front_end = ConsoleFrontEnd::new(TargetBox::new(1280, 800), true, tx);
        assert!(front_end.current_selection().is_none());

        let image = ImageRef::new("/p/a.jpg");
        front_end.select_in_browser(&image);
        assert_eq!(front_end.current_selection(), Some(image));
        assert!(front_end.in_single_image_mode());
    }

    #[test]
    fn send_after_receiver_dropped_is_ignored() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let front_end = ConsoleFrontEnd::new(TargetBox::new(1, 1), false, tx);
        front_end.remove_image_entry(&ImageRef::new("/p/a.jpg"));
    }

    #[test]
    fn format_thumbnail_events() {
        let image = ImageRef::new("/p/a.jpg");
        let lines = format_event(&FrontEndEvent::Dimensions {
            image: image.clone(),
            width: 4000,
            height: 3000,
        });
        assert_eq!(lines, vec!["/p/a.jpg", "    Size: 4000 x 3000"]);

        let lines = format_event(&FrontEndEvent::Thumbnail {
            image: image.clone(),
            path: PathBuf::from("/cache/120/ab.jpg"),
        });
        assert_eq!(lines, vec!["    Thumbnail: /cache/120/ab.jpg"]);

        let lines = format_event(&FrontEndEvent::Removed { image: image.clone() });
        assert_eq!(lines, vec!["/p/a.jpg", "    Skipped: cannot be thumbnailed"]);

        assert!(format_event(&FrontEndEvent::Selected { image }).is_empty());
    }

    #[test]
    fn format_shown_lines() {
        let shown = Shown {
            image: ImageRef::new("/p/a.jpg"),
            decoded: Decoded {
                image: DecodedImage::new(DynamicImage::new_rgb8(1067, 800), true, 1280),
                source: Source::Strategy(Strategy::Library),
            },
            needs_orientation_check: false,
        };
        assert_eq!(
            format_shown(&shown, ZoomMode::Fit),
            vec![
                "/p/a.jpg (fit)",
                "    Decoded: 1067 x 800",
                "    Source: library",
                "    Oriented: yes",
            ]
        );
    }

    #[test]
    fn summary_line() {
        assert_eq!(
            format_thumbs_summary(3, 2),
            "Thumbnails: 2 of 3 images processed"
        );
    }
}
