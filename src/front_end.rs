//! The front-end collaborator, seen from the pipeline.
//!
//! Rendering, input routing and the thumbnail grid live outside this crate.
//! The pipeline only needs to ask a few questions (what is selected, how big
//! is the viewport, is the viewer showing a single image) and to send a few
//! fire-and-forget notifications. [`FrontEnd`] is that contract.
//!
//! Interaction timing is tracked here too, by [`Activity`]: the viewer
//! records every user action and the thumbnail worker reads it to stay out
//! of the way while the user is browsing.

use crate::types::{ImageRef, TargetBox};
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::{Duration, Instant};

/// Queries and notifications the pipeline exchanges with whatever renders the UI.
///
/// Notifications must not block; implementations typically post them to
/// their own event loop.
pub trait FrontEnd: Send + Sync {
    /// The image currently selected in the browser, if any.
    fn current_selection(&self) -> Option<ImageRef>;

    /// Space available for a fit-mode image.
    fn viewport(&self) -> TargetBox;

    /// `true` while the viewer shows one image rather than the folder grid.
    fn in_single_image_mode(&self) -> bool;

    fn set_dimensions(&self, image: &ImageRef, width: u32, height: u32);

    fn add_image_thumbnail(&self, image: &ImageRef, thumbnail: &std::path::Path);

    fn remove_image_entry(&self, image: &ImageRef);

    fn select_in_browser(&self, image: &ImageRef);
}

/// Last-interaction clock shared by the show path and the thumbnail worker.
///
/// `None` means "no interaction yet" and never throttles; this is the state
/// after a quick startup show.
#[derive(Debug, Default)]
pub struct Activity {
    last: Mutex<Option<Instant>>,
}

impl Activity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a user action now.
    pub fn register(&self) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    /// Forget past actions.
    pub fn reset(&self) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn last_interaction(&self) -> Option<Instant> {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Time since the last action, or `None` if there was none.
    pub fn idle_for(&self) -> Option<Duration> {
        self.last_interaction().map(|t| t.elapsed())
    }

    /// Whether at least `threshold` has passed since the last action.
    pub fn is_idle(&self, threshold: Duration) -> bool {
        self.idle_for().is_none_or(|idle| idle >= threshold)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    /// Notification recorded by [`RecordingFrontEnd`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Notification {
        Dimensions(ImageRef, u32, u32),
        Thumbnail(ImageRef, PathBuf),
        Removed(ImageRef),
        Selected(ImageRef),
    }

    /// Front-end double with settable answers and a notification log.
    pub struct RecordingFrontEnd {
        pub selection: Mutex<Option<ImageRef>>,
        pub viewport: Mutex<TargetBox>,
        pub single_image: Mutex<bool>,
        pub notifications: Mutex<Vec<Notification>>,
    }

    impl Default for RecordingFrontEnd {
        fn default() -> Self {
            Self {
                selection: Mutex::new(None),
                viewport: Mutex::new(TargetBox::new(800, 600)),
                single_image: Mutex::new(false),
                notifications: Mutex::new(Vec::new()),
            }
        }
    }

    impl RecordingFrontEnd {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn select(&self, image: Option<ImageRef>) {
            *self.selection.lock().unwrap() = image;
        }

        pub fn notifications(&self) -> Vec<Notification> {
            self.notifications.lock().unwrap().clone()
        }

        fn push(&self, n: Notification) {
            self.notifications.lock().unwrap().push(n);
        }
    }

    impl FrontEnd for RecordingFrontEnd {
        fn current_selection(&self) -> Option<ImageRef> {
            self.selection.lock().unwrap().clone()
        }

        fn viewport(&self) -> TargetBox {
            *self.viewport.lock().unwrap()
        }

        fn in_single_image_mode(&self) -> bool {
            *self.single_image.lock().unwrap()
        }

        fn set_dimensions(&self, image: &ImageRef, width: u32, height: u32) {
            self.push(Notification::Dimensions(image.clone(), width, height));
        }

        fn add_image_thumbnail(&self, image: &ImageRef, thumbnail: &Path) {
            self.push(Notification::Thumbnail(image.clone(), thumbnail.to_path_buf()));
        }

        fn remove_image_entry(&self, image: &ImageRef) {
            self.push(Notification::Removed(image.clone()));
        }

        fn select_in_browser(&self, image: &ImageRef) {
            self.push(Notification::Selected(image.clone()));
        }
    }

    #[test]
    fn fresh_activity_is_idle() {
        let activity = Activity::new();
        assert!(activity.last_interaction().is_none());
        assert!(activity.is_idle(Duration::from_secs(3600)));
    }

    #[test]
    fn registered_action_blocks_idle() {
        let activity = Activity::new();
        activity.register();
        assert!(!activity.is_idle(Duration::from_secs(3600)));
        assert!(activity.is_idle(Duration::ZERO));
    }

    #[test]
    fn reset_clears_last_action() {
        let activity = Activity::new();
        activity.register();
        activity.reset();
        assert!(activity.idle_for().is_none());
    }
}
