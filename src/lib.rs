//! # Glance
//!
//! The image-preparation engine behind an instant-feeling image viewer.
//! A viewer has to put a decoded, correctly oriented image on screen the
//! moment the user asks for it, while thumbnails for the whole folder and
//! the next few images are prepared in the background. Glance is that
//! background machinery; windows, input handling and the thumbnail grid
//! belong to whatever embeds it.
//!
//! # Architecture: One Show Path, Two Workers
//!
//! ```text
//!   interaction thread            cache worker             thumbnail worker
//!   ──────────────────            ────────────             ────────────────
//!   Viewer::show ──decode──┐      pops (image, zoom)       pops image
//!        │                 │      claims in coordinator    waits for user idle
//!        └─ cache_around ──┼──▶   decodes oriented         renders + saves JPEG
//!                          │           │                   notifies front-end
//!                          ▼           ▼
//!              Coordinator ⇄ PixelCaches (fit / full)      disk: <root>/<height>/<sha256>.jpg
//! ```
//!
//! All shared state lives in one [`context::Context`]. Requests for the same
//! (image, zoom) pair collapse into a single decode: the first requester
//! claims the key in the [`coordinator`], everyone else waits for the
//! broadcast and then reads the cache.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Shared keys: `ImageRef`, `ZoomMode`, `TargetBox`, `PrepKey` |
//! | [`config`] | TOML configuration: stock defaults, overlay merge, validation |
//! | [`front_end`] | The `FrontEnd` trait the embedder implements, plus the activity clock |
//! | [`metadata`] | Dimensions and orientation without a full decode, cached per image |
//! | [`imaging`] | Backend trait, pure-Rust backend, orientation table, fit math |
//! | [`pixel_cache`] | Decoded images per zoom mode, flushed wholesale when full |
//! | [`coordinator`] | Single-flight claims over (image, zoom) with broadcast release |
//! | [`queue`] | FIFO work queue with wake and idle signals |
//! | [`decode`] | Cache check plus the direct → embedded preview → library strategy chain |
//! | [`context`] | The owned pipeline context and worker lifecycle |
//! | [`cache_worker`] | Background pre-decoding of neighbouring images |
//! | [`thumbnails`] | Thumbnail paths, generation, priority ordering and the throttled worker |
//! | [`viewer`] | Show path, orientation recheck, cache-around and folder policies |
//! | [`folder`] | Image listing for the command-line tool |
//! | [`output`] | Headless console front-end and output formatting |
//!
//! # Design Decisions
//!
//! ## Flush, Don't Age
//!
//! The pixel cache has no LRU. When the cache worker is about to add an
//! entry to a full cache, the whole cache for that zoom mode is dropped.
//! Neighbours are re-queued on every show anyway, so what matters right now
//! is rebuilt within one or two decodes.
//!
//! ## Unoriented First, Corrected Later
//!
//! The fastest decoders know nothing about EXIF orientation. When metadata is
//! not known yet, the show path accepts an unoriented result, marks it as
//! such, and [`viewer::Viewer::check_orientation`] re-shows the image once
//! metadata says it needs correction.
//!
//! ## The Disk Is the Thumbnail Index
//!
//! A thumbnail exists if and only if its file exists. Names are a hash of
//! the source path, so there is nothing to load, migrate or invalidate.

pub mod cache_worker;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod decode;
pub mod folder;
pub mod front_end;
pub mod imaging;
pub mod metadata;
pub mod output;
pub mod pixel_cache;
pub mod queue;
pub mod thumbnails;
pub mod types;
pub mod viewer;
