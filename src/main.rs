use clap::{Parser, Subcommand, ValueEnum};
use glance::context::{Context, Workers};
use glance::imaging::RustBackend;
use glance::output::{self, ConsoleFrontEnd, FrontEndEvent};
use glance::thumbnails::thumbnail_path_for;
use glance::types::{ImageRef, TargetBox, ZoomMode};
use glance::viewer::{ShowOptions, Viewer};
use glance::{config, folder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "glance")]
#[command(about = "Image preparation engine for fast image viewing")]
#[command(long_about = "\
Image preparation engine for fast image viewing

Decodes, orients and caches images the way an interactive viewer does, and
keeps a persistent thumbnail cache:

  <cache root>/<height>/<sha256 of source path>.jpg

Thumbnails are never expired. Delete the directory to rebuild them.

Run 'glance gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file (TOML); stock defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging: -v for debug, -vv for trace. RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Viewport the headless front-end reports.
#[derive(clap::Args, Clone, Copy)]
struct ViewportArgs {
    #[arg(long, default_value_t = 1280)]
    width: u32,
    #[arg(long, default_value_t = 800)]
    height: u32,
}

#[derive(Clone, Copy, ValueEnum)]
enum ZoomArg {
    Fit,
    Full,
}

impl From<ZoomArg> for ZoomMode {
    fn from(zoom: ZoomArg) -> Self {
        match zoom {
            ZoomArg::Fit => ZoomMode::Fit,
            ZoomArg::Full => ZoomMode::Full,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Generate missing thumbnails for the images in a directory
    Thumbs {
        dir: PathBuf,
    },
    /// Decode one image as the viewer would show it
    Show {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = ZoomArg::Fit)]
        zoom: ZoomArg,
        #[command(flatten)]
        viewport: ViewportArgs,
        /// Write the decoded image here (format from the extension)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print where the thumbnail of a file is cached
    ThumbPath {
        file: PathBuf,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Thumbs { dir } => {
            let config = config::load_config(cli.config.as_deref())?;
            let dir = dir.canonicalize()?;
            let images = folder::list_images(&dir)?;
            let total = images.len();

            let (tx, rx) = mpsc::channel();
            let printer = spawn_printer(rx);
            let front_end = Arc::new(ConsoleFrontEnd::new(TargetBox::new(1280, 800), false, tx));
            let ctx = Arc::new(Context::new(config, Arc::new(RustBackend::new()), front_end));

            let workers = Workers::start(&ctx)?;
            let mut viewer = Viewer::new(Arc::clone(&ctx));
            viewer.change_folder(images);
            ctx.thumbnails.queue().join();
            workers.shutdown();

            let prepared = ctx.thumbnails.prepared_count();
            // Last sender goes with the context; the printer then drains and exits
            drop(viewer);
            drop(ctx);
            printer
                .join()
                .map_err(|_| "output thread panicked")?;
            println!("{}", output::format_thumbs_summary(total, prepared));
        }
        Command::Show {
            file,
            zoom,
            viewport,
            out,
        } => {
            let config = config::load_config(cli.config.as_deref())?;
            let image = ImageRef::new(file.canonicalize()?);

            let (tx, rx) = mpsc::channel();
            let front_end = Arc::new(ConsoleFrontEnd::new(
                TargetBox::new(viewport.width, viewport.height),
                true,
                tx,
            ));
            let ctx = Arc::new(Context::new(config, Arc::new(RustBackend::new()), front_end));
            let mut viewer = Viewer::new(ctx);
            viewer.set_zoom(zoom.into());

            let shown = viewer.show(&image, ShowOptions::quick())?;
            let shown = if shown.needs_orientation_check {
                viewer.check_orientation(&image)?.unwrap_or(shown)
            } else {
                shown
            };

            print_events(rx.try_iter());
            for line in output::format_shown(&shown, viewer.zoom()) {
                println!("{}", line);
            }
            if let Some(out) = out {
                shown.decoded.image.pixels.save(&out)?;
                println!("Wrote {}", out.display());
            }
        }
        Command::ThumbPath { file } => {
            let config = config::load_config(cli.config.as_deref())?;
            let image = ImageRef::new(absolute(&file)?);
            println!("{}", thumbnail_path_for(&config.thumbnails, &image).display());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn spawn_printer(rx: Receiver<FrontEndEvent>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || print_events(rx))
}

fn print_events(events: impl IntoIterator<Item = FrontEndEvent>) {
    for event in events {
        for line in output::format_event(&event) {
            println!("{}", line);
        }
    }
}

/// Absolute form of `path` without requiring it to exist.
fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    path.canonicalize().or_else(|_| std::path::absolute(path))
}
