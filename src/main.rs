use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use catpack::compositor::{fit_geometry, WindowDimensions};
use catpack::host::{FileWindow, HostConfig};
use catpack::probe::{ImageHeaderProbe, ImageProbe};
use catpack::resolver::PackResolver;
use catpack::settings::{self, Settings};
use catpack::{logging, pack, HostEvent, Session};

/// Date-aware decorative background layers for terminal windows
#[derive(Parser, Debug)]
#[command(name = "catpack", version, about, long_about = None)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file to use instead of the per-user one
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the image a pack selects for a day
    Resolve {
        /// Pack name or directory
        pack: String,
        /// Day to resolve for (defaults to today)
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
    },
    /// Print the display size of an image for a window height
    Geometry {
        image: PathBuf,
        /// Window height in pixels
        #[arg(long)]
        height: u32,
    },
    /// Overlay a single image file
    AddImage {
        image: PathBuf,
        #[command(flatten)]
        target: Target,
    },
    /// Overlay today's image from a pack
    AddPack {
        /// Pack name or directory (defaults to the configured pack)
        pack: Option<String>,
        #[command(flatten)]
        target: Target,
    },
    /// Read host events from stdin and keep the overlay up to date
    Run {
        /// Pack name or directory (defaults to the configured pack)
        #[arg(long)]
        pack: Option<String>,
        #[command(flatten)]
        target: Target,
    },
    /// List packs in the packs directory
    ListPacks,
    /// Print the settings file and packs directory
    ShowPaths,
    /// Update and save settings, then print them
    Config(ConfigArgs),
}

/// Settings to change; omitted values are kept.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Largest share of the window height the overlay may cover (0-1)
    #[arg(long, value_name = "FRACTION")]
    maximum_window_percentage: Option<f64>,
    /// Overlay opacity while visible (0-1)
    #[arg(long, value_name = "FRACTION")]
    kitty_opacity: Option<f32>,
    /// Whether the overlay starts out visible
    #[arg(long)]
    draw_cat: Option<bool>,
    /// Default pack name
    #[arg(long)]
    pack: Option<String>,
    /// Folder holding installed packs
    #[arg(long, value_name = "PATH")]
    packs_dir: Option<PathBuf>,
}

impl ConfigArgs {
    fn apply(self, settings: &mut Settings) {
        if let Some(value) = self.maximum_window_percentage {
            settings.maximum_window_percentage = value;
        }
        if let Some(value) = self.kitty_opacity {
            settings.kitty_opacity = value;
        }
        if let Some(value) = self.draw_cat {
            settings.draw_cat = value;
        }
        if let Some(pack) = self.pack {
            settings.pack = Some(pack);
        }
        if let Some(dir) = self.packs_dir {
            settings.packs_dir = Some(dir);
        }
    }
}

/// The window whose overrides are written.
#[derive(Args, Debug)]
struct Target {
    /// JSON file holding the window's configuration overrides
    #[arg(long, value_name = "PATH")]
    overrides: PathBuf,
    /// JSON file holding the host's base configuration
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Window width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,
    /// Window height in pixels
    #[arg(long, default_value_t = 800)]
    height: u32,
    /// Layer position to insert at (defaults to topmost)
    #[arg(long)]
    index: Option<usize>,
}

impl Target {
    fn window(&self) -> FileWindow {
        FileWindow::new(
            &self.overrides,
            WindowDimensions {
                pixel_width: self.width,
                pixel_height: self.height,
            },
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let settings_file = match &cli.settings {
        Some(path) => path.clone(),
        None => settings::settings_path()?,
    };
    let mut settings = settings::load_from(&settings_file);
    // A broken settings file can still be repaired through `config`.
    if !matches!(cli.command, Command::Config(_)) {
        settings.validate()?;
    }

    match cli.command {
        Command::Resolve { pack, date } => {
            let pack_dir = settings.pack_dir(&pack)?;
            let today = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let image = PackResolver::default().resolve(&pack_dir, today)?;
            println!("{}", image.display());
        }
        Command::Geometry { image, height } => {
            let native = ImageHeaderProbe.dimensions(&image)?;
            if native.1 == 0 {
                bail!("{} reports zero height", image.display());
            }
            let geometry = fit_geometry(height, native, settings.maximum_window_percentage);
            println!("{:.0}x{:.0}", geometry.width, geometry.height);
        }
        Command::AddImage { image, target } => {
            let config = HostConfig::load(target.config.as_deref())?;
            let mut window = target.window();
            Session::from_settings(settings).add_image(&mut window, &config, &image, target.index)?;
        }
        Command::AddPack { pack, target } => {
            let pack = pack_name(pack, &settings)?;
            let config = HostConfig::load(target.config.as_deref())?;
            let mut window = target.window();
            Session::from_settings(settings).add_from_pack(&mut window, &config, &pack, target.index)?;
        }
        Command::Run { pack, target } => {
            let pack = pack.or_else(|| settings.pack.clone());
            run(settings, pack.as_deref(), &target)?;
        }
        Command::ListPacks => {
            let dir = settings.packs_dir()?;
            for name in pack::installed_packs(&dir)? {
                println!("{name}");
            }
        }
        Command::ShowPaths => {
            println!("settings: {}", settings_file.display());
            println!("packs:    {}", settings.packs_dir()?.display());
        }
        Command::Config(args) => {
            args.apply(&mut settings);
            settings.validate()?;
            settings::save_to(&settings, &settings_file)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }
    Ok(())
}

fn pack_name(pack: Option<String>, settings: &Settings) -> Result<String> {
    match pack.or_else(|| settings.pack.clone()) {
        Some(pack) => Ok(pack),
        None => bail!("no pack given and no default pack configured"),
    }
}

/// Dispatch one event per stdin line until `quit` or end of input.
///
/// A failing event is logged and leaves the installed overrides untouched.
fn run(settings: Settings, pack: Option<&str>, target: &Target) -> Result<()> {
    let config = HostConfig::load(target.config.as_deref())?;
    let mut window = target.window();
    let mut session = Session::from_settings(settings);
    tracing::info!("watching events for {}", pack.unwrap_or("no pack"));

    // Draw once up front, as the host does on first config load.
    dispatch(&mut session, &mut window, &config, pack, &HostEvent::ConfigReloaded);

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read event")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line == "quit" {
            break;
        }
        let event = match line.parse::<HostEvent>() {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!("{err:#}");
                continue;
            }
        };
        dispatch(&mut session, &mut window, &config, pack, &event);
    }
    Ok(())
}

fn dispatch(
    session: &mut Session,
    window: &mut FileWindow,
    config: &HostConfig,
    pack: Option<&str>,
    event: &HostEvent,
) {
    if let Err(err) = session.handle_event(window, config, pack, event) {
        tracing::error!("{event:?} failed: {err:#}");
    }
}
