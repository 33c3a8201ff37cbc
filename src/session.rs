//! Runtime state and event handling for one host process.

use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use rand::SeedableRng;
use rand_chacha::ChaChaRng;

use crate::compositor::{self, WindowDimensions};
use crate::host::{HostConfig, HostWindow};
use crate::layer::set_pack_opacity;
use crate::probe::{is_supported_image, DirectoryLister, FsLister, ImageHeaderProbe, ImageProbe};
use crate::resolver::{DailyLock, PackResolver};
use crate::settings::Settings;

/// Events delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// The window changed size.
    Resized { pixel_width: u32, pixel_height: u32 },
    /// The host reloaded its configuration.
    ConfigReloaded,
    /// The visibility key binding was pressed.
    Toggle,
}

impl FromStr for HostEvent {
    type Err = anyhow::Error;

    /// Parse `resize <width> <height>`, `reload` or `toggle`.
    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let event = match words.next() {
            Some("resize") => {
                let mut dimension = |name: &str| -> Result<u32> {
                    let word = words.next().ok_or_else(|| anyhow!("resize needs a {name}"))?;
                    word.parse()
                        .with_context(|| format!("invalid {name} `{word}`"))
                };
                let pixel_width = dimension("width")?;
                let pixel_height = dimension("height")?;
                HostEvent::Resized {
                    pixel_width,
                    pixel_height,
                }
            }
            Some("reload") => HostEvent::ConfigReloaded,
            Some("toggle") => HostEvent::Toggle,
            Some(other) => bail!("unknown event `{other}`"),
            None => bail!("empty event"),
        };
        if let Some(extra) = words.next() {
            bail!("unexpected argument `{extra}`");
        }
        Ok(event)
    }
}

/// In-memory state that drives overlay composition.
///
/// Owned by a single dispatch loop; every operation takes `&mut self`.
pub struct Session {
    settings: Settings,
    visible: bool,
    resolver: PackResolver,
    probe: Box<dyn ImageProbe>,
    clock: fn() -> NaiveDate,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("settings", &self.settings)
            .field("visible", &self.visible)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl Session {
    /// Build a session backed by the real filesystem and clock.
    pub fn from_settings(settings: Settings) -> Self {
        Self::with_parts(
            settings,
            Box::new(ImageHeaderProbe),
            Box::new(FsLister),
            ChaChaRng::from_entropy(),
        )
    }

    /// Build a session from explicit collaborators.
    pub fn with_parts(
        settings: Settings,
        probe: Box<dyn ImageProbe>,
        lister: Box<dyn DirectoryLister>,
        rng: ChaChaRng,
    ) -> Self {
        Self {
            visible: settings.draw_cat,
            settings,
            resolver: PackResolver::new(lister, rng),
            probe,
            clock: local_today,
        }
    }

    /// Replace the clock used to determine "today".
    pub fn with_clock(mut self, clock: fn() -> NaiveDate) -> Self {
        self.clock = clock;
        self
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn daily_lock(&self) -> Option<&DailyLock> {
        self.resolver.lock()
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    /// Overlay `file_path` on the host's base background and install it.
    pub fn add_image(
        &mut self,
        window: &mut dyn HostWindow,
        config: &HostConfig,
        file_path: &Path,
        index: Option<usize>,
    ) -> Result<()> {
        if !is_supported_image(file_path) {
            tracing::warn!("{} does not look like an image", file_path.display());
        }
        let layers = compositor::add_image(
            &config.background,
            window.dimensions(),
            file_path,
            index,
            self.probe.as_ref(),
            self.settings.overlay_style(self.visible),
        )?;

        let mut overrides = window.config_overrides()?.unwrap_or_default();
        overrides.background = Some(layers);
        window.set_config_overrides(overrides)?;
        tracing::info!("installed overlay {}", file_path.display());
        Ok(())
    }

    /// Resolve today's image from `pack_name` and overlay it.
    pub fn add_from_pack(
        &mut self,
        window: &mut dyn HostWindow,
        config: &HostConfig,
        pack_name: &str,
        index: Option<usize>,
    ) -> Result<()> {
        let pack_dir = self.settings.pack_dir(pack_name)?;
        let today = self.today();
        let image = self
            .resolver
            .resolve(&pack_dir, today)
            .with_context(|| format!("failed to resolve pack {pack_name}"))?;
        self.add_image(window, config, &image, index)
    }

    /// Flip visibility, reroll the daily pick and restyle installed layers.
    ///
    /// Session state only changes once the restyled layers are installed.
    pub fn toggle(&mut self, window: &mut dyn HostWindow) -> Result<()> {
        let visible = !self.visible;
        if let Some(mut overrides) = window.config_overrides()? {
            if let Some(layers) = overrides.background.as_mut() {
                let opacity = self.settings.overlay_style(visible).effective_opacity();
                let changed = set_pack_opacity(layers, opacity);
                tracing::debug!("set opacity {opacity} on {changed} pack layers");
                window.set_config_overrides(overrides)?;
            }
        }

        self.visible = visible;
        self.resolver.invalidate_lock();
        tracing::info!("overlay {}", if visible { "shown" } else { "hidden" });
        Ok(())
    }

    /// Dispatch one host event.
    ///
    /// Resize and reload recompose the overlay from `pack_name`; without a
    /// pack they are ignored.
    pub fn handle_event(
        &mut self,
        window: &mut dyn HostWindow,
        config: &HostConfig,
        pack_name: Option<&str>,
        event: &HostEvent,
    ) -> Result<()> {
        match event {
            HostEvent::Toggle => self.toggle(window),
            HostEvent::Resized {
                pixel_width,
                pixel_height,
            } => {
                window.resize(WindowDimensions {
                    pixel_width: *pixel_width,
                    pixel_height: *pixel_height,
                });
                self.recompose(window, config, pack_name, event)
            }
            HostEvent::ConfigReloaded => self.recompose(window, config, pack_name, event),
        }
    }

    fn recompose(
        &mut self,
        window: &mut dyn HostWindow,
        config: &HostConfig,
        pack_name: Option<&str>,
        event: &HostEvent,
    ) -> Result<()> {
        match pack_name {
            Some(pack) => self.add_from_pack(window, config, pack, None),
            None => {
                tracing::debug!("no pack configured; ignoring {event:?}");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::error::PackError;
    use crate::host::{FileWindow, MemoryWindow, Overrides};
    use crate::layer::{BackgroundLayer, LayerSize, LayerSource};

    struct FixedProbe;

    impl ImageProbe for FixedProbe {
        fn dimensions(&self, _path: &Path) -> Result<(u32, u32), PackError> {
            Ok((400, 200))
        }
    }

    struct BrokenProbe;

    impl ImageProbe for BrokenProbe {
        fn dimensions(&self, path: &Path) -> Result<(u32, u32), PackError> {
            Err(PackError::probe(path, "broken"))
        }
    }

    struct TallProbe;

    impl ImageProbe for TallProbe {
        fn dimensions(&self, _path: &Path) -> Result<(u32, u32), PackError> {
            Ok((400, 2000))
        }
    }

    /// Window that serves overrides but refuses to install new ones.
    struct ReadOnlyWindow(MemoryWindow);

    impl HostWindow for ReadOnlyWindow {
        fn dimensions(&self) -> WindowDimensions {
            self.0.dimensions()
        }

        fn resize(&mut self, dimensions: WindowDimensions) {
            self.0.resize(dimensions);
        }

        fn config_overrides(&self) -> Result<Option<Overrides>> {
            self.0.config_overrides()
        }

        fn set_config_overrides(&mut self, _overrides: Overrides) -> Result<()> {
            bail!("overrides are read-only")
        }
    }

    fn june_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn session_with(probe: Box<dyn ImageProbe>, settings: Settings) -> Session {
        Session::with_parts(settings, probe, Box::new(FsLister), ChaChaRng::seed_from_u64(3))
            .with_clock(june_first)
    }

    fn session() -> Session {
        session_with(Box::new(FixedProbe), Settings::default())
    }

    fn window() -> MemoryWindow {
        MemoryWindow::new(WindowDimensions {
            pixel_width: 1600,
            pixel_height: 1000,
        })
    }

    fn base_config() -> HostConfig {
        HostConfig {
            background: vec![BackgroundLayer::new(LayerSource::Color("#1e1e2e".into()))],
        }
    }

    fn pack_layers(window: &MemoryWindow) -> Vec<BackgroundLayer> {
        window
            .overrides
            .as_ref()
            .and_then(|o| o.background.clone())
            .unwrap_or_default()
            .into_iter()
            .filter(|layer| layer.pack_owned)
            .collect()
    }

    fn random_pack(names: usize) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("catpack.json"), r#"{"default": "random"}"#).unwrap();
        fs::create_dir(dir.path().join("random")).unwrap();
        for i in 0..names {
            fs::write(dir.path().join("random").join(format!("{i:02}.png")), b"").unwrap();
        }
        dir
    }

    #[test]
    fn parses_event_lines() {
        assert_eq!(
            "resize 800 600".parse::<HostEvent>().unwrap(),
            HostEvent::Resized {
                pixel_width: 800,
                pixel_height: 600
            }
        );
        assert_eq!("  reload ".parse::<HostEvent>().unwrap(), HostEvent::ConfigReloaded);
        assert_eq!("toggle".parse::<HostEvent>().unwrap(), HostEvent::Toggle);
        assert!("resize 800".parse::<HostEvent>().is_err());
        assert!("resize wide 600".parse::<HostEvent>().is_err());
        assert!("toggle now".parse::<HostEvent>().is_err());
        assert!("explode".parse::<HostEvent>().is_err());
        assert!("".parse::<HostEvent>().is_err());
    }

    #[test]
    fn add_image_installs_overrides_on_top_of_base_config() {
        let mut session = session();
        let mut window = window();
        let config = base_config();
        session
            .add_image(&mut window, &config, Path::new("/tmp/cat.png"), None)
            .unwrap();

        let layers = window.overrides.unwrap().background.unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0], config.background[0]);
        assert_eq!(layers[1].height, LayerSize::Pixels(200.0));
        assert_eq!(layers[1].opacity, 0.6);
    }

    #[test]
    fn repeated_events_do_not_stack_pack_layers() {
        let pack = random_pack(3);
        let mut session = session();
        let mut window = window();
        let config = base_config();
        let name = pack.path().to_str().unwrap();

        for event in [
            HostEvent::ConfigReloaded,
            HostEvent::Resized { pixel_width: 800, pixel_height: 600 },
            HostEvent::ConfigReloaded,
        ] {
            session.handle_event(&mut window, &config, Some(name), &event).unwrap();
        }
        assert_eq!(pack_layers(&window).len(), 1);
    }

    #[test]
    fn failed_probe_installs_nothing() {
        let mut session = session_with(Box::new(BrokenProbe), Settings::default());
        let mut window = window();
        let err = session
            .add_image(&mut window, &base_config(), Path::new("/tmp/cat.png"), None)
            .unwrap_err();
        assert!(err.downcast_ref::<PackError>().is_some());
        assert!(window.overrides.is_none());
    }

    #[test]
    fn toggle_twice_restores_opacity() {
        let mut session = session();
        let mut window = window();
        session
            .add_image(&mut window, &base_config(), Path::new("/tmp/cat.png"), None)
            .unwrap();

        session.toggle(&mut window).unwrap();
        assert!(!session.is_visible());
        assert!(pack_layers(&window).iter().all(|layer| layer.opacity == 0.0));
        let user = &window.overrides.as_ref().unwrap().background.as_ref().unwrap()[0];
        assert_eq!(user.opacity, 1.0);

        session.toggle(&mut window).unwrap();
        assert!(session.is_visible());
        assert!(pack_layers(&window).iter().all(|layer| layer.opacity == 0.6));
    }

    #[test]
    fn toggle_without_overrides_affects_future_layers() {
        let mut session = session();
        let mut window = window();
        session.toggle(&mut window).unwrap();
        assert!(window.overrides.is_none());

        session
            .add_image(&mut window, &base_config(), Path::new("/tmp/cat.png"), None)
            .unwrap();
        assert_eq!(pack_layers(&window)[0].opacity, 0.0);
    }

    #[test]
    fn draw_cat_false_starts_hidden() {
        let settings = Settings {
            draw_cat: false,
            ..Settings::default()
        };
        let session = session_with(Box::new(FixedProbe), settings);
        assert!(!session.is_visible());
    }

    #[test]
    fn toggle_invalidates_daily_lock() {
        let pack = random_pack(5);
        let mut session = session();
        let mut window = window();
        let name = pack.path().to_str().unwrap();

        session.add_from_pack(&mut window, &base_config(), name, None).unwrap();
        let locked = session.daily_lock().cloned().unwrap();
        assert_eq!(locked.day_of_year, 152);

        session.add_from_pack(&mut window, &base_config(), name, None).unwrap();
        assert_eq!(session.daily_lock(), Some(&locked));
        let source = pack_layers(&window)[0].source.clone();
        assert_eq!(
            source,
            LayerSource::File(pack.path().join("random").join(&locked.name))
        );

        session.toggle(&mut window).unwrap();
        assert!(session.daily_lock().is_none());
    }

    #[test]
    fn missing_pack_surfaces_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session();
        let mut window = window();
        let err = session
            .add_from_pack(&mut window, &base_config(), dir.path().to_str().unwrap(), None)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PackError>(),
            Some(PackError::NotFound { .. })
        ));
        assert!(window.overrides.is_none());
    }

    #[test]
    fn events_without_pack_are_ignored() {
        let mut session = session();
        let mut window = window();
        session
            .handle_event(&mut window, &base_config(), None, &HostEvent::ConfigReloaded)
            .unwrap();
        assert!(window.overrides.is_none());
    }

    #[test]
    fn other_override_keys_survive_recomposition() {
        let mut session = session();
        let mut window = window();
        let mut overrides = Overrides::default();
        overrides
            .other
            .insert("font_size".into(), serde_json::json!(12));
        window.overrides = Some(overrides);

        session
            .add_image(&mut window, &base_config(), &PathBuf::from("/tmp/cat.png"), None)
            .unwrap();
        let installed = window.overrides.unwrap();
        assert_eq!(installed.other["font_size"], serde_json::json!(12));
        assert!(installed.background.is_some());
    }

    #[test]
    fn resize_event_rescales_overlay() {
        let pack = random_pack(1);
        let mut session = session_with(Box::new(TallProbe), Settings::default());
        let mut window = window();
        let name = pack.path().to_str().unwrap();

        session
            .handle_event(&mut window, &base_config(), Some(name), &HostEvent::ConfigReloaded)
            .unwrap();
        assert_eq!(pack_layers(&window)[0].height, LayerSize::Pixels(800.0));

        let resized = HostEvent::Resized {
            pixel_width: 400,
            pixel_height: 500,
        };
        session
            .handle_event(&mut window, &base_config(), Some(name), &resized)
            .unwrap();
        assert_eq!(window.dimensions.pixel_height, 500);
        let layer = &pack_layers(&window)[0];
        assert_eq!(layer.height, LayerSize::Pixels(400.0));
        assert_eq!(layer.width, LayerSize::Pixels(80.0));
    }

    #[test]
    fn resize_without_pack_still_records_size() {
        let mut session = session();
        let mut window = window();
        let resized = HostEvent::Resized {
            pixel_width: 640,
            pixel_height: 480,
        };
        session
            .handle_event(&mut window, &base_config(), None, &resized)
            .unwrap();
        assert_eq!(window.dimensions.pixel_width, 640);
        assert!(window.overrides.is_none());
    }

    #[test]
    fn unparseable_overrides_abort_without_rewriting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");
        let original = r##"{"font_size": 12, "background": [{"source": {"Color": "#000000"}, "hsb": {"hue": 1.0}}]}"##;
        fs::write(&path, original).unwrap();
        let mut window = FileWindow::new(
            &path,
            WindowDimensions {
                pixel_width: 1600,
                pixel_height: 1000,
            },
        );

        let mut session = session();
        let err = session
            .add_image(&mut window, &base_config(), Path::new("/tmp/cat.png"), None)
            .unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse"));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);

        assert!(session.toggle(&mut window).is_err());
        assert!(session.is_visible());
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn failed_toggle_install_keeps_session_state() {
        let pack = random_pack(4);
        let mut session = session();
        let mut window = window();
        session
            .add_from_pack(&mut window, &base_config(), pack.path().to_str().unwrap(), None)
            .unwrap();
        let locked = session.daily_lock().cloned();
        assert!(locked.is_some());

        let mut read_only = ReadOnlyWindow(window);
        assert!(session.toggle(&mut read_only).is_err());
        assert!(session.is_visible());
        assert_eq!(session.daily_lock().cloned(), locked);
        assert!(pack_layers(&read_only.0).iter().all(|layer| layer.opacity == 0.6));
    }
}
