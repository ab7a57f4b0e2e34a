use directories::UserDirs;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::blobs::{AreaBand, DEFAULT_MIN_AREA, default_max_area};
use crate::control::ControlSettings;
use crate::error::{Error, Result};
use crate::frame::Intrinsics;
use crate::geometry::Rect;
use crate::publish::DEFAULT_ADDRESS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneSettings {
    pub angle: i32,
    pub distance: i32,
    pub local_depth: bool,
}

impl Default for PlaneSettings {
    fn default() -> Self {
        Self {
            angle: 0,
            distance: 800,
            local_depth: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneSettings {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for ZoneSettings {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 640.0,
            height: 480.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobSettings {
    pub min_area: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_area: Option<usize>,
    /// Publish at most this many blobs, the largest ones.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_count: Option<usize>,
}

impl Default for BlobSettings {
    fn default() -> Self {
        Self {
            min_area: DEFAULT_MIN_AREA,
            max_area: None,
            max_count: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    pub width: usize,
    pub height: usize,
    pub fps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay: Option<PathBuf>,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Default for SensorSettings {
    fn default() -> Self {
        let k = Intrinsics::nominal_640x480();
        Self {
            width: 640,
            height: 480,
            fps: 30,
            replay: None,
            fx: k.fx,
            fy: k.fy,
            cx: k.cx,
            cy: k.cy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscSettings {
    pub host: String,
    pub port: u16,
    pub address: String,
}

impl Default for OscSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9999,
            address: DEFAULT_ADDRESS.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub plane: PlaneSettings,
    pub zone: ZoneSettings,
    pub blobs: BlobSettings,
    pub sensor: SensorSettings,
    pub osc: OscSettings,
}

impl Settings {
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let settings: Settings = toml::from_str(text).map_err(|source| Error::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&txt, path)
    }

    pub fn validate(&self) -> Result<()> {
        let z = &self.zone;
        if ![z.x, z.y, z.width, z.height].iter().all(|v| v.is_finite()) {
            return Err(Error::ConfigInvalid("zone values must be finite".into()));
        }
        if z.width <= 0.0 || z.height <= 0.0 {
            return Err(Error::ConfigInvalid(
                "zone width and height must be positive".into(),
            ));
        }
        if self.sensor.width == 0 || self.sensor.height == 0 {
            return Err(Error::ConfigInvalid("sensor size must be positive".into()));
        }
        if self.sensor.fps == 0 {
            return Err(Error::ConfigInvalid("sensor.fps must be positive".into()));
        }
        let k = self.intrinsics();
        if !(k.fx.is_finite() && k.fy.is_finite() && k.fx > 0.0 && k.fy > 0.0) {
            return Err(Error::ConfigInvalid(
                "sensor focal lengths must be finite and positive".into(),
            ));
        }
        if !(k.cx.is_finite() && k.cy.is_finite()) {
            return Err(Error::ConfigInvalid(
                "sensor principal point must be finite".into(),
            ));
        }
        if self.blobs.max_count == Some(0) {
            return Err(Error::ConfigInvalid("blobs.max_count must be positive".into()));
        }
        if let Some(max) = self.blobs.max_area {
            if self.blobs.min_area > max {
                return Err(Error::ConfigInvalid(format!(
                    "blobs.min_area ({}) exceeds blobs.max_area ({max})",
                    self.blobs.min_area
                )));
            }
        }
        if self.osc.port == 0 {
            return Err(Error::ConfigInvalid("osc.port must be non-zero".into()));
        }
        if !self.osc.address.starts_with('/') {
            return Err(Error::ConfigInvalid(format!(
                "osc.address '{}' must start with '/'",
                self.osc.address
            )));
        }
        Ok(())
    }

    pub fn area_band(&self) -> AreaBand {
        let max = self
            .blobs
            .max_area
            .unwrap_or_else(|| default_max_area(self.sensor.width, self.sensor.height));
        AreaBand::new(self.blobs.min_area, max)
    }

    pub fn intrinsics(&self) -> Intrinsics {
        Intrinsics {
            fx: self.sensor.fx,
            fy: self.sensor.fy,
            cx: self.sensor.cx,
            cy: self.sensor.cy,
        }
    }

    pub fn osc_target(&self) -> String {
        format!("{}:{}", self.osc.host, self.osc.port)
    }

    pub fn control(&self) -> ControlSettings {
        ControlSettings {
            angle: self.plane.angle,
            distance: self.plane.distance,
            active_zone: Rect::new(self.zone.x, self.zone.y, self.zone.width, self.zone.height),
            local_depth: self.plane.local_depth,
            area: Some(self.area_band()),
            max_blobs: self.blobs.max_count,
        }
    }

    /// Copy the user-adjustable values back for saving.
    pub fn store_control(&mut self, control: &ControlSettings) {
        self.plane.angle = control.angle;
        self.plane.distance = control.distance;
        self.plane.local_depth = control.local_depth;
        self.zone = ZoneSettings {
            x: control.active_zone.x,
            y: control.active_zone.y,
            width: control.active_zone.width,
            height: control.active_zone.height,
        };
    }
}

fn default_settings_text() -> &'static str {
    include_str!("../settings/default.toml")
}

pub fn config_dir() -> Result<PathBuf> {
    let home = UserDirs::new()
        .ok_or_else(|| Error::ConfigInvalid("cannot locate home directory".into()))?
        .home_dir()
        .to_path_buf();
    Ok(home.join(".config").join("depthctl"))
}

/// Settings file on disk plus the last successfully loaded contents.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    pub path: PathBuf,
    pub settings: Settings,
}

impl SettingsStore {
    pub fn load_or_install_default() -> Result<Self> {
        let dir = config_dir()?;
        Self::open_in(&dir)
    }

    /// Open `settings.toml` in `dir`, installing the bundled default first
    /// when it does not exist.
    pub fn open_in(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        let path = dir.join("settings.toml");
        if !path.exists() {
            fs::write(&path, default_settings_text()).map_err(|e| Error::io(&path, e))?;
            info!("installed default settings at {}", path.display());
        }
        let settings = Settings::load(&path)?;
        Ok(Self { path, settings })
    }

    /// Re-read the file. On failure the previous settings stay active.
    pub fn reload(&mut self) -> Result<&Settings> {
        match Settings::load(&self.path) {
            Ok(s) => {
                self.settings = s;
                Ok(&self.settings)
            }
            Err(e) => {
                warn!("keeping previous settings: {e}");
                Err(e)
            }
        }
    }

    pub fn save(&mut self, control: &ControlSettings) -> Result<()> {
        self.settings.store_control(control);
        let txt = toml::to_string_pretty(&self.settings)?;
        fs::write(&self.path, txt).map_err(|e| Error::io(&self.path, e))?;
        info!("saved settings to {}", self.path.display());
        Ok(())
    }

    pub fn doctor_report(&self) -> serde_json::Value {
        let replay = self.settings.sensor.replay.as_ref();
        serde_json::json!({
            "settings": self.path,
            "replay": replay,
            "replay_present": replay.map(|p| p.exists()),
            "osc_target": self.settings.osc_target(),
            "osc_address": self.settings.osc.address,
            "sensor": format!("{}x{}", self.settings.sensor.width, self.settings.sensor.height),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("depthctl-cfg-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn bundled_default_parses() {
        let s = Settings::parse(default_settings_text(), Path::new("default.toml")).unwrap();
        assert_eq!(s.plane.distance, 800);
        assert_eq!(s.area_band(), AreaBand::new(900, 640 * 480 / 2));
        assert_eq!(s.osc_target(), "127.0.0.1:9999");
    }

    #[test]
    fn partial_file_uses_defaults() {
        let s = Settings::parse("[plane]\nangle = 12\n", Path::new("x.toml")).unwrap();
        assert_eq!(s.plane.angle, 12);
        assert_eq!(s.plane.distance, 800);
        assert_eq!(s.osc, OscSettings::default());
    }

    #[test]
    fn rejects_degenerate_zone_and_bad_band() {
        let err = Settings::parse("[zone]\nwidth = 0.0\n", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid(_)));
        let err = Settings::parse("[blobs]\nmin_area = 50\nmax_area = 10\n", Path::new("x.toml"))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid(_)));
        let err = Settings::parse("[plane]\nangle = \"up\"\n", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn rejects_negative_zone_extents() {
        let err = Settings::parse("[zone]\nwidth = -320.0\n", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid(_)));
        let err = Settings::parse("[zone]\nheight = -1.0\n", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid(_)));
    }

    #[test]
    fn rejects_non_finite_intrinsics() {
        for text in [
            "[sensor]\nfx = nan\n",
            "[sensor]\nfy = inf\n",
            "[sensor]\nfx = -580.0\n",
            "[sensor]\ncx = nan\n",
            "[sensor]\ncy = -inf\n",
        ] {
            let err = Settings::parse(text, Path::new("x.toml")).unwrap_err();
            assert!(matches!(err, Error::ConfigInvalid(_)), "{text:?} accepted");
        }
    }

    #[test]
    fn blob_count_cap_reaches_controls() {
        let s = Settings::parse("[blobs]\nmax_count = 2\n", Path::new("x.toml")).unwrap();
        assert_eq!(s.control().max_blobs, Some(2));
        assert_eq!(Settings::default().control().max_blobs, None);
        let err = Settings::parse("[blobs]\nmax_count = 0\n", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid(_)));
    }

    #[test]
    fn out_of_range_controls_are_left_for_clamping() {
        let s = Settings::parse("[plane]\nangle = 70\ndistance = 9000\n", Path::new("x.toml")).unwrap();
        let c = s.control();
        assert_eq!((c.angle, c.distance), (70, 9000));
    }

    #[test]
    fn save_then_reload_round_trips_controls() {
        let dir = temp_dir("save");
        let mut store = SettingsStore::open_in(&dir).unwrap();
        let mut control = store.settings.control();
        control.angle = -12;
        control.distance = 1230;
        control.active_zone = Rect::new(10.0, 20.0, 300.0, 200.0);
        control.local_depth = false;
        store.save(&control).unwrap();

        let reopened = SettingsStore::open_in(&dir).unwrap();
        assert_eq!(reopened.settings.control(), control);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn failed_reload_keeps_previous_settings() {
        let dir = temp_dir("reload");
        let mut store = SettingsStore::open_in(&dir).unwrap();
        fs::write(&store.path, "[zone]\nheight = 0.0\n").unwrap();
        assert!(store.reload().is_err());
        assert_eq!(store.settings.zone.height, 480.0);
        fs::remove_dir_all(dir).ok();
    }
}
