use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{
    error::{Error, Result},
    hardware::Model,
    palette::DMG_PALETTE,
};

/// Which console to emulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EmulationModel {
    /// Pick CGB for cartridges that support it, DMG otherwise.
    #[default]
    Auto,
    Dmg,
    Cgb,
}

impl EmulationModel {
    pub fn resolve(self, cart_supports_cgb: bool) -> Model {
        match self {
            EmulationModel::Auto if cart_supports_cgb => Model::Cgb,
            EmulationModel::Auto | EmulationModel::Dmg => Model::Dmg,
            EmulationModel::Cgb => Model::Cgb,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    pub model: EmulationModel,
    /// 0xRRGGBB for DMG shades 0 (lightest) to 3.
    pub dmg_palette: [u32; 4],
    pub dmg_bootrom_path: Option<PathBuf>,
    pub cgb_bootrom_path: Option<PathBuf>,
    /// Write battery RAM back to `<rom>.sav` when the runner stops.
    pub autosave: bool,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            model: EmulationModel::Auto,
            dmg_palette: DMG_PALETTE,
            dmg_bootrom_path: None,
            cgb_bootrom_path: None,
            autosave: true,
        }
    }
}

impl EmulatorConfig {
    pub fn bootrom_path(&self, model: Model) -> Option<&Path> {
        match model {
            Model::Dmg => self.dmg_bootrom_path.as_deref(),
            Model::Cgb => self.cgb_bootrom_path.as_deref(),
        }
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml(&text)
    }

    /// Like [`load_from_file`](Self::load_from_file) but never fails: a
    /// missing file is silently replaced by defaults, anything else is
    /// logged first.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(Error::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                Self::default()
            }
            Err(e) => {
                warn!(
                    "Failed to load config {}: {e}; using defaults",
                    path.display()
                );
                Self::default()
            }
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let text = self.to_toml()?;
        std::fs::write(path, text).map_err(|e| Error::io(path, e))
    }
}

pub fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("dotboy").join("dotboy.toml");
        }
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("dotboy").join("dotboy.toml");
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("dotboy")
            .join("dotboy.toml");
    }

    PathBuf::from("dotboy.toml")
}
