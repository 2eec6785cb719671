//! Engine configuration: keyboard scheme and normalization toggles.
//!
//! A `PinInConfig` is plain data. Read the active one with
//! [`PinIn::get_config`](crate::PinIn::get_config), adjust it with the
//! builder methods and publish it with [`PinIn::commit`](crate::PinIn::commit).
//!
//! # Example
//!
//! ```rust
//! use pinin::{Keyboard, PinInConfig};
//!
//! let config = PinInConfig::default()
//!     .with_keyboard(Keyboard::Xiaohe)
//!     .with_zh2z(true);
//! let text = config.to_toml_string().unwrap();
//! assert_eq!(PinInConfig::from_toml_str(&text).unwrap(), config);
//! ```
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::keyboard::Keyboard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PinInConfig {
    pub keyboard: Keyboard,
    // Confusable pairs merged before comparison
    pub zh2z: bool, // zhong ↔ zong
    pub sh2s: bool, // shan ↔ san
    pub ch2c: bool, // chang ↔ cang
    pub ang2an: bool, // yang ↔ yan
    pub ing2in: bool, // ying ↔ yin
    pub eng2en: bool, // feng ↔ fen
    pub u2v: bool,  // lv ↔ lu
    /// Abbreviate a syllable only by its first keystroke.
    pub first_char: bool,
}

impl Default for PinInConfig {
    fn default() -> Self {
        Self {
            keyboard: Keyboard::Quanpin,
            zh2z: false,
            sh2s: false,
            ch2c: false,
            ang2an: false,
            ing2in: false,
            eng2en: false,
            u2v: false,
            first_char: false,
        }
    }
}

impl PinInConfig {
    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = keyboard;
        self
    }

    pub fn with_zh2z(mut self, enabled: bool) -> Self {
        self.zh2z = enabled;
        self
    }

    pub fn with_sh2s(mut self, enabled: bool) -> Self {
        self.sh2s = enabled;
        self
    }

    pub fn with_ch2c(mut self, enabled: bool) -> Self {
        self.ch2c = enabled;
        self
    }

    pub fn with_ang2an(mut self, enabled: bool) -> Self {
        self.ang2an = enabled;
        self
    }

    pub fn with_ing2in(mut self, enabled: bool) -> Self {
        self.ing2in = enabled;
        self
    }

    pub fn with_eng2en(mut self, enabled: bool) -> Self {
        self.eng2en = enabled;
        self
    }

    pub fn with_u2v(mut self, enabled: bool) -> Self {
        self.u2v = enabled;
        self
    }

    pub fn with_first_char(mut self, enabled: bool) -> Self {
        self.first_char = enabled;
        self
    }

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("parsing pinin config")
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("encoding pinin config")
    }

    pub fn load_toml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml_string()?)
            .with_context(|| format!("writing config {}", path.display()))
    }
}
