//! The subset of `firebase.json` this tool reads: emulator ports.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;

pub const FIREBASE_CONFIG_FILE: &str = "firebase.json";

/// Emulator UI port when `emulators.ui.port` is not set.
pub const DEFAULT_UI_PORT: u16 = 4000;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FirebaseConfig {
    /// Emulator entries keyed by service name. Kept as raw JSON because the
    /// same object also holds scalar settings such as `singleProjectMode`.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub emulators: BTreeMap<String, Value>,
}

fn null_as_empty<'de, D>(de: D) -> std::result::Result<BTreeMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::deserialize(de)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmulatorConfig {
    pub port: Option<u16>,
    pub enabled: Option<bool>,
}

impl EmulatorConfig {
    /// `port` may be a number or a numeric string; zero counts as unset.
    fn from_value(v: &Value) -> Option<Self> {
        let obj = v.as_object()?;
        let port = match obj.get("port") {
            Some(Value::Number(n)) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            Some(Value::String(s)) => s.trim().parse::<u16>().ok(),
            _ => None,
        }
        .filter(|&p| p != 0);
        Some(Self {
            port,
            enabled: obj.get("enabled").and_then(Value::as_bool),
        })
    }
}

impl FirebaseConfig {
    /// Load `firebase.json`. Returns `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// The emulator entry for `name`, if present and object-shaped.
    pub fn emulator(&self, name: &str) -> Option<EmulatorConfig> {
        EmulatorConfig::from_value(self.emulators.get(name)?)
    }

    /// Every configured emulator port. The UI is included on its default
    /// port unless explicitly disabled.
    pub fn emulator_ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self
            .emulators
            .keys()
            .filter(|name| name.as_str() != "ui")
            .filter_map(|name| self.emulator(name)?.port)
            .collect();

        let ui = self.emulator("ui").unwrap_or_default();
        if ui.enabled != Some(false) {
            ports.push(ui.port.unwrap_or(DEFAULT_UI_PORT));
        }
        ports
    }
}
