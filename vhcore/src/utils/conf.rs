//! Process-wide configuration.
//!
//! The two switches that drive the proof-mode policy are read once, before the
//! first obligation is dispatched, and are immutable afterwards. They are moved
//! into the dispatcher instead of being read from ambient state.
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    magic::{ENV_CONFIG_PATH, ENV_DEBUG, ENV_DO_PROVE},
    utils::error::{HarnessError, VhResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessConfig {
    do_prove: bool,
    debug: bool,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            do_prove: true,
            debug: false,
        }
    }
}

impl ProcessConfig {
    pub const fn new(do_prove: bool, debug: bool) -> Self {
        Self { do_prove, debug }
    }

    /// Produce real proofs, production tactics.
    pub const fn proving() -> Self {
        Self::new(true, false)
    }

    /// Trust every specification without symbolic execution.
    pub const fn assume_only() -> Self {
        Self::new(false, false)
    }

    /// When `false`, every production entry point registers its specification
    /// as trusted instead of verifying it.
    pub const fn do_prove(&self) -> bool {
        self.do_prove
    }

    /// When `true`, SMT discharges go through the debug tactic (extra
    /// simplification and goal printing).
    pub const fn debug(&self) -> bool {
        self.debug
    }

    /// Parse a TOML document; `file` is only used for error reporting.
    pub fn from_toml_str(data: &str, file: &str) -> VhResult<Self> {
        toml::from_str(data).map_err(|source| HarnessError::ConfigParse {
            source,
            file: file.to_string(),
        })
    }

    pub fn load_file(path: impl AsRef<Path>) -> VhResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        Self::from_toml_str(&data, &path.display().to_string())
    }

    /// Build the configuration from the process environment.
    ///
    /// The file named by `VH_CONFIG_PATH` is loaded first (defaults apply when
    /// unset), then `VH_DO_PROVE` and `VH_DEBUG` override individual switches.
    pub fn from_env() -> VhResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ProcessConfig::from_env`] with an explicit variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> VhResult<Self> {
        let mut config = match lookup(ENV_CONFIG_PATH) {
            Some(path) => Self::load_file(path)?,
            None => Self::default(),
        };

        if let Some(value) = lookup(ENV_DO_PROVE) {
            config.do_prove = parse_switch(ENV_DO_PROVE, &value)?;
        }
        if let Some(value) = lookup(ENV_DEBUG) {
            config.debug = parse_switch(ENV_DEBUG, &value)?;
        }

        debug!(
            "Process configuration: do_prove = {}, debug = {}",
            config.do_prove, config.debug
        );
        Ok(config)
    }
}

fn parse_switch(key: &str, value: &str) -> VhResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(HarnessError::ConfigValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_prove_without_debug() {
        let config = ProcessConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ProcessConfig::proving());
    }

    #[test]
    fn toml_fills_missing_keys_with_defaults() {
        let config = ProcessConfig::from_toml_str("debug = true", "inline").unwrap();
        assert!(config.do_prove());
        assert!(config.debug());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ProcessConfig::from_toml_str("do_prove = true\nverbose = 3", "inline");
        assert!(matches!(err, Err(HarnessError::ConfigParse { .. })));
    }

    #[test]
    fn environment_overrides() {
        let config =
            ProcessConfig::from_lookup(lookup(&[(ENV_DO_PROVE, "off"), (ENV_DEBUG, "YES")]))
                .unwrap();
        assert_eq!(config, ProcessConfig::new(false, true));
    }

    #[test]
    fn invalid_switch_value() {
        let err = ProcessConfig::from_lookup(lookup(&[(ENV_DEBUG, "maybe")])).unwrap_err();
        assert!(matches!(err, HarnessError::ConfigValue { value, .. } if value == "maybe"));
    }

    #[test]
    fn file_is_loaded_before_overrides() {
        let dir = std::env::temp_dir().join(format!("vhcore-conf-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("harness.toml");
        std::fs::write(&path, "do_prove = false\ndebug = true\n").unwrap();

        let path_str = path.display().to_string();
        let config = ProcessConfig::from_lookup(lookup(&[
            (ENV_CONFIG_PATH, path_str.as_str()),
            (ENV_DEBUG, "0"),
        ]))
        .unwrap();
        assert_eq!(config, ProcessConfig::new(false, false));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
