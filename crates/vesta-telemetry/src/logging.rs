// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logger installation.

use env_logger::{Builder, Env};
use serde::{Deserialize, Serialize};

/// How the process-wide logger is configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is not set, in `env_logger` syntax.
    pub default_filter: String,
    /// Per-module overrides applied on top of the filter.
    pub module_levels: Vec<(String, String)>,
    /// Prefix lines with a millisecond timestamp.
    pub timestamps: bool,
    /// Prefix lines with the module path.
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            module_levels: Vec::new(),
            timestamps: true,
            module_path: true,
        }
    }
}

impl LogConfig {
    /// Parses a configuration from RON. Missing fields take their defaults.
    pub fn from_ron_str(source: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(source)
    }

    /// Sets the fallback filter.
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    /// Adds a level override for `module`.
    pub fn with_module_level(mut self, module: impl Into<String>, level: impl Into<String>) -> Self {
        self.module_levels.push((module.into(), level.into()));
        self
    }

    fn builder(&self) -> Builder {
        let mut builder = Builder::from_env(Env::default().default_filter_or(self.default_filter.as_str()));
        for (module, level) in &self.module_levels {
            if let Ok(level) = level.parse::<log::LevelFilter>() {
                builder.filter_module(module, level);
            }
        }
        if self.timestamps {
            builder.format_timestamp_millis();
        } else {
            builder.format_timestamp(None);
        }
        builder.format_module_path(self.module_path);
        builder
    }
}

/// Installs `env_logger` as the global logger.
///
/// `RUST_LOG` takes precedence over [`LogConfig::default_filter`]. Returns `false` if a
/// logger was already installed, in which case the existing one is kept.
pub fn init_logging(config: &LogConfig) -> bool {
    match config.builder().try_init() {
        Ok(()) => {
            log::debug!("Logger installed (default filter '{}').", config.default_filter);
            for (module, level) in &config.module_levels {
                if level.parse::<log::LevelFilter>().is_err() {
                    log::warn!("Ignored unknown log level '{level}' for '{module}'.");
                }
            }
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_harmless() {
        let config = LogConfig::default().with_default_filter("warn");
        init_logging(&config);
        assert!(!init_logging(&config));
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let config = LogConfig::from_ron_str(
            r#"(default_filter: "debug", module_levels: [("vesta_infra", "trace")])"#,
        )
        .unwrap();
        assert_eq!(config.default_filter, "debug");
        assert_eq!(
            config.module_levels,
            vec![("vesta_infra".to_string(), "trace".to_string())]
        );
        assert!(config.timestamps);
    }
}
