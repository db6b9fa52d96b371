// Copyright 2025 Fernando Borretti
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

use std::fmt::Display;
use std::fmt::Formatter;
use std::fs::read_to_string;
use std::fs::write;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Fallible;
use crate::error::fail;
use crate::types::timestamp::Timestamp;

/// When to sweep the collection automatically.
#[derive(ValueEnum, Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum AutoRunMode {
    /// Never.
    #[default]
    #[serde(rename = "off")]
    #[value(name = "off")]
    Off,
    /// Every time a session starts.
    #[serde(rename = "on")]
    #[value(name = "on")]
    OnEveryStartup,
    /// When a session starts, if the last sweep was more than a day ago.
    #[serde(rename = "once")]
    #[value(name = "once")]
    OnceDailyAtStartup,
}

impl Display for AutoRunMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AutoRunMode::Off => write!(f, "off"),
            AutoRunMode::OnEveryStartup => write!(f, "on"),
            AutoRunMode::OnceDailyAtStartup => write!(f, "once"),
        }
    }
}

/// Collection-wide retirement settings.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalRetirementConfig {
    /// The tag added to retired notes.
    pub retirement_tag: String,
    /// The deck retired cards are moved to.
    pub retirement_deck_name: String,
    pub auto_run: AutoRunMode,
    /// Notify when a card is retired while reviewing.
    pub notify_on_incremental: bool,
    /// Notify with a summary after a sweep.
    pub notify_on_batch: bool,
    pub last_batch_run: Timestamp,
}

impl Default for GlobalRetirementConfig {
    fn default() -> Self {
        Self {
            retirement_tag: "Retired".to_string(),
            retirement_deck_name: "Retired Cards".to_string(),
            auto_run: AutoRunMode::Off,
            notify_on_incremental: true,
            notify_on_batch: true,
            last_batch_run: Timestamp::default(),
        }
    }
}

impl GlobalRetirementConfig {
    /// Tags are stored space-separated, so the retirement tag must be a
    /// single word.
    pub fn validate(&self) -> Fallible<()> {
        let tag = &self.retirement_tag;
        if tag.is_empty() || tag.contains(char::is_whitespace) {
            return fail(format!(
                "invalid retirement tag '{tag}': the retirement tag must be a single word."
            ));
        }
        Ok(())
    }
}

/// Where the engine gets its settings from, and where it saves them.
pub trait ConfigurationGate {
    fn current(&self) -> Fallible<GlobalRetirementConfig>;

    fn persist(&self, config: &GlobalRetirementConfig) -> Fallible<()>;
}

/// Settings stored in a TOML file. A missing file means default settings.
pub struct TomlConfigGate {
    path: PathBuf,
}

impl TomlConfigGate {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ConfigurationGate for TomlConfigGate {
    fn current(&self) -> Fallible<GlobalRetirementConfig> {
        if !self.path.exists() {
            log::debug!("No settings file, using defaults.");
            return Ok(GlobalRetirementConfig::default());
        }
        let content = read_to_string(&self.path)?;
        let config: GlobalRetirementConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn persist(&self, config: &GlobalRetirementConfig) -> Fallible<()> {
        config.validate()?;
        log::debug!("Saving settings to {:?}.", self.path);
        let content = toml::to_string(config)?;
        write(&self.path, content)?;
        Ok(())
    }
}
