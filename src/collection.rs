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

use std::env::current_dir;
use std::path::PathBuf;

use crate::config::TomlConfigGate;
use crate::db::Database;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;
use crate::notify::ConsoleNotifier;
use crate::retire::engine::RetirementEngine;

const DATABASE_FILE: &str = "collection.db";
const SETTINGS_FILE: &str = "retirement.toml";

/// A collection directory: the card database plus the retirement settings.
pub struct Collection {
    pub directory: PathBuf,
    pub db: Database,
}

impl Collection {
    /// Open the collection in the given directory, or the current directory.
    /// The database is created if it does not exist.
    pub fn new(directory: Option<String>) -> Fallible<Self> {
        let directory: PathBuf = match directory {
            Some(dir) => PathBuf::from(dir),
            None => current_dir()?,
        };
        let directory = if directory.exists() {
            directory.canonicalize()?
        } else {
            return fail("directory does not exist.");
        };

        let db_path: PathBuf = directory.join(DATABASE_FILE);
        let db_path: &str = db_path
            .to_str()
            .ok_or_else(|| ErrorReport::new("invalid path"))?;
        log::debug!("Opening collection at {db_path}.");
        let db: Database = Database::new(db_path)?;

        Ok(Self { directory, db })
    }

    pub fn settings(&self) -> TomlConfigGate {
        TomlConfigGate::new(self.directory.join(SETTINGS_FILE))
    }

    pub fn engine(&self) -> Fallible<RetirementEngine<Database, TomlConfigGate>> {
        RetirementEngine::new(self.db.clone(), self.settings(), Box::new(ConsoleNotifier))
    }
}
