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

use std::error::Error;
use std::fmt::Display;
use std::fmt::Formatter;

use crate::types::disposition::Disposition;
use crate::types::ids::DeckId;

/// A generic, message-carrying error used at the application level.
#[derive(Debug)]
pub struct ErrorReport {
    message: String,
}

pub type Fallible<T> = Result<T, ErrorReport>;

impl ErrorReport {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl Display for ErrorReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ErrorReport {}

pub fn fail<T>(message: impl Into<String>) -> Fallible<T> {
    Err(ErrorReport {
        message: message.into(),
    })
}

impl From<std::io::Error> for ErrorReport {
    fn from(value: std::io::Error) -> Self {
        ErrorReport::new(&format!("I/O error: {value}"))
    }
}

impl From<rusqlite::Error> for ErrorReport {
    fn from(value: rusqlite::Error) -> Self {
        ErrorReport::new(&format!("database error: {value}"))
    }
}

impl From<serde_json::Error> for ErrorReport {
    fn from(value: serde_json::Error) -> Self {
        ErrorReport::new(&format!("JSON error: {value}"))
    }
}

impl From<toml::de::Error> for ErrorReport {
    fn from(value: toml::de::Error) -> Self {
        ErrorReport::new(&format!("invalid settings file: {value}"))
    }
}

impl From<toml::ser::Error> for ErrorReport {
    fn from(value: toml::ser::Error) -> Self {
        ErrorReport::new(&format!("failed to serialize settings: {value}"))
    }
}

impl From<StoreError> for ErrorReport {
    fn from(value: StoreError) -> Self {
        ErrorReport::new(&value.to_string())
    }
}

impl From<RetirementError> for ErrorReport {
    fn from(value: RetirementError) -> Self {
        ErrorReport::new(&value.to_string())
    }
}

/// Errors raised by the collection and policy stores.
#[derive(Debug)]
pub enum StoreError {
    /// The store could not be read from.
    Unavailable(String),
    /// A deck's retirement policy is missing a required field or is otherwise
    /// unreadable.
    PolicyMalformed { deck_id: DeckId, reason: String },
    /// A bulk mutation did not go through.
    Mutation(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(reason) => write!(f, "collection unavailable: {reason}"),
            StoreError::PolicyMalformed { deck_id, reason } => {
                write!(f, "malformed retirement policy for deck {deck_id}: {reason}")
            }
            StoreError::Mutation(reason) => write!(f, "mutation failed: {reason}"),
        }
    }
}

impl Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        StoreError::Unavailable(value.to_string())
    }
}

/// Errors that abort a retirement run.
#[derive(Debug)]
pub enum RetirementError {
    /// The collection could not be read. Nothing was mutated.
    StoreUnavailable(String),
    /// A bulk disposition call failed. The dispositions in `applied` went
    /// through before the failure and were not rolled back.
    PartialMutationFailure {
        failed: Disposition,
        applied: Vec<Disposition>,
        reason: String,
    },
}

impl RetirementError {
    pub fn from_read(err: StoreError) -> Self {
        RetirementError::StoreUnavailable(err.to_string())
    }

    pub fn from_mutation(failed: Disposition, applied: &[Disposition], err: StoreError) -> Self {
        RetirementError::PartialMutationFailure {
            failed,
            applied: applied.to_vec(),
            reason: err.to_string(),
        }
    }
}

impl Display for RetirementError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RetirementError::StoreUnavailable(reason) => {
                write!(f, "retirement aborted: {reason}")
            }
            RetirementError::PartialMutationFailure {
                failed,
                applied,
                reason,
            } => {
                write!(f, "retirement aborted while applying {failed}: {reason}")?;
                if !applied.is_empty() {
                    let applied: Vec<String> = applied.iter().map(|d| d.to_string()).collect();
                    write!(f, " (already applied: {})", applied.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

impl Error for RetirementError {}
