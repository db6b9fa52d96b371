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

use serde::Deserialize;
use serde::Serialize;

use crate::error::StoreError;
use crate::types::ids::DeckId;

/// A deck's retirement settings.
///
/// Stored in the deck's options as a JSON object. Every field is required: a
/// document missing any of them is malformed.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct DeckRetirementPolicy {
    #[serde(rename = "retire")]
    pub enabled: bool,
    /// Cards with an interval strictly greater than this are retired.
    #[serde(rename = "retireInterval")]
    pub retire_interval_days: u32,
    pub delete: bool,
    pub suspend: bool,
    pub tag: bool,
    #[serde(rename = "move")]
    pub move_: bool,
}

impl Default for DeckRetirementPolicy {
    /// The settings a deck starts out with before the user touches them.
    fn default() -> Self {
        Self {
            enabled: false,
            retire_interval_days: 0,
            delete: false,
            suspend: true,
            tag: true,
            move_: false,
        }
    }
}

impl DeckRetirementPolicy {
    /// Build a policy from user-chosen settings. The policy is switched on
    /// only if the interval is positive and at least one action is chosen.
    pub fn configured(
        retire_interval_days: u32,
        delete: bool,
        suspend: bool,
        tag: bool,
        move_: bool,
    ) -> Self {
        let any_action = delete || suspend || tag || move_;
        Self {
            enabled: any_action && retire_interval_days > 0,
            retire_interval_days,
            delete,
            suspend,
            tag,
            move_,
        }
    }

    pub fn parse(deck_id: DeckId, json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(|e| StoreError::PolicyMalformed {
            deck_id,
            reason: e.to_string(),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
