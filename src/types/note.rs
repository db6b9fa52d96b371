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

use std::collections::BTreeSet;

use crate::types::card::Card;
use crate::types::ids::CardId;
use crate::types::ids::NoteId;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Note {
    pub id: NoteId,
    pub tags: BTreeSet<String>,
    pub cards: Vec<Card>,
}

impl Note {
    /// Tags are compared case-insensitively.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn card(&self, card_id: CardId) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == card_id)
    }
}

/// Parse the space-separated tag string the collection stores.
pub fn parse_tags(tags: &str) -> BTreeSet<String> {
    tags.split_whitespace().map(|t| t.to_string()).collect()
}

/// The inverse of [`parse_tags`]. Padded with spaces on both ends so that
/// single tags can be matched with `like '% tag %'`.
pub fn join_tags(tags: &BTreeSet<String>) -> String {
    if tags.is_empty() {
        String::new()
    } else {
        let joined: Vec<&str> = tags.iter().map(|t| t.as_str()).collect();
        format!(" {} ", joined.join(" "))
    }
}
