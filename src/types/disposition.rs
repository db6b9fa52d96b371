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
use std::fmt::Display;
use std::fmt::Formatter;

use serde::Serialize;

use crate::types::ids::CardId;
use crate::types::ids::NoteId;

/// An action taken on a retired card or its note.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// Applies to the note, and therefore to all of its cards.
    Delete,
    Suspend,
    /// Applies to the note.
    Tag,
    Move,
}

impl Disposition {
    /// The order in which dispositions are applied to the collection. Delete
    /// comes last so that no card-level operation refers to a removed note.
    pub const APPLY_ORDER: [Disposition; 4] = [
        Disposition::Suspend,
        Disposition::Tag,
        Disposition::Move,
        Disposition::Delete,
    ];
}

impl Display for Disposition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Disposition::Delete => write!(f, "delete"),
            Disposition::Suspend => write!(f, "suspend"),
            Disposition::Tag => write!(f, "tag"),
            Disposition::Move => write!(f, "move"),
        }
    }
}

/// The work accumulated over a sweep or a single-card check. Each entry is
/// recorded at most once.
#[derive(Default, Debug)]
pub struct DispositionSet {
    pub notes_to_delete: BTreeSet<NoteId>,
    pub notes_to_tag: BTreeSet<NoteId>,
    pub cards_to_suspend: BTreeSet<CardId>,
    pub cards_to_move: BTreeSet<CardId>,
}

impl DispositionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.notes_to_delete.is_empty()
            && self.notes_to_tag.is_empty()
            && self.cards_to_suspend.is_empty()
            && self.cards_to_move.is_empty()
    }

    /// How many entries are queued for the given disposition.
    pub fn len_of(&self, disposition: Disposition) -> usize {
        match disposition {
            Disposition::Delete => self.notes_to_delete.len(),
            Disposition::Suspend => self.cards_to_suspend.len(),
            Disposition::Tag => self.notes_to_tag.len(),
            Disposition::Move => self.cards_to_move.len(),
        }
    }
}
