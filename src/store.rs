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

//! The interfaces the retirement engine uses to read and mutate a
//! collection. The engine only talks to these traits; [`crate::db::Database`]
//! is the SQLite-backed implementation.

use std::collections::BTreeSet;

use crate::error::StoreError;
use crate::types::ids::CardId;
use crate::types::ids::DeckId;
use crate::types::ids::NoteId;
use crate::types::note::Note;
use crate::types::policy::DeckRetirementPolicy;

/// Supplies per-deck retirement policies.
pub trait PolicyStore {
    /// Return the deck's retirement policy, if it has one.
    ///
    /// Returns [`StoreError::PolicyMalformed`] if the deck has a policy that
    /// cannot be read.
    fn policy_for_deck(&self, deck_id: DeckId) -> Result<Option<DeckRetirementPolicy>, StoreError>;
}

/// A deck, as far as retirement cares.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DeckRef {
    pub id: DeckId,
    /// Filtered decks never receive moved cards.
    pub filtered: bool,
}

/// The result of a bulk move.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveOutcome {
    /// This many cards were moved.
    Moved(usize),
    /// The target is a filtered deck, so nothing was moved.
    FilteredTarget,
}

/// Reads and mutates cards and notes. Every mutating call either applies in
/// full or fails as a unit.
pub trait CollectionAccessor {
    fn list_all_note_ids(&self) -> Result<Vec<NoteId>, StoreError>;

    /// Fetch a note together with all of its cards.
    fn get_note(&self, note_id: NoteId) -> Result<Note, StoreError>;

    /// Remove the notes and all of their cards.
    fn delete_notes(&self, note_ids: &BTreeSet<NoteId>) -> Result<(), StoreError>;

    fn suspend_cards(&self, card_ids: &BTreeSet<CardId>) -> Result<(), StoreError>;

    fn add_tag_to_notes(&self, note_ids: &BTreeSet<NoteId>, tag: &str) -> Result<(), StoreError>;

    /// Move the cards into the given deck, taking them out of any filtered
    /// deck they are in. Cards are never moved into a filtered deck: in that
    /// case nothing happens and [`MoveOutcome::FilteredTarget`] is returned.
    fn move_cards_to_deck(
        &self,
        card_ids: &BTreeSet<CardId>,
        deck_id: DeckId,
    ) -> Result<MoveOutcome, StoreError>;

    /// Look up a deck by name.
    fn find_deck(&self, name: &str) -> Result<Option<DeckRef>, StoreError>;

    /// Look up a deck by name, creating a regular deck if none exists.
    fn ensure_deck(&self, name: &str) -> Result<DeckId, StoreError>;
}
