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

use crate::types::ids::CardId;
use crate::types::ids::DeckId;
use crate::types::ids::NoteId;

/// A snapshot of a card as read from the collection.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Card {
    /// The card's ID.
    pub id: CardId,
    /// The note this card was generated from.
    pub note_id: NoteId,
    /// The deck the card currently sits in.
    pub deck_id: DeckId,
    /// If the card is parked in a filtered deck, the deck it came from.
    pub original_deck_id: Option<DeckId>,
    /// The current review interval in days. Zero for cards that have never
    /// been studied.
    pub interval: u32,
    /// Whether the card is suspended.
    pub suspended: bool,
}

impl Card {
    /// The deck whose settings govern this card.
    pub fn effective_deck_id(&self) -> DeckId {
        self.original_deck_id.unwrap_or(self.deck_id)
    }

    pub fn is_new(&self) -> bool {
        self.interval == 0
    }
}
