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

use crate::error::StoreError;
use crate::store::DeckRef;
use crate::store::PolicyStore;
use crate::types::card::Card;
use crate::types::disposition::Disposition;
use crate::types::disposition::DispositionSet;
use crate::types::note::Note;
use crate::types::policy::DeckRetirementPolicy;

/// The outcome of evaluating a card against its deck's policy.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Evaluation {
    pub eligible: bool,
    pub delete: bool,
    pub suspend: bool,
    pub tag: bool,
    pub move_: bool,
}

/// Collection-wide facts the idempotence checks need.
pub struct GateContext<'a> {
    /// The tag retired notes receive.
    pub retirement_tag: &'a str,
    /// The deck retired cards are moved to, if it exists yet.
    pub retirement_deck: Option<DeckRef>,
}

/// Decide whether a card has crossed its deck's retirement threshold, and
/// what the policy says to do with it.
///
/// Deletion is exclusive: when the policy deletes, no other disposition is
/// set, since the note and all its cards are going away.
pub fn evaluate(card: &Card, policy: Option<&DeckRetirementPolicy>) -> Evaluation {
    let Some(policy) = policy else {
        return Evaluation::default();
    };
    if !policy.enabled || card.interval <= policy.retire_interval_days {
        return Evaluation::default();
    }
    if policy.delete {
        Evaluation {
            eligible: true,
            delete: true,
            ..Evaluation::default()
        }
    } else {
        Evaluation {
            eligible: true,
            delete: false,
            suspend: policy.suspend,
            tag: policy.tag,
            move_: policy.move_,
        }
    }
}

impl Evaluation {
    /// Drop the dispositions that are already in effect for this card.
    pub fn needed(self, card: &Card, note: &Note, ctx: &GateContext<'_>) -> Evaluation {
        if !self.eligible {
            return self;
        }
        Evaluation {
            eligible: true,
            delete: self.delete,
            suspend: self.suspend && !card.suspended,
            tag: self.tag && !note.has_tag(ctx.retirement_tag),
            move_: self.move_ && can_move(card, ctx.retirement_deck),
        }
    }

    pub fn dispositions(&self) -> BTreeSet<Disposition> {
        let mut dispositions = BTreeSet::new();
        if self.delete {
            dispositions.insert(Disposition::Delete);
        }
        if self.suspend {
            dispositions.insert(Disposition::Suspend);
        }
        if self.tag {
            dispositions.insert(Disposition::Tag);
        }
        if self.move_ {
            dispositions.insert(Disposition::Move);
        }
        dispositions
    }

    /// Add this card's dispositions to the set. Returns true if the card
    /// contributed anything.
    pub fn queue(&self, card: &Card, note: &Note, set: &mut DispositionSet) -> bool {
        if self.delete {
            set.notes_to_delete.insert(note.id);
        }
        if self.suspend {
            set.cards_to_suspend.insert(card.id);
        }
        if self.tag {
            set.notes_to_tag.insert(note.id);
        }
        if self.move_ {
            set.cards_to_move.insert(card.id);
        }
        self.delete || self.suspend || self.tag || self.move_
    }
}

/// A card needs moving unless it is already in the retirement deck. Nothing
/// can be moved into a filtered retirement deck.
fn can_move(card: &Card, retirement_deck: Option<DeckRef>) -> bool {
    match retirement_deck {
        Some(deck) => !deck.filtered && deck.id != card.deck_id,
        None => true,
    }
}

/// Evaluate one card of a note, reading its policy fresh from the store.
///
/// New cards are skipped before any policy lookup.
pub fn check_card<P: PolicyStore + ?Sized>(
    policies: &P,
    card: &Card,
    note: &Note,
    ctx: &GateContext<'_>,
) -> Result<Evaluation, StoreError> {
    if card.is_new() {
        return Ok(Evaluation::default());
    }
    let policy = policies.policy_for_deck(card.effective_deck_id())?;
    Ok(evaluate(card, policy.as_ref()).needed(card, note, ctx))
}
