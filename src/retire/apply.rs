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

use crate::config::GlobalRetirementConfig;
use crate::error::RetirementError;
use crate::error::StoreError;
use crate::store::CollectionAccessor;
use crate::store::MoveOutcome;
use crate::types::disposition::Disposition;
use crate::types::disposition::DispositionSet;
use crate::types::ids::CardId;

/// What a call to [`apply_dispositions`] actually changed.
#[derive(Default, Debug, PartialEq, Eq)]
pub struct Applied {
    pub suspended: usize,
    pub tagged: usize,
    pub moved: usize,
    pub deleted: usize,
    /// The dispositions that changed something, in the order they ran.
    pub actions: Vec<Disposition>,
}

/// Apply the accumulated dispositions to the collection, one bulk call per
/// kind, in [`Disposition::APPLY_ORDER`]. Kinds with nothing queued are
/// skipped without touching the store.
///
/// If a call fails, the kinds after it are not attempted and the ones before
/// it stay applied.
pub fn apply_dispositions<S: CollectionAccessor + ?Sized>(
    store: &S,
    set: &DispositionSet,
    config: &GlobalRetirementConfig,
) -> Result<Applied, RetirementError> {
    let mut applied = Applied::default();
    for disposition in Disposition::APPLY_ORDER {
        let queued = set.len_of(disposition);
        if queued == 0 {
            continue;
        }
        let result = match disposition {
            Disposition::Suspend => store.suspend_cards(&set.cards_to_suspend).map(|_| queued),
            Disposition::Tag => store
                .add_tag_to_notes(&set.notes_to_tag, &config.retirement_tag)
                .map(|_| queued),
            Disposition::Move => {
                move_cards(store, &set.cards_to_move, &config.retirement_deck_name)
            }
            Disposition::Delete => store.delete_notes(&set.notes_to_delete).map(|_| queued),
        };
        let count = result
            .map_err(|e| RetirementError::from_mutation(disposition, &applied.actions, e))?;
        match disposition {
            Disposition::Suspend => applied.suspended = count,
            Disposition::Tag => applied.tagged = count,
            Disposition::Move => applied.moved = count,
            Disposition::Delete => applied.deleted = count,
        }
        if count > 0 {
            applied.actions.push(disposition);
        }
    }
    Ok(applied)
}

fn move_cards<S: CollectionAccessor + ?Sized>(
    store: &S,
    card_ids: &BTreeSet<CardId>,
    deck_name: &str,
) -> Result<usize, StoreError> {
    let deck_id = store.ensure_deck(deck_name)?;
    match store.move_cards_to_deck(card_ids, deck_id)? {
        MoveOutcome::Moved(moved) => Ok(moved),
        MoveOutcome::FilteredTarget => {
            log::debug!("Retirement deck '{deck_name}' is a filtered deck, not moving cards.");
            Ok(0)
        }
    }
}
