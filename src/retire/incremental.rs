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

use serde::Serialize;

use crate::config::GlobalRetirementConfig;
use crate::error::RetirementError;
use crate::error::StoreError;
use crate::retire::apply::apply_dispositions;
use crate::retire::evaluate::GateContext;
use crate::retire::evaluate::check_card;
use crate::store::CollectionAccessor;
use crate::store::PolicyStore;
use crate::types::card::Card;
use crate::types::disposition::Disposition;
use crate::types::disposition::DispositionSet;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IncrementalReport {
    /// True if anything was done to the card or its note.
    pub retired: bool,
    pub actions: BTreeSet<Disposition>,
}

/// Check a single card right after it was reviewed, and retire it
/// immediately if it has crossed its deck's threshold.
///
/// The card is re-read from the store, so the caller's copy only needs to
/// identify it.
pub fn run_incremental<S>(
    store: &S,
    card: &Card,
    config: &GlobalRetirementConfig,
) -> Result<IncrementalReport, RetirementError>
where
    S: CollectionAccessor + PolicyStore + ?Sized,
{
    let note = store
        .get_note(card.note_id)
        .map_err(RetirementError::from_read)?;
    let Some(card) = note.card(card.id) else {
        log::debug!("Card {} is no longer in note {}.", card.id, note.id);
        return Ok(IncrementalReport::default());
    };
    let retirement_deck = store
        .find_deck(&config.retirement_deck_name)
        .map_err(RetirementError::from_read)?;
    let ctx = GateContext {
        retirement_tag: &config.retirement_tag,
        retirement_deck,
    };
    let evaluation = match check_card(store, card, &note, &ctx) {
        Ok(evaluation) => evaluation,
        Err(StoreError::PolicyMalformed { deck_id, reason }) => {
            log::debug!("Not checking card {}, deck {deck_id} policy is malformed: {reason}", card.id);
            return Ok(IncrementalReport::default());
        }
        Err(e) => return Err(RetirementError::from_read(e)),
    };
    let mut set = DispositionSet::new();
    if !evaluation.queue(card, &note, &mut set) {
        return Ok(IncrementalReport::default());
    }
    let applied = apply_dispositions(store, &set, config)?;
    let actions: BTreeSet<Disposition> = applied.actions.into_iter().collect();
    log::debug!("Card {} retired: {actions:?}", card.id);
    Ok(IncrementalReport {
        retired: !actions.is_empty(),
        actions,
    })
}
