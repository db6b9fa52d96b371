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
use std::time::Instant;

use serde::Serialize;

use crate::config::GlobalRetirementConfig;
use crate::error::RetirementError;
use crate::error::StoreError;
use crate::retire::apply::apply_dispositions;
use crate::retire::evaluate::GateContext;
use crate::retire::evaluate::check_card;
use crate::store::CollectionAccessor;
use crate::store::PolicyStore;
use crate::types::disposition::DispositionSet;
use crate::types::ids::DeckId;
use crate::types::ids::NoteId;

/// Progress is reported after every this many notes.
pub const PROGRESS_INTERVAL: usize = 10;

/// The results of a sweep.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Cards that had at least one disposition applied.
    pub total_eligible: usize,
    /// Notes deleted.
    pub num_deleted: usize,
    /// Cards suspended.
    pub num_suspended: usize,
    /// Notes tagged.
    pub num_tagged: usize,
    /// Cards moved to the retirement deck.
    pub num_moved: usize,
    /// Decks whose policy could not be read. Their cards were skipped.
    pub malformed_policies: usize,
    pub elapsed_seconds: f64,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.num_deleted == 0 && self.num_suspended == 0 && self.num_tagged == 0 && self.num_moved == 0
    }

    /// A human-readable summary, or `None` if nothing was retired.
    pub fn summary(&self) -> Option<String> {
        let mut lines = Vec::new();
        if self.num_suspended > 0 {
            lines.push(format!("- {} card(s) have been suspended", self.num_suspended));
        }
        if self.num_tagged > 0 {
            lines.push(format!("- {} note(s) have been tagged", self.num_tagged));
        }
        if self.num_moved > 0 {
            lines.push(format!("- {} card(s) have been moved", self.num_moved));
        }
        if self.num_deleted > 0 {
            lines.push(format!("- {} note(s) have been deleted", self.num_deleted));
        }
        if lines.is_empty() {
            return None;
        }
        Some(format!(
            "{} card(s) have been retired in {:.3} seconds:\n{}",
            self.total_eligible,
            self.elapsed_seconds,
            lines.join("\n")
        ))
    }
}

/// Sweep the given notes, retiring every card that has crossed its deck's
/// threshold.
///
/// All notes are evaluated before anything is mutated. `progress` receives
/// `(processed, total)` every [`PROGRESS_INTERVAL`] notes and once at the end.
pub fn run_batch<S>(
    store: &S,
    note_ids: &[NoteId],
    config: &GlobalRetirementConfig,
    progress: &mut dyn FnMut(usize, usize),
) -> Result<BatchReport, RetirementError>
where
    S: CollectionAccessor + PolicyStore + ?Sized,
{
    let start = Instant::now();
    let total = note_ids.len();
    log::debug!("Sweeping {total} notes.");

    let retirement_deck = store
        .find_deck(&config.retirement_deck_name)
        .map_err(RetirementError::from_read)?;
    let ctx = GateContext {
        retirement_tag: &config.retirement_tag,
        retirement_deck,
    };

    let mut set = DispositionSet::new();
    let mut total_eligible = 0;
    let mut malformed: BTreeSet<DeckId> = BTreeSet::new();
    for (idx, note_id) in note_ids.iter().enumerate() {
        let note = store.get_note(*note_id).map_err(RetirementError::from_read)?;
        for card in &note.cards {
            match check_card(store, card, &note, &ctx) {
                Ok(evaluation) => {
                    if evaluation.queue(card, &note, &mut set) {
                        log::trace!("Card {}: {:?}", card.id, evaluation.dispositions());
                        total_eligible += 1;
                    }
                }
                Err(StoreError::PolicyMalformed { deck_id, reason }) => {
                    if malformed.insert(deck_id) {
                        log::debug!("Skipping deck {deck_id}: {reason}");
                    }
                }
                Err(e) => return Err(RetirementError::from_read(e)),
            }
        }
        let processed = idx + 1;
        if processed % PROGRESS_INTERVAL == 0 || processed == total {
            progress(processed, total);
        }
    }
    if !malformed.is_empty() {
        log::warn!(
            "Skipped cards in {} deck(s) with malformed retirement policies.",
            malformed.len()
        );
    }

    if set.is_empty() {
        log::debug!("Nothing to retire.");
    }
    let applied = apply_dispositions(store, &set, config)?;
    let report = BatchReport {
        total_eligible,
        num_deleted: applied.deleted,
        num_suspended: applied.suspended,
        num_tagged: applied.tagged,
        num_moved: applied.moved,
        malformed_policies: malformed.len(),
        elapsed_seconds: start.elapsed().as_secs_f64(),
    };
    log::info!(
        "Sweep done: {} retired, {} deleted, {} suspended, {} tagged, {} moved.",
        report.total_eligible,
        report.num_deleted,
        report.num_suspended,
        report.num_tagged,
        report.num_moved
    );
    Ok(report)
}
