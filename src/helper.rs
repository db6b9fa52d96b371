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

//! Test fixtures.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;

use crate::config::ConfigurationGate;
use crate::config::GlobalRetirementConfig;
use crate::db::Database;
use crate::error::Fallible;
use crate::error::StoreError;
use crate::notify::Notifier;
use crate::store::CollectionAccessor;
use crate::store::DeckRef;
use crate::store::MoveOutcome;
use crate::store::PolicyStore;
use crate::types::disposition::Disposition;
use crate::types::ids::CardId;
use crate::types::ids::DeckId;
use crate::types::ids::NoteId;
use crate::types::note::Note;
use crate::types::policy::DeckRetirementPolicy;

/// An enabled policy.
pub fn policy(
    retire_interval_days: u32,
    delete: bool,
    suspend: bool,
    tag: bool,
    move_: bool,
) -> DeckRetirementPolicy {
    DeckRetirementPolicy {
        enabled: true,
        retire_interval_days,
        delete,
        suspend,
        tag,
        move_,
    }
}

/// An in-memory collection with a single deck governed by `policy`.
pub fn collection_with_policy(policy: DeckRetirementPolicy) -> Fallible<(Database, DeckId)> {
    let db = Database::new(":memory:")?;
    let deck = db.add_deck("Default", false)?;
    db.set_deck_policy(deck, &policy)?;
    Ok((db, deck))
}

/// Wraps a database, recording the bulk mutations that go through, and
/// optionally failing reads or one kind of mutation.
pub struct ProbeStore {
    pub db: Database,
    calls: RefCell<Vec<Disposition>>,
    fail_on: Option<Disposition>,
    fail_reads: bool,
}

impl ProbeStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            calls: RefCell::new(Vec::new()),
            fail_on: None,
            fail_reads: false,
        }
    }

    pub fn failing_on(db: Database, disposition: Disposition) -> Self {
        Self {
            fail_on: Some(disposition),
            ..Self::new(db)
        }
    }

    pub fn unreadable(db: Database) -> Self {
        Self {
            fail_reads: true,
            ..Self::new(db)
        }
    }

    /// The bulk mutations that succeeded, in order.
    pub fn calls(&self) -> Vec<Disposition> {
        self.calls.borrow().clone()
    }

    fn read(&self) -> Result<(), StoreError> {
        if self.fail_reads {
            Err(StoreError::Unavailable("collection is closed".to_string()))
        } else {
            Ok(())
        }
    }

    fn record<T>(
        &self,
        disposition: Disposition,
        f: impl FnOnce() -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        if self.fail_on == Some(disposition) {
            return Err(StoreError::Mutation("injected failure".to_string()));
        }
        let result = f()?;
        self.calls.borrow_mut().push(disposition);
        Ok(result)
    }
}

impl PolicyStore for ProbeStore {
    fn policy_for_deck(&self, deck_id: DeckId) -> Result<Option<DeckRetirementPolicy>, StoreError> {
        self.read()?;
        self.db.policy_for_deck(deck_id)
    }
}

impl CollectionAccessor for ProbeStore {
    fn list_all_note_ids(&self) -> Result<Vec<NoteId>, StoreError> {
        self.read()?;
        self.db.list_all_note_ids()
    }

    fn get_note(&self, note_id: NoteId) -> Result<Note, StoreError> {
        self.read()?;
        self.db.get_note(note_id)
    }

    fn delete_notes(&self, note_ids: &BTreeSet<NoteId>) -> Result<(), StoreError> {
        self.record(Disposition::Delete, || self.db.delete_notes(note_ids))
    }

    fn suspend_cards(&self, card_ids: &BTreeSet<CardId>) -> Result<(), StoreError> {
        self.record(Disposition::Suspend, || self.db.suspend_cards(card_ids))
    }

    fn add_tag_to_notes(&self, note_ids: &BTreeSet<NoteId>, tag: &str) -> Result<(), StoreError> {
        self.record(Disposition::Tag, || self.db.add_tag_to_notes(note_ids, tag))
    }

    fn move_cards_to_deck(
        &self,
        card_ids: &BTreeSet<CardId>,
        deck_id: DeckId,
    ) -> Result<MoveOutcome, StoreError> {
        self.record(Disposition::Move, || {
            self.db.move_cards_to_deck(card_ids, deck_id)
        })
    }

    fn find_deck(&self, name: &str) -> Result<Option<DeckRef>, StoreError> {
        self.read()?;
        self.db.find_deck(name)
    }

    fn ensure_deck(&self, name: &str) -> Result<DeckId, StoreError> {
        self.db.ensure_deck(name)
    }
}

/// Settings held in memory. Clones share state.
#[derive(Clone)]
pub struct MemoryGate {
    inner: Arc<Mutex<(GlobalRetirementConfig, usize)>>,
}

impl MemoryGate {
    pub fn new(config: GlobalRetirementConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new((config, 0))),
        }
    }

    /// Replace the stored settings, as if edited outside the engine.
    pub fn set(&self, config: GlobalRetirementConfig) {
        self.inner.lock().unwrap().0 = config;
    }

    pub fn saved(&self) -> GlobalRetirementConfig {
        self.inner.lock().unwrap().0.clone()
    }

    pub fn save_count(&self) -> usize {
        self.inner.lock().unwrap().1
    }
}

impl ConfigurationGate for MemoryGate {
    fn current(&self) -> Fallible<GlobalRetirementConfig> {
        Ok(self.saved())
    }

    fn persist(&self, config: &GlobalRetirementConfig) -> Fallible<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.0 = config.clone();
        inner.1 += 1;
        Ok(())
    }
}

/// Collects notifications. Clones share state.
#[derive(Clone)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_with_policy() -> Fallible<()> {
        let (db, deck) = collection_with_policy(policy(30, false, true, true, false))?;
        assert!(db.policy_for_deck(deck)?.is_some_and(|p| p.enabled));
        Ok(())
    }

    #[test]
    fn test_unreadable_store() -> Fallible<()> {
        let (db, _) = collection_with_policy(policy(30, false, true, true, false))?;
        let store = ProbeStore::unreadable(db);
        assert!(store.list_all_note_ids().is_err());
        Ok(())
    }
}
