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
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::config::DbConfig;

use crate::error::Fallible;
use crate::error::StoreError;
use crate::error::fail;
use crate::store::CollectionAccessor;
use crate::store::DeckRef;
use crate::store::MoveOutcome;
use crate::store::PolicyStore;
use crate::types::card::Card;
use crate::types::ids::CardId;
use crate::types::ids::DeckId;
use crate::types::ids::NoteId;
use crate::types::note::Note;
use crate::types::note::join_tags;
use crate::types::note::parse_tags;
use crate::types::policy::DeckRetirementPolicy;

/// The queue value of a suspended card.
const QUEUE_SUSPENDED: i64 = -1;

/// A SQLite-backed card collection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(database_path: &str) -> Fallible<Self> {
        let mut conn = Connection::open(database_path)?;
        conn.set_db_config(DbConfig::SQLITE_DBCONFIG_ENABLE_FKEY, true)?;
        {
            let tx = conn.transaction()?;
            if !probe_schema_exists(&tx)? {
                tx.execute_batch(include_str!("schema.sql"))?;
                tx.commit()?;
            }
        }
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self { conn })
    }

    /// Create a deck. Filtered decks borrow cards from their home decks.
    pub fn add_deck(&self, name: &str, filtered: bool) -> Fallible<DeckId> {
        log::debug!("Adding deck: {name}");
        let conn = self.acquire()?;
        let sql = "insert into decks (name, filtered) values (?, ?) returning deck_id;";
        let deck_id: DeckId = conn.query_row(sql, (name, filtered), |row| row.get(0))?;
        Ok(deck_id)
    }

    /// Find a deck's ID from its name, failing if no such deck exists.
    pub fn deck_named(&self, name: &str) -> Fallible<DeckId> {
        match self.find_deck(name)? {
            Some(deck) => Ok(deck.id),
            None => fail(format!("no deck named '{name}'.")),
        }
    }

    /// Replace a deck's retirement policy.
    pub fn set_deck_policy(&self, deck_id: DeckId, policy: &DeckRetirementPolicy) -> Fallible<()> {
        let json = policy.to_json()?;
        self.set_deck_policy_json(deck_id, Some(&json))
    }

    /// Store a raw policy document for a deck. `None` clears the policy.
    pub fn set_deck_policy_json(&self, deck_id: DeckId, json: Option<&str>) -> Fallible<()> {
        let conn = self.acquire()?;
        let sql = "update decks set retirement_options = ? where deck_id = ?;";
        let changed = conn.execute(sql, (json, deck_id))?;
        if changed == 0 {
            return fail(format!("no deck with ID {deck_id}."));
        }
        Ok(())
    }

    /// Add a note with the given tags and no cards.
    pub fn add_note(&self, tags: &[&str]) -> Fallible<NoteId> {
        let tags: BTreeSet<String> = tags.iter().map(|t| t.to_string()).collect();
        let conn = self.acquire()?;
        let sql = "insert into notes (tags) values (?) returning note_id;";
        let note_id: NoteId = conn.query_row(sql, [join_tags(&tags)], |row| row.get(0))?;
        Ok(note_id)
    }

    /// Add a card to a note.
    pub fn add_card(&self, note_id: NoteId, deck_id: DeckId, interval: u32) -> Fallible<CardId> {
        let conn = self.acquire()?;
        let sql = "insert into cards (note_id, deck_id, interval_days) values (?, ?, ?) returning card_id;";
        let card_id: CardId =
            conn.query_row(sql, (note_id, deck_id, interval), |row| row.get(0))?;
        Ok(card_id)
    }

    pub fn get_card(&self, card_id: CardId) -> Fallible<Option<Card>> {
        let conn = self.acquire()?;
        let sql = "select card_id, note_id, deck_id, original_deck_id, interval_days, queue from cards where card_id = ?;";
        let card = conn.query_row(sql, [card_id], card_from_row).optional()?;
        Ok(card)
    }

    /// Record the interval a review gave a card.
    pub fn record_review(&self, card_id: CardId, interval: u32) -> Fallible<()> {
        let conn = self.acquire()?;
        let sql = "update cards set interval_days = ? where card_id = ?;";
        let changed = conn.execute(sql, (interval, card_id))?;
        if changed == 0 {
            return fail(format!("no card with ID {card_id}."));
        }
        Ok(())
    }

    /// Borrow a card into a filtered deck.
    #[cfg(test)]
    pub fn park_in_filtered_deck(&self, card_id: CardId, filtered_deck: DeckId) -> Fallible<()> {
        let conn = self.acquire()?;
        let sql = "update cards set original_deck_id = deck_id, deck_id = ? where card_id = ? and original_deck_id is null;";
        conn.execute(sql, (filtered_deck, card_id))?;
        Ok(())
    }

    #[cfg(test)]
    pub fn note_count(&self) -> Fallible<i64> {
        let conn = self.acquire()?;
        let count: i64 = conn.query_row("select count(*) from notes;", [], |row| row.get(0))?;
        Ok(count)
    }

    fn acquire(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))
    }
}

impl PolicyStore for Database {
    fn policy_for_deck(&self, deck_id: DeckId) -> Result<Option<DeckRetirementPolicy>, StoreError> {
        let conn = self.acquire()?;
        let sql = "select retirement_options from decks where deck_id = ?;";
        let json: Option<Option<String>> = conn
            .query_row(sql, [deck_id], |row| row.get(0))
            .optional()?;
        match json.flatten() {
            Some(json) => DeckRetirementPolicy::parse(deck_id, &json).map(Some),
            None => Ok(None),
        }
    }
}

impl CollectionAccessor for Database {
    fn list_all_note_ids(&self) -> Result<Vec<NoteId>, StoreError> {
        let conn = self.acquire()?;
        let mut stmt = conn.prepare("select note_id from notes order by note_id;")?;
        let mut rows = stmt.query([])?;
        let mut note_ids = Vec::new();
        while let Some(row) = rows.next()? {
            note_ids.push(row.get(0)?);
        }
        Ok(note_ids)
    }

    fn get_note(&self, note_id: NoteId) -> Result<Note, StoreError> {
        let conn = self.acquire()?;
        let tags: Option<String> = conn
            .query_row("select tags from notes where note_id = ?;", [note_id], |row| {
                row.get(0)
            })
            .optional()?;
        let tags = match tags {
            Some(tags) => parse_tags(&tags),
            None => return Err(StoreError::Unavailable(format!("note {note_id} not found"))),
        };
        let sql = "select card_id, note_id, deck_id, original_deck_id, interval_days, queue from cards where note_id = ? order by card_id;";
        let mut stmt = conn.prepare(sql)?;
        let cards = stmt
            .query_map([note_id], card_from_row)?
            .collect::<Result<Vec<Card>, rusqlite::Error>>()?;
        Ok(Note {
            id: note_id,
            tags,
            cards,
        })
    }

    fn delete_notes(&self, note_ids: &BTreeSet<NoteId>) -> Result<(), StoreError> {
        log::debug!("Deleting {} notes.", note_ids.len());
        let mut conn = self.acquire()?;
        mutate(&mut conn, |tx| {
            for note_id in note_ids {
                tx.execute("delete from cards where note_id = ?;", [note_id])?;
                tx.execute("delete from notes where note_id = ?;", [note_id])?;
            }
            Ok(())
        })
    }

    fn suspend_cards(&self, card_ids: &BTreeSet<CardId>) -> Result<(), StoreError> {
        log::debug!("Suspending {} cards.", card_ids.len());
        let mut conn = self.acquire()?;
        mutate(&mut conn, |tx| {
            for card_id in card_ids {
                tx.execute(
                    "update cards set queue = ? where card_id = ?;",
                    (QUEUE_SUSPENDED, card_id),
                )?;
            }
            Ok(())
        })
    }

    fn add_tag_to_notes(&self, note_ids: &BTreeSet<NoteId>, tag: &str) -> Result<(), StoreError> {
        log::debug!("Tagging {} notes with '{tag}'.", note_ids.len());
        let mut conn = self.acquire()?;
        mutate(&mut conn, |tx| {
            for note_id in note_ids {
                let tags: Option<String> = tx
                    .query_row("select tags from notes where note_id = ?;", [note_id], |row| {
                        row.get(0)
                    })
                    .optional()?;
                let Some(tags) = tags else {
                    continue;
                };
                let mut tags = parse_tags(&tags);
                if tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                    continue;
                }
                tags.insert(tag.to_string());
                tx.execute(
                    "update notes set tags = ? where note_id = ?;",
                    (join_tags(&tags), note_id),
                )?;
            }
            Ok(())
        })
    }

    fn move_cards_to_deck(
        &self,
        card_ids: &BTreeSet<CardId>,
        deck_id: DeckId,
    ) -> Result<MoveOutcome, StoreError> {
        let mut conn = self.acquire()?;
        let filtered: Option<bool> = conn
            .query_row("select filtered from decks where deck_id = ?;", [deck_id], |row| {
                row.get(0)
            })
            .optional()?;
        match filtered {
            None => {
                return Err(StoreError::Mutation(format!("deck {deck_id} not found")));
            }
            Some(true) => {
                log::debug!("Not moving cards into filtered deck {deck_id}.");
                return Ok(MoveOutcome::FilteredTarget);
            }
            Some(false) => {}
        }
        log::debug!("Moving {} cards to deck {deck_id}.", card_ids.len());
        let mut moved = 0;
        mutate(&mut conn, |tx| {
            for card_id in card_ids {
                moved += tx.execute(
                    "update cards set deck_id = ?, original_deck_id = null where card_id = ?;",
                    (deck_id, card_id),
                )?;
            }
            Ok(())
        })?;
        Ok(MoveOutcome::Moved(moved))
    }

    fn find_deck(&self, name: &str) -> Result<Option<DeckRef>, StoreError> {
        let conn = self.acquire()?;
        let sql = "select deck_id, filtered from decks where name = ?;";
        let deck = conn
            .query_row(sql, [name], |row| {
                Ok(DeckRef {
                    id: row.get(0)?,
                    filtered: row.get(1)?,
                })
            })
            .optional()?;
        Ok(deck)
    }

    fn ensure_deck(&self, name: &str) -> Result<DeckId, StoreError> {
        if let Some(deck) = self.find_deck(name)? {
            return Ok(deck.id);
        }
        log::debug!("Creating deck: {name}");
        let conn = self.acquire()?;
        let sql = "insert into decks (name, filtered) values (?, 0) returning deck_id;";
        let deck_id = conn
            .query_row(sql, [name], |row| row.get(0))
            .map_err(|e| StoreError::Mutation(e.to_string()))?;
        Ok(deck_id)
    }
}

/// Run a bulk mutation in its own transaction. Any error rolls the whole
/// call back.
fn mutate<F>(conn: &mut Connection, f: F) -> Result<(), StoreError>
where
    F: FnOnce(&Transaction) -> rusqlite::Result<()>,
{
    let run = |conn: &mut Connection| -> rusqlite::Result<()> {
        let tx = conn.transaction()?;
        f(&tx)?;
        tx.commit()
    };
    run(conn).map_err(|e| StoreError::Mutation(e.to_string()))
}

fn card_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Card> {
    let queue: i64 = row.get(5)?;
    Ok(Card {
        id: row.get(0)?,
        note_id: row.get(1)?,
        deck_id: row.get(2)?,
        original_deck_id: row.get(3)?,
        interval: row.get(4)?,
        suspended: queue == QUEUE_SUSPENDED,
    })
}

fn probe_schema_exists(tx: &Transaction) -> Fallible<bool> {
    let sql = "select count(*) from sqlite_master where type='table' AND name=?;";
    let count: i64 = tx.query_row(sql, ["cards"], |row| row.get(0))?;
    Ok(count > 0)
}
