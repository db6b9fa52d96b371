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

use clap::Parser;

use crate::collection::Collection;
use crate::config::AutoRunMode;
use crate::config::ConfigurationGate;
use crate::error::Fallible;
use crate::error::fail;
use crate::store::CollectionAccessor;
use crate::store::PolicyStore;
use crate::types::ids::CardId;
use crate::types::policy::DeckRetirementPolicy;
use crate::types::timestamp::Timestamp;

#[derive(Parser)]
#[command(version, about, long_about = None)]
enum Command {
    /// Create an empty collection.
    Init {
        /// Optional path to the collection directory.
        directory: Option<String>,
    },
    /// Add a note with a single card.
    Add {
        /// The deck to add the card to. Created if it does not exist.
        deck: String,
        /// The card's review interval in days.
        #[arg(long, default_value_t = 0)]
        interval: u32,
        /// Tags for the note.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Optional path to the collection directory.
        directory: Option<String>,
    },
    /// Set a deck's retirement policy.
    Policy {
        /// The deck's name.
        deck: String,
        /// Retire cards whose interval exceeds this many days. Zero turns
        /// retirement off.
        #[arg(long, default_value_t = 0)]
        interval: u32,
        /// Delete retired notes. Overrides the other actions.
        #[arg(long)]
        delete: bool,
        /// Suspend retired cards.
        #[arg(long)]
        suspend: bool,
        /// Tag retired notes.
        #[arg(long)]
        tag: bool,
        /// Move retired cards to the retirement deck.
        #[arg(long = "move")]
        move_: bool,
        /// Remove the deck's policy.
        #[arg(long, conflicts_with_all = ["delete", "suspend", "tag", "move_"])]
        clear: bool,
        /// Optional path to the collection directory.
        directory: Option<String>,
    },
    /// Show or change the retirement settings.
    Settings {
        /// The tag added to retired notes.
        #[arg(long)]
        retirement_tag: Option<String>,
        /// The deck retired cards are moved to.
        #[arg(long)]
        retirement_deck: Option<String>,
        /// When to sweep the collection on startup.
        #[arg(long)]
        auto_run: Option<AutoRunMode>,
        /// Notify when a card is retired during review.
        #[arg(long)]
        notify_on_review: Option<bool>,
        /// Notify with a summary after a sweep.
        #[arg(long)]
        notify_on_sweep: Option<bool>,
        /// Optional path to the collection directory.
        directory: Option<String>,
    },
    /// Sweep the whole collection, retiring every eligible card.
    Run {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
        /// Optional path to the collection directory.
        directory: Option<String>,
    },
    /// Record a review of a card, then check it for retirement.
    Review {
        /// The card's ID.
        card_id: i64,
        /// The interval the review gave the card, in days.
        #[arg(long)]
        interval: u32,
        /// Optional path to the collection directory.
        directory: Option<String>,
    },
    /// Start a session, sweeping the collection if the settings say so.
    Startup {
        /// Optional path to the collection directory.
        directory: Option<String>,
    },
}

pub fn entrypoint() -> Fallible<()> {
    let cli: Command = Command::parse();
    match cli {
        Command::Init { directory } => {
            let collection = Collection::new(directory)?;
            let settings = collection.settings();
            settings.persist(&settings.current()?)?;
            println!("Initialized collection in {:?}.", collection.directory);
            Ok(())
        }
        Command::Add {
            deck,
            interval,
            tags,
            directory,
        } => {
            let collection = Collection::new(directory)?;
            let db = &collection.db;
            let deck_id = db.ensure_deck(&deck)?;
            let tags: Vec<&str> = tags.iter().map(|t| t.as_str()).collect();
            let note_id = db.add_note(&tags)?;
            let card_id = db.add_card(note_id, deck_id, interval)?;
            println!("Added note {note_id} with card {card_id}.");
            Ok(())
        }
        Command::Policy {
            deck,
            interval,
            delete,
            suspend,
            tag,
            move_,
            clear,
            directory,
        } => {
            let collection = Collection::new(directory)?;
            let db = &collection.db;
            let deck_id = db.deck_named(&deck)?;
            if clear {
                db.set_deck_policy_json(deck_id, None)?;
                println!("Cleared the retirement policy of '{deck}'.");
                return Ok(());
            }
            let policy = DeckRetirementPolicy::configured(interval, delete, suspend, tag, move_);
            db.set_deck_policy(deck_id, &policy)?;
            if !policy.enabled {
                println!("Retirement is off for '{deck}': choose an interval and an action.");
            }
            println!("{}", serde_json::to_string_pretty(&db.policy_for_deck(deck_id)?)?);
            Ok(())
        }
        Command::Settings {
            retirement_tag,
            retirement_deck,
            auto_run,
            notify_on_review,
            notify_on_sweep,
            directory,
        } => {
            let collection = Collection::new(directory)?;
            let engine = collection.engine()?;
            let mut config = engine.config();
            let mut changed = false;
            if let Some(tag) = retirement_tag {
                config.retirement_tag = tag;
                changed = true;
            }
            if let Some(deck) = retirement_deck {
                config.retirement_deck_name = deck;
                changed = true;
            }
            if let Some(auto_run) = auto_run {
                config.auto_run = auto_run;
                changed = true;
            }
            if let Some(notify) = notify_on_review {
                config.notify_on_incremental = notify;
                changed = true;
            }
            if let Some(notify) = notify_on_sweep {
                config.notify_on_batch = notify;
                changed = true;
            }
            if changed {
                config.validate()?;
                engine.save_settings(config)?;
            }
            print!("{}", toml::to_string(&engine.config())?);
            Ok(())
        }
        Command::Run { json, directory } => {
            let collection = Collection::new(directory)?;
            let engine = collection.engine()?;
            let report = engine.run_batch(&mut |processed, total| {
                eprint!("\rProcessed {processed}/{total} notes.");
                if processed == total {
                    eprintln!();
                }
            })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.is_empty() {
                println!("No cards to retire.");
            }
            if report.malformed_policies > 0 {
                eprintln!(
                    "warning: {} deck(s) have a malformed retirement policy and were skipped.",
                    report.malformed_policies
                );
            }
            Ok(())
        }
        Command::Review {
            card_id,
            interval,
            directory,
        } => {
            let collection = Collection::new(directory)?;
            let card_id = CardId::new(card_id);
            collection.db.record_review(card_id, interval)?;
            let card = match collection.db.get_card(card_id)? {
                Some(card) => card,
                None => return fail(format!("no card with ID {card_id}.")),
            };
            let engine = collection.engine()?;
            let report = engine.on_card_reviewed(&card);
            if !report.retired {
                println!("Card {card_id} was not retired.");
            }
            log::debug!("{}", serde_json::to_string(&report)?);
            Ok(())
        }
        Command::Startup { directory } => {
            let collection = Collection::new(directory)?;
            let engine = collection.engine()?;
            match engine.on_session_start(Timestamp::now())? {
                Some(report) => {
                    log::debug!("Startup sweep: {}", serde_json::to_string(&report)?);
                }
                None => {
                    println!("No sweep due.");
                }
            }
            Ok(())
        }
    }
}
