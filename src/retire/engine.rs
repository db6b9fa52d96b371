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

use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::TryLockError;

use crate::config::AutoRunMode;
use crate::config::ConfigurationGate;
use crate::config::GlobalRetirementConfig;
use crate::error::Fallible;
use crate::error::RetirementError;
use crate::notify::Notifier;
use crate::retire::batch;
use crate::retire::batch::BatchReport;
use crate::retire::incremental;
use crate::retire::incremental::IncrementalReport;
use crate::store::CollectionAccessor;
use crate::store::PolicyStore;
use crate::types::card::Card;
use crate::types::timestamp::Timestamp;

/// How long after a sweep a once-daily startup sweep runs again.
pub const DAILY_RUN_THRESHOLD_MILLIS: i64 = 86_400_000;

/// Whether a session that starts at `now` should begin with a sweep.
pub fn should_auto_run(config: &GlobalRetirementConfig, now: Timestamp) -> bool {
    match config.auto_run {
        AutoRunMode::Off => false,
        AutoRunMode::OnEveryStartup => true,
        AutoRunMode::OnceDailyAtStartup => {
            now.millis_since(config.last_batch_run) > DAILY_RUN_THRESHOLD_MILLIS
        }
    }
}

/// The entry point the host application calls into.
///
/// Holds the current settings and runs one retirement operation at a time.
pub struct RetirementEngine<S, G> {
    store: S,
    gate: G,
    notifier: Box<dyn Notifier>,
    /// Locked for the whole of every retirement operation.
    config: Mutex<GlobalRetirementConfig>,
}

impl<S, G> RetirementEngine<S, G>
where
    S: CollectionAccessor + PolicyStore,
    G: ConfigurationGate,
{
    pub fn new(store: S, gate: G, notifier: Box<dyn Notifier>) -> Fallible<Self> {
        let config = gate.current()?;
        Ok(Self {
            store,
            gate,
            notifier,
            config: Mutex::new(config),
        })
    }

    pub fn config(&self) -> GlobalRetirementConfig {
        self.lock().clone()
    }

    /// Reload the settings from the gate.
    pub fn refresh(&self) -> Fallible<()> {
        let fresh = self.gate.current()?;
        *self.lock() = fresh;
        Ok(())
    }

    /// Save new settings. The time of the last sweep is kept as is.
    pub fn save_settings(&self, mut config: GlobalRetirementConfig) -> Fallible<()> {
        config.last_batch_run = self.lock().last_batch_run;
        self.gate.persist(&config)?;
        self.refresh()
    }

    /// Sweep the whole collection.
    pub fn run_batch(
        &self,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<BatchReport, RetirementError> {
        self.run_batch_at(Timestamp::now(), progress)
    }

    /// Check a card that was just reviewed. If a sweep is running, the check
    /// is skipped: the sweep covers the card.
    pub fn run_incremental(&self, card: &Card) -> Result<IncrementalReport, RetirementError> {
        let config = match self.config.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                log::debug!("Retirement busy, skipping check of card {}.", card.id);
                return Ok(IncrementalReport::default());
            }
        };
        let report = incremental::run_incremental(&self.store, card, &config)?;
        if report.retired && config.notify_on_incremental {
            self.notifier.notify("The card has been retired.");
        }
        Ok(report)
    }

    /// Called by the host after every review. Failures are logged and
    /// otherwise ignored, so as not to interrupt the review session.
    pub fn on_card_reviewed(&self, card: &Card) -> IncrementalReport {
        match self.run_incremental(card) {
            Ok(report) => report,
            Err(e) => {
                log::debug!("Retirement check of card {} failed: {e}", card.id);
                IncrementalReport::default()
            }
        }
    }

    /// Called by the host when a session starts. Reloads the settings and
    /// sweeps the collection if the auto-run mode says so.
    pub fn on_session_start(&self, now: Timestamp) -> Fallible<Option<BatchReport>> {
        self.refresh()?;
        if !should_auto_run(&self.config(), now) {
            log::debug!("No automatic sweep this session.");
            return Ok(None);
        }
        log::info!("Running automatic sweep.");
        let report = self.run_batch_at(now, &mut |_, _| {})?;
        Ok(Some(report))
    }

    fn run_batch_at(
        &self,
        now: Timestamp,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<BatchReport, RetirementError> {
        let mut config = self.lock();
        match self.sweep(&config, progress) {
            Ok(report) => {
                config.last_batch_run = now;
                if let Err(e) = self.gate.persist(&config) {
                    log::warn!("Failed to save the time of the last sweep: {e}");
                }
                if config.notify_on_batch {
                    if let Some(summary) = report.summary() {
                        self.notifier.notify(&summary);
                    }
                }
                Ok(report)
            }
            Err(e) => {
                log::error!("Sweep failed: {e}");
                self.notifier.notify(&format!("Card retirement failed: {e}"));
                Err(e)
            }
        }
    }

    fn sweep(
        &self,
        config: &GlobalRetirementConfig,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<BatchReport, RetirementError> {
        let note_ids = self
            .store
            .list_all_note_ids()
            .map_err(RetirementError::from_read)?;
        batch::run_batch(&self.store, &note_ids, config, progress)
    }

    fn lock(&self) -> MutexGuard<'_, GlobalRetirementConfig> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::helper::MemoryGate;
    use crate::helper::ProbeStore;
    use crate::helper::RecordingNotifier;
    use crate::helper::collection_with_policy;
    use crate::helper::policy;
    use crate::types::ids::DeckId;

    const DAY: i64 = DAILY_RUN_THRESHOLD_MILLIS;

    fn config(auto_run: AutoRunMode, last_batch_run: i64) -> GlobalRetirementConfig {
        GlobalRetirementConfig {
            auto_run,
            last_batch_run: Timestamp::from_millis(last_batch_run),
            ..GlobalRetirementConfig::default()
        }
    }

    fn engine(
        db: &Database,
        config: GlobalRetirementConfig,
    ) -> Fallible<(RetirementEngine<Database, MemoryGate>, MemoryGate, RecordingNotifier)> {
        let gate = MemoryGate::new(config);
        let notifier = RecordingNotifier::new();
        let engine = RetirementEngine::new(db.clone(), gate.clone(), Box::new(notifier.clone()))?;
        Ok((engine, gate, notifier))
    }

    fn retirable_card(db: &Database, deck: DeckId) -> Fallible<Card> {
        let note = db.add_note(&[])?;
        let card = db.add_card(note, deck, 45)?;
        match db.get_card(card)? {
            Some(card) => Ok(card),
            None => crate::error::fail("card vanished"),
        }
    }

    #[test]
    fn test_should_auto_run() {
        let now = Timestamp::from_millis(10 * DAY);
        assert!(!should_auto_run(&config(AutoRunMode::Off, 0), now));
        assert!(should_auto_run(&config(AutoRunMode::OnEveryStartup, 10 * DAY), now));
        assert!(should_auto_run(&config(AutoRunMode::OnceDailyAtStartup, 0), now));
        assert!(!should_auto_run(&config(AutoRunMode::OnceDailyAtStartup, 9 * DAY), now));
        assert!(should_auto_run(&config(AutoRunMode::OnceDailyAtStartup, 9 * DAY - 1), now));
    }

    #[test]
    fn test_session_start_sweeps_and_records_time() -> Fallible<()> {
        let (db, deck) = collection_with_policy(policy(30, false, true, false, false))?;
        let card = retirable_card(&db, deck)?;
        let (engine, gate, notifier) = engine(&db, config(AutoRunMode::OnceDailyAtStartup, 0))?;
        let now = Timestamp::from_millis(5 * DAY);
        let report = engine.on_session_start(now)?;
        assert_eq!(report.map(|r| r.num_suspended), Some(1));
        assert_eq!(gate.saved().last_batch_run, now);
        assert_eq!(engine.config().last_batch_run, now);
        assert_eq!(db.get_card(card.id)?.map(|c| c.suspended), Some(true));
        assert_eq!(notifier.messages().len(), 1);

        // Same day: no second sweep.
        let later = Timestamp::from_millis(5 * DAY + 1000);
        assert_eq!(engine.on_session_start(later)?, None);
        Ok(())
    }

    #[test]
    fn test_session_start_off() -> Fallible<()> {
        let (db, deck) = collection_with_policy(policy(30, false, true, false, false))?;
        let card = retirable_card(&db, deck)?;
        let (engine, gate, _) = engine(&db, config(AutoRunMode::Off, 0))?;
        assert_eq!(engine.on_session_start(Timestamp::from_millis(DAY * 100))?, None);
        assert_eq!(gate.save_count(), 0);
        assert_eq!(db.get_card(card.id)?.map(|c| c.suspended), Some(false));
        Ok(())
    }

    #[test]
    fn test_session_start_picks_up_saved_settings() -> Fallible<()> {
        let (db, _) = collection_with_policy(policy(30, false, true, false, false))?;
        let (engine, gate, _) = engine(&db, config(AutoRunMode::Off, 0))?;
        gate.set(config(AutoRunMode::OnEveryStartup, 0));
        assert!(engine.on_session_start(Timestamp::from_millis(1))?.is_some());
        Ok(())
    }

    #[test]
    fn test_batch_notification_toggle() -> Fallible<()> {
        let (db, deck) = collection_with_policy(policy(30, false, true, false, false))?;
        retirable_card(&db, deck)?;
        let quiet = GlobalRetirementConfig {
            notify_on_batch: false,
            ..GlobalRetirementConfig::default()
        };
        let (engine, _, notifier) = engine(&db, quiet)?;
        let report = engine.run_batch(&mut |_, _| {})?;
        assert_eq!(report.num_suspended, 1);
        assert!(notifier.messages().is_empty());
        Ok(())
    }

    #[test]
    fn test_failed_sweep_keeps_timestamp() -> Fallible<()> {
        let (db, deck) = collection_with_policy(policy(30, false, true, false, false))?;
        retirable_card(&db, deck)?;
        let gate = MemoryGate::new(config(AutoRunMode::OnEveryStartup, 0));
        let notifier = RecordingNotifier::new();
        let engine = RetirementEngine::new(
            ProbeStore::unreadable(db),
            gate.clone(),
            Box::new(notifier.clone()),
        )?;
        let result = engine.on_session_start(Timestamp::from_millis(DAY));
        assert!(result.is_err());
        assert_eq!(gate.save_count(), 0);
        assert_eq!(engine.config().last_batch_run, Timestamp::from_millis(0));
        assert_eq!(notifier.messages().len(), 1);
        Ok(())
    }

    #[test]
    fn test_review_notification() -> Fallible<()> {
        let (db, deck) = collection_with_policy(policy(30, false, true, true, false))?;
        let card = retirable_card(&db, deck)?;
        let (engine, _, notifier) = engine(&db, GlobalRetirementConfig::default())?;
        let report = engine.on_card_reviewed(&card);
        assert!(report.retired);
        assert_eq!(notifier.messages(), vec!["The card has been retired.".to_string()]);

        // Already retired: nothing to do, nothing to say.
        let report = engine.on_card_reviewed(&card);
        assert!(!report.retired);
        assert_eq!(notifier.messages().len(), 1);
        Ok(())
    }

    #[test]
    fn test_review_failure_is_silent() -> Fallible<()> {
        let (db, deck) = collection_with_policy(policy(30, false, true, false, false))?;
        let card = retirable_card(&db, deck)?;
        let notifier = RecordingNotifier::new();
        let engine = RetirementEngine::new(
            ProbeStore::unreadable(db),
            MemoryGate::new(GlobalRetirementConfig::default()),
            Box::new(notifier.clone()),
        )?;
        assert_eq!(engine.on_card_reviewed(&card), IncrementalReport::default());
        assert!(notifier.messages().is_empty());
        Ok(())
    }

    #[test]
    fn test_review_during_sweep_is_skipped() -> Fallible<()> {
        let (db, deck) = collection_with_policy(policy(30, false, true, false, false))?;
        let card = retirable_card(&db, deck)?;
        let (engine, _, _) = engine(&db, GlobalRetirementConfig::default())?;
        {
            let _sweeping = engine.lock();
            assert_eq!(engine.run_incremental(&card)?, IncrementalReport::default());
        }
        assert_eq!(db.get_card(card.id)?.map(|c| c.suspended), Some(false));
        assert!(engine.run_incremental(&card)?.retired);
        Ok(())
    }

    #[test]
    fn test_save_settings_keeps_last_run() -> Fallible<()> {
        let (db, _) = collection_with_policy(policy(30, false, true, false, false))?;
        let (engine, gate, _) = engine(&db, config(AutoRunMode::Off, 1234))?;
        let new_settings = GlobalRetirementConfig {
            retirement_tag: "Graduated".to_string(),
            ..GlobalRetirementConfig::default()
        };
        engine.save_settings(new_settings)?;
        assert_eq!(gate.saved().retirement_tag, "Graduated");
        assert_eq!(gate.saved().last_batch_run, Timestamp::from_millis(1234));
        assert_eq!(engine.config().retirement_tag, "Graduated");
        Ok(())
    }
}
