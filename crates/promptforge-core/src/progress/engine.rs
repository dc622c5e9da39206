//! Progression state machine
//!
//! Drives level unlocking, completion marking, and the terminal
//! game-complete transition from freshly computed scores. State is loaded
//! once at construction and persisted after every mutation; persistence
//! failures are logged but never surface to gameplay.

use tracing::{debug, info, warn};

use crate::config::GameConfig;

use super::LevelProgress;
use super::store::ProgressStore;

/// Result of recording a score for the current level
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreOutcome {
    /// Below the pass threshold; the player may retry indefinitely
    Retry { score: u8 },
    /// Passed; `unlocked` carries the newly unlocked level, if any
    LevelPassed { level: u8, unlocked: Option<u8> },
    /// The final level was newly completed; entered once per playthrough
    GameComplete,
}

/// State machine over {current level, unlocked set, completed set}
pub struct ProgressionEngine {
    progress: LevelProgress,
    game_complete: bool,
    pass_threshold: u8,
    level_count: u8,
    store: Box<dyn ProgressStore>,
}

impl std::fmt::Debug for ProgressionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressionEngine")
            .field("progress", &self.progress)
            .field("game_complete", &self.game_complete)
            .field("pass_threshold", &self.pass_threshold)
            .field("level_count", &self.level_count)
            .finish()
    }
}

impl ProgressionEngine {
    /// Create an engine, loading saved progress exactly once.
    ///
    /// Unreadable or corrupt saved state falls back to the initial state
    /// rather than failing session start.
    pub fn new(config: &GameConfig, store: Box<dyn ProgressStore>) -> Self {
        let progress = match store.load() {
            Ok(Some(saved)) => saved.sanitized(config.level_count),
            Ok(None) => LevelProgress::default(),
            Err(e) => {
                warn!(error = %e, "Failed to load saved progress, starting fresh");
                LevelProgress::default()
            }
        };

        let game_complete =
            (1..=config.level_count).all(|level| progress.completed_levels.contains(&level));

        Self {
            progress,
            game_complete,
            pass_threshold: config.pass_threshold,
            level_count: config.level_count,
            store,
        }
    }

    pub fn current_level(&self) -> u8 {
        self.progress.current_level
    }

    pub fn progress(&self) -> &LevelProgress {
        &self.progress
    }

    pub fn is_game_complete(&self) -> bool {
        self.game_complete
    }

    /// Record a freshly computed score for the current level.
    ///
    /// At or above the pass threshold the level is marked completed and the
    /// next level unlocked; passing the final level flags game-complete
    /// instead of unlocking anything. Below the threshold nothing changes.
    /// Both set mutations are idempotent.
    pub fn record_score(&mut self, score: u8) -> ScoreOutcome {
        if score < self.pass_threshold {
            debug!(score, level = self.progress.current_level, "Score below threshold");
            return ScoreOutcome::Retry { score };
        }

        let level = self.progress.current_level;
        let newly_completed = self.mark_completed(level);
        let unlocked = if level < self.level_count {
            self.unlock(level + 1)
        } else {
            None
        };

        if newly_completed || unlocked.is_some() {
            self.persist();
        }

        if level == self.level_count && newly_completed {
            self.game_complete = true;
            info!(score, "Final level passed, game complete");
            return ScoreOutcome::GameComplete;
        }

        info!(score, level, ?unlocked, "Level passed");
        ScoreOutcome::LevelPassed { level, unlocked }
    }

    /// Navigate to a level. Locked targets are silently rejected so stale UI
    /// state cannot force an illegal jump. Returns whether navigation took
    /// effect.
    pub fn change_level(&mut self, target: u8) -> bool {
        if !self.progress.unlocked_levels.contains(&target) {
            debug!(target, "Rejected navigation to locked level");
            return false;
        }
        if self.progress.current_level != target {
            self.progress.current_level = target;
            self.persist();
        }
        true
    }

    /// Return to the initial state unconditionally ("play again")
    pub fn reset(&mut self) {
        self.progress = LevelProgress::default();
        self.game_complete = false;
        self.persist();
        info!("Progress reset");
    }

    /// Idempotent completion marking; true if the level was newly completed
    fn mark_completed(&mut self, level: u8) -> bool {
        self.progress.completed_levels.insert(level)
    }

    /// Idempotent unlock; returns the level if it was newly unlocked
    fn unlock(&mut self, level: u8) -> Option<u8> {
        self.progress.unlocked_levels.insert(level).then_some(level)
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.progress) {
            warn!(error = %e, "Failed to persist progress");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::store::MemoryProgressStore;
    use std::collections::BTreeSet;

    fn engine_with(progress: LevelProgress) -> ProgressionEngine {
        ProgressionEngine::new(
            &GameConfig::default(),
            Box::new(MemoryProgressStore::with_progress(progress)),
        )
    }

    fn fresh_engine() -> ProgressionEngine {
        ProgressionEngine::new(&GameConfig::default(), Box::new(MemoryProgressStore::new()))
    }

    #[test]
    fn test_score_69_at_level_2_changes_nothing() {
        let mut engine = engine_with(LevelProgress {
            current_level: 2,
            unlocked_levels: BTreeSet::from([1, 2]),
            completed_levels: BTreeSet::from([1]),
        });

        let outcome = engine.record_score(69);

        assert_eq!(outcome, ScoreOutcome::Retry { score: 69 });
        assert_eq!(engine.progress().unlocked_levels, BTreeSet::from([1, 2]));
        assert_eq!(engine.progress().completed_levels, BTreeSet::from([1]));
    }

    #[test]
    fn test_score_70_at_level_2_unlocks_level_3() {
        let mut engine = engine_with(LevelProgress {
            current_level: 2,
            unlocked_levels: BTreeSet::from([1, 2]),
            completed_levels: BTreeSet::from([1]),
        });

        let outcome = engine.record_score(70);

        assert_eq!(
            outcome,
            ScoreOutcome::LevelPassed {
                level: 2,
                unlocked: Some(3)
            }
        );
        assert_eq!(engine.progress().unlocked_levels, BTreeSet::from([1, 2, 3]));
        assert_eq!(engine.progress().completed_levels, BTreeSet::from([1, 2]));
        // Passing does not move the player; navigation is explicit
        assert_eq!(engine.current_level(), 2);
    }

    #[test]
    fn test_passing_final_level_flags_game_complete() {
        let mut engine = engine_with(LevelProgress {
            current_level: 5,
            unlocked_levels: BTreeSet::from([1, 2, 3, 4, 5]),
            completed_levels: BTreeSet::from([1, 2, 3, 4]),
        });

        let outcome = engine.record_score(85);

        assert_eq!(outcome, ScoreOutcome::GameComplete);
        assert!(engine.is_game_complete());
        // Never a level 6
        assert!(!engine.progress().unlocked_levels.contains(&6));
    }

    #[test]
    fn test_game_complete_entered_only_once() {
        let mut engine = engine_with(LevelProgress {
            current_level: 5,
            unlocked_levels: BTreeSet::from([1, 2, 3, 4, 5]),
            completed_levels: BTreeSet::from([1, 2, 3, 4]),
        });

        assert_eq!(engine.record_score(85), ScoreOutcome::GameComplete);
        // Replaying the final level passes, but does not re-enter the
        // terminal transition
        assert_eq!(
            engine.record_score(90),
            ScoreOutcome::LevelPassed {
                level: 5,
                unlocked: None
            }
        );
    }

    #[test]
    fn test_repassing_a_level_is_idempotent() {
        let mut engine = engine_with(LevelProgress {
            current_level: 2,
            unlocked_levels: BTreeSet::from([1, 2, 3]),
            completed_levels: BTreeSet::from([1, 2]),
        });

        let outcome = engine.record_score(95);
        assert_eq!(
            outcome,
            ScoreOutcome::LevelPassed {
                level: 2,
                unlocked: None
            }
        );
        assert_eq!(engine.progress().completed_levels, BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_illegal_navigation_rejected() {
        let mut engine = engine_with(LevelProgress {
            current_level: 2,
            unlocked_levels: BTreeSet::from([1, 2]),
            completed_levels: BTreeSet::from([1]),
        });

        assert!(!engine.change_level(4));
        assert_eq!(engine.current_level(), 2);

        assert!(engine.change_level(1));
        assert_eq!(engine.current_level(), 1);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut engine = engine_with(LevelProgress {
            current_level: 4,
            unlocked_levels: BTreeSet::from([1, 2, 3, 4]),
            completed_levels: BTreeSet::from([1, 2, 3]),
        });

        engine.reset();
        let after_first = engine.progress().clone();
        engine.reset();

        assert_eq!(engine.progress(), &after_first);
        assert_eq!(after_first, LevelProgress::default());
        assert!(!engine.is_game_complete());
    }

    #[test]
    fn test_transitions_are_persisted() {
        let store = MemoryProgressStore::with_progress(LevelProgress {
            current_level: 2,
            unlocked_levels: BTreeSet::from([1, 2]),
            completed_levels: BTreeSet::from([1]),
        });
        let mut engine = ProgressionEngine::new(&GameConfig::default(), Box::new(store));

        engine.record_score(88);
        engine.change_level(3);

        assert_eq!(engine.current_level(), 3);
        assert!(engine.progress().completed_levels.contains(&2));
    }

    #[test]
    fn test_retry_does_not_persist() {
        let mut engine = fresh_engine();
        assert_eq!(engine.record_score(10), ScoreOutcome::Retry { score: 10 });
        assert_eq!(engine.progress(), &LevelProgress::default());
    }

    #[test]
    fn test_corrupt_saved_state_sanitized_on_load() {
        let engine = engine_with(LevelProgress {
            current_level: 9,
            unlocked_levels: BTreeSet::from([1, 9]),
            completed_levels: BTreeSet::from([7]),
        });
        assert_eq!(engine.current_level(), 1);
        assert!(engine.progress().completed_levels.is_empty());
    }

    #[test]
    fn test_fully_completed_save_restores_game_complete() {
        let engine = engine_with(LevelProgress {
            current_level: 5,
            unlocked_levels: BTreeSet::from([1, 2, 3, 4, 5]),
            completed_levels: BTreeSet::from([1, 2, 3, 4, 5]),
        });
        assert!(engine.is_game_complete());
    }
}
