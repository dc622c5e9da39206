//! Level progression
//!
//! Per-session progression state, the threshold state machine that advances
//! it, and the persistence seam it is saved through.

pub mod engine;
pub mod store;

pub use engine::{ProgressionEngine, ScoreOutcome};
pub use store::{JsonFileProgressStore, MemoryProgressStore, ProgressStore};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Per-session progression state.
///
/// `unlocked_levels` and `completed_levels` are ordered and duplicate-free;
/// level 1 is always unlocked and `current_level` is always a member of
/// `unlocked_levels`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub current_level: u8,
    pub unlocked_levels: BTreeSet<u8>,
    pub completed_levels: BTreeSet<u8>,
}

impl Default for LevelProgress {
    fn default() -> Self {
        Self {
            current_level: 1,
            unlocked_levels: BTreeSet::from([1]),
            completed_levels: BTreeSet::new(),
        }
    }
}

impl LevelProgress {
    /// Repair state loaded from storage so the invariants hold.
    ///
    /// Out-of-range levels are dropped, level 1 is re-added if missing, and a
    /// current level pointing at a locked or unknown level falls back to 1.
    pub fn sanitized(mut self, level_count: u8) -> Self {
        self.unlocked_levels
            .retain(|level| (1..=level_count).contains(level));
        self.completed_levels
            .retain(|level| (1..=level_count).contains(level));
        self.unlocked_levels.insert(1);

        if !self.unlocked_levels.contains(&self.current_level) {
            self.current_level = 1;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_initial_state() {
        let progress = LevelProgress::default();
        assert_eq!(progress.current_level, 1);
        assert_eq!(progress.unlocked_levels, BTreeSet::from([1]));
        assert!(progress.completed_levels.is_empty());
    }

    #[test]
    fn test_sanitize_drops_out_of_range_levels() {
        let progress = LevelProgress {
            current_level: 3,
            unlocked_levels: BTreeSet::from([0, 1, 2, 3, 9]),
            completed_levels: BTreeSet::from([1, 2, 42]),
        }
        .sanitized(5);

        assert_eq!(progress.unlocked_levels, BTreeSet::from([1, 2, 3]));
        assert_eq!(progress.completed_levels, BTreeSet::from([1, 2]));
        assert_eq!(progress.current_level, 3);
    }

    #[test]
    fn test_sanitize_repairs_current_level() {
        let progress = LevelProgress {
            current_level: 4,
            unlocked_levels: BTreeSet::from([1, 2]),
            completed_levels: BTreeSet::new(),
        }
        .sanitized(5);
        assert_eq!(progress.current_level, 1);
    }

    #[test]
    fn test_sanitize_restores_level_one() {
        let progress = LevelProgress {
            current_level: 1,
            unlocked_levels: BTreeSet::new(),
            completed_levels: BTreeSet::new(),
        }
        .sanitized(5);
        assert!(progress.unlocked_levels.contains(&1));
    }

    #[test]
    fn test_serde_round_trip() {
        let progress = LevelProgress {
            current_level: 2,
            unlocked_levels: BTreeSet::from([1, 2, 3]),
            completed_levels: BTreeSet::from([1, 2]),
        };
        let json = serde_json::to_string(&progress).unwrap();
        let parsed: LevelProgress = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, progress);
    }
}
