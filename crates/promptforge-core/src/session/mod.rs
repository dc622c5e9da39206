//! Game session composition
//!
//! Wires the generation client, the comparison orchestrator, and the
//! progression engine into the per-action flow: one "create image" action is
//! one generation followed by one comparison followed by one progression
//! transition, strictly in that order.

pub mod events;
pub mod quality;

pub use events::{AttemptEvent, AttemptEventType, AttemptEventWriter};
pub use quality::QualityBand;

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use crate::error::{Error, Result};
use crate::generation::{GeneratedImage, GenerationClient};
use crate::progress::{LevelProgress, ProgressionEngine, ScoreOutcome};
use crate::vision::{ComparisonResult, ImageComparator};

/// One playable level: its number, rank title, and target image source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSpec {
    pub level: u8,
    pub title: String,
    pub target_image: String,
}

/// Ordered set of playable levels
#[derive(Debug, Clone)]
pub struct LevelCatalog {
    levels: Vec<LevelSpec>,
}

impl LevelCatalog {
    pub fn new(levels: Vec<LevelSpec>) -> Self {
        Self { levels }
    }

    /// The five standard levels with their rank titles
    pub fn standard() -> Self {
        let titles = [
            "Prompt Explorer",
            "Prompt Builder",
            "Prompt Creator",
            "Prompt Innovator",
            "Prompt Master",
        ];
        let levels = titles
            .iter()
            .enumerate()
            .map(|(index, title)| {
                let level = (index + 1) as u8;
                LevelSpec {
                    level,
                    title: title.to_string(),
                    target_image: format!("assets/levels/level{}.png", level),
                }
            })
            .collect();
        Self { levels }
    }

    pub fn get(&self, level: u8) -> Option<&LevelSpec> {
        self.levels.iter().find(|spec| spec.level == level)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LevelSpec> {
        self.levels.iter()
    }
}

impl Default for LevelCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Everything the UI needs to render after one attempt
#[derive(Debug, Clone)]
pub struct AttemptReport {
    pub level: u8,
    pub image: GeneratedImage,
    pub comparison: ComparisonResult,
    pub outcome: ScoreOutcome,
}

/// One player's running game: generation, comparison, and progression
/// composed per user action.
pub struct GameSession {
    generator: GenerationClient,
    comparator: ImageComparator,
    engine: Mutex<ProgressionEngine>,
    catalog: LevelCatalog,
    /// At most one attempt runs at a time; further submissions are rejected
    /// until the current one finishes
    busy: AtomicBool,
    events: AttemptEventWriter,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("generator", &self.generator)
            .field("levels", &self.catalog.len())
            .finish()
    }
}

impl GameSession {
    pub fn new(
        generator: GenerationClient,
        comparator: ImageComparator,
        engine: ProgressionEngine,
        catalog: LevelCatalog,
    ) -> Self {
        Self {
            generator,
            comparator,
            engine: Mutex::new(engine),
            catalog,
            busy: AtomicBool::new(false),
            events: AttemptEventWriter::new(),
        }
    }

    /// Use a custom event writer (tests, alternate event sinks)
    pub fn with_event_writer(mut self, events: AttemptEventWriter) -> Self {
        self.events = events;
        self
    }

    /// Run one full attempt for the current level: generate an image from
    /// the prompt, score it against the level's target, and record the score.
    ///
    /// Generation errors propagate: with no image there is nothing to score,
    /// and the UI must branch on the failure explicitly. Comparison failures
    /// do not propagate; they surface as a zero-score result inside the
    /// report, uniform with a legitimately low score.
    pub async fn submit_prompt(&self, prompt: &str) -> Result<AttemptReport> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AttemptInFlight);
        }

        let result = self.run_attempt(prompt).await;
        self.busy.store(false, Ordering::Release);
        result
    }

    async fn run_attempt(&self, prompt: &str) -> Result<AttemptReport> {
        let (level, target_image) = {
            let engine = self.lock_engine()?;
            let level = engine.current_level();
            let target = self
                .catalog
                .get(level)
                .ok_or_else(|| Error::Config(format!("no level {} in catalog", level)))?
                .target_image
                .clone();
            (level, target)
        };

        info!(level, "Starting attempt");
        self.events.emit_started(level);

        let image = match self.generator.generate(prompt).await {
            Ok(image) => image,
            Err(e) => {
                self.events.emit_generation_failed(level, &e.to_string());
                return Err(e);
            }
        };
        self.events.emit_generated(level);

        let comparison = self
            .comparator
            .compare_with_feedback(&target_image, &image.url, prompt)
            .await;

        let outcome = {
            let mut engine = self.lock_engine()?;
            engine.record_score(comparison.score)
        };

        self.events.emit_score(level, comparison.score);
        if outcome == ScoreOutcome::GameComplete {
            self.events.emit_game_complete(level);
        }

        Ok(AttemptReport {
            level,
            image,
            comparison,
            outcome,
        })
    }

    /// Navigate to an unlocked level; locked targets are silently rejected
    pub fn change_level(&self, target: u8) -> bool {
        self.lock_engine()
            .map(|mut engine| engine.change_level(target))
            .unwrap_or(false)
    }

    /// Start over ("play again")
    pub fn reset(&self) {
        if let Ok(mut engine) = self.lock_engine() {
            engine.reset();
        }
    }

    /// Snapshot of the current progression state
    pub fn progress(&self) -> LevelProgress {
        self.lock_engine()
            .map(|engine| engine.progress().clone())
            .unwrap_or_default()
    }

    pub fn is_game_complete(&self) -> bool {
        self.lock_engine()
            .map(|engine| engine.is_game_complete())
            .unwrap_or(false)
    }

    pub fn catalog(&self) -> &LevelCatalog {
        &self.catalog
    }

    fn lock_engine(&self) -> Result<std::sync::MutexGuard<'_, ProgressionEngine>> {
        self.engine
            .lock()
            .map_err(|_| Error::Storage("progression state poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::generation::CredentialPool;
    use crate::normalize::ImageNormalizer;
    use crate::progress::MemoryProgressStore;
    use crate::vision::ComparisonClient;
    use tempfile::TempDir;

    fn test_session(keys: Vec<&str>, temp_dir: &TempDir) -> GameSession {
        let config = Config::default();
        let generator = GenerationClient::builder()
            .config(config.generation.clone())
            .credentials(CredentialPool::new(
                keys.into_iter().map(String::from).collect(),
            ))
            .build()
            .unwrap();
        let comparator = ImageComparator::new(
            ImageNormalizer::new().unwrap(),
            ComparisonClient::new(config.comparison.clone(), "test-key").unwrap(),
        );
        let engine =
            ProgressionEngine::new(&config.game, Box::new(MemoryProgressStore::new()));

        GameSession::new(generator, comparator, engine, LevelCatalog::standard())
            .with_event_writer(AttemptEventWriter::with_path(
                temp_dir.path().join("events.jsonl"),
            ))
    }

    #[test]
    fn test_standard_catalog() {
        let catalog = LevelCatalog::standard();
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.get(1).unwrap().title, "Prompt Explorer");
        assert_eq!(catalog.get(5).unwrap().title, "Prompt Master");
        assert!(catalog.get(6).is_none());
    }

    #[tokio::test]
    async fn test_empty_prompt_fails_and_releases_busy_flag() {
        let temp_dir = TempDir::new().unwrap();
        let session = test_session(vec!["key-1"], &temp_dir);

        // Both calls must hit the validation error, not AttemptInFlight:
        // the busy flag is released when an attempt fails
        assert!(matches!(
            session.submit_prompt("").await,
            Err(Error::EmptyPrompt)
        ));
        assert!(matches!(
            session.submit_prompt("  ").await,
            Err(Error::EmptyPrompt)
        ));
    }

    #[tokio::test]
    async fn test_generation_failure_emits_event_and_propagates() {
        let temp_dir = TempDir::new().unwrap();
        // No credentials: generation fails before any network traffic
        let session = test_session(vec![], &temp_dir);

        assert!(matches!(
            session.submit_prompt("a red balloon").await,
            Err(Error::NoCredentials)
        ));

        let contents =
            std::fs::read_to_string(temp_dir.path().join("events.jsonl")).unwrap();
        let events: Vec<AttemptEvent> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(events[0].event_type, AttemptEventType::Started);
        assert_eq!(events[1].event_type, AttemptEventType::GenerationFailed);
        assert!(events[1].error.is_some());
        // No score event: a failed generation produces no score change
        assert!(
            !events
                .iter()
                .any(|e| e.event_type == AttemptEventType::ScoreComputed)
        );
    }

    #[tokio::test]
    async fn test_navigation_and_reset() {
        let temp_dir = TempDir::new().unwrap();
        let session = test_session(vec!["key-1"], &temp_dir);

        assert!(!session.change_level(3));
        assert!(session.change_level(1));
        assert_eq!(session.progress().current_level, 1);

        session.reset();
        assert_eq!(session.progress(), LevelProgress::default());
        assert!(!session.is_game_complete());
    }
}
