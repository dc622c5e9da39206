//! Attempt event stream
//!
//! Optional JSONL notifications for observers (UI chrome, sound cues,
//! dashboards). The core emits events; nothing in the pipeline depends on
//! anyone reading them, and a failed write never disturbs gameplay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use uuid::Uuid;

/// Default path of the attempt events file
pub fn events_file_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".promptforge")
        .join("attempt-events.jsonl")
}

/// One attempt lifecycle event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptEvent {
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
    /// Unique event ID
    pub event_id: Uuid,
    /// Session ID for grouping events from the same playthrough
    pub session_id: Uuid,
    /// Event type
    pub event_type: AttemptEventType,
    /// Level the attempt targets
    pub level: u8,
    /// Similarity score (score events only)
    pub score: Option<u8>,
    /// Error message (failure events only)
    pub error: Option<String>,
}

/// Type of attempt event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttemptEventType {
    /// Attempt started for a level
    Started,
    /// Image generation succeeded
    Generated,
    /// Image generation failed; the attempt was aborted
    GenerationFailed,
    /// Comparison finished and a score was recorded
    ScoreComputed,
    /// The final level was passed
    GameComplete,
}

/// Appends attempt events to a JSONL file
pub struct AttemptEventWriter {
    session_id: Uuid,
    file: Mutex<Option<File>>,
}

impl AttemptEventWriter {
    /// Create a writer at the default path
    pub fn new() -> Self {
        Self::with_path(events_file_path())
    }

    /// Create a writer at a custom path
    pub fn with_path(path: PathBuf) -> Self {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok();

        Self {
            session_id: Uuid::new_v4(),
            file: Mutex::new(file),
        }
    }

    /// Get the session ID
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    fn write_event(
        &self,
        event_type: AttemptEventType,
        level: u8,
        score: Option<u8>,
        error: Option<String>,
    ) {
        let event = AttemptEvent {
            timestamp: Utc::now(),
            event_id: Uuid::new_v4(),
            session_id: self.session_id,
            event_type,
            level,
            score,
            error,
        };

        if let Ok(mut file_guard) = self.file.lock()
            && let Some(ref mut file) = *file_guard
            && let Ok(json) = serde_json::to_string(&event)
        {
            let _ = writeln!(file, "{}", json);
            let _ = file.flush();
        }
    }

    /// Emit an attempt-started event
    pub fn emit_started(&self, level: u8) {
        self.write_event(AttemptEventType::Started, level, None, None);
    }

    /// Emit a generation-succeeded event
    pub fn emit_generated(&self, level: u8) {
        self.write_event(AttemptEventType::Generated, level, None, None);
    }

    /// Emit a generation-failed event
    pub fn emit_generation_failed(&self, level: u8, error: &str) {
        self.write_event(
            AttemptEventType::GenerationFailed,
            level,
            None,
            Some(error.to_string()),
        );
    }

    /// Emit a score-computed event
    pub fn emit_score(&self, level: u8, score: u8) {
        self.write_event(AttemptEventType::ScoreComputed, level, Some(score), None);
    }

    /// Emit a game-complete event
    pub fn emit_game_complete(&self, level: u8) {
        self.write_event(AttemptEventType::GameComplete, level, None, None);
    }
}

impl Default for AttemptEventWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_event_serialization() {
        let event = AttemptEvent {
            timestamp: Utc::now(),
            event_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            event_type: AttemptEventType::ScoreComputed,
            level: 2,
            score: Some(74),
            error: None,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"score_computed\""));
        let parsed: AttemptEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event_type, AttemptEventType::ScoreComputed);
        assert_eq!(parsed.score, Some(74));
    }

    #[test]
    fn test_events_appended_as_jsonl() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.jsonl");
        let writer = AttemptEventWriter::with_path(path.clone());

        writer.emit_started(1);
        writer.emit_generated(1);
        writer.emit_score(1, 42);

        let contents = std::fs::read_to_string(&path).unwrap();
        let events: Vec<AttemptEvent> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event_type, AttemptEventType::Started);
        assert_eq!(events[2].score, Some(42));
        assert!(events.iter().all(|e| e.session_id == writer.session_id()));
    }
}
