//! Entry domain model.
//!
//! # Responsibility
//! - Define the canonical grow-log record and its growth-stage tag.
//! - Provide draft constructors and timestamp helpers.
//!
//! # Invariants
//! - `id` is `None` only for drafts that were never persisted.
//! - `id` never changes once assigned.
//! - `stage` is always one of `Stage::ALL`.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier assigned by the entry store on first upsert.
pub type EntryId = Uuid;

/// Opaque user id of the identity owning an entry.
pub type OwnerId = String;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 10_000;

/// Growth-phase tag attached to every entry.
///
/// Declaration order is the page order of the editor's stage selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Seed,
    Vegetative,
    Flowering,
    Harvest,
    Curing,
}

impl Stage {
    /// All stages in selector page order.
    pub const ALL: [Stage; 5] = [
        Stage::Seed,
        Stage::Vegetative,
        Stage::Flowering,
        Stage::Harvest,
        Stage::Curing,
    ];

    /// Stage a fresh draft starts with.
    pub fn first() -> Self {
        Self::ALL[0]
    }

    /// Maps a selector page index to a stage. Out-of-range pages clamp to
    /// the last stage.
    pub fn from_page(page: usize) -> Self {
        Self::ALL[page.min(Self::ALL.len() - 1)]
    }

    /// Selector page index of this stage.
    pub fn page(self) -> usize {
        match self {
            Self::Seed => 0,
            Self::Vegetative => 1,
            Self::Flowering => 2,
            Self::Harvest => 3,
            Self::Curing => 4,
        }
    }

    /// Stable uppercase label used for storage and display.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Seed => "SEED",
            Self::Vegetative => "VEGETATIVE",
            Self::Flowering => "FLOWERING",
            Self::Harvest => "HARVEST",
            Self::Curing => "CURING",
        }
    }

    /// Parses a label case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user-created log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// `None` until the store assigns an id.
    pub id: Option<EntryId>,
    /// Identity that created the entry.
    pub owner_id: OwnerId,
    pub title: String,
    pub description: String,
    pub stage: Stage,
    /// Unix epoch milliseconds.
    pub timestamp_ms: i64,
    /// Ordered image references. Stored as-is, never processed.
    pub images: Vec<String>,
}

impl Entry {
    /// Creates an empty, unsaved draft stamped with the current time.
    ///
    /// # Invariants
    /// - `id` is `None` and `owner_id` is empty until the first save.
    /// - `stage` is `Stage::first()`.
    pub fn draft() -> Self {
        Self::draft_at(Utc::now().timestamp_millis())
    }

    /// Creates an empty, unsaved draft with a caller-provided timestamp.
    pub fn draft_at(timestamp_ms: i64) -> Self {
        Self {
            id: None,
            owner_id: OwnerId::new(),
            title: String::new(),
            description: String::new(),
            stage: Stage::first(),
            timestamp_ms,
            images: Vec::new(),
        }
    }

    /// Returns whether the store has already assigned an id.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Timestamp as a UTC date-time, `None` if out of chrono's range.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp_ms).single()
    }

    /// Sets the timestamp from a UTC date-time (millisecond precision).
    pub fn set_timestamp(&mut self, at: DateTime<Utc>) {
        self.timestamp_ms = at.timestamp_millis();
    }

    /// Validates field bounds before persistence.
    ///
    /// # Errors
    /// - `TitleTooLong` / `DescriptionTooLong` when limits are exceeded.
    /// - `BlankImageReference` when an image entry is empty after trim.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        let title_chars = self.title.chars().count();
        if title_chars > MAX_TITLE_CHARS {
            return Err(EntryValidationError::TitleTooLong {
                chars: title_chars,
                max: MAX_TITLE_CHARS,
            });
        }

        let description_chars = self.description.chars().count();
        if description_chars > MAX_DESCRIPTION_CHARS {
            return Err(EntryValidationError::DescriptionTooLong {
                chars: description_chars,
                max: MAX_DESCRIPTION_CHARS,
            });
        }

        if let Some(index) = self.images.iter().position(|image| image.trim().is_empty()) {
            return Err(EntryValidationError::BlankImageReference { index });
        }

        Ok(())
    }
}

/// Field-bound violations detected by `Entry::validate()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValidationError {
    TitleTooLong { chars: usize, max: usize },
    DescriptionTooLong { chars: usize, max: usize },
    BlankImageReference { index: usize },
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TitleTooLong { chars, max } => {
                write!(f, "title has {chars} chars; at most {max} allowed")
            }
            Self::DescriptionTooLong { chars, max } => {
                write!(f, "description has {chars} chars; at most {max} allowed")
            }
            Self::BlankImageReference { index } => {
                write!(f, "image reference at index {index} is blank")
            }
        }
    }
}

impl Error for EntryValidationError {}

#[cfg(test)]
mod tests {
    use super::{Entry, EntryValidationError, Stage, MAX_TITLE_CHARS};
    use chrono::{TimeZone, Utc};

    #[test]
    fn draft_starts_with_first_stage_and_no_id() {
        let draft = Entry::draft();
        assert!(!draft.is_persisted());
        assert_eq!(draft.stage, Stage::Seed);
        assert!(draft.title.is_empty());
        assert!(draft.timestamp_ms > 0);
    }

    #[test]
    fn stage_pages_follow_declaration_order() {
        for (page, stage) in Stage::ALL.into_iter().enumerate() {
            assert_eq!(stage.page(), page);
            assert_eq!(Stage::from_page(page), stage);
        }
        assert_eq!(Stage::from_page(99), Stage::Curing);
    }

    #[test]
    fn stage_parse_is_case_insensitive() {
        assert_eq!(Stage::parse(" flowering "), Some(Stage::Flowering));
        assert_eq!(Stage::parse("bloom"), None);
    }

    #[test]
    fn stage_serializes_as_uppercase_label() {
        let json = serde_json::to_string(&Stage::Vegetative).unwrap();
        assert_eq!(json, "\"VEGETATIVE\"");
    }

    #[test]
    fn timestamp_helpers_use_millisecond_precision() {
        let mut draft = Entry::draft_at(0);
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();
        draft.set_timestamp(at);
        assert_eq!(draft.timestamp(), Some(at));
    }

    #[test]
    fn validate_rejects_long_title_and_blank_images() {
        let mut entry = Entry::draft_at(1);
        entry.title = "x".repeat(MAX_TITLE_CHARS + 1);
        assert!(matches!(
            entry.validate(),
            Err(EntryValidationError::TitleTooLong { .. })
        ));

        entry.title = "ok".to_string();
        entry.images = vec!["a.png".to_string(), "  ".to_string()];
        assert_eq!(
            entry.validate(),
            Err(EntryValidationError::BlankImageReference { index: 1 })
        );
    }
}
