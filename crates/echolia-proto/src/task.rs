//! Task tags for the supported analyses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The analyses the gateway can run on decrypted content.
///
/// The wire carries the tag as a free string so that unknown tags reach the
/// pipeline (and its quota accounting) instead of failing at
/// deserialization; [`TaskKind::from_str`] is the single point that decides
/// whether a tag is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Extract commitments, facts, insights, patterns, and preferences.
    MemoryDistillation,
    /// Extract relevant lowercase tags.
    Tagging,
    /// Extract deeper insights and recurring themes.
    InsightExtraction,
    /// Extract capture metadata: intent, entities, reminder time, tags.
    CaptureMetadata,
}

impl TaskKind {
    /// All supported tags, in registry order.
    pub const ALL: [TaskKind; 4] = [
        TaskKind::MemoryDistillation,
        TaskKind::Tagging,
        TaskKind::InsightExtraction,
        TaskKind::CaptureMetadata,
    ];

    /// Canonical wire string for this tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MemoryDistillation => "memory_distillation",
            Self::Tagging => "tagging",
            Self::InsightExtraction => "insight_extraction",
            Self::CaptureMetadata => "capture_metadata",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a wire tag names no supported task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTask;

impl FromStr for TaskKind {
    type Err = UnknownTask;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == s).ok_or(UnknownTask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_tag() {
        for kind in TaskKind::ALL {
            assert_eq!(kind.as_str().parse::<TaskKind>(), Ok(kind));
        }
    }

    #[test]
    fn rejects_unknown_tag() {
        assert_eq!("summarization".parse::<TaskKind>(), Err(UnknownTask));
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&TaskKind::MemoryDistillation).unwrap();
        assert_eq!(json, "\"memory_distillation\"");
    }
}
