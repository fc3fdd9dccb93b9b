//! Structured task results.
//!
//! The model's JSON output deserializes into these types; the canonical
//! serialization is what gets sealed back to the client. Unknown fields in
//! model output are ignored; missing required fields fail deserialization.
//!
//! # Invariants
//!
//! - Canonical form is compact JSON with declaration-order fields; parsing
//!   a canonical serialization and re-serializing reproduces it
//!   byte-for-byte.
//! - `capture_metadata` results are wrapped as
//!   `{"capture_metadata": {...}, "confidence": n}` with camelCase inner
//!   fields, matching what clients already decode.

use serde::{Deserialize, Serialize};

use crate::task::TaskKind;

/// Kind of an extracted memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    /// A future action or promise.
    Commitment,
    /// Learned information.
    Fact,
    /// A realization or conclusion.
    Insight,
    /// A recurring behavior.
    Pattern,
    /// A personal preference.
    Preference,
}

/// One extracted memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Memory kind. Serialized as `type` for client compatibility.
    #[serde(rename = "type")]
    pub kind: MemoryKind,
    /// The memory text.
    pub content: String,
    /// Model confidence in [0, 1].
    pub confidence: f64,
}

/// Result of the `memory_distillation` task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryDistillationResult {
    /// Extracted memories; may be empty.
    pub memories: Vec<MemoryItem>,
    /// Overall confidence in [0, 1].
    pub confidence: f64,
}

/// One extracted tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagItem {
    /// Tag text, lowercase single tokens preferred.
    pub tag: String,
    /// Model confidence in [0, 1].
    pub confidence: f64,
}

/// Result of the `tagging` task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggingResult {
    /// Extracted tags; may be empty.
    pub tags: Vec<TagItem>,
    /// Overall confidence in [0, 1].
    pub confidence: f64,
}

/// Result of the `insight_extraction` task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightExtractionResult {
    /// Extracted insights as complete sentences; may be empty.
    pub insights: Vec<String>,
    /// Overall confidence in [0, 1].
    pub confidence: f64,
}

/// Primary intent of a captured entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureIntent {
    /// The entry asks something.
    Question,
    /// The entry wants to be reminded later.
    Reminder,
    /// The entry records an action item.
    Task,
    /// A plain note.
    Note,
    /// A reflective entry.
    Reflection,
    /// A quotation.
    Quote,
    /// An idea.
    Idea,
}

/// Result of the `capture_metadata` task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureMetadataResult {
    /// Classified primary intent.
    pub intent: CaptureIntent,
    /// Core question, when `intent` is `question`.
    #[serde(default)]
    pub extracted_question: Option<String>,
    /// Action item, when `intent` is `task`.
    #[serde(default)]
    pub extracted_task: Option<String>,
    /// ISO 8601 UTC reminder instant, when `intent` is `reminder`.
    #[serde(default)]
    pub inferred_reminder_time: Option<String>,
    /// People, places, and concepts mentioned.
    #[serde(default)]
    pub extracted_entities: Vec<String>,
    /// Suggested tags.
    #[serde(default)]
    pub suggested_tags: Vec<String>,
    /// Model confidence in [0, 1].
    pub confidence: f64,
    /// Whether the user expects an AI response.
    #[serde(default)]
    pub requires_response: bool,
}

/// A validated task result, one variant per task tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    /// `memory_distillation` output.
    MemoryDistillation(MemoryDistillationResult),
    /// `tagging` output.
    Tagging(TaggingResult),
    /// `insight_extraction` output.
    InsightExtraction(InsightExtractionResult),
    /// `capture_metadata` output.
    CaptureMetadata(CaptureMetadataResult),
}

/// Wrapper giving `capture_metadata` results their wire shape.
#[derive(Debug, Serialize)]
struct CaptureEnvelope<'a> {
    capture_metadata: &'a CaptureMetadataResult,
    confidence: f64,
}

impl TaskResult {
    /// The task tag this result belongs to.
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::MemoryDistillation(_) => TaskKind::MemoryDistillation,
            Self::Tagging(_) => TaskKind::Tagging,
            Self::InsightExtraction(_) => TaskKind::InsightExtraction,
            Self::CaptureMetadata(_) => TaskKind::CaptureMetadata,
        }
    }

    /// Canonical JSON serialization of this result.
    ///
    /// Compact, declaration-order fields, UTF-8, no embedded newlines.
    /// This is the exact byte string that gets sealed back to the client.
    pub fn canonical_json(&self) -> String {
        let encoded = match self {
            Self::MemoryDistillation(result) => serde_json::to_string(result),
            Self::Tagging(result) => serde_json::to_string(result),
            Self::InsightExtraction(result) => serde_json::to_string(result),
            Self::CaptureMetadata(result) => serde_json::to_string(&CaptureEnvelope {
                capture_metadata: result,
                confidence: result.confidence,
            }),
        };

        let Ok(json) = encoded else {
            unreachable!("task results contain only string keys and finite numbers");
        };
        json
    }
}
