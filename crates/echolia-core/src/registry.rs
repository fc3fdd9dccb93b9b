//! Task registry: the closed table of supported analyses.
//!
//! Each task pairs a system prompt with a user-prompt template and a
//! schema for the model's JSON output. Descriptors are immutable after
//! process start; prompt engineering lives here and nowhere else.
//!
//! Decrypted content is inserted into the user template verbatim — no
//! escaping, the model receives it as the message body. That is the point
//! of the E2EE pipeline: the content is opaque everywhere except inside
//! this one formatting step and the provider call.

use chrono::{DateTime, SecondsFormat, Utc};
use echolia_proto::{
    CaptureMetadataResult, InsightExtractionResult, MemoryDistillationResult, TaggingResult,
    TaskKind, TaskResult,
};
use thiserror::Error;

/// Model output that failed JSON decoding or schema validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutputError {
    /// Not valid JSON after fence stripping.
    #[error("model output is not valid JSON: {0}")]
    Json(String),

    /// JSON decoded but violated the task's schema.
    #[error("model output failed schema validation: {0}")]
    Schema(&'static str),
}

/// One supported analysis: tag, prompts, and output schema.
#[derive(Debug, Clone, Copy)]
pub struct TaskDescriptor {
    kind: TaskKind,
    system_prompt: &'static str,
    user_prefix: &'static str,
}

impl TaskDescriptor {
    /// The task tag.
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Build the `(system, user)` message pair for this task.
    ///
    /// `content` is inserted verbatim. `now` only affects
    /// `capture_metadata`, whose system prompt carries the current time
    /// context for reminder parsing; the other prompts are constants.
    pub fn format(&self, content: &str, now: DateTime<Utc>) -> (String, String) {
        let system = match self.kind {
            TaskKind::CaptureMetadata => render_capture_system(now),
            _ => self.system_prompt.to_string(),
        };
        let user = format!("{}{}", self.user_prefix, content);
        (system, user)
    }

    /// Parse and validate raw model output into a task result.
    ///
    /// Strips optional triple-backtick fences, JSON-decodes, then applies
    /// the task's schema rules. Unknown fields are ignored; missing
    /// required fields, out-of-range confidences, and empty required
    /// strings are rejected. Tags are normalized to lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] on any decoding or validation failure.
    pub fn parse(&self, raw: &str) -> Result<TaskResult, OutputError> {
        let stripped = strip_fences(raw);

        match self.kind {
            TaskKind::MemoryDistillation => {
                let result: MemoryDistillationResult = decode(stripped)?;
                check_confidence(result.confidence)?;
                for memory in &result.memories {
                    check_confidence(memory.confidence)?;
                    if memory.content.is_empty() {
                        return Err(OutputError::Schema("empty memory content"));
                    }
                }
                Ok(TaskResult::MemoryDistillation(result))
            }
            TaskKind::Tagging => {
                let mut result: TaggingResult = decode(stripped)?;
                check_confidence(result.confidence)?;
                for tag in &mut result.tags {
                    check_confidence(tag.confidence)?;
                    if tag.tag.is_empty() {
                        return Err(OutputError::Schema("empty tag"));
                    }
                    tag.tag = tag.tag.to_lowercase();
                }
                Ok(TaskResult::Tagging(result))
            }
            TaskKind::InsightExtraction => {
                let result: InsightExtractionResult = decode(stripped)?;
                check_confidence(result.confidence)?;
                if result.insights.iter().any(String::is_empty) {
                    return Err(OutputError::Schema("empty insight"));
                }
                Ok(TaskResult::InsightExtraction(result))
            }
            TaskKind::CaptureMetadata => {
                let result: CaptureMetadataResult = decode(stripped)?;
                check_confidence(result.confidence)?;
                Ok(TaskResult::CaptureMetadata(result))
            }
        }
    }
}

/// The immutable table of descriptors, one per supported tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskRegistry;

impl TaskRegistry {
    /// Build the registry.
    pub fn new() -> Self {
        Self
    }

    /// Constant-time lookup of a wire tag.
    ///
    /// Returns `None` for tags naming no registered analysis; the caller
    /// maps that to the `unknown_task` error.
    pub fn lookup(&self, tag: &str) -> Option<&'static TaskDescriptor> {
        let kind = tag.parse::<TaskKind>().ok()?;
        DESCRIPTORS.iter().find(|descriptor| descriptor.kind == kind)
    }
}

static DESCRIPTORS: [TaskDescriptor; 4] = [
    TaskDescriptor {
        kind: TaskKind::MemoryDistillation,
        system_prompt: MEMORY_DISTILLATION_SYSTEM,
        user_prefix: "Extract memories from this journal entry:\n\n",
    },
    TaskDescriptor {
        kind: TaskKind::Tagging,
        system_prompt: TAGGING_SYSTEM,
        user_prefix: "Extract tags from this journal entry:\n\n",
    },
    TaskDescriptor {
        kind: TaskKind::InsightExtraction,
        system_prompt: INSIGHT_EXTRACTION_SYSTEM,
        user_prefix: "Extract insights from this journal entry:\n\n",
    },
    TaskDescriptor {
        kind: TaskKind::CaptureMetadata,
        system_prompt: "",
        user_prefix: "Extract metadata from this entry:\n\n",
    },
];

const MEMORY_DISTILLATION_SYSTEM: &str = r#"You are a memory extraction assistant. Your task is to identify and extract important memories from journal entries. Focus on:

1. Commitments - Future actions or promises ("I will...", "Need to...", "Should call...")
2. Facts - Learned information ("Flutter uses Dart", "The meeting is at 3pm")
3. Insights - Realizations or conclusions ("I realized that...", "Understood why...")
4. Patterns - Recurring behaviors ("I always...", "Every time...")
5. Preferences - Personal preferences ("I prefer...", "I like...")

Return a JSON object with this exact structure:
{
  "memories": [
    {"type": "commitment|fact|insight|pattern|preference", "content": "extracted memory", "confidence": 0.0-1.0}
  ],
  "confidence": 0.0-1.0
}

Only extract clear, meaningful memories. Assign confidence based on how explicit the memory is in the text."#;

const TAGGING_SYSTEM: &str = r#"You are a tagging assistant. Your task is to extract relevant tags from journal entries.

Common tag categories:
- Topics: work, personal, family, health, finance, learning
- Types: task, reminder, question, idea, reflection, gratitude
- Entities: project, meeting, deadline, goal, event

Return a JSON object with this exact structure:
{
  "tags": [
    {"tag": "lowercase_tag", "confidence": 0.0-1.0}
  ],
  "confidence": 0.0-1.0
}

Extract 3-7 most relevant tags. Use lowercase, single words. Assign confidence based on relevance."#;

const INSIGHT_EXTRACTION_SYSTEM: &str = r#"You are an insight extraction assistant. Your task is to identify deeper insights, patterns, and connections in journal entries.

Focus on:
- Recurring themes or patterns
- Connections to broader goals or values
- Emotional patterns or trends
- Areas of growth or concern
- Underlying motivations

Return a JSON object with this exact structure:
{
  "insights": [
    "First insight as a complete sentence",
    "Second insight as a complete sentence"
  ],
  "confidence": 0.0-1.0
}

Provide 1-3 meaningful insights. Write them as helpful observations that could aid self-reflection."#;

const CAPTURE_METADATA_PREAMBLE: &str = "You are a metadata extraction assistant. Analyze journal entries and extract structured metadata.";

const CAPTURE_METADATA_SCHEMA: &str = r#"Return a JSON object with this exact structure:
{
  "intent": "question|reminder|task|note|reflection|quote|idea",
  "extractedQuestion": "string or null",
  "extractedTask": "string or null",
  "inferredReminderTime": "ISO8601 string or null",
  "extractedEntities": ["entity1", "entity2"],
  "suggestedTags": ["tag1", "tag2"],
  "confidence": 0.0-1.0,
  "requiresResponse": true|false
}

Guidelines:
- intent: Classify the primary intent
- extractedQuestion: If question intent, extract the core question
- extractedTask: If task intent, extract the action item
- inferredReminderTime: If reminder intent, parse time expressions (e.g., "tomorrow at 2pm", "in 2 hours") into ISO8601 UTC timestamp
- extractedEntities: Extract people, places, concepts mentioned (max 5)
- suggestedTags: Extract 1-5 relevant tags (work, personal, health, urgent, family, etc.)
- requiresResponse: true if the user expects an AI response (questions, complex requests)"#;

fn render_capture_system(now: DateTime<Utc>) -> String {
    format!(
        "{CAPTURE_METADATA_PREAMBLE}\n\n\
         CURRENT TIME CONTEXT (use for reminder time calculations):\n\
         - UTC time: {}\n\
         - Day: {}\n\
         - Date: {}\n\
         - Time: {}\n\n\
         {CAPTURE_METADATA_SCHEMA}",
        now.to_rfc3339_opts(SecondsFormat::Secs, true),
        now.format("%A"),
        now.format("%Y-%m-%d"),
        now.format("%H:%M"),
    )
}

fn decode<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, OutputError> {
    serde_json::from_str(raw).map_err(|err| OutputError::Json(err.to_string()))
}

fn check_confidence(value: f64) -> Result<(), OutputError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(OutputError::Schema("confidence out of range"))
    }
}

/// Strip optional markdown code fences around model output.
fn strip_fences(raw: &str) -> &str {
    let mut stripped = raw.trim();
    if let Some(rest) = stripped.strip_prefix("```json") {
        stripped = rest;
    } else if let Some(rest) = stripped.strip_prefix("```") {
        stripped = rest;
    }
    if let Some(rest) = stripped.strip_suffix("```") {
        stripped = rest;
    }
    stripped.trim()
}
