use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Episode identifier as stored by the dataset: integer for R2R-style splits,
/// string for some others.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EpisodeId {
    Int(i64),
    /// Any other JSON number: floats and integers outside the `i64` range.
    Num(serde_json::Number),
    Str(String),
}

impl EpisodeId {
    /// Compares on the string form so "42" matches both `Int(42)` and `Str("42")`.
    pub fn matches(&self, id: &str) -> bool {
        match self {
            EpisodeId::Int(n) => n.to_string() == id,
            EpisodeId::Num(n) => n.to_string() == id,
            EpisodeId::Str(s) => s == id,
        }
    }

    fn numeric_value(&self) -> Option<f64> {
        match self {
            EpisodeId::Int(n) => Some(*n as f64),
            EpisodeId::Num(n) => n.as_f64(),
            EpisodeId::Str(_) => None,
        }
    }

    fn variant_rank(&self) -> u8 {
        match self {
            EpisodeId::Int(_) => 0,
            EpisodeId::Num(_) => 1,
            EpisodeId::Str(_) => 2,
        }
    }
}

impl Ord for EpisodeId {
    fn cmp(&self, other: &Self) -> Ordering {
        // Numbers sort by value before strings. Numerically equal ids of
        // different variants fall back to variant order, then text.
        match (self, other) {
            (EpisodeId::Int(a), EpisodeId::Int(b)) => a.cmp(b),
            (EpisodeId::Str(a), EpisodeId::Str(b)) => a.cmp(b),
            (EpisodeId::Str(_), _) => Ordering::Greater,
            (_, EpisodeId::Str(_)) => Ordering::Less,
            _ => {
                let a = self.numeric_value().unwrap_or(f64::NAN);
                let b = other.numeric_value().unwrap_or(f64::NAN);
                a.total_cmp(&b)
                    .then_with(|| self.variant_rank().cmp(&other.variant_rank()))
                    .then_with(|| self.to_string().cmp(&other.to_string()))
            }
        }
    }
}

impl PartialOrd for EpisodeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpisodeId::Int(n) => write!(f, "{}", n),
            EpisodeId::Num(n) => write!(f, "{}", n),
            EpisodeId::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for EpisodeId {
    fn from(id: i64) -> Self {
        EpisodeId::Int(id)
    }
}

impl From<&str> for EpisodeId {
    fn from(id: &str) -> Self {
        EpisodeId::Str(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionText {
    pub instruction_text: String,
}

/// The `instruction` attribute of an episode, in whichever shape the dataset uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstructionField {
    Structured(InstructionText),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub episode_id: EpisodeId,
    pub scene_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<InstructionField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_position: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_rotation: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionSource {
    Instruction,
    Goals,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedInstruction {
    pub source: InstructionSource,
    pub text: String,
}

impl EpisodeRecord {
    pub fn new(episode_id: impl Into<EpisodeId>, scene_id: impl Into<String>) -> Self {
        Self {
            episode_id: episode_id.into(),
            scene_id: scene_id.into(),
            instruction: None,
            goals: None,
            start_position: None,
            start_rotation: None,
        }
    }

    pub fn with_instruction_text(mut self, text: impl Into<String>) -> Self {
        self.instruction = Some(InstructionField::Structured(InstructionText {
            instruction_text: text.into(),
        }));
        self
    }

    /// Resolves the instruction in priority order: nested `instruction_text`,
    /// any other `instruction` value, then `goals`.
    pub fn extract_instruction(&self) -> Option<ExtractedInstruction> {
        match (&self.instruction, &self.goals) {
            (Some(InstructionField::Structured(inner)), _) => Some(ExtractedInstruction {
                source: InstructionSource::Instruction,
                text: inner.instruction_text.clone(),
            }),
            (Some(InstructionField::Other(value)), _) => Some(ExtractedInstruction {
                source: InstructionSource::Instruction,
                text: stringify(value),
            }),
            (None, Some(goals)) => Some(ExtractedInstruction {
                source: InstructionSource::Goals,
                text: stringify(goals),
            }),
            (None, None) => None,
        }
    }

    /// Instruction text suitable for analysis; blank text counts as absent.
    pub fn analyzable_instruction(&self) -> Option<String> {
        self.extract_instruction()
            .map(|extracted| extracted.text)
            .filter(|text| !text.trim().is_empty())
    }
}

fn stringify(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
