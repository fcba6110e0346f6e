use super::image::{EncodedImage, GeneratedImage};
use super::style::StyleDefinition;
use crate::error::CaricatureError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Appended to every instruction. Some models answer with a description of
/// the picture instead of pixels unless told otherwise.
pub const IMAGE_ONLY_DIRECTIVE: &str =
    "Return ONLY the generated image. Do not answer with text or describe the image.";

/// One fan-out branch: the shared encoded upload plus a single style.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub image: Arc<EncodedImage>,
    pub style: StyleDefinition,
    pub prompt: String,
}

impl GenerationRequest {
    pub fn new(image: Arc<EncodedImage>, style: StyleDefinition) -> Self {
        let prompt = format!("{}\n\n{}", style.instruction.trim_end(), IMAGE_ONLY_DIRECTIVE);
        Self {
            image,
            style,
            prompt,
        }
    }

    /// The prompt limited to `max_chars` characters. Only the instruction is
    /// shortened so the image-only directive stays intact.
    pub fn prompt_within(&self, max_chars: usize) -> Cow<'_, str> {
        if self.prompt.chars().count() <= max_chars {
            return Cow::Borrowed(&self.prompt);
        }
        let budget = max_chars.saturating_sub(IMAGE_ONLY_DIRECTIVE.chars().count() + 2);
        let instruction = self.style.instruction.trim_end();
        let cut = instruction
            .char_indices()
            .nth(budget)
            .map_or(instruction.len(), |(index, _)| index);
        Cow::Owned(format!("{}\n\n{}", &instruction[..cut], IMAGE_ONLY_DIRECTIVE))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NoImage,
    Transport,
    Provider,
    DeadlineExceeded,
    Panicked,
}

impl FailureKind {
    pub fn from_error(error: &CaricatureError) -> Self {
        if error.is_transport() {
            FailureKind::Transport
        } else if matches!(error, CaricatureError::DeadlineExceeded) {
            FailureKind::DeadlineExceeded
        } else {
            FailureKind::Provider
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Success {
        style_id: String,
        display_name: String,
        image_data: String,
    },
    Failure {
        style_id: String,
        kind: FailureKind,
        reason: String,
    },
}

impl GenerationOutcome {
    pub fn failure(style: &StyleDefinition, kind: FailureKind, reason: impl Into<String>) -> Self {
        GenerationOutcome::Failure {
            style_id: style.id.clone(),
            kind,
            reason: reason.into(),
        }
    }

    pub fn style_id(&self) -> &str {
        match self {
            GenerationOutcome::Success { style_id, .. } => style_id,
            GenerationOutcome::Failure { style_id, .. } => style_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Success { .. })
    }

    pub fn into_generated_image(self) -> Option<GeneratedImage> {
        match self {
            GenerationOutcome::Success {
                style_id,
                display_name,
                image_data,
            } => Some(GeneratedImage {
                style_id,
                display_name,
                image_data,
            }),
            GenerationOutcome::Failure { .. } => None,
        }
    }
}

/// Successful images of one batch, in catalog order, plus how many styles failed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationBatchResult {
    pub batch_id: Uuid,
    pub images: Vec<GeneratedImage>,
    pub failed: usize,
    pub elapsed_ms: u64,
}

impl GenerationBatchResult {
    pub fn total(&self) -> usize {
        self.images.len() + self.failed
    }

    pub fn is_partial(&self) -> bool {
        self.failed > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Received,
    Encoding,
    Dispatched,
    Settling,
    Complete,
    AllFailed,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchState::Received => "received",
            BatchState::Encoding => "encoding",
            BatchState::Dispatched => "dispatched",
            BatchState::Settling => "settling",
            BatchState::Complete => "complete",
            BatchState::AllFailed => "all_failed",
        };
        f.write_str(name)
    }
}
