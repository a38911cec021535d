//! Model capability table
//!
//! Static knowledge about the models the adapter has been used with:
//! context size, output limit, accepted inputs and feature flags. Models not
//! in the table are still usable; lookups for them return a conservative
//! default with `known = false`.
//!
//! Dated snapshots resolve to their family (`gpt-4o-2024-08-06` reads as
//! `gpt-4o`), picking the longest matching family name.

pub mod modality;

pub use modality::{Modality, ModalitySupport};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Capabilities of one model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelInfo {
    /// Model name as requested
    pub id: String,

    /// Whether the model was found in the capability table
    pub known: bool,

    /// Context window in tokens
    pub context_window: usize,

    /// Maximum generated tokens
    pub max_output_tokens: usize,

    /// Accepted input modalities
    pub input_modalities: ModalitySupport,

    /// Streaming responses
    pub streaming: bool,

    /// `response_format = json_object`
    pub json_mode: bool,

    /// Function / tool calling
    pub function_calling: bool,
}

impl ModelInfo {
    /// Conservative capabilities for a model missing from the table
    pub fn unknown(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            known: false,
            context_window: 4096,
            max_output_tokens: 4096,
            input_modalities: ModalitySupport::text_only(),
            streaming: true,
            json_mode: false,
            function_calling: false,
        }
    }

    /// Check whether an input modality is accepted
    pub fn supports(&self, modality: Modality) -> bool {
        self.input_modalities.supports(modality)
    }
}

struct FamilyEntry {
    family: &'static str,
    context_window: usize,
    max_output_tokens: usize,
    vision: bool,
    json_mode: bool,
    function_calling: bool,
}

const fn family(
    family: &'static str,
    context_window: usize,
    max_output_tokens: usize,
    vision: bool,
    json_mode: bool,
) -> FamilyEntry {
    FamilyEntry {
        family,
        context_window,
        max_output_tokens,
        vision,
        json_mode,
        function_calling: true,
    }
}

const KNOWN_MODELS: &[FamilyEntry] = &[
    family("gpt-4o", 128_000, 16_384, true, true),
    family("gpt-4o-mini", 128_000, 16_384, true, true),
    family("gpt-4.1", 1_047_576, 32_768, true, true),
    family("gpt-4.1-mini", 1_047_576, 32_768, true, true),
    family("gpt-4-turbo", 128_000, 4_096, true, true),
    family("gpt-4", 8_192, 8_192, false, false),
    family("gpt-3.5-turbo", 16_385, 4_096, false, true),
    family("o3-mini", 200_000, 100_000, false, true),
];

fn find(model: &str) -> Option<&'static FamilyEntry> {
    KNOWN_MODELS
        .iter()
        .filter(|entry| {
            model == entry.family
                || model
                    .strip_prefix(entry.family)
                    .is_some_and(|rest| rest.starts_with('-'))
        })
        .max_by_key(|entry| entry.family.len())
}

/// Look up a model without logging
pub fn lookup(model: &str) -> Option<ModelInfo> {
    find(model).map(|entry| ModelInfo {
        id: model.to_string(),
        known: true,
        context_window: entry.context_window,
        max_output_tokens: entry.max_output_tokens,
        input_modalities: if entry.vision {
            ModalitySupport::text_and_image()
        } else {
            ModalitySupport::text_only()
        },
        streaming: true,
        json_mode: entry.json_mode,
        function_calling: entry.function_calling,
    })
}

/// Look up a model, warning when it is not in the table
pub fn model_info(model: &str) -> ModelInfo {
    lookup(model).unwrap_or_else(|| {
        warn!(
            code = "UNKNOWN_MODEL",
            model, "model is not in the capability table, using conservative defaults"
        );
        ModelInfo::unknown(model)
    })
}

/// Names of the model families in the table
pub fn known_models() -> impl Iterator<Item = &'static str> {
    KNOWN_MODELS.iter().map(|entry| entry.family)
}
