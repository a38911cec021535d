//! Input modality definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Kinds of input a model accepts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Image,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Text => f.write_str("text"),
            Modality::Image => f.write_str("image"),
        }
    }
}

/// Set of accepted input modalities
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ModalitySupport(BTreeSet<Modality>);

impl ModalitySupport {
    /// Text only
    pub fn text_only() -> Self {
        Self([Modality::Text].into_iter().collect())
    }

    /// Text and images
    pub fn text_and_image() -> Self {
        Self([Modality::Text, Modality::Image].into_iter().collect())
    }

    /// Check whether an input modality is accepted
    pub fn supports(&self, modality: Modality) -> bool {
        self.0.contains(&modality)
    }

    pub fn iter(&self) -> impl Iterator<Item = Modality> + '_ {
        self.0.iter().copied()
    }
}

impl Default for ModalitySupport {
    fn default() -> Self {
        Self::text_only()
    }
}
