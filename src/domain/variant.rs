// ============================================================
// Layer 3 — Model Variants and Layer Roles
// ============================================================
// Layers are addressed by what they do, never by position.
// Each variant declares which roles hold word-level knowledge
// that inference mode copies from a trained model and freezes.
//
//   DM    word embedding, hidden layer, output layer
//   DBOW  output layer
//
// The document embedding is never in a freeze set: it is the
// only table inference mode is allowed to train.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    /// Distributed memory
    Dm,
    /// Distributed bag of words
    Dbow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerRole {
    WordEmbedding,
    DocEmbedding,
    HiddenLayer,
    OutputLayer,
}

impl ModelVariant {
    /// Roles seeded from a trained model and frozen in inference mode.
    pub fn frozen_layers(self) -> &'static [LayerRole] {
        match self {
            Self::Dm   => &[LayerRole::WordEmbedding, LayerRole::HiddenLayer, LayerRole::OutputLayer],
            Self::Dbow => &[LayerRole::OutputLayer],
        }
    }

    /// Roles that exist in this variant's topology.
    pub fn layers(self) -> &'static [LayerRole] {
        match self {
            Self::Dm => &[
                LayerRole::WordEmbedding,
                LayerRole::DocEmbedding,
                LayerRole::HiddenLayer,
                LayerRole::OutputLayer,
            ],
            Self::Dbow => &[LayerRole::DocEmbedding, LayerRole::OutputLayer],
        }
    }

    pub fn has_layer(self, role: LayerRole) -> bool {
        self.layers().contains(&role)
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dm   => f.write_str("dm"),
            Self::Dbow => f.write_str("dbow"),
        }
    }
}

impl FromStr for ModelVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dm"   => Ok(Self::Dm),
            "dbow" => Ok(Self::Dbow),
            other  => Err(format!("unknown model '{other}', expected 'dm' or 'dbow'")),
        }
    }
}

impl fmt::Display for LayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WordEmbedding => "word_embedding",
            Self::DocEmbedding  => "doc_embedding",
            Self::HiddenLayer   => "hidden",
            Self::OutputLayer   => "output",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dbow_freezes_fewer_layers_than_dm() {
        assert!(ModelVariant::Dbow.frozen_layers().len() < ModelVariant::Dm.frozen_layers().len());
    }

    #[test]
    fn test_doc_embedding_is_never_frozen() {
        for v in [ModelVariant::Dm, ModelVariant::Dbow] {
            assert!(!v.frozen_layers().contains(&LayerRole::DocEmbedding));
            for role in v.frozen_layers() {
                assert!(v.has_layer(*role));
            }
        }
    }

    #[test]
    fn test_parse_variant() {
        assert_eq!("dm".parse::<ModelVariant>().unwrap(), ModelVariant::Dm);
        assert_eq!("DBOW".parse::<ModelVariant>().unwrap(), ModelVariant::Dbow);
        assert!("cbow".parse::<ModelVariant>().is_err());
    }
}
