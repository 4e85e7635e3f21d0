// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Persists a Vocabulary as JSON so training and inference see
// exactly the same token → id mapping.
//
// File format:
//   {
//     "version": 1,
//     "unknown_id": 3,
//     "tokens": [ ["the", 12], ["cat", 4], ["sat", 4] ]
//   }
//
// `tokens` is in id order; `unknown_id` must equal its length.
// Anything else is rejected as malformed.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::domain::error::VocabError;
use crate::domain::traits::Persistable;
use crate::domain::vocabulary::Vocabulary;

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct VocabFile {
    version:    u32,
    unknown_id: u32,
    tokens:     Vec<(String, u64)>,
}

impl Persistable for Vocabulary {
    type Error = VocabError;

    fn save(&self, path: &Path) -> Result<(), VocabError> {
        let file = VocabFile {
            version:    FORMAT_VERSION,
            unknown_id: self.unknown_id(),
            tokens:     self.entries().map(|(t, c)| (t.to_string(), c)).collect(),
        };

        let save_err = |source| VocabError::Save { path: path.to_path_buf(), source };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(save_err)?;
        }
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| save_err(std::io::Error::other(e)))?;
        fs::write(path, json).map_err(save_err)?;

        tracing::info!("Saved vocabulary ({} ids) to '{}'", self.size(), path.display());
        Ok(())
    }

    fn load(path: &Path) -> Result<Self, VocabError> {
        let load_err = |reason: String| VocabError::Load { path: path.to_path_buf(), reason };

        let json = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let file: VocabFile = serde_json::from_str(&json).map_err(|e| load_err(e.to_string()))?;

        if file.version != FORMAT_VERSION {
            return Err(load_err(format!("unsupported format version {}", file.version)));
        }
        if file.unknown_id as usize != file.tokens.len() {
            return Err(load_err(format!(
                "unknown id {} does not follow the {} stored tokens",
                file.unknown_id,
                file.tokens.len()
            )));
        }

        let vocab = Vocabulary::from_entries(file.tokens).map_err(load_err)?;
        tracing::info!("Loaded vocabulary ({} ids) from '{}'", vocab.size(), path.display());
        Ok(vocab)
    }
}
