use std::fmt;
use std::path::PathBuf;

/// Everything that can go wrong while building or persisting a vocabulary.
/// All of these are fatal to a run.
#[derive(Debug)]
pub enum VocabError {
    /// `build` was handed a token stream with no tokens in it.
    EmptyCorpus,
    /// The vocabulary file is missing, unreadable or malformed.
    Load { path: PathBuf, reason: String },
    /// The vocabulary file could not be written.
    Save {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for VocabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCorpus => write!(f, "cannot build a vocabulary from an empty corpus"),
            Self::Load { path, reason } => {
                write!(f, "cannot load vocabulary from '{}': {reason}", path.display())
            }
            Self::Save { path, source } => {
                write!(f, "cannot save vocabulary to '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for VocabError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Save { source, .. } => Some(source),
            _ => None,
        }
    }
}
