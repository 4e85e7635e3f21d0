// ============================================================
// Layer 4 — Document Loader
// ============================================================
// Loads every document in a directory. Each file is one
// document:
//
//   *.txt   read as UTF-8 text
//   *.docx  paragraphs extracted with docx-rs
//
// Other files are ignored. A file that fails to read or parse
// is skipped with a warning so one bad file does not sink the
// corpus.
//
// `tokens_by_doc_id` is the corpus-loader contract the rest of
// the pipeline uses: file name → ordered raw tokens. A BTreeMap
// keeps documents sorted by name, which fixes the document ids
// across runs.
//
// Reference: docx-rs crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{collections::BTreeMap, fs, path::Path};
use docx_rs::read_docx;

use crate::data::preprocessor::Preprocessor;
use crate::domain::document::Document;
use crate::domain::traits::DocumentSource;

/// Loads all .txt and .docx files from a directory.
pub struct DirectoryLoader {
    dir: String,
}

impl DirectoryLoader {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DocumentSource for DirectoryLoader {
    fn load_all(&self) -> Result<Vec<Document>> {
        let dir = Path::new(&self.dir);

        let mut docs = Vec::new();

        for entry in fs::read_dir(dir)
            .with_context(|| format!("Cannot read directory '{}'", self.dir))?
        {
            let path = entry?.path();

            let loaded = match path.extension().and_then(|e| e.to_str()) {
                Some("txt")  => load_text(&path),
                Some("docx") => load_docx(&path),
                _ => continue,
            };

            match loaded {
                Ok(doc) => {
                    tracing::debug!("Loaded: {} ({} chars)", doc.source, doc.text.len());
                    docs.push(doc);
                }
                Err(e) => {
                    tracing::warn!("Skipping '{}': {:#}", path.display(), e);
                }
            }
        }

        docs.sort_by(|a, b| a.source.cmp(&b.source));
        tracing::info!("Loaded {} documents from '{}'", docs.len(), self.dir);
        Ok(docs)
    }
}

/// Load and tokenise every document of a source, keyed by source name.
pub fn tokens_by_doc_id(
    source:       &impl DocumentSource,
    preprocessor: &Preprocessor,
) -> Result<BTreeMap<String, Vec<String>>> {
    let mut out = BTreeMap::new();
    for doc in source.load_all()? {
        let tokens = preprocessor.tokenize(&doc.text);
        if out.insert(doc.source.clone(), tokens).is_some() {
            tracing::warn!("Duplicate document name '{}', keeping the last one", doc.source);
        }
    }
    Ok(out)
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

fn load_text(path: &Path) -> Result<Document> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    Ok(Document::new(source_name(path), text))
}

/// Parse a single .docx file; paragraphs are joined with newlines.
fn load_docx(path: &Path) -> Result<Document> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;

    let docx = read_docx(&bytes)
        .map_err(|e| {
            anyhow::anyhow!("docx-rs parse error in '{}': {:?}", path.display(), e)
        })?;

    let mut paragraphs: Vec<String> = Vec::new();

    for child in &docx.document.children {
        use docx_rs::DocumentChild;

        if let DocumentChild::Paragraph(para) = child {
            let para_text = extract_paragraph_text(para);
            if !para_text.trim().is_empty() {
                paragraphs.push(para_text);
            }
        }
    }

    Ok(Document::new(source_name(path), paragraphs.join("\n")))
}

/// Paragraph → Run → Text; runs are concatenated without a separator.
fn extract_paragraph_text(para: &docx_rs::Paragraph) -> String {
    let mut parts = Vec::new();

    for child in &para.children {
        use docx_rs::ParagraphChild;

        if let ParagraphChild::Run(run) = child {
            for rc in &run.children {
                use docx_rs::RunChild;

                if let RunChild::Text(t) = rc {
                    parts.push(t.text.clone());
                }
            }
        }
    }

    parts.join("")
}
