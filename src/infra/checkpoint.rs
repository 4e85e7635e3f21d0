// ============================================================
// Layer 6 — Checkpoint Files
// ============================================================
// File-level helpers shared by the model and the training loop.
//
// Path templates:
//   Save paths may contain `{epoch}`, which is replaced by the
//   number of epochs elapsed when the file is written:
//
//     --save runs/dm-{epoch}   →  runs/dm-5.mpk.gz  (weights)
//                                 runs/dm-5.json    (config)
//
//   Suffixes are always appended, never substituted, so dotted
//   names keep every segment:
//
//     --save runs/ckpt.{epoch} →  runs/ckpt.5.mpk.gz
//                                 runs/ckpt.5.json
//
// Model config sidecar:
//   Every saved model gets its Doc2VecConfig next to it as
//   JSON so it can be reopened without repeating the CLI flags.
//
// Document embeddings export:
//   Plain text, one document per line:
//     <row>\t<v1> <v2> ... <vd>
//   plus an optional `<path>.docs.json` listing the source file
//   of each row.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use burn::config::Config;
use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::ml::model::Doc2VecConfig;

const EPOCH_PLACEHOLDER: &str = "{epoch}";

/// Substitute the elapsed epoch count into a path template.
pub fn render_path(template: &str, epoch: usize) -> PathBuf {
    PathBuf::from(template.replace(EPOCH_PLACEHOLDER, &epoch.to_string()))
}

const WEIGHTS_SUFFIX: &str = ".mpk.gz";

/// `path` with `suffix` appended to its last component.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Where the config sidecar for a model path lives.
pub fn config_path(model_path: &Path) -> PathBuf {
    with_suffix(model_path, ".json")
}

/// Where the weights for a model path end up on disk.
pub fn weights_path(model_path: &Path) -> PathBuf {
    with_suffix(model_path, WEIGHTS_SUFFIX)
}

/// The path to hand to Burn's file recorder.
///
/// The recorder calls `set_extension("mpk.gz")`, which swaps out the
/// last extension; giving it `<path>.mpk` makes that swap land on
/// `weights_path(model_path)`.
pub fn recorder_path(model_path: &Path) -> PathBuf {
    with_suffix(model_path, ".mpk")
}

/// Create the parent directory of `path` if it is missing.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }
    Ok(())
}

pub fn save_model_config(config: &Doc2VecConfig, model_path: &Path) -> Result<()> {
    let path = config_path(model_path);
    config
        .save(&path)
        .with_context(|| format!("Cannot write model config to '{}'", path.display()))?;
    tracing::debug!("Saved model config to '{}'", path.display());
    Ok(())
}

pub fn load_model_config(model_path: &Path) -> Result<Doc2VecConfig> {
    let path = config_path(model_path);
    Doc2VecConfig::load(&path).map_err(|e| {
        anyhow::anyhow!(
            "Cannot read model config '{}': {:?}. Was the model saved by this tool?",
            path.display(),
            e
        )
    })
}

/// Write one embedding row per line.
pub fn write_embeddings(path: &Path, rows: &[Vec<f32>]) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = fs::File::create(path)
        .with_context(|| format!("Cannot create '{}'", path.display()))?;
    let mut out = BufWriter::new(file);

    for (row, values) in rows.iter().enumerate() {
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        writeln!(out, "{}\t{}", row, values.join(" "))?;
    }
    out.flush()?;

    tracing::debug!("Wrote {} document embeddings to '{}'", rows.len(), path.display());
    Ok(())
}

/// Read back a file written by `write_embeddings`.
pub fn read_embeddings(path: &Path) -> Result<Vec<Vec<f32>>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;

    text.lines()
        .enumerate()
        .map(|(n, line)| {
            let (_, values) = line
                .split_once('\t')
                .with_context(|| format!("line {} of '{}' has no tab", n + 1, path.display()))?;
            values
                .split_whitespace()
                .map(|v| v.parse::<f32>().with_context(|| format!("bad value '{v}' on line {}", n + 1)))
                .collect()
        })
        .collect()
}

/// Where the row → document name list for an embeddings file goes.
pub fn doc_index_path(embeddings_path: &Path) -> PathBuf {
    with_suffix(embeddings_path, ".docs.json")
}

/// Write the source name of every embedding row.
pub fn save_doc_index(embeddings_path: &Path, sources: &[String]) -> Result<()> {
    let path = doc_index_path(embeddings_path);
    ensure_parent_dir(&path)?;
    fs::write(&path, serde_json::to_string_pretty(sources)?)
        .with_context(|| format!("Cannot write document index to '{}'", path.display()))?;
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::variant::ModelVariant;
    use tempfile::tempdir;

    #[test]
    fn test_render_path() {
        assert_eq!(render_path("out/dm-{epoch}", 7), PathBuf::from("out/dm-7"));
        assert_eq!(render_path("fixed.bin", 3), PathBuf::from("fixed.bin"));
        assert_eq!(render_path("{epoch}/{epoch}", 2), PathBuf::from("2/2"));
    }

    #[test]
    fn test_suffixes_keep_dotted_names() {
        let ckpt = render_path("runs/ckpt.{epoch}", 3);
        assert_eq!(config_path(&ckpt), PathBuf::from("runs/ckpt.3.json"));
        assert_eq!(weights_path(&ckpt), PathBuf::from("runs/ckpt.3.mpk.gz"));

        let bin = Path::new("model.bin");
        assert_eq!(config_path(bin), PathBuf::from("model.bin.json"));
        assert_eq!(weights_path(bin), PathBuf::from("model.bin.mpk.gz"));

        let mut recorded = recorder_path(&ckpt);
        recorded.set_extension("mpk.gz");
        assert_eq!(recorded, weights_path(&ckpt));
    }

    #[test]
    fn test_config_roundtrip() {
        let dir   = tempdir().unwrap();
        let model = dir.path().join("nested").join("m-1");
        ensure_parent_dir(&model).unwrap();

        let cfg = Doc2VecConfig::new(ModelVariant::Dbow, 50, 3, 2).with_embedding_size(16);
        save_model_config(&cfg, &model).unwrap();

        let back = load_model_config(&model).unwrap();
        assert!(back.same_shape(&cfg));
        assert!(config_path(&model).exists());
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(load_model_config(&dir.path().join("nothing")).is_err());
    }

    #[test]
    fn test_embeddings_roundtrip() {
        let dir  = tempdir().unwrap();
        let path = dir.path().join("emb").join("docs-4.txt");
        let rows = vec![vec![0.5, -1.25], vec![3.0, 0.0]];

        write_embeddings(&path, &rows).unwrap();
        assert_eq!(read_embeddings(&path).unwrap(), rows);
    }

    #[test]
    fn test_doc_index_sits_next_to_embeddings() {
        let dir  = tempdir().unwrap();
        let path = dir.path().join("docs.txt");
        save_doc_index(&path, &["a.txt".to_string(), "b.txt".to_string()]).unwrap();

        let written = fs::read_to_string(doc_index_path(&path)).unwrap();
        let names: Vec<String> = serde_json::from_str(&written).unwrap();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }
}
