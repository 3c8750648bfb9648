//! Ingestion entry points: read a file and hand it to a ready engine.

use crate::engine::RagEngine;
use crate::error::{IngestError, IngestResult};
use crate::factory::Ready;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A file's full text together with the path it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUnit {
    pub path: PathBuf,
    pub content: String,
}

impl DocumentUnit {
    /// Read a whole UTF-8 file.
    ///
    /// Fails with [`IngestError::FileNotFound`] before touching the file when
    /// it does not exist.
    pub async fn read(path: &Path) -> IngestResult<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }

        let bytes = tokio::fs::read(path).await?;
        let content = String::from_utf8(bytes).map_err(|source| IngestError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            content,
        })
    }

    /// The path as recorded in provenance metadata.
    pub fn provenance(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Index the file at `file_path` into `engine`.
///
/// The engine receives the exact file contents and a one-element list with
/// the path as given. Errors from reading or inserting are returned as is.
pub async fn index_data<E: RagEngine>(
    engine: &Ready<E>,
    file_path: impl AsRef<Path>,
) -> IngestResult<()> {
    let unit = DocumentUnit::read(file_path.as_ref()).await?;
    debug!("Read {} ({} bytes)", unit.path.display(), unit.content.len());

    let file_paths = vec![unit.provenance()];
    engine.engine().insert(unit.content, file_paths).await
}

/// Same as [`index_data`].
pub async fn index_file<E: RagEngine>(
    engine: &Ready<E>,
    file_path: impl AsRef<Path>,
) -> IngestResult<()> {
    index_data(engine, file_path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingEngine;
    use ragline_config::Config;
    use std::sync::Arc;
    use tempfile::tempdir;

    async fn ready(engine: RecordingEngine) -> (Ready<Arc<RecordingEngine>>, Arc<RecordingEngine>) {
        let engine = Arc::new(engine);
        (Ready::initialize(engine.clone()).await.unwrap(), engine)
    }

    #[tokio::test]
    async fn test_missing_file_fails_before_insert() {
        let (handle, engine) = ready(RecordingEngine::default()).await;
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.txt");

        let err = index_data(&handle, &missing).await.unwrap_err();

        match err {
            IngestError::FileNotFound(path) => assert_eq!(path, missing),
            other => panic!("expected FileNotFound, got {other:?}"),
        }
        assert!(engine.inserts().is_empty());
        assert!(!engine.calls().contains(&"insert".to_string()));
    }

    #[tokio::test]
    async fn test_insert_receives_exact_content_and_path() {
        let (handle, engine) = ready(RecordingEngine::default()).await;
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.md");
        let content = "  # Title\r\n\nBody with trailing space \n";
        std::fs::write(&path, content).unwrap();

        index_data(&handle, &path).await.unwrap();

        let inserts = engine.inserts();
        assert_eq!(inserts.len(), 1);
        assert_eq!(inserts[0].0, content);
        assert_eq!(inserts[0].1, vec![path.display().to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_a_decode_error() {
        let (handle, engine) = ready(RecordingEngine::default()).await;
        let dir = tempdir().unwrap();
        let path = dir.path().join("binary.bin");
        std::fs::write(&path, [0x66, 0x6f, 0xff, 0xfe]).unwrap();

        let err = index_data(&handle, &path).await.unwrap_err();

        assert!(matches!(err, IngestError::Decode { path: ref p, .. } if *p == path));
        assert!(engine.inserts().is_empty());
    }

    #[tokio::test]
    async fn test_index_file_matches_index_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("same.txt");
        std::fs::write(&path, "identical").unwrap();

        let (data_handle, data_engine) = ready(RecordingEngine::default()).await;
        let (file_handle, file_engine) = ready(RecordingEngine::default()).await;
        index_data(&data_handle, &path).await.unwrap();
        index_file(&file_handle, &path).await.unwrap();

        assert_eq!(data_engine.inserts(), file_engine.inserts());
        assert_eq!(data_engine.calls(), file_engine.calls());
    }

    #[tokio::test]
    async fn test_insert_errors_propagate() {
        let (handle, _engine) = ready(RecordingEngine {
            fail_insert: true,
            ..RecordingEngine::default()
        })
        .await;
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "text").unwrap();

        let err = index_data(&handle, &path).await.unwrap_err();

        assert!(matches!(
            err,
            IngestError::Ollama(ragline_ollama::OllamaError::ServerNotRunning { .. })
        ));
    }

    #[tokio::test]
    async fn test_hello_world_with_default_model() {
        let config = Config::from_lookup(|_| None).unwrap();
        let (handle, engine) = ready(RecordingEngine::from_config(&config)).await;
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello world").unwrap();

        index_data(&handle, &path).await.unwrap();

        assert_eq!(engine.llm_model, "qwen2:latest");
        assert_eq!(
            engine.inserts(),
            vec![("hello world".to_string(), vec![path.display().to_string()])]
        );
        assert_eq!(
            engine.calls(),
            vec!["initialize_storages", "initialize_pipeline_status", "insert"]
        );
    }

    #[tokio::test]
    async fn test_relative_path_is_passed_unmodified() {
        let (handle, engine) = ready(RecordingEngine::default()).await;

        index_data(&handle, "Cargo.toml").await.unwrap();

        assert_eq!(engine.inserts()[0].1, vec!["Cargo.toml".to_string()]);
    }
}
