//! The RAG engine: storages, pipeline status and the insert pipeline.

use crate::chunker::{ChunkConfig, Chunker};
use crate::error::{IngestError, IngestResult};
use crate::extract::{build_extraction_request, parse_extraction};
use crate::graph::GraphMerger;
use async_trait::async_trait;
use ragline_config::Config;
use ragline_core::{Chunk, DocStatus, DocStatusRecord, Document, PipelineStatus};
use ragline_db::{Database, StorageStats, DATABASE_FILE};
use ragline_ollama::{EmbeddingFunc, LanguageModel, OllamaCompletion};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Provenance recorded when an insert carries no file path.
pub const UNKNOWN_SOURCE: &str = "unknown_source";

/// Operations every indexing engine exposes.
///
/// `initialize_storages` must complete before `initialize_pipeline_status`,
/// and both before `insert`.
#[async_trait]
pub trait RagEngine: Send + Sync {
    async fn initialize_storages(&self) -> IngestResult<()>;

    async fn initialize_pipeline_status(&self) -> IngestResult<()>;

    /// Index one document. `file_paths` holds its provenance.
    async fn insert(&self, input: String, file_paths: Vec<String>) -> IngestResult<()>;
}

#[async_trait]
impl<E: RagEngine + ?Sized> RagEngine for Arc<E> {
    async fn initialize_storages(&self) -> IngestResult<()> {
        (**self).initialize_storages().await
    }

    async fn initialize_pipeline_status(&self) -> IngestResult<()> {
        (**self).initialize_pipeline_status().await
    }

    async fn insert(&self, input: String, file_paths: Vec<String>) -> IngestResult<()> {
        (**self).insert(input, file_paths).await
    }
}

/// Graph-and-vector engine over a local SQLite working directory.
pub struct LightRag {
    working_dir: PathBuf,
    config: Config,
    chunker: Chunker,
    pub(crate) embedding: EmbeddingFunc,
    pub(crate) llm: Arc<dyn LanguageModel>,
    storage: OnceLock<Database>,
    pipeline_ready: AtomicBool,
    pipeline_lock: Mutex<()>,
}

impl LightRag {
    /// Create an engine. Nothing is opened until `initialize_storages`.
    pub fn new(
        working_dir: impl Into<PathBuf>,
        config: Config,
        embedding: EmbeddingFunc,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            working_dir: working_dir.into(),
            chunker: Chunker::new(ChunkConfig::from_chunking_config(&config.chunking)),
            config,
            embedding,
            llm,
            storage: OnceLock::new(),
            pipeline_ready: AtomicBool::new(false),
            pipeline_lock: Mutex::new(()),
        }
    }

    /// Engine wired to Ollama for both embeddings and completions.
    pub fn from_config(working_dir: impl Into<PathBuf>, config: &Config) -> IngestResult<Self> {
        let embedding = EmbeddingFunc::from_config(&config.embedding)?;
        let llm = OllamaCompletion::from_config(&config.llm)?;
        Ok(Self::new(working_dir, config.clone(), embedding, Arc::new(llm)))
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Location of the SQLite file inside the working directory.
    pub fn database_path(&self) -> PathBuf {
        self.working_dir.join(DATABASE_FILE)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn embedding(&self) -> &EmbeddingFunc {
        &self.embedding
    }

    pub fn llm_model(&self) -> &str {
        self.llm.model()
    }

    pub(crate) fn storage(&self) -> IngestResult<&Database> {
        self.storage
            .get()
            .ok_or(IngestError::NotInitialized("storages"))
    }

    pub fn pipeline_status(&self) -> IngestResult<PipelineStatus> {
        Ok(self.storage()?.load_pipeline_status()?.unwrap_or_default())
    }

    /// Number of documents in each status.
    pub fn doc_status_counts(&self) -> IngestResult<BTreeMap<String, i64>> {
        Ok(self.storage()?.doc_status_counts()?)
    }

    pub fn doc_status(&self, doc_id: &str) -> IngestResult<Option<DocStatusRecord>> {
        Ok(self.storage()?.get_doc_status(doc_id)?)
    }

    /// Documents whose last run failed, oldest first.
    pub fn failed_documents(&self) -> IngestResult<Vec<DocStatusRecord>> {
        Ok(self.storage()?.docs_by_status(DocStatus::Failed)?)
    }

    pub fn stats(&self) -> IngestResult<StorageStats> {
        Ok(self.storage()?.get_stats()?)
    }

    async fn process_document(&self, db: &Database, doc: &Document) -> IngestResult<usize> {
        let chunks = self.chunker.chunk_document(doc);
        debug!("Split {} into {} chunks", doc.id, chunks.len());

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedding.embed(&texts).await?;
        db.store_chunks_with_vectors(&chunks, &vectors, self.embedding.model())?;

        if self.config.entity_extraction {
            self.extract_graph(db, &chunks).await?;
        }

        Ok(chunks.len())
    }

    async fn extract_graph(&self, db: &Database, chunks: &[Chunk]) -> IngestResult<()> {
        let merger = GraphMerger::new(db, self.llm.as_ref(), self.config.summary_max_tokens);

        for chunk in chunks {
            let raw = self.llm.complete(build_extraction_request(chunk)).await?;
            let extraction = match parse_extraction(&raw) {
                Ok(extraction) => extraction,
                Err(e) => {
                    warn!("Skipping malformed extraction output for {}: {}", chunk.id, e);
                    continue;
                }
            };

            let (entities, relations) = extraction.into_graph(chunk);
            debug!(
                "Chunk {}: {} entities, {} relations",
                chunk.chunk_index,
                entities.len(),
                relations.len()
            );

            for entity in entities {
                merger.merge_entity(entity).await?;
            }
            for relation in relations {
                merger.merge_relation(relation).await?;
            }
        }

        Ok(())
    }

    /// Persist the outcome of a run. Bookkeeping failures are logged, never returned.
    fn record_outcome(
        &self,
        db: &Database,
        record: DocStatusRecord,
        status: &mut PipelineStatus,
        result: &IngestResult<usize>,
    ) {
        let record = match result {
            Ok(chunks) => {
                info!("Processed {} ({} chunks)", record.file_path, chunks);
                status.push_message(format!("Completed {}", record.file_path));
                let mut record = record.with_status(DocStatus::Processed);
                record.chunks_count = Some(*chunks);
                record.error = None;
                record
            }
            Err(e) => {
                warn!("Failed to process {}: {}", record.file_path, e);
                status.push_message(format!("Failed {}: {}", record.file_path, e));
                let mut record = record.with_status(DocStatus::Failed);
                record.error = Some(e.to_string());
                record
            }
        };

        if let Err(e) = db.upsert_doc_status(&record) {
            warn!("Could not record status of {}: {}", record.doc_id, e);
        }

        status.cur_batch = status.batchs;
        status.finish_job();
        if let Err(e) = db.save_pipeline_status(status) {
            warn!("Could not save pipeline status: {}", e);
        }
    }
}

#[async_trait]
impl RagEngine for LightRag {
    async fn initialize_storages(&self) -> IngestResult<()> {
        if self.storage.get().is_some() {
            return Ok(());
        }

        let db = Database::open_in_dir(&self.working_dir)?;

        let expected = self.embedding.embedding_dim;
        if let Some(found) = db
            .stored_vector_dimensions()?
            .into_iter()
            .find(|d| *d != expected)
        {
            return Err(IngestError::StorageMismatch { expected, found });
        }

        if self.storage.set(db).is_err() {
            debug!("Storages were initialized concurrently");
        }
        info!("Storages ready in {}", self.working_dir.display());
        Ok(())
    }

    async fn initialize_pipeline_status(&self) -> IngestResult<()> {
        let db = self.storage()?;
        db.ensure_pipeline_status()?;
        self.pipeline_ready.store(true, Ordering::Release);
        Ok(())
    }

    async fn insert(&self, input: String, file_paths: Vec<String>) -> IngestResult<()> {
        let db = self.storage()?;
        if !self.pipeline_ready.load(Ordering::Acquire) {
            return Err(IngestError::NotInitialized("pipeline status"));
        }

        let mut file_paths = file_paths.into_iter();
        let file_path = file_paths.next().unwrap_or_else(|| UNKNOWN_SOURCE.to_string());
        if file_paths.next().is_some() {
            return Err(ragline_core::Error::InvalidInput(
                "a single document takes exactly one file path".to_string(),
            )
            .into());
        }

        let doc = Document::new(input, file_path)?;

        // The status check and every status write happen under the lock.
        let _guard = self.pipeline_lock.lock().await;
        if let Some(existing) = db.get_doc_status(&doc.id)? {
            if existing.status == DocStatus::Processed {
                info!("Skipping {}: already processed as {}", doc.file_path, doc.id);
                return Ok(());
            }
        }

        db.upsert_document(&doc)?;
        let record = DocStatusRecord::pending(&doc);
        db.upsert_doc_status(&record)?;

        let mut status = db.load_pipeline_status()?.unwrap_or_default();
        status.start_job(format!("indexing {}", doc.file_path), 1);
        status.push_message(format!("Processing {}", doc.file_path));
        db.save_pipeline_status(&status)?;

        let record = record.with_status(DocStatus::Processing);
        let result = match db.upsert_doc_status(&record) {
            Ok(()) => self.process_document(db, &doc).await,
            Err(e) => Err(e.into()),
        };

        self.record_outcome(db, record, &mut status, &result);
        result.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_config, FakeLlm, HashEmbedder, EXTRACTION_JSON};
    use std::time::Duration;
    use tempfile::tempdir;

    fn engine(dir: &Path, llm: Arc<FakeLlm>) -> LightRag {
        let embedding = EmbeddingFunc::new(Arc::new(HashEmbedder::new(16)), 16, 512);
        LightRag::new(dir, test_config(16), embedding, llm)
    }

    async fn ready_engine(dir: &Path, llm: Arc<FakeLlm>) -> LightRag {
        let engine = engine(dir, llm);
        engine.initialize_storages().await.unwrap();
        engine.initialize_pipeline_status().await.unwrap();
        engine
    }

    #[tokio::test]
    async fn test_insert_before_init_fails() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path(), Arc::new(FakeLlm::answering("ok")));

        let err = engine
            .insert("hello world".to_string(), vec!["notes.txt".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::NotInitialized("storages")));

        engine.initialize_storages().await.unwrap();
        let err = engine
            .insert("hello world".to_string(), vec!["notes.txt".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::NotInitialized("pipeline status")));
    }

    #[tokio::test]
    async fn test_pipeline_status_requires_storages() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path(), Arc::new(FakeLlm::answering("ok")));

        let err = engine.initialize_pipeline_status().await.unwrap_err();
        assert!(matches!(err, IngestError::NotInitialized("storages")));
    }

    #[tokio::test]
    async fn test_insert_indexes_document() {
        let dir = tempdir().unwrap();
        let llm = Arc::new(FakeLlm::extracting(EXTRACTION_JSON));
        let engine = ready_engine(dir.path(), llm.clone()).await;

        engine
            .insert(
                "Ada Lovelace worked with Charles Babbage on the Analytical Engine.".to_string(),
                vec!["notes/ada.md".to_string()],
            )
            .await
            .unwrap();

        let stats = engine.stats().unwrap();
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.chunks, 1);
        assert_eq!(stats.vectors, 1);
        assert_eq!(stats.entities, 2);
        assert_eq!(stats.relations, 1);

        let counts = engine.doc_status_counts().unwrap();
        assert_eq!(counts["processed"], 1);
        assert_eq!(counts["failed"], 0);

        let db = engine.storage().unwrap();
        let ada = db.get_entity("ADA LOVELACE").unwrap().unwrap();
        assert_eq!(ada.file_paths, vec!["notes/ada.md".to_string()]);

        let status = engine.pipeline_status().unwrap();
        assert!(!status.busy);
        assert_eq!(status.latest_message, "Completed notes/ada.md");
        assert_eq!(llm.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_identical_content_is_processed_once() {
        let dir = tempdir().unwrap();
        let llm = Arc::new(FakeLlm::extracting(EXTRACTION_JSON));
        let engine = ready_engine(dir.path(), llm.clone()).await;

        for _ in 0..2 {
            engine
                .insert("same text".to_string(), vec!["a.txt".to_string()])
                .await
                .unwrap();
        }

        assert_eq!(engine.stats().unwrap().documents, 1);
        assert_eq!(llm.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_identical_inserts_are_processed_once() {
        let dir = tempdir().unwrap();
        let llm = Arc::new(
            FakeLlm::extracting(EXTRACTION_JSON).with_delay(Duration::from_millis(20)),
        );
        let engine = ready_engine(dir.path(), llm.clone()).await;

        let (first, second) = tokio::join!(
            engine.insert("same text".to_string(), vec!["a.txt".to_string()]),
            engine.insert("same text".to_string(), vec!["a.txt".to_string()]),
        );
        first.unwrap();
        second.unwrap();

        assert_eq!(llm.requests().len(), 1);
        let relation = engine
            .storage()
            .unwrap()
            .get_relation("ADA LOVELACE", "CHARLES BABBAGE")
            .unwrap()
            .unwrap();
        assert_eq!(relation.weight, 2.0);
        assert_eq!(engine.doc_status_counts().unwrap()["processed"], 1);
    }

    #[tokio::test]
    async fn test_failure_marks_document_failed() {
        let dir = tempdir().unwrap();
        let engine = ready_engine(dir.path(), Arc::new(FakeLlm::unreachable())).await;
        let doc = Document::new("hello world", "notes.txt").unwrap();

        let err = engine
            .insert("hello world".to_string(), vec!["notes.txt".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::Ollama(ragline_ollama::OllamaError::ServerNotRunning { .. })
        ));

        let record = engine.doc_status(&doc.id).unwrap().unwrap();
        assert_eq!(record.status, DocStatus::Failed);
        assert!(record.error.unwrap().contains("not running"));
        assert!(!engine.pipeline_status().unwrap().busy);

        let failed = engine.failed_documents().unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].file_path, "notes.txt");
    }

    #[tokio::test]
    async fn test_failed_document_is_retried() {
        let dir = tempdir().unwrap();
        let failing = ready_engine(dir.path(), Arc::new(FakeLlm::unreachable())).await;
        assert!(failing
            .insert("retry me".to_string(), vec!["r.txt".to_string()])
            .await
            .is_err());
        drop(failing);

        let engine = ready_engine(dir.path(), Arc::new(FakeLlm::extracting(EXTRACTION_JSON))).await;
        engine
            .insert("retry me".to_string(), vec!["r.txt".to_string()])
            .await
            .unwrap();

        let counts = engine.doc_status_counts().unwrap();
        assert_eq!(counts["processed"], 1);
        assert_eq!(counts["failed"], 0);
    }

    #[tokio::test]
    async fn test_retry_does_not_merge_chunks_twice() {
        let dir = tempdir().unwrap();
        let engine = ready_engine(dir.path(), Arc::new(FakeLlm::extracting(EXTRACTION_JSON))).await;
        let text = "Ada Lovelace worked with Charles Babbage.";
        engine
            .insert(text.to_string(), vec!["ada.md".to_string()])
            .await
            .unwrap();

        // A run that died after merging leaves the document failed.
        let db = engine.storage().unwrap();
        let doc = Document::new(text, "ada.md").unwrap();
        let record = engine.doc_status(&doc.id).unwrap().unwrap();
        db.upsert_doc_status(&record.with_status(DocStatus::Failed))
            .unwrap();
        let before = db.get_entity("ADA LOVELACE").unwrap().unwrap();

        engine
            .insert(text.to_string(), vec!["ada.md".to_string()])
            .await
            .unwrap();

        let relation = db
            .get_relation("ADA LOVELACE", "CHARLES BABBAGE")
            .unwrap()
            .unwrap();
        assert_eq!(relation.weight, 2.0);
        assert_eq!(relation.keywords, "collaboration");
        assert_eq!(db.get_entity("ADA LOVELACE").unwrap().unwrap(), before);
        assert_eq!(engine.doc_status_counts().unwrap()["processed"], 1);
    }

    #[tokio::test]
    async fn test_malformed_extraction_is_skipped() {
        let dir = tempdir().unwrap();
        let engine = ready_engine(dir.path(), Arc::new(FakeLlm::extracting("not json"))).await;

        engine
            .insert("plain text".to_string(), vec!["p.txt".to_string()])
            .await
            .unwrap();

        let stats = engine.stats().unwrap();
        assert_eq!(stats.chunks, 1);
        assert_eq!(stats.entities, 0);
    }

    #[tokio::test]
    async fn test_empty_content_is_rejected() {
        let dir = tempdir().unwrap();
        let engine = ready_engine(dir.path(), Arc::new(FakeLlm::answering("ok"))).await;

        let err = engine
            .insert("  \n ".to_string(), vec!["blank.txt".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Document(_)));
    }

    #[tokio::test]
    async fn test_dimension_change_is_detected() {
        let dir = tempdir().unwrap();
        let engine = ready_engine(dir.path(), Arc::new(FakeLlm::extracting("{}"))).await;
        engine
            .insert("some text".to_string(), vec!["s.txt".to_string()])
            .await
            .unwrap();
        drop(engine);

        let embedding = EmbeddingFunc::new(Arc::new(HashEmbedder::new(8)), 8, 512);
        let resized = LightRag::new(
            dir.path(),
            test_config(8),
            embedding,
            Arc::new(FakeLlm::answering("ok")),
        );
        let err = resized.initialize_storages().await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::StorageMismatch {
                expected: 8,
                found: 16
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_file_path_uses_unknown_source() {
        let dir = tempdir().unwrap();
        let engine = ready_engine(dir.path(), Arc::new(FakeLlm::extracting("{}"))).await;

        engine.insert("orphan text".to_string(), Vec::new()).await.unwrap();

        let doc = Document::new("orphan text", UNKNOWN_SOURCE).unwrap();
        let record = engine.doc_status(&doc.id).unwrap().unwrap();
        assert_eq!(record.file_path, UNKNOWN_SOURCE);
    }
}
