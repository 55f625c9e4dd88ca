//! SQLite-backed vector backend.
//!
//! Both collections share one table keyed by `(collection, id)`. Embeddings
//! are little-endian f32 BLOBs; lookup is brute-force cosine distance.

use crate::embeddings::EmbeddingProvider;
use crate::filter::Filter;
use crate::vector_index::{Collection, Match, Metadata, Record, VectorBackend};
use coursemate_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Vector backend storing records in a single SQLite database.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("embedder", &self.embedder)
            .finish_non_exhaustive()
    }
}

struct StoredRow {
    id: String,
    document: String,
    embedding: Vec<f32>,
    metadata: Metadata,
}

impl SqliteBackend {
    /// Open (or create) the index at `db_path`.
    pub fn open(db_path: &Path, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Retrieval(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Retrieval(format!("Failed to open SQLite index: {}", e)))?;

        tracing::debug!("Opened SQLite index at {:?}", db_path);
        Self::with_connection(conn, embedder)
    }

    /// Index that lives only as long as the backend.
    pub fn in_memory(embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Retrieval(format!("Failed to open SQLite index: {}", e)))?;
        Self::with_connection(conn, embedder)
    }

    fn with_connection(conn: Connection, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                document TEXT NOT NULL,
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );
            "#,
        )
        .map_err(|e| AppError::Retrieval(format!("Failed to create tables: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Retrieval("Index connection lock poisoned".to_string()))
    }

    fn write_records(
        &self,
        collection: Collection,
        records: &[Record],
        embeddings: &[Vec<f32>],
    ) -> AppResult<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Retrieval(format!("Failed to begin transaction: {}", e)))?;

        for (record, embedding) in records.iter().zip(embeddings) {
            let metadata_json = serde_json::to_string(&record.metadata)?;
            tx.execute(
                "INSERT INTO records (collection, id, document, embedding, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (collection, id) DO UPDATE SET
                     document = excluded.document,
                     embedding = excluded.embedding,
                     metadata = excluded.metadata",
                params![
                    collection.as_str(),
                    record.id,
                    record.document,
                    embedding_to_bytes(embedding),
                    metadata_json,
                ],
            )
            .map_err(|e| AppError::Retrieval(format!("Failed to insert record: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| AppError::Retrieval(format!("Failed to commit records: {}", e)))
    }

    fn load_rows(&self, collection: Collection) -> AppResult<Vec<StoredRow>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, document, embedding, metadata FROM records
                 WHERE collection = ?1 ORDER BY rowid",
            )
            .map_err(|e| AppError::Retrieval(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![collection.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(|e| AppError::Retrieval(format!("Failed to query records: {}", e)))?;

        let mut out = Vec::new();
        for row in rows {
            let (id, document, blob, metadata_json) =
                row.map_err(|e| AppError::Retrieval(format!("Failed to read record: {}", e)))?;
            out.push(StoredRow {
                id,
                document,
                embedding: bytes_to_embedding(&blob)?,
                metadata: serde_json::from_str(&metadata_json)?,
            });
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl VectorBackend for SqliteBackend {
    async fn upsert(&self, collection: Collection, records: Vec<Record>) -> AppResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = records.iter().map(|r| r.document.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != records.len() {
            return Err(AppError::Retrieval(format!(
                "Embedding provider returned {} vectors for {} records",
                embeddings.len(),
                records.len()
            )));
        }

        self.write_records(collection, &records, &embeddings)?;
        tracing::debug!("Upserted {} records into {}", records.len(), collection.as_str());
        Ok(())
    }

    async fn query(
        &self,
        collection: Collection,
        text: &str,
        filter: Option<&Filter>,
        limit: usize,
    ) -> AppResult<Vec<Match>> {
        let query_embedding = self.embedder.embed(text).await?;
        let rows = self.load_rows(collection)?;

        let mut matches: Vec<Match> = rows
            .into_iter()
            .filter(|row| filter.map_or(true, |f| f.matches(&row.metadata)))
            .map(|row| Match {
                distance: 1.0 - cosine_similarity(&query_embedding, &row.embedding),
                id: row.id,
                document: row.document,
                metadata: row.metadata,
            })
            .collect();

        matches.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(limit);

        tracing::debug!(
            "Retrieved {} matches from {} (requested top-{})",
            matches.len(),
            collection.as_str(),
            limit
        );
        Ok(matches)
    }

    async fn get(&self, collection: Collection, ids: &[String]) -> AppResult<Vec<Record>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT document, metadata FROM records WHERE collection = ?1 AND id = ?2")
            .map_err(|e| AppError::Retrieval(format!("Failed to prepare query: {}", e)))?;

        let mut records = Vec::new();
        for id in ids {
            let mut rows = stmt
                .query(params![collection.as_str(), id])
                .map_err(|e| AppError::Retrieval(format!("Failed to get record: {}", e)))?;
            if let Some(row) = rows
                .next()
                .map_err(|e| AppError::Retrieval(format!("Failed to read record: {}", e)))?
            {
                let document: String = row
                    .get(0)
                    .map_err(|e| AppError::Retrieval(format!("Failed to read record: {}", e)))?;
                let metadata_json: String = row
                    .get(1)
                    .map_err(|e| AppError::Retrieval(format!("Failed to read record: {}", e)))?;
                records.push(Record {
                    id: id.clone(),
                    document,
                    metadata: serde_json::from_str(&metadata_json)?,
                });
            }
        }
        Ok(records)
    }

    async fn ids(&self, collection: Collection) -> AppResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id FROM records WHERE collection = ?1 ORDER BY rowid")
            .map_err(|e| AppError::Retrieval(format!("Failed to prepare query: {}", e)))?;
        let ids = stmt
            .query_map(params![collection.as_str()], |row| row.get::<_, String>(0))
            .map_err(|e| AppError::Retrieval(format!("Failed to list ids: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Retrieval(format!("Failed to list ids: {}", e)))?;
        Ok(ids)
    }

    async fn clear(&self, collection: Collection) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM records WHERE collection = ?1",
            params![collection.as_str()],
        )
        .map_err(|e| AppError::Retrieval(format!("Failed to clear collection: {}", e)))?;

        tracing::info!("Cleared collection {}", collection.as_str());
        Ok(())
    }
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Retrieval(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::trigram::TrigramProvider;
    use serde_json::json;
    use tempfile::TempDir;

    fn record(id: &str, document: &str, metadata: serde_json::Value) -> Record {
        Record {
            id: id.to_string(),
            document: document.to_string(),
            metadata: metadata.as_object().cloned().unwrap(),
        }
    }

    fn backend() -> SqliteBackend {
        SqliteBackend::in_memory(Arc::new(TrigramProvider::new(384))).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_and_query_ranks_by_distance() {
        let backend = backend();
        backend
            .upsert(
                Collection::CourseContent,
                vec![
                    record("a", "Variables store data values in Python", json!({"lesson_number": 2})),
                    record("b", "Loops repeat a block of statements", json!({"lesson_number": 3})),
                ],
            )
            .await
            .unwrap();

        let matches = backend
            .query(Collection::CourseContent, "python variables", None, 5)
            .await
            .unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "a");
        assert!(matches[0].distance <= matches[1].distance);
    }

    #[tokio::test]
    async fn test_query_applies_filter_and_limit() {
        let backend = backend();
        let records = (0..4)
            .map(|i| {
                record(
                    &format!("c{}", i),
                    "shared passage text",
                    json!({"course_title": if i % 2 == 0 { "Intro" } else { "Advanced" }}),
                )
            })
            .collect();
        backend.upsert(Collection::CourseContent, records).await.unwrap();

        let filter = Filter::CourseTitle("Intro".to_string());
        let matches = backend
            .query(Collection::CourseContent, "passage", Some(&filter), 1)
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].metadata["course_title"], "Intro");
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let backend = backend();
        backend
            .upsert(Collection::CourseCatalog, vec![record("Intro", "Intro", json!({}))])
            .await
            .unwrap();

        assert_eq!(backend.ids(Collection::CourseCatalog).await.unwrap(), vec!["Intro"]);
        assert!(backend.ids(Collection::CourseContent).await.unwrap().is_empty());

        backend.clear(Collection::CourseCatalog).await.unwrap();
        assert!(backend.ids(Collection::CourseCatalog).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_updates_in_place() {
        let backend = backend();
        let catalog = |title: &str, lessons: u32| record(title, title, json!({"lesson_count": lessons}));

        backend
            .upsert(Collection::CourseCatalog, vec![catalog("Intro", 1), catalog("Advanced", 2)])
            .await
            .unwrap();
        backend
            .upsert(Collection::CourseCatalog, vec![catalog("Intro", 4)])
            .await
            .unwrap();

        // Re-upserting keeps the original insertion position
        assert_eq!(
            backend.ids(Collection::CourseCatalog).await.unwrap(),
            vec!["Intro", "Advanced"]
        );
        let records = backend
            .get(Collection::CourseCatalog, &["Intro".to_string()])
            .await
            .unwrap();
        assert_eq!(records[0].metadata["lesson_count"], 4);
    }

    #[tokio::test]
    async fn test_get_skips_missing_ids_and_persists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("index.sqlite");

        {
            let backend = SqliteBackend::open(&path, Arc::new(TrigramProvider::new(64))).unwrap();
            backend
                .upsert(
                    Collection::CourseCatalog,
                    vec![record("Intro", "Intro", json!({"lesson_count": 3}))],
                )
                .await
                .unwrap();
        }

        let reopened = SqliteBackend::open(&path, Arc::new(TrigramProvider::new(64))).unwrap();
        let records = reopened
            .get(
                Collection::CourseCatalog,
                &["Intro".to_string(), "Missing".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metadata["lesson_count"], 3);
    }

    #[test]
    fn test_embedding_bytes_roundtrip_and_cosine() {
        let bytes = embedding_to_bytes(&[1.0, -0.5]);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), vec![1.0, -0.5]);
        assert!(bytes_to_embedding(&bytes[..3]).is_err());

        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
    }
}
