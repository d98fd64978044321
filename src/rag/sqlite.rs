//! SQLite-backed RAG store implementation.
//!
//! In-process vector store using SQLite for chunks and metadata and
//! brute-force cosine similarity for search. The database file persists
//! the index across query sessions.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::store::{ChunkSearchResult, RagStore, StoredChunk};
use crate::core::errors::ApiError;

pub struct SqliteRagStore {
    pool: SqlitePool,
}

impl SqliteRagStore {
    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(ApiError::internal)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS manual_chunks (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                metadata TEXT DEFAULT '{}',
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    async fn insert_rows(
        conn: &mut SqliteConnection,
        items: &[(StoredChunk, Vec<f32>)],
    ) -> Result<(), ApiError> {
        for (chunk, embedding) in items {
            let blob = Self::serialize_embedding(embedding);
            let metadata_str = match chunk.metadata.as_ref() {
                Some(m) => serde_json::to_string(m).map_err(ApiError::internal)?,
                None => "{}".to_string(),
            };

            sqlx::query(
                "INSERT OR REPLACE INTO manual_chunks (chunk_id, content, source, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.content)
            .bind(&chunk.source)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *conn)
            .await
            .map_err(ApiError::internal)?;
        }
        Ok(())
    }

    async fn clear_with_model(
        conn: &mut SqliteConnection,
        embedding_model: &str,
    ) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM manual_chunks")
            .execute(&mut *conn)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query(
            "INSERT OR REPLACE INTO rag_meta (key, value, updated_at)
             VALUES ('embedding_model', ?1, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(embedding_model)
        .execute(&mut *conn)
        .await
        .map_err(ApiError::internal)?;
        Ok(())
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> StoredChunk {
        let metadata_str: String = row.get("metadata");
        let metadata = serde_json::from_str::<Value>(&metadata_str).ok();

        StoredChunk {
            chunk_id: row.get("chunk_id"),
            content: row.get("content"),
            source: row.get("source"),
            metadata,
        }
    }
}

#[async_trait]
impl RagStore for SqliteRagStore {
    async fn insert_batch(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), ApiError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        Self::insert_rows(&mut *tx, &items).await?;
        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        let rows = sqlx::query(
            "SELECT chunk_id, content, source, metadata, embedding
             FROM manual_chunks
             ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut scored: Vec<ChunkSearchResult> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored_emb = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(query_embedding, &stored_emb);

                Some(ChunkSearchResult {
                    chunk: Self::row_to_chunk(row),
                    score,
                })
            })
            .collect();

        // stable: equal scores keep insertion order
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit.max(1));

        Ok(scored)
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM manual_chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(count as usize)
    }

    async fn reset_with_model(&self, embedding_model: &str) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        Self::clear_with_model(&mut *tx, embedding_model).await?;
        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn replace_all(
        &self,
        embedding_model: &str,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        Self::clear_with_model(&mut *tx, embedding_model).await?;
        Self::insert_rows(&mut *tx, &items).await?;
        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn embedding_model(&self) -> Result<Option<String>, ApiError> {
        sqlx::query_scalar("SELECT value FROM rag_meta WHERE key = 'embedding_model'")
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store(dir: &tempfile::TempDir) -> SqliteRagStore {
        SqliteRagStore::with_path(dir.path().join("rag.db")).await.unwrap()
    }

    fn make_chunk(id: &str, content: &str, code: &str) -> StoredChunk {
        StoredChunk {
            chunk_id: id.to_string(),
            content: content.to_string(),
            source: "manual.md".to_string(),
            metadata: Some(serde_json::json!({ "Error_Code": code })),
        }
    }

    #[tokio::test]
    async fn insert_and_search_ranks_by_cosine() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;

        store
            .insert_batch(vec![
                (make_chunk("c1", "Fan tray", "HW-1002"), vec![0.0, 1.0, 0.0]),
                (make_chunk("c2", "Fiber link", "S-304"), vec![1.0, 0.0, 0.0]),
                (make_chunk("c3", "Power unit", "E-101"), vec![0.7, 0.7, 0.0]),
            ])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 3);

        let results = store.search(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.chunk_id, "c2");
        assert!(results[0].score > 0.99);
        assert_eq!(results[1].chunk.chunk_id, "c3");
        assert_eq!(
            results[0].chunk.metadata.as_ref().unwrap()["Error_Code"],
            "S-304"
        );
    }

    #[tokio::test]
    async fn equal_scores_keep_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;

        let items = ["b", "a", "c"]
            .iter()
            .map(|id| (make_chunk(id, "same", "X-1"), vec![1.0, 0.0]))
            .collect();
        store.insert_batch(items).await.unwrap();

        let ids: Vec<String> = store
            .search(&[1.0, 0.0], 10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.chunk.chunk_id)
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn reset_with_model_clears_chunks_and_records_model() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        assert_eq!(store.embedding_model().await.unwrap(), None);

        store
            .insert_batch(vec![(make_chunk("c1", "data", "E-101"), vec![1.0])])
            .await
            .unwrap();

        store.reset_with_model("text-embedding-004").await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(
            store.embedding_model().await.unwrap().as_deref(),
            Some("text-embedding-004")
        );
    }

    #[tokio::test]
    async fn replace_all_swaps_contents_and_model_together() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        store
            .insert_batch(vec![(make_chunk("old", "stale", "E-101"), vec![1.0])])
            .await
            .unwrap();

        store
            .replace_all(
                "text-embedding-004",
                vec![
                    (make_chunk("n1", "fresh", "S-304"), vec![1.0, 0.0]),
                    (make_chunk("n2", "fresher", "S-305"), vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        let results = store.search(&[1.0, 0.0], 10).await.unwrap();
        assert!(results.iter().all(|r| r.chunk.chunk_id != "old"));
        assert_eq!(
            store.embedding_model().await.unwrap().as_deref(),
            Some("text-embedding-004")
        );
    }

    #[tokio::test]
    async fn index_survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = test_store(&dir).await;
            store
                .insert_batch(vec![(make_chunk("c1", "persisted", "S-304"), vec![1.0, 0.0])])
                .await
                .unwrap();
            store.pool.close().await;
        }

        let reopened = test_store(&dir).await;
        let results = reopened.search(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.content, "persisted");
    }

    #[test]
    fn embedding_blob_round_trip_and_cosine_edges() {
        let emb = vec![0.25f32, -1.5, 3.0];
        let bytes = SqliteRagStore::serialize_embedding(&emb);
        assert_eq!(bytes.len(), 12);
        assert_eq!(SqliteRagStore::deserialize_embedding(&bytes), emb);

        assert_eq!(SqliteRagStore::cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(SqliteRagStore::cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
