//! Vector index store.
//!
//! Persists chunk texts and their embedding vectors in SQLite and answers
//! nearest-neighbor queries by scanning the stored vectors and computing
//! cosine similarity in Rust. The store is append-only: chunks are never
//! updated or deleted once written.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::Chunk;

/// A chunk returned from a nearest-neighbor query, most-similar first.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub book_name: String,
    pub text: String,
    pub score: f64,
}

pub struct VectorIndex {
    pool: SqlitePool,
}

impl VectorIndex {
    /// Connect to the index database. Run `tutor init` first to create the
    /// schema.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        Ok(Self { pool })
    }

    /// Persist one file's chunks and their vectors in a single transaction,
    /// so a partial failure leaves no half-stored file behind.
    pub async fn add_chunks(
        &self,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
        model: &str,
        dims: usize,
    ) -> Result<()> {
        anyhow::ensure!(
            chunks.len() == vectors.len(),
            "chunk/vector count mismatch: {} vs {}",
            chunks.len(),
            vectors.len()
        );

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
            sqlx::query(
                "INSERT INTO chunks (id, book_name, chunk_index, text, hash) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&chunk.id)
            .bind(&chunk.book_name)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .execute(&mut *tx)
            .await?;

            let blob = vec_to_blob(vector);
            sqlx::query(
                r#"
                INSERT INTO chunk_vectors (chunk_id, book_name, model, dims, embedding, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.book_name)
            .bind(model)
            .bind(dims as i64)
            .bind(&blob)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Return the `k` stored chunks nearest to `query_vec` by cosine
    /// similarity, most-similar first.
    pub async fn nearest(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let rows = sqlx::query(
            r#"
            SELECT cv.chunk_id, cv.book_name, cv.embedding, c.text
            FROM chunk_vectors cv
            JOIN chunks c ON c.id = cv.chunk_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut candidates: Vec<ScoredChunk> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = blob_to_vec(&blob);
                let similarity = cosine_similarity(query_vec, &vec) as f64;
                ScoredChunk {
                    chunk_id: row.get("chunk_id"),
                    book_name: row.get("book_name"),
                    text: row.get("text"),
                    score: similarity,
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(k);

        Ok(candidates)
    }

    pub async fn chunk_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;

    fn test_config(root: &std::path::Path) -> Config {
        let toml_str = format!(
            "[index]\ndb_path = \"{}\"\n",
            root.join("tutor.sqlite").display()
        );
        toml::from_str(&toml_str).unwrap()
    }

    fn chunk(id: &str, book: &str, index: i64, text: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            book_name: book.to_string(),
            chunk_index: index,
            text: text.to_string(),
            hash: format!("hash-{}", id),
        }
    }

    #[tokio::test]
    async fn add_and_nearest_round_trip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path());
        migrate::run_migrations(&config).await.unwrap();

        let index = VectorIndex::open(&config).await.unwrap();
        let chunks = vec![
            chunk("c1", "calculus", 0, "Derivatives measure change."),
            chunk("c2", "calculus", 1, "Integrals accumulate area."),
        ];
        let vectors = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
        index
            .add_chunks(&chunks, &vectors, "test-model", 3)
            .await
            .unwrap();

        assert_eq!(index.chunk_count().await.unwrap(), 2);

        let results = index.nearest(&[0.9, 0.1, 0.0], 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk_id, "c1");
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].text, "Derivatives measure change.");
        assert_eq!(results[0].book_name, "calculus");

        let top_one = index.nearest(&[0.0, 1.0, 0.0], 1).await.unwrap();
        assert_eq!(top_one.len(), 1);
        assert_eq!(top_one[0].chunk_id, "c2");

        index.close().await;
    }

    #[tokio::test]
    async fn mismatched_vector_count_is_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path());
        migrate::run_migrations(&config).await.unwrap();

        let index = VectorIndex::open(&config).await.unwrap();
        let chunks = vec![chunk("c1", "calculus", 0, "text")];
        let err = index
            .add_chunks(&chunks, &[], "test-model", 3)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("mismatch"));
        index.close().await;
    }
}
