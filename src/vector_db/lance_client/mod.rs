//! LanceDB vector store (embedded, no server required)
//!
//! One Lance table per repository. Rows mirror [`CodeChunk`]: the string columns,
//! 1-based line numbers as `UInt32`, and the embedding as a fixed-size list of
//! `Float32`. Filters are rendered from [`Filter`] so file paths are always quoted.

use super::{ChunkTable, Filter, VectorStore};
use crate::types::CodeChunk;
use anyhow::{Context, Result, bail};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
    UInt32Array, types::Float32Type,
};
use arrow_schema::{DataType, Field, Schema};
use futures::stream::TryStreamExt;
use lancedb::Table;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::sync::Arc;

/// LanceDB-backed [`VectorStore`]
pub struct LanceVectorStore {
    connection: Connection,
    db_path: String,
}

impl LanceVectorStore {
    /// Connect to (or create) a LanceDB directory
    pub async fn with_path(db_path: &str) -> Result<Self> {
        tracing::info!("Connecting to LanceDB at: {}", db_path);

        let connection = lancedb::connect(db_path)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        Ok(Self {
            connection,
            db_path: db_path.to_string(),
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Create schema for a chunk table
    fn create_schema(dimension: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("repo_url", DataType::Utf8, false),
            Field::new("file_path", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("start_line", DataType::UInt32, false),
            Field::new("end_line", DataType::UInt32, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimension as i32,
                ),
                false,
            ),
        ]))
    }

    async fn contains_table(&self, name: &str) -> Result<bool> {
        let names = self.table_names().await?;
        Ok(names.iter().any(|n| n == name))
    }
}

#[async_trait::async_trait]
impl VectorStore for LanceVectorStore {
    async fn table_names(&self) -> Result<Vec<String>> {
        self.connection
            .table_names()
            .execute()
            .await
            .context("Failed to list tables")
    }

    async fn open_table(&self, name: &str) -> Result<Option<Arc<dyn ChunkTable>>> {
        if !self.contains_table(name).await? {
            return Ok(None);
        }

        let table = self
            .connection
            .open_table(name)
            .execute()
            .await
            .with_context(|| format!("Failed to open table '{}'", name))?;

        Ok(Some(Arc::new(LanceChunkTable {
            name: name.to_string(),
            table,
        })))
    }

    async fn create_table(&self, name: &str, dimension: usize) -> Result<Arc<dyn ChunkTable>> {
        if dimension == 0 {
            bail!("Vector dimension must be greater than 0");
        }

        let schema = Self::create_schema(dimension);

        // Empty batch wrapped in an iterator of Result<RecordBatch>
        let empty_batch = RecordBatch::new_empty(schema.clone());
        let batches = RecordBatchIterator::new(vec![empty_batch].into_iter().map(Ok), schema);

        let table = self
            .connection
            .create_table(name, Box::new(batches))
            .execute()
            .await
            .with_context(|| format!("Failed to create table '{}'", name))?;

        tracing::info!("Created table '{}' (dimension {})", name, dimension);
        Ok(Arc::new(LanceChunkTable {
            name: name.to_string(),
            table,
        }))
    }

    async fn drop_table(&self, name: &str) -> Result<()> {
        if !self.contains_table(name).await? {
            tracing::debug!("Table '{}' does not exist, nothing to drop", name);
            return Ok(());
        }

        self.connection
            .drop_table(name, &[])
            .await
            .with_context(|| format!("Failed to drop table '{}'", name))?;

        tracing::info!("Dropped table '{}'", name);
        Ok(())
    }
}

/// One repository's table inside a LanceDB directory
pub struct LanceChunkTable {
    name: String,
    table: Table,
}

impl LanceChunkTable {
    /// Convert chunks to a RecordBatch; all embeddings must share one dimension
    fn create_record_batch(chunks: Vec<CodeChunk>) -> Result<RecordBatch> {
        let dimension = chunks.first().map(|c| c.embedding.len()).unwrap_or(0);
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dimension) {
            bail!(
                "Chunk '{}' has dimension {}, expected {}",
                bad.id,
                bad.embedding.len(),
                dimension
            );
        }

        let schema = LanceVectorStore::create_schema(dimension);

        let id_array = StringArray::from(chunks.iter().map(|c| c.id.as_str()).collect::<Vec<_>>());
        let repo_url_array =
            StringArray::from(chunks.iter().map(|c| c.repo_url.as_str()).collect::<Vec<_>>());
        let file_path_array =
            StringArray::from(chunks.iter().map(|c| c.file_path.as_str()).collect::<Vec<_>>());
        let content_array =
            StringArray::from(chunks.iter().map(|c| c.content.as_str()).collect::<Vec<_>>());
        let start_line_array =
            UInt32Array::from(chunks.iter().map(|c| c.start_line as u32).collect::<Vec<_>>());
        let end_line_array =
            UInt32Array::from(chunks.iter().map(|c| c.end_line as u32).collect::<Vec<_>>());
        let vector_array = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            chunks
                .iter()
                .map(|c| Some(c.embedding.iter().copied().map(Some))),
            dimension as i32,
        );

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(id_array),
                Arc::new(repo_url_array),
                Arc::new(file_path_array),
                Arc::new(content_array),
                Arc::new(start_line_array),
                Arc::new(end_line_array),
                Arc::new(vector_array),
            ],
        )
        .context("Failed to create RecordBatch")
    }

    /// Convert result batches back into chunks, preserving row order
    fn chunks_from_batches(batches: &[RecordBatch]) -> Result<Vec<CodeChunk>> {
        let mut chunks = Vec::new();

        for batch in batches {
            let id_array = string_column(batch, "id")?;
            let repo_url_array = string_column(batch, "repo_url")?;
            let file_path_array = string_column(batch, "file_path")?;
            let content_array = string_column(batch, "content")?;
            let start_line_array = u32_column(batch, "start_line")?;
            let end_line_array = u32_column(batch, "end_line")?;
            let vector_array = batch
                .column_by_name("vector")
                .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>());

            for i in 0..batch.num_rows() {
                let embedding = vector_array
                    .map(|v| v.value(i))
                    .and_then(|values| {
                        values
                            .as_any()
                            .downcast_ref::<Float32Array>()
                            .map(|f| f.values().to_vec())
                    })
                    .unwrap_or_default();

                chunks.push(CodeChunk {
                    id: id_array.value(i).to_string(),
                    repo_url: repo_url_array.value(i).to_string(),
                    file_path: file_path_array.value(i).to_string(),
                    content: content_array.value(i).to_string(),
                    start_line: start_line_array.value(i) as usize,
                    end_line: end_line_array.value(i) as usize,
                    embedding,
                });
            }
        }

        Ok(chunks)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .with_context(|| format!("Missing {} column", name))?
        .as_any()
        .downcast_ref::<StringArray>()
        .with_context(|| format!("Invalid {} type", name))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .with_context(|| format!("Missing {} column", name))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .with_context(|| format!("Invalid {} type", name))
}

#[async_trait::async_trait]
impl ChunkTable for LanceChunkTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add(&self, chunks: Vec<CodeChunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let batch = Self::create_record_batch(chunks)?;
        let count = batch.num_rows();
        let schema = batch.schema();
        let batches = RecordBatchIterator::new(vec![batch].into_iter().map(Ok), schema);

        self.table
            .add(Box::new(batches))
            .execute()
            .await
            .context("Failed to add records to table")?;

        tracing::debug!("Stored {} chunks in table '{}'", count, self.name);
        Ok(count)
    }

    async fn delete(&self, filter: &Filter) -> Result<()> {
        self.table
            .delete(&filter.to_sql())
            .await
            .context("Failed to delete records")?;
        Ok(())
    }

    async fn count_rows(&self, filter: Option<&Filter>) -> Result<usize> {
        self.table
            .count_rows(filter.map(Filter::to_sql))
            .await
            .context("Failed to count rows")
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<Vec<CodeChunk>> {
        let query = self
            .table
            .vector_search(vector)
            .context("Failed to create vector search")?
            .limit(limit);

        let stream = match filter {
            Some(filter) => query.only_if(filter.to_sql()).execute().await,
            None => query.execute().await,
        }
        .context("Failed to execute search")?;

        let results: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .context("Failed to collect search results")?;

        Self::chunks_from_batches(&results)
    }
}
