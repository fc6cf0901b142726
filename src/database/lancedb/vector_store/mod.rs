
use super::{ChunkMetadata, EmbeddingRecord};
use crate::{ShelfError, config::Config};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Vector database store using LanceDB for similarity search.
///
/// Each store instance wraps one named collection: `books` for tagged
/// description lines, `corpus` for chunked reference documents.
pub struct VectorStore {
    connection: Connection,
    collection: String,
    vector_dimension: Option<usize>,
}

/// Search result from vector similarity search
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk_metadata: ChunkMetadata,
    pub similarity_score: f32,
    pub distance: f32,
}

impl VectorStore {
    /// Open (or create) the named collection under the configured vector
    /// database path.
    #[inline]
    pub async fn open(config: &Config, collection: &str) -> Result<Self, ShelfError> {
        let db_path = config.vector_database_path();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(&db_path).map_err(|e| {
            ShelfError::Database(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = format!("file://{}", db_path.display());

        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| ShelfError::Database(format!("Failed to connect to LanceDB: {}", e)))?;

        let mut store = Self {
            connection,
            collection: collection.to_string(),
            vector_dimension: None,
        };

        store
            .initialize_table(config.ollama.embedding_dimension as usize)
            .await?;

        info!("Vector store ready for collection '{}'", collection);
        Ok(store)
    }

    /// Name of the collection this store wraps.
    #[inline]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Initialize the collection table with the correct schema
    async fn initialize_table(&mut self, default_dimension: usize) -> Result<(), ShelfError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| ShelfError::Database(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.collection) {
            debug!(
                "Collection '{}' already exists, detecting vector dimension",
                self.collection
            );
            match self.detect_existing_vector_dimension().await {
                Ok(dim) => {
                    self.vector_dimension = Some(dim);
                    debug!("Detected existing vector dimension: {}", dim);
                }
                Err(e) => {
                    warn!(
                        "Could not detect vector dimension from existing table: {}",
                        e
                    );
                    self.vector_dimension = Some(default_dimension);
                }
            }
            return Ok(());
        }

        info!(
            "Creating collection '{}' with {} dimensions",
            self.collection, default_dimension
        );

        // The table is recreated on first insert if the embedding model
        // produces vectors of a different width.
        let schema = self.create_schema(default_dimension);

        self.connection
            .create_empty_table(&self.collection, schema)
            .execute()
            .await
            .map_err(|e| ShelfError::Database(format!("Failed to create table: {}", e)))?;

        self.vector_dimension = Some(default_dimension);
        Ok(())
    }

    /// Detect vector dimension from existing table schema
    async fn detect_existing_vector_dimension(&self) -> Result<usize, ShelfError> {
        let table = self
            .connection
            .open_table(&self.collection)
            .execute()
            .await
            .map_err(|e| ShelfError::Database(format!("Failed to open existing table: {}", e)))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| ShelfError::Database(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(ShelfError::Database(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    /// Create schema with the specified vector dimension
    fn create_schema(&self, vector_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    vector_dim as i32,
                ),
                false,
            ),
            Field::new("chunk_id", DataType::Utf8, false),
            Field::new("source_file", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("token_count", DataType::UInt32, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    /// Store a single embedding with its metadata
    #[inline]
    pub async fn store_embedding(&mut self, record: EmbeddingRecord) -> Result<(), ShelfError> {
        self.store_embeddings_batch(vec![record]).await
    }

    /// Store multiple embeddings in a batch
    #[inline]
    pub async fn store_embeddings_batch(
        &mut self,
        records: Vec<EmbeddingRecord>,
    ) -> Result<(), ShelfError> {
        if records.is_empty() {
            debug!("No embeddings to store");
            return Ok(());
        }

        debug!("Storing batch of {} embeddings", records.len());

        // Auto-detect vector dimension from first record and recreate table if needed
        let vector_dim = records[0].vector.len();
        if self.vector_dimension != Some(vector_dim) {
            info!(
                "Vector dimension changed from {:?} to {}, recreating table",
                self.vector_dimension, vector_dim
            );
            self.recreate_table_with_dimension(vector_dim).await?;
            self.vector_dimension = Some(vector_dim);
        }

        let record_batch = self.create_record_batch(&records)?;

        let table = self
            .connection
            .open_table(&self.collection)
            .execute()
            .await
            .map_err(|e| ShelfError::Database(format!("Failed to open table: {}", e)))?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| ShelfError::Database(format!("Failed to insert embeddings: {}", e)))?;

        info!(
            "Stored {} embeddings in collection '{}'",
            records.len(),
            self.collection
        );
        Ok(())
    }

    /// Recreate table with new vector dimension
    async fn recreate_table_with_dimension(&self, vector_dim: usize) -> Result<(), ShelfError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| ShelfError::Database(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.collection) {
            self.connection
                .drop_table(&self.collection)
                .await
                .map_err(|e| ShelfError::Database(format!("Failed to drop table: {}", e)))?;
        }

        let schema = self.create_schema(vector_dim);
        self.connection
            .create_empty_table(&self.collection, schema)
            .execute()
            .await
            .map_err(|e| {
                ShelfError::Database(format!("Failed to create table with new dimensions: {}", e))
            })?;

        Ok(())
    }

    /// Create a RecordBatch from embedding records
    fn create_record_batch(&self, records: &[EmbeddingRecord]) -> Result<RecordBatch, ShelfError> {
        let len = records.len();
        let vector_dim = self
            .vector_dimension
            .ok_or_else(|| ShelfError::Database("Vector dimension not set".to_string()))?;

        let mut ids = Vec::with_capacity(len);
        let mut vectors = Vec::with_capacity(len);
        let mut chunk_ids = Vec::with_capacity(len);
        let mut source_files = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut token_counts = Vec::with_capacity(len);
        let mut chunk_indices = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);

        for record in records {
            if record.vector.len() != vector_dim {
                return Err(ShelfError::Database(format!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    vector_dim,
                    record.vector.len()
                )));
            }
            ids.push(record.id.as_str());
            vectors.push(record.vector.clone());
            chunk_ids.push(record.metadata.chunk_id.as_str());
            source_files.push(record.metadata.source_file.as_str());
            contents.push(record.metadata.content.as_str());
            token_counts.push(record.metadata.token_count);
            chunk_indices.push(record.metadata.chunk_index);
            created_ats.push(record.metadata.created_at.as_str());
        }

        let schema = self.create_schema(vector_dim);

        // Create vector array using FixedSizeListArray
        let mut flat_values = Vec::with_capacity(len * vector_dim);
        for vector in &vectors {
            flat_values.extend_from_slice(vector);
        }
        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(field, vector_dim as i32, Arc::new(values_array), None)
                .map_err(|e| {
                    ShelfError::Database(format!("Failed to create vector array: {}", e))
                })?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(chunk_ids)),
            Arc::new(StringArray::from(source_files)),
            Arc::new(StringArray::from(contents)),
            Arc::new(UInt32Array::from(token_counts)),
            Arc::new(UInt32Array::from(chunk_indices)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(schema, arrays)
            .map_err(|e| ShelfError::Database(format!("Failed to create record batch: {}", e)))
    }

    /// Search for similar embeddings using vector similarity.
    ///
    /// Results are ordered nearest-first.
    #[inline]
    pub async fn search_similar(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, ShelfError> {
        debug!(
            "Searching collection '{}' for similar vectors with limit: {}",
            self.collection, limit
        );

        let table = self
            .connection
            .open_table(&self.collection)
            .execute()
            .await
            .map_err(|e| ShelfError::Database(format!("Failed to open table: {}", e)))?;

        let query = table
            .vector_search(query_vector)
            .map_err(|e| ShelfError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit);

        let results = query
            .execute()
            .await
            .map_err(|e| ShelfError::Database(format!("Failed to execute search: {}", e)))?;

        self.parse_search_results_stream(results).await
    }

    /// Parse search results from LanceDB stream into SearchResult structs
    async fn parse_search_results_stream(
        &self,
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<SearchResult>, ShelfError> {
        let mut search_results = Vec::new();

        while let Some(batch_result) = results
            .try_next()
            .await
            .map_err(|e| ShelfError::Database(format!("Failed to read result stream: {}", e)))?
        {
            let parsed_batch = Self::parse_search_batch(&batch_result)?;
            search_results.extend(parsed_batch);
        }

        debug!("Parsed {} search results from stream", search_results.len());
        Ok(search_results)
    }

    /// Parse a single record batch from search results
    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>, ShelfError> {
        let mut search_results = Vec::new();
        let num_rows = batch.num_rows();

        let chunk_ids = string_column(batch, "chunk_id")?;
        let source_files = string_column(batch, "source_file")?;
        let contents = string_column(batch, "content")?;
        let created_ats = string_column(batch, "created_at")?;

        let token_counts = batch
            .column_by_name("token_count")
            .ok_or_else(|| ShelfError::Database("Missing token_count column".to_string()))?
            .as_any()
            .downcast_ref::<UInt32Array>()
            .ok_or_else(|| ShelfError::Database("Invalid token_count column type".to_string()))?;

        let chunk_indices = batch
            .column_by_name("chunk_index")
            .ok_or_else(|| ShelfError::Database("Missing chunk_index column".to_string()))?
            .as_any()
            .downcast_ref::<UInt32Array>()
            .ok_or_else(|| ShelfError::Database("Invalid chunk_index column type".to_string()))?;

        // Extract distance scores if available
        let distances = batch
            .column_by_name("_distance")
            .map(|col| col.as_any().downcast_ref::<Float32Array>());

        for row in 0..num_rows {
            let chunk_metadata = ChunkMetadata {
                chunk_id: chunk_ids.value(row).to_string(),
                source_file: source_files.value(row).to_string(),
                content: contents.value(row).to_string(),
                token_count: token_counts.value(row),
                chunk_index: chunk_indices.value(row),
                created_at: created_ats.value(row).to_string(),
            };

            let distance = distances
                .flatten()
                .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            // Convert distance to similarity score (higher is better)
            let similarity_score = 1.0 - distance;

            search_results.push(SearchResult {
                chunk_metadata,
                similarity_score,
                distance,
            });
        }

        debug!("Parsed {} search results", search_results.len());
        Ok(search_results)
    }

    /// Get the total number of embeddings stored in this collection
    #[inline]
    pub async fn count_embeddings(&self) -> Result<u64, ShelfError> {
        let table = self
            .connection
            .open_table(&self.collection)
            .execute()
            .await
            .map_err(|e| ShelfError::Database(format!("Failed to open table: {}", e)))?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| ShelfError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, ShelfError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| ShelfError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| ShelfError::Database(format!("Invalid {} column type", name)))
}
