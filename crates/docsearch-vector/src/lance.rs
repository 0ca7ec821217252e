//! LanceDB-backed vector store.
//!
//! The table holds `(id, ordinal, vector)`. Queries run a full vector scan in
//! Lance and rescore the returned vectors locally, so rankings match the flat
//! store exactly. Rebuilds overwrite the table as a new Lance version; handles
//! opened on the previous version keep reading it.

use anyhow::{anyhow, Context, Result};
use arrow_array::cast::AsArray;
use arrow_array::types::Float32Type;
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray, UInt64Array};
use arrow_schema::{DataType, Field, Schema};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::table::AddDataMode;
use lancedb::{connect, DistanceType, Table};
use std::path::Path;
use std::sync::Arc;

use docsearch_core::config::Metric;
use docsearch_core::traits::VectorIndex;
use docsearch_core::types::{Chunk, SearchHit};

use crate::similarity::{top_k, Candidate};

const BATCH_ROWS: usize = 1000;

pub fn build_arrow_schema(dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("ordinal", DataType::UInt64, false),
        Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim as i32), true),
    ]))
}

fn distance_type(metric: Metric) -> DistanceType {
    match metric {
        Metric::Cosine => DistanceType::Cosine,
        Metric::Dot => DistanceType::Dot,
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("starting tokio runtime for LanceDB")
}

pub struct LanceVectorStore {
    rt: tokio::runtime::Runtime,
    table: Table,
    metric: Metric,
    dim: usize,
    len: usize,
}

impl LanceVectorStore {
    /// Write `chunks` with their vectors into the table under `dir`, replacing
    /// any previous contents.
    pub fn create(dir: &Path, table_name: &str, chunks: &[Chunk], vectors: &[Vec<f32>], metric: Metric, dim: usize) -> Result<Self> {
        anyhow::ensure!(chunks.len() == vectors.len(), "chunks and embeddings length must match");
        anyhow::ensure!(!chunks.is_empty(), "cannot create an empty Lance table");
        let rt = runtime()?;
        let schema = build_arrow_schema(dim);
        let mut batches = Vec::new();
        for (chunk_slice, vector_slice) in chunks.chunks(BATCH_ROWS).zip(vectors.chunks(BATCH_ROWS)) {
            batches.push(to_record_batch(schema.clone(), chunk_slice, vector_slice, dim)?);
        }
        let uri = dir.to_string_lossy().to_string();
        let table = rt.block_on(async {
            let db = connect(&uri).execute().await?;
            let reader = Box::new(RecordBatchIterator::new(batches.into_iter().map(Ok), schema.clone()));
            if db.table_names().execute().await?.iter().any(|n| n == table_name) {
                let table = db.open_table(table_name).execute().await?;
                table.add(reader).mode(AddDataMode::Overwrite).execute().await?;
                Ok(table)
            } else {
                db.create_table(table_name, reader).execute().await
            }
        })?;
        tracing::info!(rows = chunks.len(), table = table_name, "Lance table written");
        Ok(Self { rt, table, metric, dim, len: chunks.len() })
    }

    pub fn open(dir: &Path, table_name: &str, metric: Metric, dim: usize) -> Result<Self> {
        let rt = runtime()?;
        let uri = dir.to_string_lossy().to_string();
        let (table, len) = rt.block_on(async {
            let db = connect(&uri).execute().await?;
            let table = db.open_table(table_name).execute().await?;
            let len = table.count_rows(None).await?;
            Ok::<_, lancedb::Error>((table, len))
        })?;
        Ok(Self { rt, table, metric, dim, len })
    }
}

fn to_record_batch(schema: Arc<Schema>, chunks: &[Chunk], vectors: &[Vec<f32>], dim: usize) -> Result<RecordBatch> {
    let ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
    let ordinals: Vec<u64> = chunks.iter().map(|c| c.ordinal as u64).collect();
    let vectors = vectors.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
    let record_batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(UInt64Array::from(ordinals)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim as i32)),
        ],
    )?;
    Ok(record_batch)
}

impl VectorIndex for LanceVectorStore {
    fn len(&self) -> usize { self.len }

    fn search_vec(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 || self.len == 0 {
            return Ok(Vec::new());
        }
        anyhow::ensure!(query_vec.len() == self.dim, "query vector has dimension {} but the store holds {}", query_vec.len(), self.dim);
        let batches: Vec<RecordBatch> = self.rt.block_on(async {
            let stream = self
                .table
                .vector_search(query_vec.to_vec())?
                .distance_type(distance_type(self.metric))
                .limit(self.len)
                .execute()
                .await?;
            stream.try_collect::<Vec<_>>().await
        })?;

        let mut rows: Vec<(String, usize, Vec<f32>)> = Vec::with_capacity(self.len);
        for batch in &batches {
            let ids = batch
                .column_by_name("id")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow!("Lance table is missing the id column"))?;
            let ordinals = batch
                .column_by_name("ordinal")
                .and_then(|c| c.as_any().downcast_ref::<UInt64Array>())
                .ok_or_else(|| anyhow!("Lance table is missing the ordinal column"))?;
            let vectors = batch
                .column_by_name("vector")
                .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
                .ok_or_else(|| anyhow!("Lance table is missing the vector column"))?;
            for i in 0..batch.num_rows() {
                let values = vectors.value(i).as_primitive::<Float32Type>().values().to_vec();
                rows.push((ids.value(i).to_string(), ordinals.value(i) as usize, values));
            }
        }
        let candidates = rows.iter().map(|(id, ordinal, v)| Candidate { id, ordinal: *ordinal, vector: v });
        Ok(top_k(self.metric, query_vec, candidates, k))
    }
}
