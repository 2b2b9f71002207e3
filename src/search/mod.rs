//! Tantivy-based search index module.
//!
//! Provides full-text search over reports with field boosting.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::Report;

const BOOST_STREET: f32 = 8.0;
const BOOST_BARRIER_TYPE: f32 = 6.0;
const BOOST_DESCRIPTION: f32 = 5.0;
const BOOST_EXTRA_INFO: f32 = 3.0;
const BOOST_COMMENTS: f32 = 1.5;

/// Search result with report ID and relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub report_id: String,
    pub score: f32,
}

struct SearchFields {
    report_id: Field,
    street: Field,
    description: Field,
    extra_info: Field,
    barrier_type: Field,
    comments: Field,
}

/// Tantivy search index for reports.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        let mut schema_builder = Schema::builder();
        // Indexed as a single token so updates can delete by term
        let report_id = schema_builder.add_text_field("report_id", STRING | STORED);
        let street = schema_builder.add_text_field("street", TEXT);
        let description = schema_builder.add_text_field("description", TEXT);
        let extra_info = schema_builder.add_text_field("extra_info", TEXT);
        let barrier_type = schema_builder.add_text_field("barrier_type", TEXT);
        let comments = schema_builder.add_text_field("comments", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            report_id,
            street,
            description,
            extra_info,
            barrier_type,
            comments,
        };

        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000)
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index from the stored reports.
    pub async fn rebuild(&self, reports: &[Report]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;
        for report in reports {
            writer.add_document(self.create_document(report))?;
        }
        writer.commit()?;

        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} reports", reports.len());
        Ok(())
    }

    /// Index a single report, replacing any previous version.
    pub async fn index_report(&self, report: &Report) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        let term = tantivy::Term::from_field_text(self.fields.report_id, &report.id);
        writer.delete_term(term);
        writer.add_document(self.create_document(report))?;
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Remove a report from the index.
    pub async fn remove_report(&self, report_id: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        let term = tantivy::Term::from_field_text(self.fields.report_id, report_id);
        writer.delete_term(term);
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Search for reports matching the query.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SearchResult>, AppError> {
        if query_str.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        // A page starting past the last document is empty; this also bounds
        // the collector size below.
        let num_docs = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX);
        if offset >= num_docs {
            return Ok(Vec::new());
        }

        let field_queries = [
            (self.fields.street, BOOST_STREET),
            (self.fields.barrier_type, BOOST_BARRIER_TYPE),
            (self.fields.description, BOOST_DESCRIPTION),
            (self.fields.extra_info, BOOST_EXTRA_INFO),
            (self.fields.comments, BOOST_COMMENTS),
        ];

        let mut subqueries: Vec<(Occur, Box<dyn tantivy::query::Query>)> = Vec::new();
        for (field, boost) in field_queries {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            if let Ok(field_query) = field_parser.parse_query(query_str) {
                subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
            }
        }

        let combined_query: Box<dyn tantivy::query::Query> = if subqueries.is_empty() {
            let query_parser = QueryParser::for_index(
                &self.index,
                field_queries.iter().map(|(field, _)| *field).collect(),
            );
            query_parser
                .parse_query(query_str)
                .map_err(|e| AppError::Search(format!("Invalid search query: {}", e)))?
        } else {
            Box::new(BooleanQuery::new(subqueries))
        };

        let window = limit.saturating_add(offset).min(num_docs);
        let top_docs = searcher
            .search(&combined_query, &TopDocs::with_limit(window))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let results = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let report_id = doc.get_first(self.fields.report_id)?.as_str()?.to_string();
                Some(SearchResult { report_id, score })
            })
            .collect();

        Ok(results)
    }

    fn create_document(&self, report: &Report) -> TantivyDocument {
        doc!(
            self.fields.report_id => report.id.clone(),
            self.fields.street => report.street.clone(),
            self.fields.description => report.description.clone(),
            self.fields.extra_info => report.extra_info.clone().unwrap_or_default(),
            self.fields.barrier_type => report.barrier_type.map(|t| t.as_str()).unwrap_or_default().to_string(),
            self.fields.comments => report.comments.join("\n")
        )
    }
}
