//! Tantivy-based search index module.
//!
//! Full-text search over published blog posts and notices with field boosting.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::{BlogPost, Notice};
use crate::store::ContentStore;

/// Field boosts.
const BOOST_TITLE: f32 = 10.0;
const BOOST_EXCERPT: f32 = 7.0;
const BOOST_CONTENT: f32 = 4.0;
const BOOST_CATEGORY: f32 = 2.5;

/// Upper bound on results per query.
pub const MAX_SEARCH_LIMIT: usize = 100;

/// Deepest page a query may start at.
pub const MAX_SEARCH_OFFSET: usize = 1_000;

/// Kind of record a hit points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Blog,
    Notice,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Blog => "blog",
            SearchKind::Notice => "notice",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "blog" => Some(SearchKind::Blog),
            "notice" => Some(SearchKind::Notice),
            _ => None,
        }
    }
}

/// Search hit with relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub kind: SearchKind,
    pub id: String,
    pub score: f32,
}

/// Search index schema fields.
struct SearchFields {
    doc_id: Field,
    kind: Field,
    title: Field,
    excerpt: Field,
    content: Field,
    category: Field,
}

/// Tantivy search index for blogs and notices.
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
        let doc_id = schema_builder.add_text_field("doc_id", STRING | STORED);
        let kind = schema_builder.add_text_field("kind", STRING | STORED);
        let title = schema_builder.add_text_field("title", TEXT);
        let excerpt = schema_builder.add_text_field("excerpt", TEXT);
        let content = schema_builder.add_text_field("content", TEXT);
        let category = schema_builder.add_text_field("category", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            doc_id,
            kind,
            title,
            excerpt,
            content,
            category,
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
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index. Unpublished posts are left out.
    #[cfg(test)]
    pub async fn rebuild(&self, blogs: &[BlogPost], notices: &[Notice]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;
        self.write_all(&mut writer, blogs, notices)
    }

    /// Rebuild from the store's current content.
    ///
    /// The content is read while the writer lock is held, so the last
    /// rebuild to commit always indexes the newest state.
    pub async fn rebuild_from(&self, store: &ContentStore) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;
        let (blogs, notices) = store
            .read(|c| (c.blogs.clone(), c.notices.clone()))
            .await;
        self.write_all(&mut writer, &blogs, &notices)
    }

    fn write_all(
        &self,
        writer: &mut IndexWriter,
        blogs: &[BlogPost],
        notices: &[Notice],
    ) -> Result<(), AppError> {
        writer.delete_all_documents()?;

        let mut indexed = 0;
        for blog in blogs.iter().filter(|b| b.published) {
            writer.add_document(doc!(
                self.fields.doc_id => blog.id.clone(),
                self.fields.kind => SearchKind::Blog.as_str(),
                self.fields.title => blog.title.clone(),
                self.fields.excerpt => blog.excerpt.clone(),
                self.fields.content => blog.content.clone(),
                self.fields.category => blog.category.clone()
            ))?;
            indexed += 1;
        }
        for notice in notices {
            writer.add_document(doc!(
                self.fields.doc_id => notice.id.clone(),
                self.fields.kind => SearchKind::Notice.as_str(),
                self.fields.title => notice.title.clone(),
                self.fields.content => notice.content.clone(),
                self.fields.category => notice.category.clone()
            ))?;
            indexed += 1;
        }

        writer.commit()?;
        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} documents", indexed);
        Ok(())
    }

    /// Search blogs and notices. `limit` is capped at [`MAX_SEARCH_LIMIT`];
    /// an `offset` past [`MAX_SEARCH_OFFSET`] is a validation error.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SearchResult>, AppError> {
        if offset > MAX_SEARCH_OFFSET {
            return Err(AppError::Validation(format!(
                "offset must be at most {}",
                MAX_SEARCH_OFFSET
            )));
        }
        let limit = limit.min(MAX_SEARCH_LIMIT);
        if limit == 0 || query_str.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        let query_parser = QueryParser::for_index(
            &self.index,
            vec![
                self.fields.title,
                self.fields.excerpt,
                self.fields.content,
                self.fields.category,
            ],
        );
        let base_query = query_parser
            .parse_query(query_str)
            .map_err(|e| AppError::Search(format!("Invalid search query: {}", e)))?;

        let mut subqueries: Vec<(Occur, Box<dyn tantivy::query::Query>)> = Vec::new();
        let field_queries = [
            (self.fields.title, BOOST_TITLE),
            (self.fields.excerpt, BOOST_EXCERPT),
            (self.fields.content, BOOST_CONTENT),
            (self.fields.category, BOOST_CATEGORY),
        ];
        for (field, boost) in field_queries {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            if let Ok(field_query) = field_parser.parse_query(query_str) {
                subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
            }
        }

        let combined_query = if subqueries.is_empty() {
            base_query
        } else {
            Box::new(BooleanQuery::new(subqueries))
        };

        let top_docs = searcher
            .search(&combined_query, &TopDocs::with_limit(offset + limit))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let results = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let id = doc.get_first(self.fields.doc_id)?.as_str()?.to_string();
                let kind = SearchKind::from_name(doc.get_first(self.fields.kind)?.as_str()?)?;
                Some(SearchResult { kind, id, score })
            })
            .collect();

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn blog(id: &str, title: &str, excerpt: &str, published: bool) -> BlogPost {
        BlogPost {
            id: id.to_string(),
            title: title.to_string(),
            excerpt: excerpt.to_string(),
            content: String::new(),
            image: String::new(),
            author: "Admin".to_string(),
            category: "Events".to_string(),
            date: "2026-01-01".to_string(),
            published,
            comments: Vec::new(),
        }
    }

    fn notice(id: &str, title: &str, content: &str) -> Notice {
        Notice {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            category: "Exam".to_string(),
            date: "2026-01-01".to_string(),
            is_latest: false,
            is_pinned: false,
        }
    }

    #[tokio::test]
    async fn test_search_blogs_and_notices() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        let blogs = vec![
            blog("b1", "Science fair winners", "Projects on display", true),
            blog("b2", "Science draft", "Not ready", false),
        ];
        let notices = vec![notice("n1", "Holiday", "No classes during the science week")];
        index.rebuild(&blogs, &notices).await.unwrap();

        let results = index.search("science", 10, 0).unwrap();
        let hits: Vec<_> = results.iter().map(|r| (r.kind, r.id.as_str())).collect();

        assert_eq!(hits.len(), 2);
        // Title match outranks a body match
        assert_eq!(hits[0], (SearchKind::Blog, "b1"));
        assert!(hits.contains(&(SearchKind::Notice, "n1")));
    }

    #[tokio::test]
    async fn test_rebuild_replaces_documents() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        index
            .rebuild(&[], &[notice("n1", "Sports day", "")])
            .await
            .unwrap();
        index
            .rebuild(&[], &[notice("n2", "Parents meeting", "")])
            .await
            .unwrap();

        assert!(index.search("sports", 10, 0).unwrap().is_empty());
        assert_eq!(index.search("parents", 10, 0).unwrap()[0].id, "n2");
    }

    #[tokio::test]
    async fn test_search_zero_limit_and_deep_offset() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();
        index
            .rebuild(&[blog("b1", "Science fair", "", true)], &[])
            .await
            .unwrap();

        assert!(index.search("science", 0, 0).unwrap().is_empty());
        assert!(index.search("science", 20, MAX_SEARCH_OFFSET).unwrap().is_empty());
        assert!(matches!(
            index.search("science", 20, usize::MAX),
            Err(AppError::Validation(_))
        ));
        assert_eq!(index.search("science", 20, 0).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rebuild_from_store() {
        let temp_dir = TempDir::new().unwrap();
        let pool = crate::db::init_database(&temp_dir.path().join("site.db"))
            .await
            .unwrap();
        let store = ContentStore::open(
            crate::db::Repository::new(pool),
            "school_site_data".to_string(),
            None,
        )
        .await;
        let index = SearchIndex::open(&temp_dir.path().join("index")).unwrap();

        store
            .add_notice(crate::models::CreateNoticeRequest {
                title: "Quidditch trials".to_string(),
                content: String::new(),
                category: "Sports".to_string(),
                is_pinned: false,
                is_latest: false,
            })
            .await
            .unwrap();
        index.rebuild_from(&store).await.unwrap();

        let hits = index.search("quidditch", 10, 0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, SearchKind::Notice);
    }

    #[tokio::test]
    async fn test_search_empty_query() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        assert!(index.search("", 10, 0).unwrap().is_empty());
        assert!(index.search("   ", 10, 0).unwrap().is_empty());
    }
}
