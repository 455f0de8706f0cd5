//! Storage collaborator abstraction.
//!
//! Proximity search only needs four things from a document store: equality
//! filters on named fields, ordering by one field, inclusive range selection
//! on that ordering and asynchronous retrieval of the matching rows.
//! [`RangeStore`] captures exactly that, and [`MemoryStore`] implements it in
//! memory for tests and embedding.

use crate::error::{NearbyError, Result};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

/// A raw stored row: identity plus loosely typed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Build a document from a JSON object.
    pub fn from_value(id: impl Into<String>, value: Value) -> Result<Self> {
        match value {
            Value::Object(data) => Ok(Self::new(id, data)),
            other => Err(NearbyError::InvalidInput(format!(
                "Document body must be a JSON object, got: {}",
                other
            ))),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}

/// Equality predicate on one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        doc.get(&self.field) == Some(&self.value)
    }
}

/// A filtered, ordered, inclusive range selection over one collection.
///
/// ```rust
/// use nearby::store::RangeQuery;
///
/// let query = RangeQuery::new("businesses")
///     .where_eq("state", true)
///     .order_by("geohash")
///     .start_at("d6n")
///     .end_at("d6p");
/// assert_eq!(query.filters.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    pub collection: String,
    pub filters: Vec<FieldFilter>,
    pub order_by: String,
    pub start_at: String,
    pub end_at: String,
}

impl RangeQuery {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: String::new(),
            start_at: String::new(),
            end_at: String::new(),
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter::equals(field, value));
        self
    }

    pub fn with_filters(mut self, filters: impl IntoIterator<Item = FieldFilter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = field.into();
        self
    }

    pub fn start_at(mut self, low: impl Into<String>) -> Self {
        self.start_at = low.into();
        self
    }

    pub fn end_at(mut self, high: impl Into<String>) -> Self {
        self.end_at = high.into();
        self
    }

    /// Whether a document falls inside this selection.
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(Value::String(key)) = doc.get(&self.order_by) else {
            return false;
        };
        key.as_str() >= self.start_at.as_str()
            && key.as_str() <= self.end_at.as_str()
            && self.filters.iter().all(|filter| filter.matches(doc))
    }
}

/// A document store that can answer range queries.
///
/// Implementations are shared between concurrent searches and must be safe to
/// call from many tasks at once. Searches never write through this trait.
pub trait RangeStore: Send + Sync {
    /// Rows matching `query`, ordered by `query.order_by`.
    fn range_query(&self, query: &RangeQuery)
    -> impl Future<Output = Result<Vec<Document>>> + Send;
}

/// Store statistics
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    /// Number of collections holding at least one document
    pub collection_count: usize,
    /// Total number of documents across collections
    pub document_count: usize,
    /// Number of range queries served
    pub range_queries: u64,
}

/// In-memory store keyed by collection, then document id.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<FxHashMap<String, BTreeMap<String, Document>>>,
    range_queries: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document.
    pub fn insert(&self, collection: &str, doc: Document) -> Option<Document> {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(doc.id.clone(), doc)
    }

    /// Insert a document under a freshly generated id and return the id.
    pub fn add(&self, collection: &str, data: Map<String, Value>) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.insert(collection, Document::new(id.clone(), data));
        id
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Document> {
        self.collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id).cloned())
    }

    pub fn remove(&self, collection: &str, id: &str) -> Option<Document> {
        let mut collections = self.collections.write();
        let docs = collections.get_mut(collection)?;
        let removed = docs.remove(id);
        if docs.is_empty() {
            collections.remove(collection);
        }
        removed
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    pub fn stats(&self) -> StoreStats {
        let collections = self.collections.read();
        StoreStats {
            collection_count: collections.len(),
            document_count: collections.values().map(BTreeMap::len).sum(),
            range_queries: self.range_queries.load(Ordering::Relaxed),
        }
    }

    fn scan(&self, query: &RangeQuery) -> Vec<Document> {
        self.range_queries.fetch_add(1, Ordering::Relaxed);

        let collections = self.collections.read();
        let Some(docs) = collections.get(&query.collection) else {
            return Vec::new();
        };

        let mut rows: Vec<Document> = docs
            .values()
            .filter(|doc| query.matches(doc))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            let ka = a.get(&query.order_by).and_then(Value::as_str);
            let kb = b.get(&query.order_by).and_then(Value::as_str);
            ka.cmp(&kb).then_with(|| a.id.cmp(&b.id))
        });
        rows
    }
}

impl RangeStore for MemoryStore {
    async fn range_query(&self, query: &RangeQuery) -> Result<Vec<Document>> {
        if query.order_by.is_empty() {
            return Err(NearbyError::Storage(
                "range query without an ordering field".to_string(),
            ));
        }
        Ok(self.scan(query))
    }
}
