use serde::{Deserialize, Serialize};

pub mod aggregate;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod huffman;
pub mod idf;
pub mod persist;
pub mod select;
pub mod store;
pub mod tf;
pub mod tokenizer;

pub use analyzer::{Analyzer, EncodedDocument, Metrics, UploadReport};
pub use config::AnalyzerConfig;
pub use error::{AnalyticsError, Result};
pub use persist::SledStore;
pub use store::{memory::MemoryStore, CorpusStore, NewDocument};

pub type UserId = u64;
pub type DocId = u64;
pub type CollectionId = u64;

/// Name reserved per user for the collection every upload lands in.
pub const DEFAULT_COLLECTION: &str = "default";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub user_id: UserId,
    pub name: String,
    pub content: String,
    pub unique_words: u32,
    /// RFC 3339 timestamp of the upload.
    pub created_at: String,
}

impl Document {
    pub fn to_ref(&self) -> DocumentRef {
        DocumentRef { id: self.id, name: self.name.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: DocId,
    pub name: String,
}

/// Persisted statistic for one word of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordStat {
    pub word: String,
    pub tf: f64,
    pub idf: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
}

pub(crate) fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "".into())
}
