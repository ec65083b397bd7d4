//! Document-store collaborator consumed by the analytics engine.
//!
//! Every user-scoped call answers `NotFound` for rows that exist but belong to someone
//! else, so one user cannot discover another user's rows.

use crate::error::Result;
use crate::{Collection, CollectionId, DocId, Document, DocumentRef, UserId, WordStat};
use std::collections::HashMap;

pub mod memory;

/// A document and everything that must become visible together with it.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub name: String,
    pub content: String,
    pub unique_words: u32,
    pub stats: Vec<WordStat>,
    /// Collections (owned by the same user) the document joins on creation.
    pub collections: Vec<CollectionId>,
    /// Also join the user's default collection, creating it in the same write.
    pub join_default: bool,
}

pub trait CorpusStore: Send + Sync {
    fn count_documents(&self, user: UserId) -> Result<u64>;

    /// For each word, the number of distinct documents of `user` whose statistics contain it.
    fn count_documents_containing(&self, user: UserId, words: &[String]) -> Result<HashMap<String, u64>>;

    /// Atomically store the document, its statistics and its memberships.
    ///
    /// Nothing is written when any listed collection is missing or foreign, including the
    /// default collection requested through `join_default`.
    fn persist_document(&self, user: UserId, doc: NewDocument) -> Result<DocId>;

    fn get_document(&self, user: UserId, doc: DocId) -> Result<Document>;

    fn list_documents(&self, user: UserId) -> Result<Vec<DocumentRef>>;

    fn list_word_stats(&self, doc: DocId) -> Result<Vec<WordStat>>;

    /// Remove the document with its statistics and memberships.
    fn delete_document(&self, user: UserId, doc: DocId) -> Result<()>;

    fn create_collection(&self, user: UserId, name: &str, description: Option<&str>) -> Result<Collection>;

    /// Fetch the user's default collection, creating it on first use.
    fn default_collection(&self, user: UserId) -> Result<Collection>;

    fn get_collection(&self, user: UserId, collection: CollectionId) -> Result<Collection>;

    fn list_collections(&self, user: UserId) -> Result<Vec<Collection>>;

    fn list_documents_in_collection(&self, collection: CollectionId) -> Result<Vec<DocumentRef>>;

    /// Idempotent: adding a member twice keeps a single membership.
    fn add_to_collection(&self, user: UserId, collection: CollectionId, doc: DocId) -> Result<()>;

    /// Drops the membership only; the document stays.
    fn remove_from_collection(&self, user: UserId, collection: CollectionId, doc: DocId) -> Result<()>;

    /// Remove every document, statistic and collection owned by `user`.
    fn delete_user(&self, user: UserId) -> Result<()>;
}
