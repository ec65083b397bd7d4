use super::{CorpusStore, NewDocument};
use crate::error::{AnalyticsError, Result};
use crate::{Collection, CollectionId, DocId, Document, DocumentRef, UserId, WordStat, DEFAULT_COLLECTION};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

#[derive(Default)]
struct Arena {
    next_id: u64,
    documents: BTreeMap<DocId, Document>,
    stats: HashMap<DocId, Vec<WordStat>>,
    collections: BTreeMap<CollectionId, Collection>,
    defaults: HashMap<UserId, CollectionId>,
    /// (collection, document) pairs; neither side owns the other.
    members: BTreeSet<(CollectionId, DocId)>,
}

impl Arena {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn owned_document(&self, user: UserId, doc: DocId) -> Result<&Document> {
        self.documents
            .get(&doc)
            .filter(|d| d.user_id == user)
            .ok_or_else(|| AnalyticsError::document(doc))
    }

    fn owned_collection(&self, user: UserId, collection: CollectionId) -> Result<&Collection> {
        self.collections
            .get(&collection)
            .filter(|c| c.user_id == user)
            .ok_or_else(|| AnalyticsError::collection(collection))
    }

    fn default_collection(&mut self, user: UserId) -> Result<Collection> {
        if let Some(id) = self.defaults.get(&user).copied() {
            return self.owned_collection(user, id).cloned();
        }
        let id = self.allocate();
        let collection = Collection { id, user_id: user, name: DEFAULT_COLLECTION.to_string(), description: None };
        self.collections.insert(id, collection.clone());
        self.defaults.insert(user, id);
        Ok(collection)
    }

    fn remove_document(&mut self, doc: DocId) {
        self.documents.remove(&doc);
        self.stats.remove(&doc);
        self.members.retain(|&(_, d)| d != doc);
    }
}

/// Single-process store keeping every row in memory behind one lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Arena>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CorpusStore for MemoryStore {
    fn count_documents(&self, user: UserId) -> Result<u64> {
        let arena = self.inner.read();
        Ok(arena.documents.values().filter(|d| d.user_id == user).count() as u64)
    }

    fn count_documents_containing(&self, user: UserId, words: &[String]) -> Result<HashMap<String, u64>> {
        let arena = self.inner.read();
        let mut counts: HashMap<String, u64> = words.iter().map(|w| (w.clone(), 0)).collect();
        for doc in arena.documents.values().filter(|d| d.user_id == user) {
            let Some(stats) = arena.stats.get(&doc.id) else { continue };
            let words: HashSet<&str> = stats.iter().map(|s| s.word.as_str()).collect();
            for word in words {
                if let Some(n) = counts.get_mut(word) {
                    *n += 1;
                }
            }
        }
        Ok(counts)
    }

    fn persist_document(&self, user: UserId, new: NewDocument) -> Result<DocId> {
        let mut arena = self.inner.write();
        for &collection in &new.collections {
            arena.owned_collection(user, collection)?;
        }
        let mut joined = new.collections;
        if new.join_default {
            joined.push(arena.default_collection(user)?.id);
        }
        let id = arena.allocate();
        arena.documents.insert(
            id,
            Document {
                id,
                user_id: user,
                name: new.name,
                content: new.content,
                unique_words: new.unique_words,
                created_at: crate::now_rfc3339(),
            },
        );
        arena.stats.insert(id, new.stats);
        for collection in joined {
            arena.members.insert((collection, id));
        }
        Ok(id)
    }

    fn get_document(&self, user: UserId, doc: DocId) -> Result<Document> {
        self.inner.read().owned_document(user, doc).cloned()
    }

    fn list_documents(&self, user: UserId) -> Result<Vec<DocumentRef>> {
        let arena = self.inner.read();
        Ok(arena.documents.values().filter(|d| d.user_id == user).map(Document::to_ref).collect())
    }

    fn list_word_stats(&self, doc: DocId) -> Result<Vec<WordStat>> {
        Ok(self.inner.read().stats.get(&doc).cloned().unwrap_or_default())
    }

    fn delete_document(&self, user: UserId, doc: DocId) -> Result<()> {
        let mut arena = self.inner.write();
        arena.owned_document(user, doc)?;
        arena.remove_document(doc);
        Ok(())
    }

    fn create_collection(&self, user: UserId, name: &str, description: Option<&str>) -> Result<Collection> {
        let mut arena = self.inner.write();
        let id = arena.allocate();
        let collection = Collection {
            id,
            user_id: user,
            name: name.to_string(),
            description: description.map(str::to_string),
        };
        arena.collections.insert(id, collection.clone());
        Ok(collection)
    }

    fn default_collection(&self, user: UserId) -> Result<Collection> {
        self.inner.write().default_collection(user)
    }

    fn get_collection(&self, user: UserId, collection: CollectionId) -> Result<Collection> {
        self.inner.read().owned_collection(user, collection).cloned()
    }

    fn list_collections(&self, user: UserId) -> Result<Vec<Collection>> {
        let arena = self.inner.read();
        Ok(arena.collections.values().filter(|c| c.user_id == user).cloned().collect())
    }

    fn list_documents_in_collection(&self, collection: CollectionId) -> Result<Vec<DocumentRef>> {
        let arena = self.inner.read();
        Ok(arena
            .members
            .range((collection, DocId::MIN)..=(collection, DocId::MAX))
            .filter_map(|(_, doc)| arena.documents.get(doc))
            .map(Document::to_ref)
            .collect())
    }

    fn add_to_collection(&self, user: UserId, collection: CollectionId, doc: DocId) -> Result<()> {
        let mut arena = self.inner.write();
        arena.owned_collection(user, collection)?;
        arena.owned_document(user, doc)?;
        arena.members.insert((collection, doc));
        Ok(())
    }

    fn remove_from_collection(&self, user: UserId, collection: CollectionId, doc: DocId) -> Result<()> {
        let mut arena = self.inner.write();
        arena.owned_collection(user, collection)?;
        arena.members.remove(&(collection, doc));
        Ok(())
    }

    fn delete_user(&self, user: UserId) -> Result<()> {
        let mut arena = self.inner.write();
        let docs: Vec<DocId> = arena.documents.values().filter(|d| d.user_id == user).map(|d| d.id).collect();
        for doc in docs {
            arena.remove_document(doc);
        }
        let collections: Vec<CollectionId> =
            arena.collections.values().filter(|c| c.user_id == user).map(|c| c.id).collect();
        for collection in collections {
            arena.collections.remove(&collection);
            arena.members.retain(|&(c, _)| c != collection);
        }
        arena.defaults.remove(&user);
        Ok(())
    }
}
