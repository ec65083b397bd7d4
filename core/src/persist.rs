//! Durable corpus store on sled trees.
//!
//! Keys are big-endian ids so prefix scans group rows by owner:
//!
//! | tree                   | key                        | value        |
//! |------------------------|----------------------------|--------------|
//! | `documents`            | doc                        | `Document`   |
//! | `user_documents`       | user, doc                  |              |
//! | `word_stats`           | doc, rank                  | `WordStat`   |
//! | `postings`             | user, word, `0x00`, doc    |              |
//! | `collections`          | collection                 | `Collection` |
//! | `user_collections`     | user, collection           |              |
//! | `default_collections`  | user                       | collection   |
//! | `members`              | collection, doc            |              |
//! | `document_collections` | doc                        | sorted ids   |
//!
//! Values are bincode. A document's membership list is only read and written inside the
//! transactions that touch its `members` rows, so the two trees never disagree.

use crate::error::{AnalyticsError, Result};
use crate::store::{CorpusStore, NewDocument};
use crate::{Collection, CollectionId, DocId, Document, DocumentRef, UserId, WordStat, DEFAULT_COLLECTION};
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError, TransactionalTree,
};
use sled::{IVec, Transactional, Tree};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

const EMPTY: &[u8] = &[];

fn pair_key(a: u64, b: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&a.to_be_bytes());
    key[8..].copy_from_slice(&b.to_be_bytes());
    key
}

fn posting_prefix(user: UserId, word: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + word.len() + 1 + 8);
    key.extend_from_slice(&user.to_be_bytes());
    key.extend_from_slice(word.as_bytes());
    key.push(0);
    key
}

fn posting_key(user: UserId, word: &str, doc: DocId) -> Vec<u8> {
    let mut key = posting_prefix(user, word);
    key.extend_from_slice(&doc.to_be_bytes());
    key
}

fn read_u64(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| AnalyticsError::Store(format!("malformed id of {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

/// Id stored in the last eight bytes of a composite key.
fn tail_id(key: &[u8]) -> Result<u64> {
    read_u64(&key[key.len().saturating_sub(8)..])
}

fn decode_ids(bytes: Option<IVec>) -> Result<Vec<u64>> {
    match bytes {
        Some(bytes) => Ok(bincode::deserialize(&bytes)?),
        None => Ok(Vec::new()),
    }
}

fn encode_ids(ids: &[u64]) -> Result<Vec<u8>> {
    Ok(bincode::serialize(ids)?)
}

fn in_tx<T>(result: Result<T>) -> ConflictableTransactionResult<T, AnalyticsError> {
    result.map_err(ConflictableTransactionError::Abort)
}

fn owned_in_tx(
    collections: &TransactionalTree,
    user: UserId,
    collection: CollectionId,
) -> ConflictableTransactionResult<(), AnalyticsError> {
    let owner = match collections.get(&collection.to_be_bytes()[..])? {
        Some(bytes) => Some(in_tx(bincode::deserialize::<Collection>(&bytes).map_err(AnalyticsError::from))?.user_id),
        None => None,
    };
    if owner == Some(user) {
        Ok(())
    } else {
        Err(ConflictableTransactionError::Abort(AnalyticsError::collection(collection)))
    }
}

/// Resolve the user's default collection, inserting `fresh` when there is none yet.
fn default_in_tx(
    defaults: &TransactionalTree,
    collections: &TransactionalTree,
    owned: &TransactionalTree,
    user: UserId,
    fresh: &(Collection, Vec<u8>),
) -> ConflictableTransactionResult<CollectionId, AnalyticsError> {
    let key = user.to_be_bytes();
    if let Some(existing) = defaults.get(&key[..])? {
        return in_tx(read_u64(&existing));
    }
    let (collection, bytes) = fresh;
    defaults.insert(&key[..], &collection.id.to_be_bytes()[..])?;
    collections.insert(&collection.id.to_be_bytes()[..], bytes.as_slice())?;
    owned.insert(&pair_key(user, collection.id)[..], EMPTY)?;
    Ok(collection.id)
}

/// Drop `collection` from the document's membership list.
fn leave_in_tx(
    doc_collections: &TransactionalTree,
    doc: DocId,
    collection: CollectionId,
) -> ConflictableTransactionResult<(), AnalyticsError> {
    let key = doc.to_be_bytes();
    if let Some(bytes) = doc_collections.get(&key[..])? {
        let mut joined = in_tx(decode_ids(Some(bytes)))?;
        joined.retain(|&c| c != collection);
        doc_collections.insert(&key[..], in_tx(encode_ids(&joined))?)?;
    }
    Ok(())
}

fn abort(err: TransactionError<AnalyticsError>) -> AnalyticsError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => e.into(),
    }
}

pub struct SledStore {
    documents: Tree,
    user_documents: Tree,
    word_stats: Tree,
    postings: Tree,
    collections: Tree,
    user_collections: Tree,
    defaults: Tree,
    members: Tree,
    document_collections: Tree,
    db: sled::Db,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_db(sled::open(path)?)
    }

    /// Store removed from disk when dropped.
    pub fn temporary() -> Result<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        Ok(Self {
            documents: db.open_tree("documents")?,
            user_documents: db.open_tree("user_documents")?,
            word_stats: db.open_tree("word_stats")?,
            postings: db.open_tree("postings")?,
            collections: db.open_tree("collections")?,
            user_collections: db.open_tree("user_collections")?,
            defaults: db.open_tree("default_collections")?,
            members: db.open_tree("members")?,
            document_collections: db.open_tree("document_collections")?,
            db,
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    fn next_id(&self) -> Result<u64> {
        Ok(self.db.generate_id()? + 1)
    }

    fn load_document(&self, doc: DocId) -> Result<Option<Document>> {
        match self.documents.get(doc.to_be_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn load_collection(&self, collection: CollectionId) -> Result<Option<Collection>> {
        match self.collections.get(collection.to_be_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn fresh_default(&self, user: UserId) -> Result<(Collection, Vec<u8>)> {
        let collection = Collection {
            id: self.next_id()?,
            user_id: user,
            name: DEFAULT_COLLECTION.to_string(),
            description: None,
        };
        let bytes = bincode::serialize(&collection)?;
        Ok((collection, bytes))
    }

    fn ids_under(tree: &Tree, prefix: u64) -> Result<Vec<u64>> {
        let mut ids = Vec::new();
        for item in tree.scan_prefix(prefix.to_be_bytes()) {
            let (key, _) = item?;
            ids.push(tail_id(&key)?);
        }
        Ok(ids)
    }

    fn drop_collection(&self, user: UserId, collection: CollectionId) -> Result<()> {
        let docs = Self::ids_under(&self.members, collection)?;
        (&self.collections, &self.user_collections, &self.members, &self.document_collections)
            .transaction(|(collections, owned, members, doc_collections)| -> ConflictableTransactionResult<(), AnalyticsError> {
                collections.remove(&collection.to_be_bytes()[..])?;
                owned.remove(&pair_key(user, collection)[..])?;
                for &doc in &docs {
                    members.remove(&pair_key(collection, doc)[..])?;
                    leave_in_tx(doc_collections, doc, collection)?;
                }
                Ok(())
            })
            .map_err(abort)
    }
}

impl CorpusStore for SledStore {
    fn count_documents(&self, user: UserId) -> Result<u64> {
        let mut n = 0;
        for item in self.user_documents.scan_prefix(user.to_be_bytes()) {
            item?;
            n += 1;
        }
        Ok(n)
    }

    fn count_documents_containing(&self, user: UserId, words: &[String]) -> Result<HashMap<String, u64>> {
        let mut counts = HashMap::with_capacity(words.len());
        for word in words {
            let mut n = 0;
            for item in self.postings.scan_prefix(posting_prefix(user, word)) {
                item?;
                n += 1;
            }
            counts.insert(word.clone(), n);
        }
        Ok(counts)
    }

    fn persist_document(&self, user: UserId, new: NewDocument) -> Result<DocId> {
        let id = self.next_id()?;
        // only inserted when the user has no default collection yet
        let fresh_default = if new.join_default { Some(self.fresh_default(user)?) } else { None };
        let document = Document {
            id,
            user_id: user,
            name: new.name,
            content: new.content,
            unique_words: new.unique_words,
            created_at: crate::now_rfc3339(),
        };
        let doc_bytes = bincode::serialize(&document)?;
        let stat_rows = new
            .stats
            .iter()
            .enumerate()
            .map(|(rank, stat)| -> Result<([u8; 16], Vec<u8>)> { Ok((pair_key(id, rank as u64), bincode::serialize(stat)?)) })
            .collect::<Result<Vec<_>>>()?;
        let words: BTreeSet<&str> = new.stats.iter().map(|s| s.word.as_str()).collect();
        let posting_keys: Vec<Vec<u8>> = words.into_iter().map(|w| posting_key(user, w, id)).collect();

        let default = (
            &self.documents,
            &self.user_documents,
            &self.word_stats,
            &self.postings,
            &self.members,
            &self.document_collections,
            &self.defaults,
            &self.collections,
            &self.user_collections,
        )
            .transaction(
                |(documents, user_documents, word_stats, postings, members, doc_collections, defaults, collections, owned)|
                 -> ConflictableTransactionResult<Option<CollectionId>, AnalyticsError> {
                    for &collection in &new.collections {
                        owned_in_tx(collections, user, collection)?;
                    }
                    let default = match &fresh_default {
                        Some(fresh) => Some(default_in_tx(defaults, collections, owned, user, fresh)?),
                        None => None,
                    };
                    let mut joined = new.collections.clone();
                    joined.extend(default);
                    joined.sort_unstable();
                    joined.dedup();

                    documents.insert(&id.to_be_bytes()[..], doc_bytes.as_slice())?;
                    user_documents.insert(&pair_key(user, id)[..], EMPTY)?;
                    for (key, value) in &stat_rows {
                        word_stats.insert(&key[..], value.as_slice())?;
                    }
                    for key in &posting_keys {
                        postings.insert(key.as_slice(), EMPTY)?;
                    }
                    for &collection in &joined {
                        members.insert(&pair_key(collection, id)[..], EMPTY)?;
                    }
                    doc_collections.insert(&id.to_be_bytes()[..], in_tx(encode_ids(&joined))?)?;
                    Ok(default)
                },
            )
            .map_err(abort)?;
        if let (Some(default), Some((fresh, _))) = (default, &fresh_default) {
            if default == fresh.id {
                tracing::info!(user, collection = default, "created default collection");
            }
        }
        Ok(id)
    }

    fn get_document(&self, user: UserId, doc: DocId) -> Result<Document> {
        self.load_document(doc)?
            .filter(|d| d.user_id == user)
            .ok_or_else(|| AnalyticsError::document(doc))
    }

    fn list_documents(&self, user: UserId) -> Result<Vec<DocumentRef>> {
        let mut out = Vec::new();
        for doc in Self::ids_under(&self.user_documents, user)? {
            if let Some(document) = self.load_document(doc)? {
                out.push(document.to_ref());
            }
        }
        Ok(out)
    }

    fn list_word_stats(&self, doc: DocId) -> Result<Vec<WordStat>> {
        let mut stats = Vec::new();
        for item in self.word_stats.scan_prefix(doc.to_be_bytes()) {
            let (_, value) = item?;
            stats.push(bincode::deserialize(&value)?);
        }
        Ok(stats)
    }

    fn delete_document(&self, user: UserId, doc: DocId) -> Result<()> {
        self.get_document(user, doc)?;
        let mut stat_keys: Vec<Vec<u8>> = Vec::new();
        let mut posting_keys: Vec<Vec<u8>> = Vec::new();
        for item in self.word_stats.scan_prefix(doc.to_be_bytes()) {
            let (key, value) = item?;
            let stat: WordStat = bincode::deserialize(&value)?;
            stat_keys.push(key.to_vec());
            posting_keys.push(posting_key(user, &stat.word, doc));
        }

        (
            &self.documents,
            &self.user_documents,
            &self.word_stats,
            &self.postings,
            &self.members,
            &self.document_collections,
        )
            .transaction(
                |(documents, user_documents, word_stats, postings, members, doc_collections)| -> ConflictableTransactionResult<(), AnalyticsError> {
                    // a concurrent delete may have won since the ownership check
                    if documents.remove(&doc.to_be_bytes()[..])?.is_none() {
                        return Err(ConflictableTransactionError::Abort(AnalyticsError::document(doc)));
                    }
                    user_documents.remove(&pair_key(user, doc)[..])?;
                    for key in &stat_keys {
                        word_stats.remove(key.as_slice())?;
                    }
                    for key in &posting_keys {
                        postings.remove(key.as_slice())?;
                    }
                    let joined = in_tx(decode_ids(doc_collections.remove(&doc.to_be_bytes()[..])?))?;
                    for collection in joined {
                        members.remove(&pair_key(collection, doc)[..])?;
                    }
                    Ok(())
                },
            )
            .map_err(abort)
    }

    fn create_collection(&self, user: UserId, name: &str, description: Option<&str>) -> Result<Collection> {
        let collection = Collection {
            id: self.next_id()?,
            user_id: user,
            name: name.to_string(),
            description: description.map(str::to_string),
        };
        let bytes = bincode::serialize(&collection)?;
        (&self.collections, &self.user_collections)
            .transaction(|(collections, owned)| -> ConflictableTransactionResult<(), AnalyticsError> {
                collections.insert(&collection.id.to_be_bytes()[..], bytes.as_slice())?;
                owned.insert(&pair_key(user, collection.id)[..], EMPTY)?;
                Ok(())
            })
            .map_err(abort)?;
        Ok(collection)
    }

    fn default_collection(&self, user: UserId) -> Result<Collection> {
        let key = user.to_be_bytes();
        if let Some(existing) = self.defaults.get(key)? {
            return self.get_collection(user, read_u64(&existing)?);
        }
        let fresh = self.fresh_default(user)?;
        // another caller may have created it since the read above
        let id = (&self.defaults, &self.collections, &self.user_collections)
            .transaction(|(defaults, collections, owned)| default_in_tx(defaults, collections, owned, user, &fresh))
            .map_err(abort)?;
        if id == fresh.0.id {
            tracing::info!(user, collection = id, "created default collection");
            Ok(fresh.0)
        } else {
            self.get_collection(user, id)
        }
    }

    fn get_collection(&self, user: UserId, collection: CollectionId) -> Result<Collection> {
        self.load_collection(collection)?
            .filter(|c| c.user_id == user)
            .ok_or_else(|| AnalyticsError::collection(collection))
    }

    fn list_collections(&self, user: UserId) -> Result<Vec<Collection>> {
        let mut out = Vec::new();
        for id in Self::ids_under(&self.user_collections, user)? {
            if let Some(collection) = self.load_collection(id)? {
                out.push(collection);
            }
        }
        Ok(out)
    }

    fn list_documents_in_collection(&self, collection: CollectionId) -> Result<Vec<DocumentRef>> {
        let mut out = Vec::new();
        for doc in Self::ids_under(&self.members, collection)? {
            if let Some(document) = self.load_document(doc)? {
                out.push(document.to_ref());
            }
        }
        Ok(out)
    }

    fn add_to_collection(&self, user: UserId, collection: CollectionId, doc: DocId) -> Result<()> {
        self.get_collection(user, collection)?;
        self.get_document(user, doc)?;
        (&self.documents, &self.collections, &self.members, &self.document_collections)
            .transaction(|(documents, collections, members, doc_collections)| -> ConflictableTransactionResult<(), AnalyticsError> {
                let key = doc.to_be_bytes();
                // either side may have been deleted since the checks above
                if documents.get(&key[..])?.is_none() {
                    return Err(ConflictableTransactionError::Abort(AnalyticsError::document(doc)));
                }
                owned_in_tx(collections, user, collection)?;
                let mut joined = in_tx(decode_ids(doc_collections.get(&key[..])?))?;
                if let Err(pos) = joined.binary_search(&collection) {
                    joined.insert(pos, collection);
                    doc_collections.insert(&key[..], in_tx(encode_ids(&joined))?)?;
                }
                members.insert(&pair_key(collection, doc)[..], EMPTY)?;
                Ok(())
            })
            .map_err(abort)
    }

    fn remove_from_collection(&self, user: UserId, collection: CollectionId, doc: DocId) -> Result<()> {
        self.get_collection(user, collection)?;
        (&self.members, &self.document_collections)
            .transaction(|(members, doc_collections)| -> ConflictableTransactionResult<(), AnalyticsError> {
                members.remove(&pair_key(collection, doc)[..])?;
                leave_in_tx(doc_collections, doc, collection)
            })
            .map_err(abort)
    }

    fn delete_user(&self, user: UserId) -> Result<()> {
        for doc in Self::ids_under(&self.user_documents, user)? {
            self.delete_document(user, doc)?;
        }
        for collection in Self::ids_under(&self.user_collections, user)? {
            self.drop_collection(user, collection)?;
        }
        self.defaults.remove(user.to_be_bytes())?;
        Ok(())
    }
}
