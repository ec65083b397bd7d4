use crate::aggregate::collection_statistics;
use crate::config::AnalyzerConfig;
use crate::error::Result;
use crate::huffman::{self, Encoded};
use crate::idf::inverse_document_frequency;
use crate::select::select_words;
use crate::store::{CorpusStore, NewDocument};
use crate::tf::term_frequency;
use crate::tokenizer::{decode, tokenize};
use crate::{CollectionId, DocId, UserId, WordStat};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReport {
    pub document_id: DocId,
    /// Distinct words in the upload, before selection.
    pub unique_words: u32,
    pub selected: Vec<WordStat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedDocument {
    pub document_id: DocId,
    /// Size of the raw UTF-8 content in bits.
    pub original_bits: usize,
    pub encoded: Encoded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_uploads: u64,
    /// Distinct words of the most recent upload.
    pub unique_words: u32,
    pub collections: u64,
}

/// Entry point for application code: ties the text pipeline to a corpus store.
pub struct Analyzer<S> {
    store: S,
    config: AnalyzerConfig,
    encodings: Vec<&'static Encoding>,
}

impl<S: CorpusStore> Analyzer<S> {
    pub fn new(store: S, config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        let encodings = config.resolve_encodings()?;
        Ok(Self { store, config, encodings })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Score an upload against the user's corpus and persist the rarest words.
    ///
    /// Nothing is written unless the bytes decode to at least one word. IDF is taken
    /// against the corpus as committed before this upload.
    pub fn analyze_upload(&self, user: UserId, name: &str, bytes: &[u8]) -> Result<UploadReport> {
        let text = decode(bytes, &self.encodings, self.config.lossy_fallback)?;
        let tokens = tokenize(&text)?;
        let tf = term_frequency(&tokens)?;
        let words: Vec<String> = tf.keys().cloned().collect();
        let idf = inverse_document_frequency(&self.store, user, &words)?;

        let selected: Vec<WordStat> = select_words(&tf, &idf, self.config.selection_limit)
            .into_iter()
            .map(|word| WordStat {
                tf: tf.get(&word).copied().unwrap_or(0.0),
                idf: idf.get(&word).copied().unwrap_or(0.0),
                word,
            })
            .collect();

        let unique_words = tf.len() as u32;
        let document_id = self.store.persist_document(
            user,
            NewDocument {
                name: name.to_string(),
                content: text,
                unique_words,
                stats: selected.clone(),
                collections: vec![],
                join_default: true,
            },
        )?;
        tracing::info!(user, doc = document_id, tokens = tokens.len(), unique_words, kept = selected.len(), "analyzed upload");
        Ok(UploadReport { document_id, unique_words, selected })
    }

    pub fn document_statistics(&self, user: UserId, doc: DocId) -> Result<Vec<WordStat>> {
        self.store.get_document(user, doc)?;
        self.store.list_word_stats(doc)
    }

    pub fn collection_statistics(&self, user: UserId, collection: CollectionId) -> Result<Vec<WordStat>> {
        collection_statistics(&self.store, user, collection)
    }

    pub fn encode_document(&self, user: UserId, doc: DocId) -> Result<EncodedDocument> {
        let document = self.store.get_document(user, doc)?;
        let encoded = huffman::encode(&document.content);
        tracing::debug!(user, doc, symbols = encoded.table.len(), bits = encoded.encoded_bits(), "encoded document");
        Ok(EncodedDocument { document_id: doc, original_bits: document.content.len() * 8, encoded })
    }

    pub fn delete_document(&self, user: UserId, doc: DocId) -> Result<()> {
        self.store.delete_document(user, doc)?;
        tracing::info!(user, doc, "deleted document");
        Ok(())
    }

    pub fn metrics(&self, user: UserId) -> Result<Metrics> {
        let documents = self.store.list_documents(user)?;
        let unique_words = match documents.iter().map(|d| d.id).max() {
            Some(latest) => self.store.get_document(user, latest)?.unique_words,
            None => 0,
        };
        Ok(Metrics {
            total_uploads: documents.len() as u64,
            unique_words,
            collections: self.store.list_collections(user)?.len() as u64,
        })
    }
}
