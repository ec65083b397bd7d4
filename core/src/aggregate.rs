use crate::error::Result;
use crate::idf::inverse_document_frequency;
use crate::store::CorpusStore;
use crate::{CollectionId, UserId, WordStat};
use std::collections::BTreeMap;

const PRECISION: f64 = 1e6;

/// Round to six fractional digits, folding `-0.0` into `0.0`.
pub fn round6(value: f64) -> f64 {
    let rounded = (value * PRECISION).round() / PRECISION;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Sum term frequencies per word. The result is a raw sum, not renormalized.
pub fn merge_term_frequencies<I>(stats: I) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = WordStat>,
{
    let mut merged = BTreeMap::new();
    for stat in stats {
        *merged.entry(stat.word).or_insert(0.0) += stat.tf;
    }
    merged
}

/// Merged statistics of every document in the collection, highest IDF first.
///
/// IDF is recomputed against the owner's whole corpus as it stands now, not taken
/// from the stored rows.
pub fn collection_statistics<S>(store: &S, user: UserId, collection: CollectionId) -> Result<Vec<WordStat>>
where
    S: CorpusStore + ?Sized,
{
    let collection = store.get_collection(user, collection)?;
    let mut rows = Vec::new();
    for doc in store.list_documents_in_collection(collection.id)? {
        rows.extend(store.list_word_stats(doc.id)?);
    }
    let merged = merge_term_frequencies(rows);
    if merged.is_empty() {
        return Ok(Vec::new());
    }

    let words: Vec<String> = merged.keys().cloned().collect();
    let idf = inverse_document_frequency(store, collection.user_id, &words)?;
    tracing::debug!(user, collection = collection.id, words = words.len(), "aggregated collection");

    let mut out: Vec<WordStat> = merged
        .into_iter()
        .map(|(word, tf)| {
            let score = idf.get(&word).copied().unwrap_or(0.0);
            WordStat { word, tf: round6(tf), idf: round6(score) }
        })
        .collect();
    out.sort_by(|a, b| b.idf.total_cmp(&a.idf).then_with(|| a.word.cmp(&b.word)));
    Ok(out)
}
