use crate::error::Result;
use crate::store::CorpusStore;
use crate::UserId;
use std::collections::BTreeMap;

/// `log10(N / (1 + n))`; the smoothing keeps the score finite for any `n`.
pub fn idf_score(total_documents: u64, containing: u64) -> f64 {
    (total_documents as f64 / (1 + containing) as f64).log10()
}

/// Score `words` against everything `user` has committed so far.
///
/// A user without documents gets 0.0 for every word.
pub fn inverse_document_frequency<S>(store: &S, user: UserId, words: &[String]) -> Result<BTreeMap<String, f64>>
where
    S: CorpusStore + ?Sized,
{
    let total = store.count_documents(user)?;
    if total == 0 {
        return Ok(words.iter().map(|w| (w.clone(), 0.0)).collect());
    }
    let containing = store.count_documents_containing(user, words)?;
    tracing::debug!(user, total, words = words.len(), "computed document frequencies");
    Ok(words
        .iter()
        .map(|w| {
            let n = containing.get(w).copied().unwrap_or(0);
            (w.clone(), idf_score(total, n))
        })
        .collect())
}
