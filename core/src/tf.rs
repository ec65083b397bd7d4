use crate::error::{AnalyticsError, Result};
use std::collections::BTreeMap;

/// Word → share of the document's tokens. Ordered so output is reproducible.
pub type TermFrequencies = BTreeMap<String, f64>;

/// Count each distinct token and divide by the total token count.
pub fn term_frequency(tokens: &[String]) -> Result<TermFrequencies> {
    if tokens.is_empty() {
        return Err(AnalyticsError::EmptyCorpus);
    }
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for token in tokens {
        *counts.entry(token.as_str()).or_insert(0) += 1;
    }
    let total = tokens.len() as f64;
    Ok(counts
        .into_iter()
        .map(|(word, count)| (word.to_string(), count as f64 / total))
        .collect())
}
