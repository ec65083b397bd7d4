use std::collections::BTreeMap;

pub const DEFAULT_LIMIT: usize = 50;

/// Keep at most `limit` of the rarest words, highest IDF first.
///
/// Words are ranked ascending by IDF, then TF, then the word itself; the last `limit`
/// entries of that ranking are returned in reverse. A word missing from `idf` scores 0.0.
pub fn select_words(tf: &BTreeMap<String, f64>, idf: &BTreeMap<String, f64>, limit: usize) -> Vec<String> {
    let mut ranked: Vec<(&str, f64, f64)> = tf
        .iter()
        .map(|(word, &freq)| (word.as_str(), idf.get(word).copied().unwrap_or(0.0), freq))
        .collect();
    ranked.sort_by(|a, b| {
        a.1.total_cmp(&b.1)
            .then_with(|| a.2.total_cmp(&b.2))
            .then_with(|| a.0.cmp(b.0))
    });
    let skip = ranked.len().saturating_sub(limit);
    ranked[skip..].iter().rev().map(|(word, _, _)| word.to_string()).collect()
}
