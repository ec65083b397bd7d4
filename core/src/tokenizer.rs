use crate::error::{AnalyticsError, Result};
use encoding_rs::Encoding;
use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\p{Alphabetic}+").expect("valid regex");
}

/// Decode raw upload bytes with the first encoding that accepts them without replacement.
///
/// When every strict attempt fails and `lossy_fallback` is set, the bytes are read as
/// UTF-8 with invalid sequences dropped.
pub fn decode(bytes: &[u8], encodings: &[&'static Encoding], lossy_fallback: bool) -> Result<String> {
    for encoding in encodings {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            tracing::debug!(encoding = encoding.name(), len = bytes.len(), "decoded upload");
            return Ok(text.into_owned());
        }
    }
    if !lossy_fallback {
        return Err(AnalyticsError::DecodeFailure);
    }
    tracing::warn!(len = bytes.len(), "no strict decoding matched, dropping invalid utf-8");
    Ok(bytes.utf8_chunks().map(|chunk| chunk.valid()).collect())
}

/// Split text into lowercase words: maximal alphabetic runs of at least two characters.
pub fn tokenize(text: &str) -> Result<Vec<String>> {
    let normalized = text.nfkc().collect::<String>();
    let tokens: Vec<String> = WORD
        .find_iter(&normalized)
        .map(|m| m.as_str())
        .filter(|run| run.chars().nth(1).is_some())
        .map(|run| run.to_lowercase())
        .collect();
    if tokens.is_empty() {
        return Err(AnalyticsError::EmptyCorpus);
    }
    Ok(tokens)
}
