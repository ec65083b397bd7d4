use crate::error::{AnalyticsError, Result};
use crate::select::DEFAULT_LIMIT;
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Maximum number of word statistics persisted per document.
    pub selection_limit: usize,
    /// Encoding labels tried in order when decoding uploads.
    pub encodings: Vec<String>,
    /// Decode as UTF-8 dropping invalid sequences when every strict attempt fails.
    /// Never reached when the chain contains an encoding that maps every byte.
    pub lossy_fallback: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            selection_limit: DEFAULT_LIMIT,
            encodings: vec!["utf-8".into(), "windows-1251".into()],
            lossy_fallback: true,
        }
    }
}

impl AnalyzerConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let buf = std::fs::read_to_string(path)
            .map_err(|e| AnalyticsError::Config(format!("{}: {e}", path.display())))?;
        let cfg: AnalyzerConfig = serde_json::from_str(&buf)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.selection_limit == 0 {
            return Err(AnalyticsError::Config("selection_limit must be positive".into()));
        }
        let chain = self.resolve_encodings()?;
        if let Some(pos) = chain.iter().position(|e| maps_every_byte(e)) {
            if let Some(unreachable) = self.encodings.get(pos + 1) {
                return Err(AnalyticsError::Config(format!(
                    "encoding {unreachable:?} is unreachable: {} accepts any input",
                    chain[pos].name()
                )));
            }
        }
        Ok(())
    }

    /// Map the configured labels to encodings, rejecting unknown labels.
    pub fn resolve_encodings(&self) -> Result<Vec<&'static Encoding>> {
        self.encodings
            .iter()
            .map(|label| {
                Encoding::for_label(label.trim().as_bytes())
                    .ok_or_else(|| AnalyticsError::Config(format!("unknown encoding label {label:?}")))
            })
            .collect()
    }
}

/// True for single-byte encodings with a character for all 256 byte values.
fn maps_every_byte(encoding: &'static Encoding) -> bool {
    encoding.is_single_byte()
        && (0..=u8::MAX).all(|b| encoding.decode_without_bom_handling_and_without_replacement(&[b]).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_resolve() {
        let cfg = AnalyzerConfig::default();
        assert_eq!(cfg.selection_limit, 50);
        assert_eq!(cfg.resolve_encodings().unwrap().len(), 2);
        cfg.validate().unwrap();
    }

    #[test]
    fn labels_after_a_total_encoding_are_rejected() {
        let cfg = AnalyzerConfig {
            encodings: vec!["utf-8".into(), "windows-1251".into(), "koi8-r".into()],
            ..Default::default()
        };
        match cfg.validate() {
            Err(AnalyticsError::Config(msg)) => assert!(msg.contains("koi8-r"), "{msg}"),
            other => panic!("expected config error, got {other:?}"),
        }

        let cfg = AnalyzerConfig { encodings: vec!["utf-8".into(), "koi8-r".into()], ..Default::default() };
        cfg.validate().unwrap();
    }

    #[test]
    fn utf8_is_not_total() {
        assert!(!maps_every_byte(encoding_rs::UTF_8));
        assert!(maps_every_byte(encoding_rs::WINDOWS_1251));
        assert!(maps_every_byte(encoding_rs::KOI8_R));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"selection_limit": 10}}"#).unwrap();
        let cfg = AnalyzerConfig::from_json_file(f.path()).unwrap();
        assert_eq!(cfg.selection_limit, 10);
        assert!(cfg.lossy_fallback);
        assert_eq!(cfg.encodings[0], "utf-8");
    }

    #[test]
    fn unknown_label_is_rejected() {
        let cfg = AnalyzerConfig { encodings: vec!["no-such-charset".into()], ..Default::default() };
        assert!(matches!(cfg.validate(), Err(AnalyticsError::Config(_))));
    }

    #[test]
    fn zero_limit_is_rejected() {
        let cfg = AnalyzerConfig { selection_limit: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }
}
