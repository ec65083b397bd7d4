use wordstat_core::tokenizer::{decode, tokenize};
use wordstat_core::AnalyzerConfig;

#[test]
fn it_normalizes_case_and_compatibility_forms() {
    // "ﬁ" is a ligature; NFKC splits it into "fi"
    let words = tokenize("Running RUNNERS run! The ﬁsh").unwrap();
    assert_eq!(words, vec!["running", "runners", "run", "the", "fish"]);
}

#[test]
fn it_keeps_stopwords_and_splits_on_digits() {
    let words = tokenize("the quick 2brown fox").unwrap();
    assert_eq!(words, vec!["the", "quick", "brown", "fox"]);
}

#[test]
fn configured_chain_reads_koi8() {
    let cfg = AnalyzerConfig { encodings: vec!["utf-8".into(), "koi8-r".into()], ..Default::default() };
    let encodings = cfg.resolve_encodings().unwrap();
    // "мир" in KOI8-R
    let text = decode(&[0xCD, 0xC9, 0xD2], &encodings, false).unwrap();
    assert_eq!(text, "мир");
}

#[test]
fn default_chain_never_falls_through_to_lossy() {
    let encodings = AnalyzerConfig::default().resolve_encodings().unwrap();
    assert!(encodings.iter().all(|e| e.name() != "KOI8-R"));
    // invalid UTF-8 is read as windows-1251, so strict mode still succeeds
    let text = decode(&[0xCD, 0xC9, 0xD2], &encodings, false).unwrap();
    assert_eq!(text, "НЙТ");
    let every_byte: Vec<u8> = (0..=u8::MAX).collect();
    assert!(decode(&every_byte, &encodings, false).is_ok());
}
