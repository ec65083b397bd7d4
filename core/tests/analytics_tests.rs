use wordstat_core::idf::inverse_document_frequency;
use wordstat_core::{
    AnalyticsError, Analyzer, AnalyzerConfig, CorpusStore, MemoryStore, NewDocument, SledStore, WordStat,
};

fn memory() -> Analyzer<MemoryStore> {
    Analyzer::new(MemoryStore::new(), AnalyzerConfig::default()).unwrap()
}

fn sled() -> Analyzer<SledStore> {
    Analyzer::new(SledStore::temporary().unwrap(), AnalyzerConfig::default()).unwrap()
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn first_upload_keeps_every_word<S: CorpusStore>(analyzer: Analyzer<S>) {
    let report = analyzer.analyze_upload(1, "mat.txt", b"the cat sat on the mat").unwrap();
    assert_eq!(report.unique_words, 5);
    assert_eq!(report.selected.len(), 5);
    assert!(report.selected.iter().all(|s| s.idf == 0.0));
    // equal idf: higher tf first
    assert_eq!(report.selected[0].word, "the");
    assert!((report.selected[0].tf - 2.0 / 6.0).abs() < 1e-12);

    let stored = analyzer.document_statistics(1, report.document_id).unwrap();
    assert_eq!(stored, report.selected);
}

#[test]
fn first_upload_keeps_every_word_memory() {
    first_upload_keeps_every_word(memory());
}

#[test]
fn first_upload_keeps_every_word_sled() {
    first_upload_keeps_every_word(sled());
}

fn idf_follows_corpus<S: CorpusStore>(analyzer: Analyzer<S>) {
    let store = analyzer.store();
    let none = inverse_document_frequency(store, 1, &words(&["cat", "anything"])).unwrap();
    assert!(none.values().all(|&v| v == 0.0));

    analyzer.analyze_upload(1, "a", b"the cat").unwrap();
    analyzer.analyze_upload(1, "b", b"the dog").unwrap();
    let idf = inverse_document_frequency(store, 1, &words(&["cat", "the", "eel"])).unwrap();
    assert_eq!(idf["cat"], 0.0);
    assert!(idf["the"] <= idf["cat"]);
    assert!((idf["eel"] - 2f64.log10()).abs() < 1e-12);
    assert!(idf.values().all(|v| v.is_finite()));
}

#[test]
fn idf_follows_corpus_memory() {
    idf_follows_corpus(memory());
}

#[test]
fn idf_follows_corpus_sled() {
    idf_follows_corpus(sled());
}

fn collection_merges_and_rescored<S: CorpusStore>(analyzer: Analyzer<S>) {
    analyzer.analyze_upload(1, "a", b"the cat sat on the mat").unwrap();
    analyzer.analyze_upload(1, "b", b"the dog sat").unwrap();
    let default = analyzer.store().default_collection(1).unwrap();

    let stats = analyzer.collection_statistics(1, default.id).unwrap();
    let order: Vec<&str> = stats.iter().map(|s| s.word.as_str()).collect();
    assert_eq!(order, vec!["cat", "dog", "mat", "on", "sat", "the"]);

    let the = stats.iter().find(|s| s.word == "the").unwrap();
    assert_eq!(the.tf, 0.666667);
    assert_eq!(the.idf, -0.176091);
    let cat = stats.iter().find(|s| s.word == "cat").unwrap();
    assert_eq!(cat.tf, 0.166667);
    assert_eq!(cat.idf, 0.0);
}

#[test]
fn collection_merges_and_rescored_memory() {
    collection_merges_and_rescored(memory());
}

#[test]
fn collection_merges_and_rescored_sled() {
    collection_merges_and_rescored(sled());
}

fn empty_collection_is_empty<S: CorpusStore>(analyzer: Analyzer<S>) {
    let coll = analyzer.store().create_collection(1, "empty", Some("nothing yet")).unwrap();
    assert!(analyzer.collection_statistics(1, coll.id).unwrap().is_empty());
}

#[test]
fn empty_collection_is_empty_memory() {
    empty_collection_is_empty(memory());
}

#[test]
fn empty_collection_is_empty_sled() {
    empty_collection_is_empty(sled());
}

fn users_never_see_each_other<S: CorpusStore>(analyzer: Analyzer<S>) {
    let mine = analyzer.analyze_upload(1, "mine", b"secret words here").unwrap();
    analyzer.analyze_upload(2, "theirs", b"secret plans").unwrap();
    analyzer.analyze_upload(2, "more", b"secret stuff").unwrap();

    let store = analyzer.store();
    assert_eq!(store.count_documents(1).unwrap(), 1);
    assert_eq!(store.count_documents_containing(1, &words(&["secret"])).unwrap()["secret"], 1);

    assert!(matches!(analyzer.document_statistics(2, mine.document_id), Err(AnalyticsError::NotFound { .. })));
    assert!(matches!(analyzer.encode_document(2, mine.document_id), Err(AnalyticsError::NotFound { .. })));
    assert!(matches!(analyzer.delete_document(2, mine.document_id), Err(AnalyticsError::NotFound { .. })));

    let my_default = store.default_collection(1).unwrap();
    assert!(matches!(analyzer.collection_statistics(2, my_default.id), Err(AnalyticsError::NotFound { .. })));
    let their_default = store.default_collection(2).unwrap();
    assert!(store.add_to_collection(2, their_default.id, mine.document_id).is_err());
}

#[test]
fn users_never_see_each_other_memory() {
    users_never_see_each_other(memory());
}

#[test]
fn users_never_see_each_other_sled() {
    users_never_see_each_other(sled());
}

fn rejected_upload_writes_nothing<S: CorpusStore>(analyzer: Analyzer<S>) {
    let err = analyzer.analyze_upload(1, "digits", b"1234 5678 !!! a").unwrap_err();
    assert!(matches!(err, AnalyticsError::EmptyCorpus));
    assert_eq!(analyzer.store().count_documents(1).unwrap(), 0);
    assert!(analyzer.store().list_collections(1).unwrap().is_empty());
}

#[test]
fn rejected_upload_writes_nothing_memory() {
    rejected_upload_writes_nothing(memory());
}

#[test]
fn rejected_upload_writes_nothing_sled() {
    rejected_upload_writes_nothing(sled());
}

fn foreign_collection_rolls_back_persist<S: CorpusStore>(analyzer: Analyzer<S>) {
    let store = analyzer.store();
    let theirs = store.create_collection(2, "theirs", None).unwrap();
    let err = store
        .persist_document(
            1,
            NewDocument {
                name: "cat.txt".into(),
                content: "cat".into(),
                unique_words: 1,
                stats: vec![WordStat { word: "cat".into(), tf: 1.0, idf: 0.0 }],
                collections: vec![theirs.id],
                join_default: true,
            },
        )
        .unwrap_err();
    assert!(matches!(err, AnalyticsError::NotFound { .. }));

    assert_eq!(store.count_documents(1).unwrap(), 0);
    assert_eq!(store.count_documents_containing(1, &words(&["cat"])).unwrap()["cat"], 0);
    assert!(store.list_documents(1).unwrap().is_empty());
    assert!(store.list_collections(1).unwrap().is_empty());
    assert!(store.list_documents_in_collection(theirs.id).unwrap().is_empty());

    // the same call succeeds once the foreign id is dropped
    let doc = store
        .persist_document(
            1,
            NewDocument {
                name: "cat.txt".into(),
                content: "cat".into(),
                unique_words: 1,
                stats: vec![WordStat { word: "cat".into(), tf: 1.0, idf: 0.0 }],
                collections: vec![],
                join_default: true,
            },
        )
        .unwrap();
    assert_eq!(store.count_documents_containing(1, &words(&["cat"])).unwrap()["cat"], 1);
    let default = store.default_collection(1).unwrap();
    assert_eq!(store.list_documents_in_collection(default.id).unwrap()[0].id, doc);
}

#[test]
fn foreign_collection_rolls_back_persist_memory() {
    foreign_collection_rolls_back_persist(memory());
}

#[test]
fn foreign_collection_rolls_back_persist_sled() {
    foreign_collection_rolls_back_persist(sled());
}

fn membership_is_a_set<S: CorpusStore>(analyzer: Analyzer<S>) {
    let doc = analyzer.analyze_upload(1, "a", b"alpha beta").unwrap().document_id;
    let store = analyzer.store();
    let coll = store.create_collection(1, "twice", None).unwrap();
    store.add_to_collection(1, coll.id, doc).unwrap();
    store.add_to_collection(1, coll.id, doc).unwrap();
    assert_eq!(store.list_documents_in_collection(coll.id).unwrap().len(), 1);

    let stats = analyzer.collection_statistics(1, coll.id).unwrap();
    assert_eq!(stats.iter().find(|s| s.word == "alpha").unwrap().tf, 0.5);

    store.remove_from_collection(1, coll.id, doc).unwrap();
    assert!(store.list_documents_in_collection(coll.id).unwrap().is_empty());
    assert!(store.get_document(1, doc).is_ok());
}

#[test]
fn membership_is_a_set_memory() {
    membership_is_a_set(memory());
}

#[test]
fn membership_is_a_set_sled() {
    membership_is_a_set(sled());
}

fn selection_is_bounded<S: CorpusStore>(analyzer: Analyzer<S>) {
    let text: String = (0..200u32)
        .map(|i| {
            // base-26 letters so every word is distinct and alphabetic
            let (a, b) = (b'a' + (i / 26) as u8, b'a' + (i % 26) as u8);
            format!("w{}{} ", a as char, b as char)
        })
        .collect();
    let report = analyzer.analyze_upload(1, "big", text.as_bytes()).unwrap();
    assert_eq!(report.unique_words, 200);
    assert_eq!(report.selected.len(), 50);
    assert_eq!(analyzer.document_statistics(1, report.document_id).unwrap().len(), 50);
}

#[test]
fn selection_is_bounded_memory() {
    selection_is_bounded(memory());
}

#[test]
fn selection_is_bounded_sled() {
    selection_is_bounded(sled());
}

fn huffman_and_metrics<S: CorpusStore>(analyzer: Analyzer<S>) {
    assert_eq!(analyzer.metrics(1).unwrap().total_uploads, 0);
    analyzer.analyze_upload(1, "a", b"alpha beta").unwrap();
    let doc = analyzer.analyze_upload(1, "b", "aabb cc".as_bytes()).unwrap().document_id;

    let enc = analyzer.encode_document(1, doc).unwrap();
    assert_eq!(enc.original_bits, 7 * 8);
    let back = wordstat_core::huffman::decode(&enc.encoded.bits, &enc.encoded.table).unwrap();
    assert_eq!(back, "aabb cc");

    let metrics = analyzer.metrics(1).unwrap();
    assert_eq!(metrics.total_uploads, 2);
    assert_eq!(metrics.unique_words, 2);
    assert_eq!(metrics.collections, 1);
}

#[test]
fn huffman_and_metrics_memory() {
    huffman_and_metrics(memory());
}

#[test]
fn huffman_and_metrics_sled() {
    huffman_and_metrics(sled());
}

#[test]
fn deleting_a_user_cascades() {
    let analyzer = memory();
    analyzer.analyze_upload(1, "a", b"alpha beta").unwrap();
    analyzer.analyze_upload(2, "b", b"alpha gamma").unwrap();
    analyzer.store().delete_user(1).unwrap();
    assert_eq!(analyzer.store().count_documents(1).unwrap(), 0);
    assert!(analyzer.store().list_collections(1).unwrap().is_empty());
    assert_eq!(analyzer.store().count_documents(2).unwrap(), 1);

    let analyzer = sled();
    analyzer.analyze_upload(1, "a", b"alpha beta").unwrap();
    analyzer.store().delete_user(1).unwrap();
    assert_eq!(analyzer.store().count_documents(1).unwrap(), 0);
    assert!(analyzer.store().list_collections(1).unwrap().is_empty());
    let fresh = analyzer.store().default_collection(1).unwrap();
    assert_eq!(fresh.name, "default");
}
