use criterion::{criterion_group, criterion_main, Criterion};
use wordstat_core::huffman;
use wordstat_core::tf::term_frequency;
use wordstat_core::tokenizer::tokenize;

const SAMPLE: &str = "It was the best of times, it was the worst of times, it was the age of \
    wisdom, it was the age of foolishness, it was the epoch of belief, it was the epoch of \
    incredulity, it was the season of Light, it was the season of Darkness, it was the spring \
    of hope, it was the winter of despair.";

fn bench_tokenize(c: &mut Criterion) {
    let text = SAMPLE.repeat(64);
    c.bench_function("tokenize_tf", |b| {
        b.iter(|| term_frequency(&tokenize(&text).expect("sample has words")))
    });
}

fn bench_huffman(c: &mut Criterion) {
    let text = SAMPLE.repeat(64);
    c.bench_function("huffman_encode", |b| b.iter(|| huffman::encode(&text)));
}

criterion_group!(benches, bench_tokenize, bench_huffman);
criterion_main!(benches);
