use criterion::{Criterion, criterion_group, criterion_main};
use shelfchat::embeddings::chunking::{ChunkingConfig, chunk_document, split_tagged_lines};
use std::hint::black_box;

fn synthetic_document(paragraphs: usize) -> String {
    let paragraph = "Verify that the shopping cart total updates when an item is removed. \
        Check that the discount code field rejects expired codes and surfaces a clear error. \
        Confirm the order summary matches the cart contents before payment. "
        .repeat(4);
    vec![paragraph; paragraphs].join("\n\n")
}

fn synthetic_tagged_lines(lines: usize) -> String {
    (0..lines)
        .map(|i| {
            format!(
                "\"978000{:07}\": A story about number {} and the people who chased it.",
                i, i
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn bench_chunk_document(c: &mut Criterion) {
    let config = ChunkingConfig::default();
    let small = synthetic_document(5);
    let large = synthetic_document(100);

    c.bench_function("chunk_document_small", |b| {
        b.iter(|| chunk_document(black_box(&small), "bench.txt", &config));
    });

    c.bench_function("chunk_document_large", |b| {
        b.iter(|| chunk_document(black_box(&large), "bench.txt", &config));
    });
}

fn bench_tagged_lines(c: &mut Criterion) {
    let text = synthetic_tagged_lines(5000);

    c.bench_function("split_tagged_lines_5k", |b| {
        b.iter(|| split_tagged_lines(black_box(&text), "tagged_description.txt"));
    });
}

criterion_group!(benches, bench_chunk_document, bench_tagged_lines);
criterion_main!(benches);
