//! Criterion benchmarks for sleuth.
//!
//! Covers document registration, structural matching against a growing
//! corpus and topic scoring.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sleuth::config::ManagerConfig;
use sleuth::manager::Manager;
use sleuth::ontology::OntologyBuilder;
use sleuth::parse::{ParsedSentence, ParsedText, Token};
use std::hint::black_box;

const SUBJECTS: &[&str] = &["dog", "cat", "mouse", "horse", "fox", "bird"];
const VERBS: &[(&str, &str)] = &[
    ("chased", "chase"),
    ("followed", "follow"),
    ("watched", "watch"),
    ("pursued", "pursue"),
];
const ADJECTIVES: &[&str] = &["big", "small", "quick", "lazy", "old"];

/// "The {adjective} {subject} {verb} the {object}" with varying words.
fn sentence(i: usize) -> ParsedSentence {
    let adjective = ADJECTIVES[i % ADJECTIVES.len()];
    let subject = SUBJECTS[(i * 7) % SUBJECTS.len()];
    let (verb, lemma) = VERBS[(i * 3) % VERBS.len()];
    let object = SUBJECTS[(i * 5 + 1) % SUBJECTS.len()];
    ParsedSentence::new(vec![
        Token::new(0, "The", "the", "DET").with_dependency("det", Some(2)),
        Token::new(1, adjective, adjective, "ADJ").with_dependency("amod", Some(2)),
        Token::new(2, subject, subject, "NOUN").with_dependency("nsubj", Some(3)),
        Token::new(3, verb, lemma, "VERB")
            .with_tag("VBD")
            .with_dependency("ROOT", None),
        Token::new(4, "the", "the", "DET").with_dependency("det", Some(5)),
        Token::new(5, object, object, "NOUN").with_dependency("dobj", Some(3)),
    ])
}

/// Generate documents of a few sentences each.
fn generate_documents(count: usize) -> Vec<(ParsedText, Option<String>)> {
    (0..count)
        .map(|i| {
            let sentences = (0..3 + i % 4).map(|j| sentence(i * 11 + j)).collect();
            (ParsedText::new(sentences), Some(format!("doc-{i:05}")))
        })
        .collect()
}

fn phrase() -> ParsedText {
    ParsedText::new(vec![ParsedSentence::new(vec![
        Token::new(0, "A", "a", "DET").with_dependency("det", Some(2)),
        Token::new(1, "big", "big", "ADJ").with_dependency("amod", Some(2)),
        Token::new(2, "dog", "dog", "NOUN").with_dependency("nsubj", Some(3)),
        Token::new(3, "chases", "chase", "VERB")
            .with_tag("VBZ")
            .with_dependency("ROOT", None),
        Token::new(4, "a", "a", "DET").with_dependency("det", Some(5)),
        Token::new(5, "cat", "cat", "NOUN").with_dependency("dobj", Some(3)),
    ])])
}

fn build_manager(documents: usize) -> Manager {
    let ontology = OntologyBuilder::new()
        .synonyms(&["chase", "pursue"])
        .is_a("fox", "dog")
        .build()
        .unwrap();
    let manager = Manager::with_ontology(ManagerConfig::default(), ontology).unwrap();
    manager.register_search_phrase(&phrase(), None).unwrap();
    manager
        .register_documents(generate_documents(documents))
        .unwrap();
    manager
}

/// Benchmark document analysis and registration.
fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");
    group.sample_size(20);

    let documents = generate_documents(500);
    group.throughput(Throughput::Elements(documents.len() as u64));
    group.bench_function("register_documents_batch", |b| {
        b.iter_with_setup(
            || (Manager::new(ManagerConfig::default()).unwrap(), documents.clone()),
            |(manager, documents)| {
                let handles = manager.register_documents(documents).unwrap();
                black_box(handles)
            },
        )
    });

    let single = &documents[0].0;
    group.throughput(Throughput::Elements(1));
    group.bench_function("register_single_document", |b| {
        let manager = Manager::new(ManagerConfig::default()).unwrap();
        b.iter(|| black_box(manager.register_document(black_box(single), Some("doc"))))
    });

    group.finish();
}

/// Benchmark structural matching as the corpus grows.
fn bench_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("structural_matching");
    group.sample_size(20);

    for size in [100, 1000, 5000] {
        let manager = build_manager(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("match_documents", size), &size, |b, _| {
            b.iter(|| black_box(manager.match_documents(None, None).unwrap()))
        });
    }

    let manager = build_manager(10);
    let (document, _) = generate_documents(1).remove(0);
    group.throughput(Throughput::Elements(1));
    group.bench_function("match_parsed_document", |b| {
        b.iter(|| black_box(manager.match_parsed_document(black_box(&document)).unwrap()))
    });

    group.finish();
}

/// Benchmark topic scoring.
fn bench_topic_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("topic_matching");
    group.sample_size(20);

    let reference = phrase();
    for size in [100, 1000] {
        let manager = build_manager(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::new("topic_match_documents_against", size),
            &size,
            |b, _| {
                b.iter(|| {
                    black_box(
                        manager
                            .topic_match_documents_against(black_box(&reference), None)
                            .unwrap(),
                    )
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_registration,
    bench_matching,
    bench_topic_matching
);
criterion_main!(benches);
