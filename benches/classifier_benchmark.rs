use criterion::{black_box, criterion_group, criterion_main, Criterion};
use emojify::{
    EmbeddingTable, Label, RecurrentClassifier, SentenceEncoder, Trainer, TrainingConfig, VocabularyIndex,
    WordVectors,
};

const DIM: usize = 50;
const MAX_LEN: usize = 10;

fn setup_vocabulary() -> (VocabularyIndex, EmbeddingTable) {
    let words = [
        "i", "love", "you", "lets", "play", "baseball", "food", "is", "life", "so", "sad", "happy", "funny", "lol",
        "the", "game", "was", "great", "dinner", "tonight",
    ];
    let mut vectors = WordVectors::default();
    for (i, word) in words.iter().enumerate() {
        let vector: Vec<f32> = (0..DIM).map(|j| ((i * DIM + j) as f32 * 0.37).sin()).collect();
        vectors.push(word, &vector).unwrap();
    }
    let vocab = VocabularyIndex::from_word_vectors(&vectors).unwrap();
    let table = EmbeddingTable::from_word_vectors(&vocab, &vectors).unwrap();
    (vocab, table)
}

fn setup_benchmark_classifier() -> (VocabularyIndex, RecurrentClassifier) {
    let (vocab, table) = setup_vocabulary();
    let classifier = RecurrentClassifier::builder()
        .with_embeddings(table)
        .with_max_len(MAX_LEN)
        .unwrap()
        .build()
        .unwrap();
    (vocab, classifier)
}

fn bench_encoding(c: &mut Criterion) {
    let (vocab, _) = setup_vocabulary();
    let encoder = SentenceEncoder::new(MAX_LEN).unwrap();
    let mut group = c.benchmark_group("Encoding");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    group.bench_function("short_sentence", |b| {
        b.iter(|| encoder.encode(black_box("lets play baseball"), &vocab).unwrap())
    });
    group.bench_function("long_sentence", |b| {
        b.iter(|| {
            encoder
                .encode(
                    black_box("I love you so much but the game was great and dinner tonight is life lol"),
                    &vocab,
                )
                .unwrap()
        })
    });

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let (vocab, classifier) = setup_benchmark_classifier();
    let encoder = SentenceEncoder::new(MAX_LEN).unwrap();
    let sequence = encoder.encode("food is life", &vocab).unwrap();
    let batch = vec![sequence.clone(); 32];

    let mut group = c.benchmark_group("Prediction");
    group.sample_size(30);
    group.warm_up_time(std::time::Duration::from_secs(1));

    group.bench_function("single", |b| b.iter(|| classifier.predict_proba(black_box(&sequence)).unwrap()));
    group.bench_function("batch_32", |b| b.iter(|| classifier.predict_batch(black_box(&batch)).unwrap()));

    group.finish();
}

fn bench_training_epoch(c: &mut Criterion) {
    let (vocab, mut classifier) = setup_benchmark_classifier();
    let encoder = SentenceEncoder::new(MAX_LEN).unwrap();
    let sentences = ["i love you", "lets play baseball", "so happy lol", "so sad", "food is life"];
    let sequences = encoder.encode_all(&sentences.repeat(8), &vocab).unwrap();
    let labels: Vec<Label> = (0..sequences.len()).map(|i| Label::new(i % 5, 5).unwrap()).collect();
    let trainer = Trainer::new(TrainingConfig {
        epochs: 1,
        ..Default::default()
    })
    .unwrap();

    let mut group = c.benchmark_group("Training");
    group.sample_size(10);
    group.bench_function("epoch_40_sentences", |b| {
        b.iter(|| trainer.train(&mut classifier, &sequences, &labels).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_encoding, bench_prediction, bench_training_epoch);
criterion_main!(benches);
