use std::sync::Arc;
use std::thread;

use emojify::{
    AveragingClassifier, ClassifierError, EmbeddingTable, Evaluator, Label, RecurrentClassifier, SentenceEncoder,
    VocabularyIndex, WordVectors,
};

fn setup_test_classifier() -> (VocabularyIndex, RecurrentClassifier) {
    let vectors = WordVectors::from_reader(
        "i 0.1 0.2 0.3\nlove 0.9 0.1 0.0\nfood 0.0 0.8 0.3\nyou -0.4 0.2 0.1\nbaseball 0.3 -0.7 0.5\n".as_bytes(),
    )
    .unwrap();
    let vocab = VocabularyIndex::from_word_vectors(&vectors).unwrap();
    let table = EmbeddingTable::from_word_vectors(&vocab, &vectors).unwrap();
    let classifier = RecurrentClassifier::builder()
        .with_embeddings(table)
        .with_max_len(5)
        .unwrap()
        .with_hidden_size(6)
        .unwrap()
        .with_seed(21)
        .build()
        .expect("Failed to create classifier");
    (vocab, classifier)
}

#[test]
fn test_probabilities_are_a_distribution() -> Result<(), Box<dyn std::error::Error>> {
    let (vocab, classifier) = setup_test_classifier();
    let encoder = SentenceEncoder::new(5)?;
    let sentences = [
        "i love you",
        "food",
        "baseball baseball baseball baseball baseball baseball",
        "",
        "completely unknown words",
    ];
    for sentence in sentences {
        let probabilities = classifier.predict_proba(&encoder.encode(sentence, &vocab)?)?;
        assert_eq!(probabilities.len(), 5);
        assert!(probabilities.iter().all(|&p| p >= 0.0 && p.is_finite()));
        let total: f32 = probabilities.iter().sum();
        assert!((total - 1.0).abs() < 1e-5, "{:?} sums to {}", sentence, total);
    }
    Ok(())
}

#[test]
fn test_batch_matches_single_predictions() -> Result<(), Box<dyn std::error::Error>> {
    let (vocab, classifier) = setup_test_classifier();
    let encoder = SentenceEncoder::new(5)?;
    let sequences = encoder.encode_all(&["i love food", "you", ""], &vocab)?;
    let batch = classifier.predict_batch(&sequences)?;
    for (sequence, row) in sequences.iter().zip(&batch) {
        let single = classifier.predict_proba(sequence)?;
        for (a, b) in single.iter().zip(row) {
            assert!((a - b).abs() < 1e-6);
        }
    }
    Ok(())
}

#[test]
fn test_info() {
    let (vocab, classifier) = setup_test_classifier();
    let info = classifier.info();
    assert_eq!(info.max_len, 5);
    assert_eq!(info.vocabulary_size, vocab.len());
    assert_eq!(info.embedding_dim, 3);
    assert_eq!(info.hidden_size, 6);
    assert_eq!(info.num_classes, 5);
    assert_eq!(info.frozen_params, (vocab.len() + 1) * 3);
    let lstm1 = 4 * 6 * 3 + 4 * 6 * 6 + 4 * 6;
    let lstm2 = 4 * 6 * 6 + 4 * 6 * 6 + 4 * 6;
    let dense = 5 * 6 + 5;
    assert_eq!(info.trainable_params, lstm1 + lstm2 + dense);
}

#[test]
fn test_predict_returns_valid_label() -> Result<(), Box<dyn std::error::Error>> {
    let (vocab, classifier) = setup_test_classifier();
    let evaluator = Evaluator::for_recurrent(&classifier, &vocab)?;
    let (label, scores) = evaluator.predict_with_scores("i love baseball")?;
    assert!(label.index() < 5);
    let best = scores.iter().cloned().fold(f32::MIN, f32::max);
    assert_eq!(scores[label.index()], best);
    Ok(())
}

#[test]
fn test_wrong_sequence_length() {
    let (vocab, classifier) = setup_test_classifier();
    let short = SentenceEncoder::new(3).unwrap().encode("i love food", &vocab).unwrap();
    assert!(matches!(
        classifier.predict_proba(&short),
        Err(ClassifierError::ValidationError(_))
    ));
}

#[test]
fn test_thread_safety() -> Result<(), Box<dyn std::error::Error>> {
    let (vocab, classifier) = setup_test_classifier();
    let vocab = Arc::new(vocab);
    let classifier = Arc::new(classifier);
    let expected = {
        let sequence = SentenceEncoder::new(5)?.encode("i love food", &vocab)?;
        classifier.predict_proba(&sequence)?
    };

    let mut handles = vec![];
    for _ in 0..4 {
        let classifier = Arc::clone(&classifier);
        let vocab = Arc::clone(&vocab);
        handles.push(thread::spawn(move || {
            let sequence = SentenceEncoder::new(5).unwrap().encode("i love food", &vocab).unwrap();
            classifier.predict_proba(&sequence).unwrap()
        }));
    }
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
    Ok(())
}

#[test]
fn test_baseline_shares_embeddings() -> Result<(), Box<dyn std::error::Error>> {
    let vectors = WordVectors::from_reader("love 1 0\nfood 0 1\n".as_bytes())?;
    let vocab = VocabularyIndex::from_word_vectors(&vectors)?;
    let table = Arc::new(EmbeddingTable::from_word_vectors(&vocab, &vectors)?);
    let encoder = SentenceEncoder::new(3)?;
    let sequences = encoder.encode_all(&["love", "food", "love love", "food food"], &vocab)?;
    let labels = Label::from_indices(&[0, 4, 0, 4], 5)?;

    let mut baseline = AveragingClassifier::new(Arc::clone(&table), 5, 0)?;
    baseline.train(&sequences, &labels, 200, 0.1)?;
    let evaluation = Evaluator::new(&baseline, &vocab, encoder).evaluate(&sequences, &labels)?;
    assert_eq!(evaluation.accuracy, 1.0);
    assert_eq!(Arc::strong_count(&table), 2);
    Ok(())
}
