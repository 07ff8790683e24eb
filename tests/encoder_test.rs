use emojify::{SentenceEncoder, VocabularyIndex, PAD_ID};

fn scenario_vocabulary() -> VocabularyIndex {
    VocabularyIndex::from_words(["funny", "lol", "lets", "play", "baseball"])
}

#[test]
fn test_concrete_scenario() -> Result<(), Box<dyn std::error::Error>> {
    let vocab = scenario_vocabulary();
    let encoder = SentenceEncoder::new(5)?;

    assert_eq!(encoder.encode("funny lol", &vocab)?.as_slice(), &[1, 2, 0, 0, 0]);
    assert_eq!(encoder.encode("lets play baseball", &vocab)?.as_slice(), &[3, 4, 5, 0, 0]);
    Ok(())
}

#[test]
fn test_unknown_words_do_not_advance_cursor() -> Result<(), Box<dyn std::error::Error>> {
    let vocab = VocabularyIndex::from_words(["hello", "world"]);
    let encoder = SentenceEncoder::new(5)?;

    let sequence = encoder.encode("xyzzy hello xyzzy world", &vocab)?;
    let hello = vocab.id_of("hello").ok_or("hello missing")?;
    let world = vocab.id_of("world").ok_or("world missing")?;
    assert_eq!(sequence.as_slice(), &[hello, world, 0, 0, 0]);
    assert_eq!(sequence.known_len(), 2);
    Ok(())
}

#[test]
fn test_case_is_folded() -> Result<(), Box<dyn std::error::Error>> {
    let vocab = scenario_vocabulary();
    let encoder = SentenceEncoder::new(5)?;
    assert_eq!(
        encoder.encode("Lets PLAY Baseball", &vocab)?,
        encoder.encode("lets play baseball", &vocab)?
    );
    Ok(())
}

#[test]
fn test_fixed_length_and_padding() -> Result<(), Box<dyn std::error::Error>> {
    let vocab = scenario_vocabulary();
    let sentences = [
        "",
        "   ",
        "funny",
        "nothing known here",
        "funny lol lets play baseball",
        "funny lol lets play baseball funny lol",
    ];
    for max_len in 1..=8 {
        let encoder = SentenceEncoder::new(max_len)?;
        for sentence in sentences {
            let sequence = encoder.encode(sentence, &vocab)?;
            assert_eq!(sequence.len(), max_len, "sentence {:?}", sentence);
            let k = sequence.known_len();
            assert!(sequence.as_slice()[k..].iter().all(|&id| id == PAD_ID));
        }
    }
    Ok(())
}

#[test]
fn test_empty_and_unknown_sentences_are_all_padding() -> Result<(), Box<dyn std::error::Error>> {
    let vocab = scenario_vocabulary();
    let encoder = SentenceEncoder::new(4)?;
    assert_eq!(encoder.encode("", &vocab)?.as_slice(), &[0, 0, 0, 0]);
    assert_eq!(encoder.encode("xyzzy plugh", &vocab)?.as_slice(), &[0, 0, 0, 0]);
    Ok(())
}

#[test]
fn test_truncates_extra_known_words() -> Result<(), Box<dyn std::error::Error>> {
    let vocab = scenario_vocabulary();
    let encoder = SentenceEncoder::new(3)?;
    let sequence = encoder.encode("funny lol lets play baseball", &vocab)?;
    assert_eq!(sequence.as_slice(), &[1, 2, 3]);
    Ok(())
}

#[test]
fn test_encoding_is_deterministic() -> Result<(), Box<dyn std::error::Error>> {
    let vocab = scenario_vocabulary();
    let encoder = SentenceEncoder::new(5)?;
    let sentence = "lol what a funny baseball game";
    assert_eq!(encoder.encode(sentence, &vocab)?, encoder.encode(sentence, &vocab)?);

    let batch = encoder.encode_all(&[sentence, "play"], &vocab)?;
    assert_eq!(batch[0], encoder.encode(sentence, &vocab)?);
    assert_eq!(batch[1].as_slice(), &[4, 0, 0, 0, 0]);
    Ok(())
}

#[test]
fn test_foreign_vocabulary_ids_are_drops() -> Result<(), Box<dyn std::error::Error>> {
    let training_vocab = scenario_vocabulary();
    let other_vocab = VocabularyIndex::from_words(["baseball"]);
    let encoder = SentenceEncoder::new(3)?;

    assert_eq!(encoder.encode("funny baseball", &training_vocab)?.as_slice(), &[1, 5, 0]);
    assert_eq!(encoder.encode("funny baseball", &other_vocab)?.as_slice(), &[1, 0, 0]);
    Ok(())
}
