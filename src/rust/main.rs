use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use emojify::{
    AveragingClassifier, DevicePreference, EmbeddingTable, EmojiMap, Evaluator, LabeledSentences, ModelStore,
    RecurrentClassifier, RuntimeConfig, SentenceEncoder, Trainer, TrainingConfig, VocabularyIndex, WordVectors,
    DEFAULT_NUM_CLASSES,
};
use log::info;

#[derive(Parser)]
#[command(author, version, about = "Pick an emoji for a sentence", long_about = None)]
struct Cli {
    /// Directory holding saved models (defaults to $EMOJIFY_CACHE/models or the user cache)
    #[arg(long, global = true)]
    models_dir: Option<PathBuf>,

    /// Run on the first CUDA or Metal device when available
    #[arg(long, global = true)]
    gpu: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a classifier on a labeled CSV file and save it
    Train(TrainArgs),
    /// Print each sentence followed by its predicted emoji
    Predict(PredictArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Pretrained word vectors, one `word v1 .. vD` record per line
    #[arg(long)]
    vectors: PathBuf,

    /// Training sentences as `sentence,label` lines
    #[arg(long)]
    train: PathBuf,

    /// Optional held-out sentences in the same format
    #[arg(long)]
    test: Option<PathBuf>,

    #[arg(long, default_value_t = 50)]
    epochs: usize,

    #[arg(long, default_value_t = 32)]
    batch_size: usize,

    #[arg(long, default_value_t = 0.001)]
    learning_rate: f64,

    /// Sequence length (defaults to the longest training sentence)
    #[arg(long)]
    max_len: Option<usize>,

    #[arg(long, default_value_t = emojify::classifier::DEFAULT_HIDDEN_SIZE)]
    hidden_size: usize,

    #[arg(long, default_value_t = emojify::classifier::DEFAULT_DROPOUT)]
    dropout: f32,

    #[arg(long, default_value_t = DEFAULT_NUM_CLASSES)]
    num_classes: usize,

    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Name under which the trained model is saved
    #[arg(long, default_value = "emojify")]
    name: String,

    /// Also train and report the word-averaging baseline
    #[arg(long)]
    baseline: bool,
}

#[derive(Args)]
struct PredictArgs {
    /// The same word vectors the model was trained with
    #[arg(long)]
    vectors: PathBuf,

    #[arg(long, default_value = "emojify")]
    name: String,

    #[arg(required = true)]
    sentences: Vec<String>,
}

fn open_store(models_dir: Option<&Path>) -> Result<ModelStore> {
    let store = match models_dir {
        Some(dir) => ModelStore::new(dir),
        None => ModelStore::new_default(),
    };
    store.context("Failed to open the models directory")
}

fn load_embeddings(path: &Path) -> Result<(VocabularyIndex, Arc<EmbeddingTable>)> {
    let start = Instant::now();
    let vectors = WordVectors::from_file(path).with_context(|| format!("Failed to read word vectors from {:?}", path))?;
    let vocab = VocabularyIndex::from_word_vectors(&vectors)?;
    let table = EmbeddingTable::from_word_vectors(&vocab, &vectors)?;
    info!(
        "Loaded {} word vectors of dimension {} in {:.2?}",
        vocab.len(),
        table.dim(),
        start.elapsed()
    );
    Ok((vocab, Arc::new(table)))
}

fn train(args: TrainArgs, store: &ModelStore, runtime: RuntimeConfig) -> Result<()> {
    let (vocab, table) = load_embeddings(&args.vectors)?;
    let train_set = LabeledSentences::from_file(&args.train, args.num_classes)
        .with_context(|| format!("Failed to read training data from {:?}", args.train))?;
    let test_set = match &args.test {
        Some(path) => Some(
            LabeledSentences::from_file(path, args.num_classes)
                .with_context(|| format!("Failed to read test data from {:?}", path))?,
        ),
        None => None,
    };

    let max_len = match args.max_len {
        Some(max_len) => max_len,
        None => SentenceEncoder::longest_sentence(train_set.sentences())?,
    };
    if max_len == 0 {
        bail!("Training data has no words to derive a sequence length from");
    }
    let encoder = SentenceEncoder::new(max_len)?;
    let sequences = encoder.encode_all(train_set.sentences(), &vocab)?;

    if args.baseline {
        let mut baseline = AveragingClassifier::new(Arc::clone(&table), args.num_classes, args.seed)?;
        baseline.train(&sequences, train_set.labels(), 400, 0.01)?;
        let evaluator = Evaluator::new(&baseline, &vocab, encoder);
        let train_eval = evaluator.evaluate(&sequences, train_set.labels())?;
        println!("Baseline training accuracy: {:.4}", train_eval.accuracy);
        if let Some(test_set) = &test_set {
            println!("Baseline test accuracy: {:.4}", evaluator.evaluate_sentences(test_set)?.accuracy);
        }
    }

    let mut classifier = RecurrentClassifier::builder()
        .with_runtime_config(runtime)
        .with_embeddings(table)
        .with_max_len(max_len)?
        .with_hidden_size(args.hidden_size)?
        .with_num_classes(args.num_classes)?
        .with_dropout(args.dropout)?
        .with_seed(args.seed)
        .build()?;
    let trainer = Trainer::new(TrainingConfig {
        epochs: args.epochs,
        batch_size: args.batch_size,
        shuffle: true,
        learning_rate: args.learning_rate,
        seed: args.seed,
    })?;

    let start = Instant::now();
    let report = trainer.train(&mut classifier, &sequences, train_set.labels())?;
    info!("Training finished in {:.2?}", start.elapsed());
    if let (Some(loss), Some(accuracy)) = (report.final_loss(), report.final_accuracy()) {
        println!("Final epoch: loss {:.4}, accuracy {:.4}", loss, accuracy);
    }

    let evaluator = Evaluator::for_recurrent(&classifier, &vocab)?;
    println!(
        "Training accuracy: {:.4}",
        evaluator.evaluate(&sequences, train_set.labels())?.accuracy
    );
    if let Some(test_set) = &test_set {
        let evaluation = evaluator.evaluate_sentences(test_set)?;
        println!("Test accuracy: {:.4}", evaluation.accuracy);
        println!("{}", evaluation.confusion);
        let emoji = EmojiMap::default();
        for wrong in evaluation.mislabeled(test_set) {
            println!(
                "Expected {} but predicted {}: {}",
                emoji.display(wrong.expected),
                emoji.display(wrong.predicted),
                wrong.sentence
            );
        }
    }

    let manifest = store.save(&args.name, &classifier, &vocab)?;
    println!(
        "Saved model '{}' to {:?} (weights sha256 {})",
        args.name,
        store.models_dir().join(&args.name),
        manifest.weights_sha256
    );
    Ok(())
}

fn predict(args: PredictArgs, store: &ModelStore, runtime: RuntimeConfig) -> Result<()> {
    let (vocab, table) = load_embeddings(&args.vectors)?;
    let classifier = store
        .load(&args.name, table, &vocab, runtime)
        .with_context(|| format!("Failed to load model '{}'", args.name))?;
    let evaluator = Evaluator::for_recurrent(&classifier, &vocab)?;
    let emoji = EmojiMap::default();
    for sentence in &args.sentences {
        let label = evaluator.predict(sentence)?;
        println!("{} {}", sentence, emoji.display(label));
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let runtime = RuntimeConfig {
        device: if cli.gpu { DevicePreference::Gpu } else { DevicePreference::Cpu },
    };
    let store = open_store(cli.models_dir.as_deref())?;

    match cli.command {
        Command::Train(args) => train(args, &store, runtime),
        Command::Predict(args) => predict(args, &store, runtime),
    }
}
