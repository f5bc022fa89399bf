#[path = "common/mod.rs"]
mod common;

use common::*;
use redcorpus::{
    tokenize, Cell, Corpus, DocFrequency, StopLanguage, TextPipeline, Vocabulary, VocabularyParams, MANIFEST_FILE,
    VOCABULARY_FILE,
};
use std::collections::BTreeSet;

fn corpus_frame() -> redcorpus::Frame {
    Corpus::from_joined_threads(joined_threads(), None, None).unwrap().into_frame()
}

fn token_lists(frame: &redcorpus::Frame, col: &str) -> Vec<Vec<String>> {
    frame.column(col).unwrap().map(|c| c.as_tokens().unwrap().to_vec()).collect()
}

const TEXT_1: &str = "my first post post 1 text ain't this hard to tokenize #hashtag yo-yo www.reddit.com @someone some.one@email.com";
const TEXT_2: &str = "look this cute animal aww adorable";
const TEXT_3: &str = "emojis 😁 🥰";
const TEXT_1_FILTERED: &str = "first post post 1 text ain't hard tokenize #hashtag yo-yo www.reddit.com @someone some.one@email.com";
const TEXT_2_FILTERED: &str = "look cute animal aww adorable";

#[test]
fn tokenizer_keeps_reddit_shapes() {
    assert_eq!(
        tokenize("Ain't this hard to tokenize: #hashtag, yo-yo www.reddit.com?"),
        words("ain't this hard to tokenize #hashtag yo-yo www.reddit.com")
    );
    assert!(tokenize("").is_empty());
    assert_eq!(tokenize("10€ a pint"), words("10 € a pint"));
    assert!(tokenize("....!").is_empty());
}

/// Flags, skin tones and joined emoji stay whole; the joiner never leaks out alone.
#[test]
fn tokenizer_keeps_composite_emoji() {
    assert_eq!(
        tokenize("go \u{1F1FA}\u{1F1F8} team \u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467} \u{1F44D}\u{1F3FD}"),
        [
            "go",
            "\u{1F1FA}\u{1F1F8}",
            "team",
            "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}",
            "\u{1F44D}\u{1F3FD}",
        ]
    );
    assert_eq!(tokenize("love \u{2764}\u{FE0F}"), ["love", "\u{2764}\u{FE0F}"]);
    assert_eq!(tokenize("“quoted” words"), words("quoted words"));
}

/// Without stop words: tokens column then the output vectors; the index covers every token.
#[test]
fn pipeline_without_stop_words() {
    let mut pipeline = TextPipeline::builder("document_text", "vectorized")
        .stop_language(None)
        .max_doc_freq(1000.0)
        .min_doc_freq(0.0)
        .build()
        .unwrap();
    assert_eq!(pipeline.stages().len(), 3);

    let out = pipeline.fit_transform(corpus_frame()).unwrap();
    assert_eq!(out.columns(), ["id", "subreddit", "document_text", "tokenized", "vectorized"]);
    let tokens = token_lists(&out, "tokenized");
    assert_eq!(tokens[0], words(TEXT_1));
    assert_eq!(tokens[1], words(TEXT_2));
    assert!(tokens[2].is_empty());
    assert_eq!(tokens[3], words(TEXT_3));

    let vocabulary: BTreeSet<String> = [TEXT_1, TEXT_2, TEXT_3].iter().flat_map(|t| words(t)).collect();
    let index = pipeline.id_to_word().unwrap();
    assert_eq!(index.len(), vocabulary.len());
    assert_eq!(index.values().cloned().collect::<BTreeSet<_>>(), vocabulary);
    assert_eq!(index.keys().copied().collect::<Vec<_>>(), (0..vocabulary.len()).collect::<Vec<_>>());
}

/// With English stop words a filtered token column sits between tokens and vectors.
#[test]
fn pipeline_with_stop_words() {
    let mut pipeline = TextPipeline::builder("document_text", "vectorized")
        .max_doc_freq(1000.0)
        .min_doc_freq(0.0)
        .build()
        .unwrap();
    assert_eq!(pipeline.stages().len(), 4);

    let out = pipeline.fit_transform(corpus_frame()).unwrap();
    assert_eq!(
        out.columns(),
        ["id", "subreddit", "document_text", "tokenized", "tokensNoStopWords", "vectorized"]
    );
    let tokens = token_lists(&out, "tokenized");
    let filtered = token_lists(&out, "tokensNoStopWords");
    assert_eq!(tokens[0], words(TEXT_1));
    assert_eq!(filtered[0], words(TEXT_1_FILTERED));
    assert_eq!(tokens[1], words(TEXT_2));
    assert_eq!(filtered[1], words(TEXT_2_FILTERED));
    assert!(tokens[2].is_empty());
    assert_eq!(filtered[3], words(TEXT_3));

    let vocabulary: BTreeSet<String> =
        [TEXT_1_FILTERED, TEXT_2_FILTERED, TEXT_3].iter().flat_map(|t| words(t)).collect();
    let index = pipeline.id_to_word().unwrap();
    assert_eq!(index.values().cloned().collect::<BTreeSet<_>>(), vocabulary);
    assert_eq!(*index.keys().last().unwrap(), vocabulary.len() - 1);
}

/// Vectors hold raw counts keyed by the fitted ids.
#[test]
fn index_words() {
    let mut pipeline = TextPipeline::builder("document_text", "vectorized").stop_language(None).build().unwrap();
    let corpus = Corpus::new(pipeline.fit_transform(simple_docs()).unwrap());

    let docs: Vec<_> = corpus.vectorized_column_iter("vectorized").unwrap().collect();
    let inv = pipeline.word_to_id().unwrap();
    let (a, b) = (inv["a"], inv["b"]);
    assert_eq!((a, b), (0, 1)); // a occurs 5 times, b 4
    assert_eq!(docs[0], ("a1".to_string(), vec![(a, 3.0)]));
    assert_eq!(docs[1].1, vec![(b, 3.0)]);
    assert_eq!(docs[2].1, vec![(a, 2.0), (b, 1.0)]);
}

/// A saved pipeline reloads with the same index and transforms the same way.
#[test]
fn save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut saved = TextPipeline::new("document_text", "vectorized").unwrap();
    let fitted = saved.fit_transform(simple_docs()).unwrap();
    saved.save(dir.path()).unwrap();
    assert!(dir.path().join(MANIFEST_FILE).exists());
    assert!(dir.path().join(VOCABULARY_FILE).exists());

    let loaded = TextPipeline::load(dir.path()).unwrap();
    assert!(loaded.is_fitted());
    assert_eq!(loaded.stages(), saved.stages());
    assert_eq!(loaded.id_to_word().unwrap(), saved.id_to_word().unwrap());
    assert_eq!(loaded.transform(simple_docs()).unwrap(), fitted);
}

/// Loading names the artifact that is missing.
#[test]
fn load_reports_missing_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let err = TextPipeline::load(dir.path()).unwrap_err();
    assert!(format!("{err:#}").contains(MANIFEST_FILE), "{err:#}");

    let mut p = TextPipeline::new("document_text", "vectorized").unwrap();
    p.fit_transform(simple_docs()).unwrap();
    p.save(dir.path()).unwrap();
    std::fs::remove_file(dir.path().join(VOCABULARY_FILE)).unwrap();
    let err = TextPipeline::load(dir.path()).unwrap_err();
    assert!(format!("{err:#}").contains(VOCABULARY_FILE), "{err:#}");
}

/// An unfitted pipeline cannot transform or expose an index; an unfitted save reloads unfitted.
#[test]
fn transform_requires_fit() {
    let p = TextPipeline::new("document_text", "vectorized").unwrap();
    assert!(p.transform(simple_docs()).is_err());
    assert!(p.id_to_word().is_err());

    let dir = tempfile::tempdir().unwrap();
    p.save(dir.path()).unwrap();
    assert!(!dir.path().join(VOCABULARY_FILE).exists());
    assert!(!TextPipeline::load(dir.path()).unwrap().is_fitted());
}

/// Refitting replaces the vocabulary with one from the new data.
#[test]
fn fit_transform_refits() {
    let mut p = TextPipeline::builder("document_text", "vectorized").stop_language(None).build().unwrap();
    p.fit_transform(simple_docs()).unwrap();
    assert_eq!(p.vocabulary().unwrap().len(), 2);
    p.fit_transform(corpus_frame()).unwrap();
    assert!(p.word_to_id().unwrap().contains_key("emojis"));
    assert!(!p.word_to_id().unwrap().contains_key("b"));
}

/// Document-frequency bounds: counts at or above one, fractions below.
#[test]
fn vocabulary_bounds_and_order() {
    assert_eq!(DocFrequency::from(2.0), DocFrequency::Count(2));
    assert_eq!(DocFrequency::from(0.5), DocFrequency::Fraction(0.5));

    let docs = vec![words("x y z"), words("x y"), words("x q q q")];
    let all = Vocabulary::fit(&docs, &VocabularyParams::default()).unwrap();
    // q: 3 occurrences, x: 3, y: 2, z: 1; ties by term
    assert_eq!(all.terms(), ["q", "x", "y", "z"]);

    let common = Vocabulary::fit(
        &docs,
        &VocabularyParams { min_df: DocFrequency::Count(2), ..VocabularyParams::default() },
    )
    .unwrap();
    assert_eq!(common.terms(), ["x", "y"]);

    let rare = Vocabulary::fit(
        &docs,
        &VocabularyParams { max_df: DocFrequency::Fraction(0.5), ..VocabularyParams::default() },
    )
    .unwrap();
    assert_eq!(rare.terms(), ["q", "z"]);

    let capped = Vocabulary::fit(&docs, &VocabularyParams { vocab_size: 1, ..VocabularyParams::default() }).unwrap();
    assert_eq!(capped.terms(), ["q"]);
}

#[test]
fn stop_language_names() {
    assert_eq!("English".parse::<StopLanguage>().unwrap(), StopLanguage::English);
    assert!("klingon".parse::<StopLanguage>().is_err());
}

/// Null text is an empty document; non-text input is an error.
#[test]
fn non_text_input_is_rejected() {
    let frame = redcorpus::Frame::new(
        vec!["id".into(), "document_text".into()],
        vec![vec![Cell::from("a"), Cell::Null], vec![Cell::from("b"), Cell::Int(3)]],
    )
    .unwrap();
    let mut p = TextPipeline::new("document_text", "vectorized").unwrap();
    assert!(p.fit_transform(frame).is_err());
}
