//! Tokenize → (stop words) → vocabulary → count vectors, with save/load.

use crate::frame::{Cell, Frame};
use crate::stopwords::{StopLanguage, StopWords};
use crate::tokenize::{Tokenizer, TOKEN_PATTERN};
use crate::util::{open_with_backoff, write_json_atomic};
use crate::vocabulary::{DocFrequency, Vocabulary, VocabularyParams, DEFAULT_VOCAB_SIZE};
use anyhow::{anyhow, bail, Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

pub const TOKENIZED_COLUMN: &str = "tokenized";
pub const NO_STOPWORDS_COLUMN: &str = "tokensNoStopWords";
pub const MANIFEST_FILE: &str = "pipeline.json";
pub const VOCABULARY_FILE: &str = "vocabulary.json";
const FORMAT_VERSION: u32 = 1;

/// One pipeline step and its configuration, in execution order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    Tokenize { input: String, output: String, pattern: String, lowercase: bool },
    RemoveStopWords { input: String, output: String, language: StopLanguage },
    IndexVocabulary { input: String, params: VocabularyParams },
    Vectorize { input: String, output: String },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Tokenize { .. } => "tokenize",
            Stage::RemoveStopWords { .. } => "remove_stop_words",
            Stage::IndexVocabulary { .. } => "index_vocabulary",
            Stage::Vectorize { .. } => "vectorize",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PipelineState {
    Unfit,
    Fitted(Vocabulary),
}

#[derive(Serialize, Deserialize)]
struct Manifest {
    format_version: u32,
    crate_version: String,
    fitted: bool,
    stages: Vec<Stage>,
}

/// A text preprocessing pipeline over one text column of a frame.
#[derive(Clone, Debug)]
pub struct TextPipeline {
    stages: Vec<Stage>,
    state: PipelineState,
    tokenizer: Tokenizer,
    stop_words: Option<StopWords>,
}

/// Configures a [`TextPipeline`]; English stop words are removed unless disabled.
#[derive(Clone, Debug)]
pub struct TextPipelineBuilder {
    input: String,
    output: String,
    token_pattern: String,
    lowercase: bool,
    stop_language: Option<StopLanguage>,
    params: VocabularyParams,
}

impl TextPipelineBuilder {
    pub fn stop_language(mut self, lang: Option<StopLanguage>) -> Self { self.stop_language = lang; self }
    pub fn min_doc_freq(mut self, v: impl Into<DocFrequency>) -> Self { self.params.min_df = v.into(); self }
    pub fn max_doc_freq(mut self, v: impl Into<DocFrequency>) -> Self { self.params.max_df = v.into(); self }
    pub fn vocab_size(mut self, n: usize) -> Self { self.params.vocab_size = n; self }
    pub fn token_pattern(mut self, pattern: impl Into<String>) -> Self { self.token_pattern = pattern.into(); self }
    pub fn lowercase(mut self, yes: bool) -> Self { self.lowercase = yes; self }

    pub fn build(self) -> Result<TextPipeline> {
        let mut stages = vec![Stage::Tokenize {
            input: self.input,
            output: TOKENIZED_COLUMN.to_string(),
            pattern: self.token_pattern,
            lowercase: self.lowercase,
        }];
        let mut last = TOKENIZED_COLUMN.to_string();
        if let Some(language) = self.stop_language {
            stages.push(Stage::RemoveStopWords { input: last, output: NO_STOPWORDS_COLUMN.to_string(), language });
            last = NO_STOPWORDS_COLUMN.to_string();
        }
        stages.push(Stage::IndexVocabulary { input: last.clone(), params: self.params });
        stages.push(Stage::Vectorize { input: last, output: self.output });
        TextPipeline::from_stages(stages, PipelineState::Unfit)
    }
}

impl TextPipeline {
    pub fn builder(input: impl Into<String>, output: impl Into<String>) -> TextPipelineBuilder {
        TextPipelineBuilder {
            input: input.into(),
            output: output.into(),
            token_pattern: TOKEN_PATTERN.to_string(),
            lowercase: true,
            stop_language: Some(StopLanguage::English),
            params: VocabularyParams { vocab_size: DEFAULT_VOCAB_SIZE, ..VocabularyParams::default() },
        }
    }

    /// Default pipeline: English stop words, `min_df = 1`, `max_df = 100%`.
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Result<Self> {
        Self::builder(input, output).build()
    }

    fn from_stages(stages: Vec<Stage>, state: PipelineState) -> Result<Self> {
        let mut tokenizer = None;
        let mut stop_words = None;
        let mut has_index = false;
        let mut has_vectorize = false;
        for s in &stages {
            match s {
                Stage::Tokenize { pattern, lowercase, .. } => tokenizer = Some(Tokenizer::new(pattern, *lowercase)?),
                Stage::RemoveStopWords { language, .. } => stop_words = Some(StopWords::for_language(*language)),
                Stage::IndexVocabulary { .. } => has_index = true,
                Stage::Vectorize { .. } => has_vectorize = true,
            }
        }
        let tokenizer = tokenizer.ok_or_else(|| anyhow!("pipeline has no tokenize stage"))?;
        if !has_index || !has_vectorize {
            bail!("pipeline needs both an index_vocabulary and a vectorize stage");
        }
        Ok(Self { stages, state, tokenizer, stop_words })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self.state, PipelineState::Fitted(_))
    }

    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        match &self.state {
            PipelineState::Fitted(v) => Some(v),
            PipelineState::Unfit => None,
        }
    }

    fn fitted_vocabulary(&self) -> Result<&Vocabulary> {
        self.vocabulary().ok_or_else(|| anyhow!("text pipeline has not been fitted"))
    }

    pub fn word_to_id(&self) -> Result<HashMap<String, usize>> {
        Ok(self.fitted_vocabulary()?.word_to_id())
    }

    pub fn id_to_word(&self) -> Result<BTreeMap<usize, String>> {
        Ok(self.fitted_vocabulary()?.id_to_word())
    }

    /// Fit the vocabulary on `frame` (replacing any earlier fit), then transform it.
    pub fn fit_transform(&mut self, frame: Frame) -> Result<Frame> {
        let tokenized = self.tokenize_stages(frame)?;
        let vocab = self.fit_vocabulary(&tokenized)?;
        if let PipelineState::Fitted(old) = &self.state {
            info!(old_terms = old.len(), new_terms = vocab.len(), "refitting text pipeline; vocabulary replaced");
        } else {
            info!(terms = vocab.len(), documents = tokenized.len(), "fitted text pipeline");
        }
        self.state = PipelineState::Fitted(vocab);
        self.vectorize_stage(tokenized)
    }

    /// Apply a fitted pipeline to `frame`.
    pub fn transform(&self, frame: Frame) -> Result<Frame> {
        self.fitted_vocabulary()?;
        let tokenized = self.tokenize_stages(frame)?;
        self.vectorize_stage(tokenized)
    }

    fn tokenize_stages(&self, mut frame: Frame) -> Result<Frame> {
        for stage in &self.stages {
            match stage {
                Stage::Tokenize { input, output, .. } => {
                    let idx = frame.column_index(input).with_context(|| format!("stage {}", stage.name()))?;
                    let tokens = frame
                        .rows()
                        .par_iter()
                        .map(|r| match &r[idx] {
                            Cell::Str(s) => Ok(Cell::Tokens(self.tokenizer.tokenize(s))),
                            Cell::Null => Ok(Cell::Tokens(Vec::new())),
                            other => Err(anyhow!("column '{input}' holds non-text value {other}")),
                        })
                        .collect::<Result<Vec<Cell>>>()?;
                    frame = frame.append_column(output, tokens)?;
                }
                Stage::RemoveStopWords { input, output, .. } => {
                    let Some(stop) = &self.stop_words else { continue };
                    let idx = frame.column_index(input).with_context(|| format!("stage {}", stage.name()))?;
                    let kept = frame
                        .rows()
                        .par_iter()
                        .map(|r| Cell::Tokens(stop.filter(r[idx].as_tokens().unwrap_or_default())))
                        .collect();
                    frame = frame.append_column(output, kept)?;
                }
                Stage::IndexVocabulary { .. } | Stage::Vectorize { .. } => {}
            }
        }
        Ok(frame)
    }

    fn fit_vocabulary(&self, frame: &Frame) -> Result<Vocabulary> {
        let Some((input, params)) = self.stages.iter().find_map(|s| match s {
            Stage::IndexVocabulary { input, params } => Some((input, params)),
            _ => None,
        }) else {
            bail!("pipeline has no index_vocabulary stage");
        };
        let docs: Vec<&[String]> = frame
            .column(input)
            .context("stage index_vocabulary")?
            .map(|c| c.as_tokens().unwrap_or_default())
            .collect();
        Vocabulary::fit(&docs, params)
    }

    fn vectorize_stage(&self, frame: Frame) -> Result<Frame> {
        let vocab = self.fitted_vocabulary()?;
        let Some((input, output)) = self.stages.iter().find_map(|s| match s {
            Stage::Vectorize { input, output } => Some((input, output)),
            _ => None,
        }) else {
            bail!("pipeline has no vectorize stage");
        };
        let idx = frame.column_index(input).context("stage vectorize")?;
        let vectors = frame
            .rows()
            .par_iter()
            .map(|r| Cell::Vector(vocab.vectorize(r[idx].as_tokens().unwrap_or_default())))
            .collect();
        debug!(documents = frame.len(), "vectorized");
        frame.append_column(output, vectors)
    }

    /// Write `pipeline.json` and, when fitted, `vocabulary.json` into `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            fitted: self.is_fitted(),
            stages: self.stages.clone(),
        };
        if let Some(vocab) = self.vocabulary() {
            write_json_atomic(&dir.join(VOCABULARY_FILE), vocab)?;
        }
        write_json_atomic(&dir.join(MANIFEST_FILE), &manifest)?;
        info!(dir = %dir.display(), fitted = manifest.fitted, "saved text pipeline");
        Ok(())
    }

    /// Restore a pipeline written by [`save`](Self::save).
    pub fn load(dir: &Path) -> Result<Self> {
        let manifest: Manifest = read_artifact(&dir.join(MANIFEST_FILE))?;
        if manifest.format_version != FORMAT_VERSION {
            bail!(
                "unsupported pipeline format version {} in {} (expected {FORMAT_VERSION})",
                manifest.format_version,
                dir.display()
            );
        }
        let state = if manifest.fitted {
            PipelineState::Fitted(read_artifact(&dir.join(VOCABULARY_FILE))?)
        } else {
            PipelineState::Unfit
        };
        Self::from_stages(manifest.stages, state).with_context(|| format!("invalid pipeline in {}", dir.display()))
    }
}

fn read_artifact<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let f = open_with_backoff(path, 4, 50).with_context(|| format!("missing pipeline artifact {}", path.display()))?;
    serde_json::from_reader(BufReader::new(f)).with_context(|| format!("corrupt pipeline artifact {}", path.display()))
}
