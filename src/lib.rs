mod config;
mod frame;
mod record;
mod paths;
mod zstd_jsonl;
mod loader;

mod filters;
mod progress;
mod concurrency;
mod util;
mod mem;
mod pipeline;
mod stats;

mod partition;
mod export;
mod corpus;

mod tokenize;
mod stopwords;
mod vocabulary;
mod text_pipeline;
mod timedelta;

pub use crate::config::{BuildOptions, FileConfig, DEFAULT_MIN_SENTENCE_LENGTH};
pub use crate::frame::{Cell, Frame, Row, SparseVector};
pub use crate::record::{parse_record, InvalidRedditType, RedditType, DELETED, OVERLAPPING_COLUMNS, REMOVED};
pub use crate::pipeline::{Community2Vec, CorpusBuilder};
pub use crate::stats::{ComparisonStats, SilentReporter, StatsReporter, TracingReporter};

// Filter/aggregate library over frames.
pub use crate::filters::{
    aggregate_contexts, aggregate_for_vectorization, exclude_top_percentage, filter_by_regex, filter_by_time_window,
    filter_out_top_users, filter_to_matching, join_threads, max_context_length, prefix_id_column, remove_deleted_authors,
    remove_deleted_text, rename_columns, top_n_counts, JoinSpec, COMMENTS_PREFIX, CONTEXT_LENGTH_COLUMN, COUNT_COLUMN,
    DEFAULT_TOP_N, DEFAULT_USER_EXCLUDE, FULLNAME_ID_COLUMN, TIME_DELTA_COLUMN, USER_PAGE_PATTERN,
};

// Input discovery and loading.
pub use crate::paths::{expand_inputs, Compression, InputFile};
pub use crate::loader::{load_files, load_records};

// Outputs.
pub use crate::export::{read_frame_dir, write_context_partitions, write_counts_csv, write_frame_dir, COLUMNS_FILE};
pub use crate::partition::PartitionWriters;
pub use crate::corpus::{Corpus, DOCUMENT_TEXT_COLUMN};

// Text preprocessing.
pub use crate::tokenize::{tokenize, Tokenizer, TOKEN_PATTERN};
pub use crate::stopwords::{StopLanguage, StopWords};
pub use crate::vocabulary::{DocFrequency, Vocabulary, VocabularyParams, DEFAULT_VOCAB_SIZE};
pub use crate::text_pipeline::{
    PipelineState, Stage, TextPipeline, TextPipelineBuilder, MANIFEST_FILE, NO_STOPWORDS_COLUMN, TOKENIZED_COLUMN,
    VOCABULARY_FILE,
};

pub use crate::timedelta::parse_time_delta;
pub use crate::mem::available_memory_fraction;
pub use crate::util::{init_tracing, init_tracing_once};
