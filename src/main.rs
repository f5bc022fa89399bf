use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use redcorpus::{init_tracing, parse_time_delta, BuildOptions, CorpusBuilder, FileConfig, RedditType};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "redcorpus", version, about = "Build community2vec and bag-of-words corpora from Reddit dumps")]
struct Cli {
    /// Skip statistics and previews
    #[arg(long, global = true)]
    quiet: bool,

    /// JSON config file applied over the defaults (flags still win)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show progress bars while loading input
    #[arg(long, global = true)]
    progress: bool,

    /// Worker threads (default: all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Per-author subreddit sentences for community2vec training
    C2v {
        /// CSV of `subreddit,count` for the kept subreddits
        subreddit_counts_csv: PathBuf,
        /// Directory for the zstd-compressed sentence partitions
        context_output_dir: PathBuf,
        /// Input files or directories (NDJSON, optionally .zst)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Type of the input records
        #[arg(short = 't', long = "type", default_value = "comments")]
        reddit_type: RedditType,
        /// Number of most popular subreddits to keep
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
        /// Fraction of the most active users to drop
        #[arg(short = 'p', long = "exclude-top-user-perc")]
        exclude_top_perc: Option<f64>,
        /// Shortest sentence kept
        #[arg(long)]
        min_sentence_length: Option<usize>,
    },
    /// Joined submission/comment threads for bag-of-words models
    Bow {
        /// Output directory for the partitioned frame
        output_dir: PathBuf,
        /// Submission files or directories
        #[arg(short = 's', long, required = true, num_args = 1..)]
        submissions: Vec<PathBuf>,
        /// Comment files or directories
        #[arg(short = 'c', long, required = true, num_args = 1..)]
        comments: Vec<PathBuf>,
        /// Keep comments posted strictly before this delay (e.g. 3600, 1d2h, 26:30:02)
        #[arg(short = 'x', long, value_parser = parse_delta)]
        max_time_delta: Option<i64>,
        /// Keep comments posted strictly after this delay; needs --max-time-delta
        #[arg(short = 'm', long, value_parser = parse_delta)]
        min_time_delta: Option<i64>,
        /// Number of most popular subreddits to keep
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
        /// Record type whose subreddit counts pick the top N
        #[arg(short = 't', long = "type-for-top-n", default_value = "comments")]
        type_for_top_n: RedditType,
        /// Fraction of the most active commenters to drop
        #[arg(short = 'p', long = "exclude-top-user-perc")]
        exclude_top_perc: Option<f64>,
    },
}

fn parse_delta(s: &str) -> Result<i64, String> {
    parse_time_delta(s).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // No-op unless the failure happened before logging was configured.
            init_tracing(None);
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let file_cfg = match &cli.config {
        Some(p) => FileConfig::load(p)?,
        None => FileConfig::default(),
    };
    init_tracing(file_cfg.log_level.as_deref());

    let mut opts = file_cfg.apply(BuildOptions::default()).with_quiet(cli.quiet);
    if cli.progress {
        opts = opts.with_progress(true);
    }
    if let Some(n) = cli.threads {
        opts = opts.with_parallelism(n);
    }

    match cli.command {
        Command::C2v {
            subreddit_counts_csv,
            context_output_dir,
            inputs,
            reddit_type,
            top_n,
            exclude_top_perc,
            min_sentence_length,
        } => {
            if let Some(n) = top_n {
                opts = opts.with_top_n(n);
            }
            if let Some(p) = exclude_top_perc {
                opts = opts.with_exclude_top_perc(p);
            }
            if let Some(n) = min_sentence_length {
                opts = opts.with_min_sentence_length(n);
            }
            let builder = CorpusBuilder::with_options(opts.clone());
            let dataset = builder
                .community2vec(&inputs, reddit_type.as_str())
                .with_context(|| format!("community2vec over {inputs:?}"))?;
            let parts = dataset
                .write(&subreddit_counts_csv, &context_output_dir, &opts)
                .context("writing community2vec outputs")?;
            tracing::info!(
                counts = %subreddit_counts_csv.display(),
                contexts = %context_output_dir.display(),
                parts = parts.len(),
                "community2vec done"
            );
        }
        Command::Bow {
            output_dir,
            submissions,
            comments,
            max_time_delta,
            min_time_delta,
            top_n,
            type_for_top_n,
            exclude_top_perc,
        } => {
            if let Some(n) = top_n {
                opts = opts.with_top_n(n);
            }
            if let Some(p) = exclude_top_perc {
                opts = opts.with_exclude_top_perc(p);
            }
            if max_time_delta.is_some() || min_time_delta.is_some() {
                if max_time_delta.is_none() {
                    tracing::warn!("--min-time-delta has no effect without --max-time-delta");
                }
                opts = opts.with_time_window(min_time_delta, max_time_delta);
            }
            let builder = CorpusBuilder::with_options(opts);
            let joined = builder
                .bag_of_words(&comments, &submissions, type_for_top_n.as_str())
                .with_context(|| format!("bag-of-words over submissions {submissions:?} and comments {comments:?}"))?;
            let parts = builder
                .write_bag_of_words(&joined, &output_dir)
                .with_context(|| format!("writing {}", output_dir.display()))?;
            tracing::info!(output = %output_dir.display(), rows = joined.len(), parts = parts.len(), "bag-of-words done");
        }
    }
    Ok(())
}
