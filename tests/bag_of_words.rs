#[path = "common/mod.rs"]
mod common;

use common::*;
use redcorpus::{read_frame_dir, Cell, CorpusBuilder, Frame, RedditType, COLUMNS_FILE};

fn builder() -> CorpusBuilder {
    CorpusBuilder::new().quiet(true).exclude_top_perc(0.0).top_n(2)
}

fn build(b: CorpusBuilder) -> Frame {
    b.bag_of_words_from_frames(
        frame_of(RedditType::Comments, &bow_comments()),
        frame_of(RedditType::Submissions, &bow_submissions()),
        RedditType::Comments,
    )
    .unwrap()
}

/// Submission columns first, then comment columns with the shared ones prefixed,
/// then the comment delay.
#[test]
fn joined_columns_and_time_delta() {
    let joined = build(builder());
    assert_eq!(
        joined.columns(),
        [
            "author", "created_utc", "id", "score", "selftext", "title", "url", "subreddit", "fullname_id",
            "comments_id", "parent_id", "comments_score", "link_id", "comments_author", "comments_subreddit", "body",
            "comments_created_utc", "time_to_comment_in_seconds",
        ]
    );
    assert_eq!(strings(&joined, "comments_id"), ["k1", "k2", "k3"]);
    assert_eq!(strings(&joined, "id"), ["s1", "s1", "s2"]);
    assert_eq!(strings(&joined, "fullname_id"), ["t3_s1", "t3_s1", "t3_s2"]);
    assert_eq!(strings(&joined, "time_to_comment_in_seconds"), ["100", "700", "50"]);
    // s2 carried its timestamp as a string
    assert_eq!(joined.cell(2, "created_utc").unwrap(), &Cell::Int(2000));
}

/// The window is open on both ends and only applies once a maximum is set.
#[test]
fn time_window_filters_comments() {
    let both = build(builder().time_window(Some(60), Some(500)));
    assert_eq!(strings(&both, "comments_id"), ["k1"]);

    let max_only = build(builder().time_window(None, Some(500)));
    assert_eq!(strings(&max_only, "comments_id"), ["k1", "k3"]);

    let min_only = build(builder().time_window(Some(60), None));
    assert_eq!(min_only.len(), 3);
}

/// Top users are cut from the comments only; submission authors stay.
#[test]
fn top_user_exclusion_applies_to_comments_only() {
    // alice (3 clean comments) outranks bob (1)
    let joined = build(builder().exclude_top_perc(0.4));
    assert_eq!(strings(&joined, "comments_author"), ["bob"]);
    assert_eq!(strings(&joined, "author"), ["op1"]);
}

/// Picking the top N from submissions changes which threads survive.
#[test]
fn top_n_from_submissions() {
    let joined = builder()
        .top_n(1)
        .bag_of_words_from_frames(
            frame_of(RedditType::Comments, &bow_comments()),
            frame_of(RedditType::Submissions, &bow_submissions()),
            RedditType::Submissions,
        )
        .unwrap();
    // AskReddit has two submissions (s1, s5) and wins outright
    assert_eq!(strings(&joined, "subreddit"), ["AskReddit", "AskReddit"]);
    assert_eq!(strings(&joined, "comments_id"), ["k1", "k2"]);
}

/// Files in, partitioned frame directory out, and back again.
#[test]
fn bag_of_words_round_trips_through_frame_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let (subs, comments) = make_bow_dirs(tmp.path());
    let b = builder().output_partitions(2);
    let joined = b.bag_of_words(&[comments], &[subs], "comments").unwrap();
    assert_eq!(joined, build(builder()));

    let out = tmp.path().join("bow");
    let parts = b.write_bag_of_words(&joined, &out).unwrap();
    assert_eq!(parts.len(), 2);
    assert!(out.join(COLUMNS_FILE).exists());

    let back = read_frame_dir(&out).unwrap();
    assert_eq!(back.columns(), joined.columns());
    let mut got: Vec<_> = back.rows().to_vec();
    let mut want: Vec<_> = joined.rows().to_vec();
    let key = |r: &Vec<Cell>| r[9].to_string();
    got.sort_by_key(key);
    want.sort_by_key(key);
    assert_eq!(got, want);
}

/// Nothing in common is an empty result, not an error.
#[test]
fn empty_join_is_not_an_error() {
    let joined = builder()
        .bag_of_words_from_frames(
            Frame::empty(RedditType::Comments.columns()),
            frame_of(RedditType::Submissions, &bow_submissions()),
            RedditType::Submissions,
        )
        .unwrap();
    assert!(joined.is_empty());
    assert!(joined.has_column("time_to_comment_in_seconds"));
}
