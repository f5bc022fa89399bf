#[path = "common/mod.rs"]
mod common;

use common::*;
use redcorpus::{
    aggregate_contexts, aggregate_for_vectorization, exclude_top_percentage, filter_by_regex, filter_by_time_window,
    filter_out_top_users, filter_to_matching, join_threads, max_context_length, prefix_id_column, remove_deleted_authors,
    remove_deleted_text, rename_columns, top_n_counts, Cell, Frame, JoinSpec, RedditType, USER_PAGE_PATTERN,
};
use serde_json::json;

fn one_col(name: &str, values: &[&str]) -> Frame {
    let rows: Vec<_> = values.iter().map(|v| json!({ name: v })).collect();
    Frame::from_json_rows(&[name], &rows).unwrap()
}

fn counts(values: &[i64]) -> Frame {
    let rows: Vec<_> = values.iter().enumerate().map(|(i, v)| json!({"key": i, "count": v})).collect();
    Frame::from_json_rows(&["key", "count"], &rows).unwrap()
}

/// Ties on count are broken by value ascending, and `n` caps the table.
#[test]
fn top_n_orders_by_count_then_value() {
    let f = one_col("subreddit", &["b", "b", "a", "c", "a", "d", "d", "d"]);
    let top = top_n_counts(&f, "subreddit", 3).unwrap();
    assert_eq!(top.columns(), ["subreddit", "count"]);
    assert_eq!(strings(&top, "subreddit"), ["d", "a", "b"]);
    assert_eq!(strings(&top, "count"), ["3", "2", "2"]);

    let all = top_n_counts(&f, "subreddit", 100).unwrap();
    assert_eq!(all.len(), 4);
}

/// Null keys are not counted.
#[test]
fn top_n_ignores_nulls() {
    let f = Frame::from_json_rows(&["subreddit"], &[json!({"subreddit": null}), json!({"subreddit": "a"})]).unwrap();
    let top = top_n_counts(&f, "subreddit", 10).unwrap();
    assert_eq!(strings(&top, "subreddit"), ["a"]);
}

/// Unknown columns are reported by name.
#[test]
fn unknown_column_is_named_in_error() {
    let f = one_col("subreddit", &["a"]);
    let err = top_n_counts(&f, "nope", 1).unwrap_err();
    assert!(err.to_string().contains("nope"), "{err}");
}

/// A semi-join keeps each matching row exactly once, whatever the key multiplicity,
/// and applying it twice changes nothing.
#[test]
fn filter_to_matching_is_a_semi_join() {
    let f = one_col("subreddit", &["a", "b", "a", "c"]);
    let keys = one_col("subreddit", &["a", "a", "c", "z"]);
    let once = filter_to_matching(f, &keys, "subreddit").unwrap();
    assert_eq!(strings(&once, "subreddit"), ["a", "a", "c"]);
    let twice = filter_to_matching(once.clone(), &keys, "subreddit").unwrap();
    assert_eq!(once, twice);
}

/// Regex filtering uses search semantics and drops nulls in both modes.
#[test]
fn regex_filter_both_modes() {
    let rows = vec![
        json!({"subreddit": "u_alice"}),
        json!({"subreddit": "AskReddit"}),
        json!({"subreddit": null}),
        json!({"subreddit": "menu_u_"}),
    ];
    let f = Frame::from_json_rows(&["subreddit"], &rows).unwrap();

    let kept = filter_by_regex(f.clone(), "subreddit", USER_PAGE_PATTERN, true).unwrap();
    assert_eq!(strings(&kept, "subreddit"), ["AskReddit", "menu_u_"]);

    let users = filter_by_regex(f.clone(), "subreddit", USER_PAGE_PATTERN, false).unwrap();
    assert_eq!(strings(&users, "subreddit"), ["u_alice"]);

    let anywhere = filter_by_regex(f.clone(), "subreddit", "u_", false).unwrap();
    assert_eq!(strings(&anywhere, "subreddit"), ["u_alice", "menu_u_"]);

    assert!(filter_by_regex(f, "subreddit", "(unclosed", false).is_err());
}

/// Deleted authors go; deleted/removed text goes from the main text field of each type.
#[test]
fn deleted_content_removal() {
    let comments = frame_of(RedditType::Comments, &c2v_comments());
    let no_deleted_authors = remove_deleted_authors(comments.clone()).unwrap();
    assert_eq!(no_deleted_authors.len(), 11);

    let no_deleted_text = remove_deleted_text(comments, RedditType::Comments).unwrap();
    // c7, c8 ([deleted]) and c13 ([removed])
    assert_eq!(no_deleted_text.len(), 10);
    assert!(!strings(&no_deleted_text, "id").contains(&"c13".to_string()));

    let subs = frame_of(RedditType::Submissions, &bow_submissions());
    let clean = remove_deleted_text(subs, RedditType::Submissions).unwrap();
    assert_eq!(strings(&clean, "id"), ["s1", "s2", "s4"]);
}

/// With counts 1..=20 and a 5% cut only the single largest row is dropped.
#[test]
fn exclude_top_percentage_drops_the_top_rank() {
    let values: Vec<i64> = (1..=20).rev().collect();
    let out = exclude_top_percentage(counts(&values), "count", 0.05).unwrap();
    assert_eq!(out.len(), 19);
    assert!(out.column("count").unwrap().all(|c| c.as_i64() != Some(20)));
    // input order preserved, no helper column
    assert_eq!(out.columns(), ["key", "count"]);
    assert_eq!(out.cell(0, "count").unwrap(), &Cell::Int(19));
}

/// Ties share a rank; zero is the identity; a single row is never dropped.
#[test]
fn exclude_top_percentage_edges() {
    let tied = counts(&[5, 5, 1]);
    assert_eq!(exclude_top_percentage(tied.clone(), "count", 0.5).unwrap().len(), 3);
    assert_eq!(strings(&exclude_top_percentage(tied.clone(), "count", 0.6).unwrap(), "count"), ["1"]);
    assert_eq!(exclude_top_percentage(tied.clone(), "count", 0.0).unwrap(), tied);

    // near and at the top only rank-0 rows survive
    let spread = counts(&[1, 2, 3, 1]);
    assert_eq!(strings(&exclude_top_percentage(spread.clone(), "count", 1.0).unwrap(), "key"), ["0", "3"]);
    assert_eq!(strings(&exclude_top_percentage(spread.clone(), "count", 0.99).unwrap(), "key"), ["0", "3"]);
    assert_eq!(strings(&exclude_top_percentage(spread, "count", 0.5).unwrap(), "count"), ["1", "2", "1"]);

    let single = counts(&[42]);
    assert_eq!(exclude_top_percentage(single, "count", 1.0).unwrap().len(), 1);

    assert!(exclude_top_percentage(tied.clone(), "count", 1.5).is_err());
    assert!(exclude_top_percentage(tied, "count", -0.1).is_err());
}

/// Every row of the most active author goes; other authors are untouched.
#[test]
fn filter_out_top_users_drops_whole_authors() {
    let f = one_col("author", &["alice", "bob", "alice", "carol", "alice"]);
    let out = filter_out_top_users(f.clone(), "author", 0.4).unwrap();
    assert_eq!(strings(&out, "author"), ["bob", "carol"]);
    assert_eq!(filter_out_top_users(f.clone(), "author", 0.0).unwrap(), f);
}

/// Per-author sentences in encounter order, short ones dropped, only the concat column left.
#[test]
fn aggregate_for_vectorization_groups_in_order() {
    let rows = vec![
        json!({"author": "alice", "subreddit": "AskReddit"}),
        json!({"author": "bob", "subreddit": "aww"}),
        json!({"author": "alice", "subreddit": "news"}),
        json!({"author": "carol", "subreddit": "aww"}),
        json!({"author": "carol", "subreddit": "pics"}),
        json!({"author": "alice", "subreddit": "aww"}),
    ];
    let f = Frame::from_json_rows(&["author", "subreddit"], &rows).unwrap();

    let contexts = aggregate_contexts(f.clone(), "author", "subreddit", 2, 0.0).unwrap();
    assert_eq!(contexts.columns(), ["subreddit_concat", "context_length"]);
    assert_eq!(strings(&contexts, "subreddit_concat"), ["AskReddit news aww", "aww pics"]);
    assert_eq!(max_context_length(&contexts, "context_length").unwrap(), Some(3));

    let only_text = aggregate_for_vectorization(f.clone(), "author", "subreddit", 2, 0.0).unwrap();
    assert_eq!(only_text.columns(), ["subreddit_concat"]);

    // The top third by length (alice) is cut before the length filter applies.
    let trimmed = aggregate_for_vectorization(f, "author", "subreddit", 1, 0.34).unwrap();
    assert_eq!(strings(&trimmed, "subreddit_concat"), ["aww", "aww pics"]);
}

/// Prefixing builds fullname ids; renaming skips absent columns.
#[test]
fn prefix_and_rename() {
    let f = Frame::from_json_rows(&["id", "author"], &[json!({"id": "abc", "author": "x"})]).unwrap();
    let f = prefix_id_column(f, "t3_", "id", "fullname_id").unwrap();
    assert_eq!(strings(&f, "fullname_id"), ["t3_abc"]);

    let f = rename_columns(f, &["id", "missing"], "comments").unwrap();
    assert_eq!(f.columns(), ["comments_id", "author", "fullname_id"]);
}

/// Bounds are strict and optional; nulls never pass once a bound is set.
#[test]
fn time_window_bounds() {
    let rows: Vec<_> = [Some(10), Some(20), Some(100), Some(500), None]
        .iter()
        .map(|v| json!({"time_to_comment_in_seconds": v}))
        .collect();
    let f = Frame::from_json_rows(&["time_to_comment_in_seconds"], &rows).unwrap();
    let col = "time_to_comment_in_seconds";

    let both = filter_by_time_window(f.clone(), Some(20), Some(500), col).unwrap();
    assert_eq!(strings(&both, col), ["100"]);

    let max_only = filter_by_time_window(f.clone(), None, Some(500), col).unwrap();
    assert_eq!(strings(&max_only, col), ["10", "20", "100"]);

    let zero_min = filter_by_time_window(f.clone(), Some(0), None, col).unwrap();
    assert_eq!(zero_min.len(), 4);

    assert_eq!(filter_by_time_window(f.clone(), None, None, col).unwrap(), f);
}

/// A delay that does not fit in an i64 is null rather than wrapped.
#[test]
fn join_time_delta_out_of_range_is_null() {
    let subs = Frame::from_json_rows(
        &["fullname_id", "created_utc"],
        &[json!({"fullname_id": "t3_a", "created_utc": -10}), json!({"fullname_id": "t3_b", "created_utc": 100})],
    )
    .unwrap();
    let comments = Frame::from_json_rows(
        &["id", "link_id", "created_utc"],
        &[
            json!({"id": "k1", "link_id": "t3_a", "created_utc": i64::MAX}),
            json!({"id": "k2", "link_id": "t3_b", "created_utc": 160}),
        ],
    )
    .unwrap();
    let joined = join_threads(subs, comments, &JoinSpec::default()).unwrap();
    assert_eq!(strings(&joined, "comments_id"), ["k1", "k2"]);
    assert_eq!(joined.cell(0, "time_to_comment_in_seconds").unwrap(), &Cell::Null);
    assert_eq!(joined.cell(1, "time_to_comment_in_seconds").unwrap(), &Cell::Int(60));
}
