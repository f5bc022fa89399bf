#![allow(dead_code)]

use redcorpus::{parse_record, Frame, RedditType};
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Write a compressed `.zst` file containing the provided JSONL lines.
pub fn write_zst_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
}

/// Write an uncompressed JSONL file.
pub fn write_plain_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut f = File::create(path).unwrap();
    for l in lines {
        writeln!(&mut f, "{}", l).unwrap();
    }
}

/// Read a text file line-by-line into strings (skips empty lines).
pub fn read_lines(path: &Path) -> Vec<String> {
    let f = File::open(path).unwrap();
    let r = BufReader::new(f);
    r.lines().map(|l| l.unwrap()).filter(|s| !s.is_empty()).collect()
}

/// Decompress a `.zst` file and collect its non-empty lines.
pub fn decompress_zst_lines(path: &Path) -> Vec<String> {
    let f = File::open(path).unwrap();
    let dec = zstd::stream::read::Decoder::new(f).unwrap();
    let r = BufReader::new(dec);
    r.lines().map(|l| l.unwrap()).filter(|s| !s.is_empty()).collect()
}

fn lines(values: &[Value]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Parse fixture records the same way the loader does.
pub fn frame_of(kind: RedditType, values: &[Value]) -> Frame {
    let rows = values.iter().map(|v| parse_record(&v.to_string(), kind).unwrap()).collect();
    Frame::new(kind.columns(), rows).unwrap()
}

fn comment(id: &str, author: &str, subreddit: &str, link: &str, body: &str, created: i64) -> Value {
    json!({
        "id": id, "parent_id": link, "score": 1, "link_id": link, "author": author,
        "subreddit": subreddit, "body": body, "created_utc": created,
        "controversiality": 0, "gilded": 0, "stickied": false
    })
}

/// Comments over five subreddits:
/// - after dropping the `u_alice` user page: news 4, AskReddit 3, aww 2, rare 1;
/// - two of the news comments are by `[deleted]`, one by carol has `[removed]` text;
/// - dave only posts in `u_alice` and `rare`.
pub fn c2v_comments() -> Vec<Value> {
    vec![
        comment("c1", "alice", "AskReddit", "t3_x1", "hello", 100),
        comment("c2", "alice", "aww", "t3_x2", "so cute", 110),
        comment("c3", "alice", "news", "t3_x3", "wow", 120),
        comment("c4", "bob", "AskReddit", "t3_x1", "hi", 130),
        comment("c5", "bob", "aww", "t3_x2", "puppy", 140),
        comment("c6", "carol", "AskReddit", "t3_x1", "hey", 150),
        comment("c7", "[deleted]", "news", "t3_x3", "[deleted]", 160),
        comment("c8", "[deleted]", "news", "t3_x3", "[deleted]", 170),
        comment("c9", "dave", "u_alice", "t3_x4", "profile", 180),
        comment("c10", "dave", "u_alice", "t3_x4", "profile", 190),
        comment("c11", "dave", "u_alice", "t3_x4", "profile", 200),
        comment("c12", "dave", "rare", "t3_x5", "lonely", 210),
        comment("c13", "carol", "news", "t3_x3", "[removed]", 220),
    ]
}

/// Submissions for the bag-of-words fixture:
/// s1 (AskReddit) and s2 (aww, string timestamp) are clean; s3 is deleted; s4 is a user
/// page; s5 has removed text.
pub fn bow_submissions() -> Vec<Value> {
    vec![
        json!({"author": "op1", "created_utc": 1000, "id": "s1", "score": 10, "selftext": "Post one",
               "title": "First", "url": "https://reddit.com/s1", "subreddit": "AskReddit"}),
        json!({"author": "op2", "created_utc": "2000", "id": "s2", "score": 3, "selftext": "",
               "title": "Kitten", "url": "https://i.redd.it/k.jpg", "subreddit": "aww"}),
        json!({"author": "[deleted]", "created_utc": 3000, "id": "s3", "score": 1, "selftext": "[deleted]",
               "title": "Gone", "url": "https://reddit.com/s3", "subreddit": "news"}),
        json!({"author": "op4", "created_utc": 4000, "id": "s4", "score": 1, "selftext": "me",
               "title": "About me", "url": "https://reddit.com/s4", "subreddit": "u_op4"}),
        json!({"author": "op5", "created_utc": 5000, "id": "s5", "score": 2, "selftext": "[removed]",
               "title": "Removed", "url": "https://reddit.com/s5", "subreddit": "AskReddit"}),
    ]
}

/// Comments for the bag-of-words fixture. After filtering with top-2 subreddits by
/// comments (AskReddit 4, aww 2) the clean ones are k1, k2, k3 and k7; k7 replies to the
/// removed s5, so only k1 (+100s), k2 (+700s) and k3 (+50s) join.
pub fn bow_comments() -> Vec<Value> {
    vec![
        comment("k1", "alice", "AskReddit", "t3_s1", "first!", 1100),
        comment("k2", "bob", "AskReddit", "t3_s1", "second", 1700),
        comment("k3", "alice", "aww", "t3_s2", "adorable", 2050),
        comment("k4", "carol", "news", "t3_s3", "sad", 3010),
        comment("k5", "[deleted]", "AskReddit", "t3_s1", "[deleted]", 1200),
        comment("k6", "dave", "aww", "t3_s2", "[removed]", 2400),
        comment("k7", "alice", "AskReddit", "t3_s5", "late", 5100),
    ]
}

/// Lay the community2vec comments out as a directory of two zstd files plus a plain one.
pub fn make_c2v_dir(base: &Path) -> PathBuf {
    let dir = base.join("comments");
    let all = lines(&c2v_comments());
    write_zst_lines(&dir.join("RC_2020-01.zst"), &all[..5]);
    write_zst_lines(&dir.join("RC_2020-02.zst"), &all[5..10]);
    write_plain_lines(&dir.join("nested").join("RC_2020-03.jsonl"), &all[10..]);
    dir
}

/// Write the bag-of-words fixtures as `submissions/RS_2020-01.zst` and `comments/RC_2020-01.zst`.
pub fn make_bow_dirs(base: &Path) -> (PathBuf, PathBuf) {
    let subs = base.join("submissions");
    let comments = base.join("comments");
    write_zst_lines(&subs.join("RS_2020-01.zst"), &lines(&bow_submissions()));
    write_zst_lines(&comments.join("RC_2020-01.zst"), &lines(&bow_comments()));
    (subs, comments)
}

/// Joined thread rows as produced by a bag-of-words build: s1 has two comments, s2 one,
/// s3 an empty comment, s4 an emoji comment.
pub fn joined_threads() -> Frame {
    let rows = vec![
        json!({"id": "s1", "selftext": "Post 1 text.", "title": "MY FIRST POST!!!!", "comments_id": "c1",
               "body": "Ain't this hard to tokenize: #hashtag, yo-yo www.reddit.com?",
               "time_to_comment_in_seconds": 600, "subreddit": "AskReddit"}),
        json!({"id": "s1", "selftext": "Post 1 text.", "title": "MY FIRST POST!!!!", "comments_id": "c2",
               "body": "@someone some.one@email.com", "time_to_comment_in_seconds": 10, "subreddit": "AskReddit"}),
        json!({"id": "s2", "selftext": "", "title": "Look @ this cute animal!", "comments_id": "c3",
               "body": "aww- - adorable...", "time_to_comment_in_seconds": 100, "subreddit": "aww"}),
        json!({"id": "s3", "selftext": "", "title": "....!", "comments_id": "c4",
               "body": "", "time_to_comment_in_seconds": 10, "subreddit": "testSubreddit"}),
        json!({"id": "s4", "selftext": "", "title": "Emojis!", "comments_id": "c5",
               "body": "😁 🥰", "time_to_comment_in_seconds": 10, "subreddit": "testSubreddit"}),
    ];
    Frame::from_json_rows(
        &["id", "selftext", "title", "comments_id", "body", "time_to_comment_in_seconds", "subreddit"],
        &rows,
    )
    .unwrap()
}

/// Three tiny documents: "a a a", "b b b", "a a b".
pub fn simple_docs() -> Frame {
    Frame::from_json_rows(
        &["id", "document_text"],
        &[
            json!({"id": "a1", "document_text": "a a a"}),
            json!({"id": "b2", "document_text": "b b b"}),
            json!({"id": "c3", "document_text": "a a b"}),
        ],
    )
    .unwrap()
}

/// Column of string cells as plain strings (nulls as "null").
pub fn strings(frame: &Frame, col: &str) -> Vec<String> {
    frame.column(col).unwrap().map(|c| c.to_string()).collect()
}

pub fn words(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}
