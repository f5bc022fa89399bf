//! Reddit record schemas and the permissive line parser.

use crate::frame::{Cell, Row};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub const DELETED: &str = "[deleted]";
pub const REMOVED: &str = "[removed]";

pub const ID: &str = "id";
pub const AUTHOR: &str = "author";
pub const SUBREDDIT: &str = "subreddit";
pub const CREATED_UTC: &str = "created_utc";
pub const SCORE: &str = "score";
pub const BODY: &str = "body";
pub const SELFTEXT: &str = "selftext";
pub const TITLE: &str = "title";
pub const LINK_ID: &str = "link_id";

/// Columns present in both comments and submissions; prefixed on the comment side of a join.
pub const OVERLAPPING_COLUMNS: [&str; 5] = [ID, AUTHOR, SUBREDDIT, CREATED_UTC, SCORE];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FieldType {
    Str,
    Int,
}

const COMMENT_SCHEMA: &[(&str, FieldType)] = &[
    (ID, FieldType::Str),
    ("parent_id", FieldType::Str),
    (SCORE, FieldType::Int),
    (LINK_ID, FieldType::Str),
    (AUTHOR, FieldType::Str),
    (SUBREDDIT, FieldType::Str),
    (BODY, FieldType::Str),
    (CREATED_UTC, FieldType::Int),
];

const SUBMISSION_SCHEMA: &[(&str, FieldType)] = &[
    (AUTHOR, FieldType::Str),
    (CREATED_UTC, FieldType::Int),
    (ID, FieldType::Str),
    (SCORE, FieldType::Int),
    (SELFTEXT, FieldType::Str),
    (TITLE, FieldType::Str),
    ("url", FieldType::Str),
    (SUBREDDIT, FieldType::Str),
];

/// Raised when a data-type tag is neither `comments` nor `submissions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRedditType(pub String);

impl fmt::Display for InvalidRedditType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid reddit data type '{}': expected 'comments' or 'submissions'", self.0)
    }
}

impl std::error::Error for InvalidRedditType {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedditType {
    Comments,
    Submissions,
}

impl RedditType {
    pub fn as_str(self) -> &'static str {
        match self {
            RedditType::Comments => "comments",
            RedditType::Submissions => "submissions",
        }
    }

    pub(crate) fn schema(self) -> &'static [(&'static str, FieldType)] {
        match self {
            RedditType::Comments => COMMENT_SCHEMA,
            RedditType::Submissions => SUBMISSION_SCHEMA,
        }
    }

    pub fn columns(self) -> Vec<String> {
        self.schema().iter().map(|(name, _)| name.to_string()).collect()
    }

    /// Field holding the user-written text.
    pub fn main_text_field(self) -> &'static str {
        match self {
            RedditType::Comments => BODY,
            RedditType::Submissions => SELFTEXT,
        }
    }

    /// Fullname prefix reddit uses when one object refers to another (`t1_`, `t3_`).
    pub fn id_prefix(self) -> &'static str {
        match self {
            RedditType::Comments => "t1_",
            RedditType::Submissions => "t3_",
        }
    }
}

impl FromStr for RedditType {
    type Err = InvalidRedditType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "comments" => Ok(RedditType::Comments),
            "submissions" => Ok(RedditType::Submissions),
            other => Err(InvalidRedditType(other.to_string())),
        }
    }
}

impl fmt::Display for RedditType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse one NDJSON line into a row laid out per `kind`'s schema.
/// Missing or mistyped fields become nulls; only non-object lines are errors.
pub fn parse_record(line: &str, kind: RedditType) -> Result<Row> {
    let obj: Map<String, Value> = match serde_json::from_str::<Value>(line)? {
        Value::Object(m) => m,
        other => return Err(anyhow!("expected a JSON object, got {}", type_name(&other))),
    };
    Ok(kind.schema().iter().map(|(name, ty)| coerce(obj.get(*name), *ty)).collect())
}

fn coerce(v: Option<&Value>, ty: FieldType) -> Cell {
    match (ty, v) {
        (_, None) | (_, Some(Value::Null)) => Cell::Null,
        (FieldType::Str, Some(Value::String(s))) => Cell::Str(s.clone()),
        (FieldType::Str, Some(Value::Number(n))) => Cell::Str(n.to_string()),
        (FieldType::Str, Some(Value::Bool(b))) => Cell::Str(b.to_string()),
        (FieldType::Int, Some(Value::Number(n))) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.is_finite()).map(|f| f as i64))
            .map(Cell::Int)
            .unwrap_or(Cell::Null),
        (FieldType::Int, Some(Value::String(s))) => s.trim().parse::<i64>().map(Cell::Int).unwrap_or(Cell::Null),
        _ => Cell::Null,
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

