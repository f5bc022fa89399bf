//! In-memory tabular data: ordered column names over row-major cells.
//! Transforms consume a `Frame` and hand back a new one; nothing is edited in place
//! behind a caller's back.

use anyhow::{anyhow, bail, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// Sparse vector with ascending `indices` and matching `values`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub size: usize,
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Build from `(index, weight)` pairs in any order. Duplicate indices are summed.
    pub fn from_pairs(size: usize, pairs: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut pairs: Vec<(usize, f64)> = pairs.into_iter().collect();
        pairs.sort_unstable_by_key(|p| p.0);
        let mut indices: Vec<usize> = Vec::with_capacity(pairs.len());
        let mut values: Vec<f64> = Vec::with_capacity(pairs.len());
        for (i, w) in pairs {
            if indices.last() == Some(&i) {
                if let Some(last) = values.last_mut() {
                    *last += w;
                }
            } else {
                indices.push(i);
                values.push(w);
            }
        }
        Self { size, indices, values }
    }

    /// Non-zero entries as `(index, weight)` pairs.
    pub fn pairs(&self) -> Vec<(usize, f64)> {
        self.indices.iter().copied().zip(self.values.iter().copied()).collect()
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }
}

/// A single value in a frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
    Tokens(Vec<String>),
    Vector(SparseVector),
}

/// Hashable, ordered view of a cell used for grouping and joins.
/// Floats, token lists and vectors are not keys (treated like nulls).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Key {
    Int(i64),
    Str(String),
}

impl Key {
    pub(crate) fn into_cell(self) -> Cell {
        match self {
            Key::Int(i) => Cell::Int(i),
            Key::Str(s) => Cell::Str(s),
        }
    }
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Scalar text rendering (strings and numbers), `None` for nulls and collections.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Cell::Str(s) => Some(Cow::Borrowed(s)),
            Cell::Int(i) => Some(Cow::Owned(i.to_string())),
            Cell::Float(f) => Some(Cow::Owned(f.to_string())),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_tokens(&self) -> Option<&[String]> {
        match self {
            Cell::Tokens(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&SparseVector> {
        match self {
            Cell::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn key(&self) -> Option<Key> {
        match self {
            Cell::Int(i) => Some(Key::Int(*i)),
            Cell::Str(s) => Some(Key::Str(s.clone())),
            _ => None,
        }
    }

    /// Lenient conversion from JSON: arrays of strings become token lists,
    /// `{size, indices, values}` objects become vectors, other composites are
    /// kept as their JSON text.
    pub fn from_json(v: &Value) -> Cell {
        match v {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Str(b.to_string()),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
            },
            Value::String(s) => Cell::Str(s.clone()),
            Value::Array(items) => {
                let strings: Option<Vec<String>> = items.iter().map(|x| x.as_str().map(str::to_string)).collect();
                match strings {
                    Some(tokens) => Cell::Tokens(tokens),
                    None => Cell::Str(v.to_string()),
                }
            }
            Value::Object(_) => match serde_json::from_value::<SparseVector>(v.clone()) {
                Ok(sv) => Cell::Vector(sv),
                Err(_) => Cell::Str(v.to_string()),
            },
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "null"),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Float(x) => write!(f, "{x}"),
            Cell::Str(s) => write!(f, "{s}"),
            Cell::Tokens(t) => write!(f, "[{}]", t.join(", ")),
            Cell::Vector(v) => write!(f, "({}, {:?}, {:?})", v.size, v.indices, v.values),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Str(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Str(s)
    }
}

impl From<i64> for Cell {
    fn from(i: i64) -> Self {
        Cell::Int(i)
    }
}

impl From<Vec<String>> for Cell {
    fn from(t: Vec<String>) -> Self {
        Cell::Tokens(t)
    }
}

impl From<SparseVector> for Cell {
    fn from(v: SparseVector) -> Self {
        Cell::Vector(v)
    }
}

pub type Row = Vec<Cell>;

/// Column-named, row-major table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Frame {
    /// Rejects duplicate column names and rows whose width differs from the header.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        for (i, c) in columns.iter().enumerate() {
            if columns[..i].contains(c) {
                bail!("duplicate column name '{c}'");
            }
        }
        if let Some((i, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            bail!("row {i} has {} cells, expected {} ({:?})", r.len(), columns.len(), columns);
        }
        Ok(Self { columns, rows })
    }

    pub fn empty<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self { columns: columns.into_iter().map(Into::into).collect(), rows: Vec::new() }
    }

    /// Build a frame from JSON objects, reading only `columns` (missing keys are null).
    pub fn from_json_rows(columns: &[&str], rows: &[Value]) -> Result<Self> {
        let rows = rows
            .iter()
            .map(|v| {
                let obj = v.as_object().ok_or_else(|| anyhow!("expected a JSON object, got {v}"))?;
                Ok(columns.iter().map(|c| obj.get(*c).map(Cell::from_json).unwrap_or(Cell::Null)).collect())
            })
            .collect::<Result<Vec<Row>>>()?;
        Frame::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Row>) {
        (self.columns, self.rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| anyhow!("no column named '{name}' (available: {:?})", self.columns))
    }

    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Cell> + '_> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |r| &r[idx]))
    }

    pub fn cell(&self, row: usize, name: &str) -> Result<&Cell> {
        let idx = self.column_index(name)?;
        self.rows
            .get(row)
            .map(|r| &r[idx])
            .ok_or_else(|| anyhow!("row {row} out of range ({} rows)", self.rows.len()))
    }

    /// Keep rows for which `keep` is true. Row order is preserved.
    pub fn filter<F>(self, keep: F) -> Frame
    where
        F: Fn(&Row) -> bool + Sync + Send,
    {
        let Frame { columns, rows } = self;
        let rows: Vec<Row> = rows.into_par_iter().filter(|r| keep(r)).collect();
        Frame { columns, rows }
    }

    /// Compute a column from each row; replaces an existing column of the same name,
    /// otherwise appends it.
    pub fn with_column<F>(self, name: &str, f: F) -> Frame
    where
        F: Fn(&Row) -> Cell + Sync + Send,
    {
        let values: Vec<Cell> = self.rows.par_iter().map(|r| f(r)).collect();
        let Frame { mut columns, mut rows } = self;
        match columns.iter().position(|c| c == name) {
            Some(idx) => {
                for (r, v) in rows.iter_mut().zip(values) {
                    r[idx] = v;
                }
            }
            None => {
                columns.push(name.to_string());
                for (r, v) in rows.iter_mut().zip(values) {
                    r.push(v);
                }
            }
        }
        Frame { columns, rows }
    }

    /// Append a precomputed column. The name must be new and the length must match.
    pub fn append_column(self, name: &str, values: Vec<Cell>) -> Result<Frame> {
        if self.has_column(name) {
            bail!("column '{name}' already exists");
        }
        if values.len() != self.rows.len() {
            bail!("column '{name}' has {} values for {} rows", values.len(), self.rows.len());
        }
        let Frame { mut columns, mut rows } = self;
        columns.push(name.to_string());
        for (r, v) in rows.iter_mut().zip(values) {
            r.push(v);
        }
        Ok(Frame { columns, rows })
    }

    /// Rename `from` to `to`. Absent `from` leaves the frame unchanged.
    pub fn rename(mut self, from: &str, to: &str) -> Result<Frame> {
        if from == to {
            return Ok(self);
        }
        if let Some(idx) = self.columns.iter().position(|c| c == from) {
            if self.has_column(to) {
                bail!("cannot rename '{from}' to '{to}': column already exists");
            }
            self.columns[idx] = to.to_string();
        }
        Ok(self)
    }

    /// Drop the named columns; names that are not present are ignored.
    pub fn drop_columns(self, names: &[&str]) -> Frame {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| !names.contains(&self.columns[i].as_str()))
            .collect();
        self.project(&keep)
    }

    /// Keep exactly `names`, in that order.
    pub fn select(self, names: &[&str]) -> Result<Frame> {
        let idx = names.iter().map(|n| self.column_index(n)).collect::<Result<Vec<_>>>()?;
        Ok(self.project(&idx))
    }

    fn project(self, idx: &[usize]) -> Frame {
        let columns: Vec<String> = idx.iter().map(|&i| self.columns[i].clone()).collect();
        let rows: Vec<Row> = self
            .rows
            .into_par_iter()
            .map(|mut r| idx.iter().map(|&i| std::mem::replace(&mut r[i], Cell::Null)).collect::<Row>())
            .collect();
        Frame { columns, rows }
    }

    /// Number of distinct non-null key values in a column.
    pub fn distinct_count(&self, name: &str) -> Result<usize> {
        let idx = self.column_index(name)?;
        let set: ahash::AHashSet<Key> = self.rows.iter().filter_map(|r| r[idx].key()).collect();
        Ok(set.len())
    }

    /// Fixed-width text table of the first `n` rows, cells truncated to 20 chars.
    pub fn preview(&self, n: usize) -> String {
        const WIDTH: usize = 20;
        let clip = |s: String| -> String {
            if s.chars().count() > WIDTH {
                let mut t: String = s.chars().take(WIDTH - 3).collect();
                t.push_str("...");
                t
            } else {
                s
            }
        };
        let shown: Vec<Vec<String>> = self
            .rows
            .iter()
            .take(n)
            .map(|r| r.iter().map(|c| clip(c.to_string())).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| shown.iter().map(|r| r[i].chars().count()).chain([c.chars().count()]).max().unwrap_or(0))
            .collect();
        let line = |cells: Vec<String>| -> String {
            let parts: Vec<String> = cells.iter().zip(&widths).map(|(c, w)| format!("{c:>width$}", width = *w)).collect();
            format!("|{}|", parts.join("|"))
        };
        let sep = format!("+{}+", widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("+"));
        let mut out = vec![sep.clone(), line(self.columns.iter().map(|c| clip(c.clone())).collect()), sep.clone()];
        out.extend(shown.into_iter().map(line));
        out.push(sep);
        if self.rows.len() > n {
            out.push(format!("only showing top {n} of {} rows", self.rows.len()));
        }
        out.join("\n")
    }
}
