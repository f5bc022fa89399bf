//! Document collections built from joined threads, and accessors over any frame of documents.

use crate::filters::{filter_by_time_window, TIME_DELTA_COLUMN};
use crate::frame::{Cell, Frame, Key, Row};
use crate::record::{BODY, ID, SELFTEXT, SUBREDDIT, TITLE};
use ahash::AHashMap;
use anyhow::{bail, Result};
use tracing::{debug, info};

pub const DOCUMENT_TEXT_COLUMN: &str = "document_text";

/// A frame of documents, one row per document, identified by an id column.
#[derive(Clone, Debug)]
pub struct Corpus {
    frame: Frame,
    id_col: String,
}

struct Thread {
    id: Cell,
    subreddit: Cell,
    title: Cell,
    selftext: Cell,
    bodies: Vec<String>,
}

impl Thread {
    /// `title selftext bodies...`, skipping null parts; the bodies always contribute
    /// (possibly empty) text.
    fn document_text(&self) -> String {
        let bodies = self.bodies.join(" ");
        [self.title.as_text(), self.selftext.as_text(), Some(bodies.as_str().into())]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Corpus {
    /// Wrap an existing frame whose documents are identified by `id`.
    pub fn new(frame: Frame) -> Self {
        Self { frame, id_col: ID.to_string() }
    }

    pub fn with_id_column(mut self, name: impl Into<String>) -> Self {
        self.id_col = name.into();
        self
    }

    /// Collapse joined submission/comment rows into one document per submission.
    ///
    /// With a time window, only comments strictly inside it are kept first; each bound
    /// applies on its own when given. Output columns are `[id, subreddit,
    /// document_text]` in first-seen submission order; comment bodies follow input order.
    pub fn from_joined_threads(joined: Frame, min_time_delta: Option<i64>, max_time_delta: Option<i64>) -> Result<Self> {
        let joined = filter_by_time_window(joined, min_time_delta, max_time_delta, TIME_DELTA_COLUMN)?;
        let id = joined.column_index(ID)?;
        let sub = joined.column_index(SUBREDDIT)?;
        let title = joined.column_index(TITLE)?;
        let selftext = joined.column_index(SELFTEXT)?;
        let body = joined.column_index(BODY)?;

        let mut slots: AHashMap<Key, usize> = AHashMap::new();
        let mut threads: Vec<Thread> = Vec::new();
        for row in joined.rows() {
            let Some(k) = row[id].key() else { continue };
            let i = *slots.entry(k).or_insert_with(|| {
                threads.push(Thread {
                    id: row[id].clone(),
                    subreddit: row[sub].clone(),
                    title: row[title].clone(),
                    selftext: row[selftext].clone(),
                    bodies: Vec::new(),
                });
                threads.len() - 1
            });
            if let Some(b) = row[body].as_text() {
                threads[i].bodies.push(b.into_owned());
            }
        }
        debug!(rows = joined.len(), documents = threads.len(), "grouped threads");

        let rows: Vec<Row> = threads
            .into_iter()
            .map(|t| {
                let text = t.document_text();
                vec![t.id, t.subreddit, Cell::Str(text)]
            })
            .collect();
        let frame = Frame::new(vec![ID.to_string(), SUBREDDIT.to_string(), DOCUMENT_TEXT_COLUMN.to_string()], rows)?;
        info!(documents = frame.len(), "corpus built from joined threads");
        Ok(Self::new(frame))
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn into_frame(self) -> Frame {
        self.frame
    }

    pub fn document_count(&self) -> usize {
        self.frame.len()
    }

    /// Lazily iterate the cells of `name` in row order. Call again to restart.
    pub fn column_iter(&self, name: &str) -> Result<impl Iterator<Item = &Cell> + '_> {
        self.frame.column(name)
    }

    /// Lazily iterate `(id, [(index, weight)])` over a vector column. Null vectors are empty.
    pub fn vectorized_column_iter(&self, name: &str) -> Result<impl Iterator<Item = (String, Vec<(usize, f64)>)> + '_> {
        let vi = self.frame.column_index(name)?;
        let ii = self.frame.column_index(&self.id_col)?;
        if let Some(bad) = self.frame.rows().iter().find(|r| !matches!(r[vi], Cell::Vector(_) | Cell::Null)) {
            bail!("column '{name}' holds non-vector value {}", bad[vi]);
        }
        Ok(self.frame.rows().iter().map(move |r| {
            let pairs = r[vi].as_vector().map(|v| v.pairs()).unwrap_or_default();
            (r[ii].to_string(), pairs)
        }))
    }

    /// All cells of `name`, in row order.
    pub fn collect_column_to_list(&self, name: &str) -> Result<Vec<Cell>> {
        Ok(self.column_iter(name)?.cloned().collect())
    }

    /// All vectors of `name` as `(index, weight)` lists, in row order.
    pub fn collect_sparse_column_to_list(&self, name: &str) -> Result<Vec<Vec<(usize, f64)>>> {
        Ok(self.vectorized_column_iter(name)?.map(|(_, pairs)| pairs).collect())
    }
}
