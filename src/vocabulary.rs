use crate::frame::SparseVector;
use ahash::{AHashMap, AHashSet};
use anyhow::{bail, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_VOCAB_SIZE: usize = 1 << 18;

/// Document-frequency bound: an absolute document count or a fraction of documents.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocFrequency {
    Count(u64),
    Fraction(f64),
}

impl DocFrequency {
    /// Bound as a document count for a corpus of `docs` documents.
    pub fn resolve(self, docs: usize) -> f64 {
        match self {
            DocFrequency::Count(c) => c as f64,
            DocFrequency::Fraction(f) => f * docs as f64,
        }
    }
}

/// Values of at least 1.0 are counts, smaller ones fractions.
impl From<f64> for DocFrequency {
    fn from(v: f64) -> Self {
        if v >= 1.0 {
            DocFrequency::Count(v as u64)
        } else {
            DocFrequency::Fraction(v)
        }
    }
}

impl From<u64> for DocFrequency {
    fn from(v: u64) -> Self {
        DocFrequency::Count(v)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VocabularyParams {
    pub min_df: DocFrequency,
    pub max_df: DocFrequency,
    pub vocab_size: usize,
}

impl Default for VocabularyParams {
    fn default() -> Self {
        Self { min_df: DocFrequency::Count(1), max_df: DocFrequency::Fraction(1.0), vocab_size: DEFAULT_VOCAB_SIZE }
    }
}

/// Term index with contiguous ids `0..len()`; id order is the fitted order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    terms: Vec<String>,
    index: AHashMap<String, usize>,
}

impl PartialEq for Vocabulary {
    fn eq(&self, other: &Self) -> bool {
        self.terms == other.terms
    }
}

impl TryFrom<Vec<String>> for Vocabulary {
    type Error = String;

    fn try_from(terms: Vec<String>) -> Result<Self, Self::Error> {
        let mut index = AHashMap::with_capacity(terms.len());
        for (i, t) in terms.iter().enumerate() {
            if index.insert(t.clone(), i).is_some() {
                return Err(format!("duplicate vocabulary term '{t}'"));
            }
        }
        Ok(Self { terms, index })
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(v: Vocabulary) -> Self {
        v.terms
    }
}

impl Vocabulary {
    /// Build from terms already in id order.
    pub fn from_terms(terms: Vec<String>) -> Result<Self> {
        Self::try_from(terms).map_err(anyhow::Error::msg)
    }

    /// Fit on tokenized documents: keep terms whose document frequency lies within
    /// `[min_df, max_df]`, order them by total count (descending) then term, and keep
    /// the first `vocab_size`.
    pub fn fit<D>(docs: &[D], params: &VocabularyParams) -> Result<Self>
    where
        D: AsRef<[String]> + Sync,
    {
        if let DocFrequency::Fraction(f) = params.min_df {
            if !(0.0..=1.0).contains(&f) {
                bail!("min_df fraction must be within [0, 1], got {f}");
            }
        }
        if let DocFrequency::Fraction(f) = params.max_df {
            if !(0.0..=1.0).contains(&f) {
                bail!("max_df fraction must be within [0, 1], got {f}");
            }
        }
        // term -> (total count, document frequency)
        let stats: AHashMap<String, (u64, u64)> = docs
            .par_iter()
            .fold(AHashMap::new, |mut acc: AHashMap<String, (u64, u64)>, doc| {
                let mut seen: AHashSet<&str> = AHashSet::new();
                for t in doc.as_ref() {
                    let e = acc.entry(t.clone()).or_insert((0, 0));
                    e.0 += 1;
                    if seen.insert(t.as_str()) {
                        e.1 += 1;
                    }
                }
                acc
            })
            .reduce(AHashMap::new, |mut a, b| {
                for (t, (tf, df)) in b {
                    let e = a.entry(t).or_insert((0, 0));
                    e.0 += tf;
                    e.1 += df;
                }
                a
            });

        let n = docs.len();
        let (min, max) = (params.min_df.resolve(n), params.max_df.resolve(n));
        if min > max {
            bail!("min_df ({min}) exceeds max_df ({max}) for {n} documents");
        }
        let mut kept: Vec<(String, u64)> = stats
            .into_iter()
            .filter(|(_, (_, df))| (*df as f64) >= min && (*df as f64) <= max)
            .map(|(t, (tf, _))| (t, tf))
            .collect();
        kept.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        kept.truncate(params.vocab_size);
        tracing::debug!(documents = n, terms = kept.len(), "fitted vocabulary");
        Self::from_terms(kept.into_iter().map(|(t, _)| t).collect())
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn id(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    pub fn term(&self, id: usize) -> Option<&str> {
        self.terms.get(id).map(String::as_str)
    }

    pub fn word_to_id(&self) -> HashMap<String, usize> {
        self.terms.iter().enumerate().map(|(i, t)| (t.clone(), i)).collect()
    }

    pub fn id_to_word(&self) -> BTreeMap<usize, String> {
        self.terms.iter().enumerate().map(|(i, t)| (i, t.clone())).collect()
    }

    /// Raw term counts of `tokens`; out-of-vocabulary tokens are ignored.
    pub fn vectorize(&self, tokens: &[String]) -> SparseVector {
        SparseVector::from_pairs(self.len(), tokens.iter().filter_map(|t| self.id(t)).map(|i| (i, 1.0)))
    }
}
