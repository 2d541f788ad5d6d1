//! Loading similarity data files into an immutable [`PairStore`].
//!
//! Two file shapes exist in the wild:
//!
//! ```text
//! { "scores": { "a.png|b.png": 0.92, ... }, ...other fields ignored }
//! [ { "path": "some/dir/a.png" }, "a.png|b.png", ... ]
//! ```
//!
//! The first carries pair scores, the second only enumerates identifiers.
//! Which one a file holds is decided here, once, and recorded in
//! [`SimilarityData`].

use std::path::Path;

use serde_json::Value;

use crate::app::AppError;

use super::ident;

/// Separator between the two identifiers of a pair key.
pub const PAIR_SEPARATOR: char = '|';

/// One stored pair. Both identifiers are bare as found in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct PairRecord {
    pub a: String,
    pub b: String,
    pub score: f64,
}

impl PairRecord {
    /// Split a `"<a>|<b>"` key into its two identifiers.
    pub fn parse_key(key: &str) -> Option<(&str, &str)> {
        let mut parts = key.split(PAIR_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), None) => Some((a, b)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimilarityData {
    /// Scored pairs, ordered by pair key.
    PairedScores(Vec<PairRecord>),
    /// Bare identifiers without any pairing.
    PathList(Vec<String>),
}

/// Similarity data of one partition as read from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PairStore {
    data: SimilarityData,
}

impl PairStore {
    pub fn new(data: SimilarityData) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &SimilarityData {
        &self.data
    }

    /// Scored pairs; empty for a path list.
    pub fn records(&self) -> &[PairRecord] {
        match self.data() {
            SimilarityData::PairedScores(records) => records,
            SimilarityData::PathList(_) => &[],
        }
    }

    /// Every identifier mentioned by the store, duplicates included.
    pub fn identifiers(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match &self.data {
            SimilarityData::PairedScores(records) => Box::new(
                records
                    .iter()
                    .flat_map(|r| [r.a.as_str(), r.b.as_str()]),
            ),
            SimilarityData::PathList(paths) => Box::new(paths.iter().map(String::as_str)),
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            SimilarityData::PairedScores(records) => records.len(),
            SimilarityData::PathList(paths) => paths.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read and parse a similarity file.
    ///
    /// Returns `Ok(None)` when the file does not exist so the caller can try
    /// the next candidate.
    pub fn load(path: &Path) -> Result<Option<Self>, AppError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let store = Self::from_slice(&bytes)
            .map_err(|reason| AppError::data_format(path.display().to_string(), reason))?;

        if store.is_empty() {
            log::warn!("{} has no entries", path.display());
        } else {
            log::debug!("loaded {} entries from {}", store.len(), path.display());
        }

        Ok(Some(store))
    }

    /// Parse the contents of a similarity file.
    ///
    /// Any malformed entry rejects the whole file.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, String> {
        let value: Value = serde_json::from_slice(bytes).map_err(|err| err.to_string())?;

        let data = match value {
            Value::Object(mut object) => match object.remove("scores") {
                Some(scores) => SimilarityData::PairedScores(parse_scores(scores)?),
                None => return Err("object has no 'scores' field".to_string()),
            },
            Value::Array(items) => SimilarityData::PathList(parse_listing(items)?),
            other => return Err(format!("unexpected top-level {}", kind(&other))),
        };

        Ok(Self::new(data))
    }
}

fn parse_scores(scores: Value) -> Result<Vec<PairRecord>, String> {
    let scores = match scores {
        Value::Object(scores) => scores,
        other => return Err(format!("'scores' must be an object, got {}", kind(&other))),
    };

    let mut records = Vec::with_capacity(scores.len());
    for (key, score) in scores {
        let Some((a, b)) = PairRecord::parse_key(&key) else {
            return Err(format!("pair key {key:?} does not have exactly two parts"));
        };
        let Some(score) = score.as_f64() else {
            return Err(format!("score of {key:?} is {}, not a number", kind(&score)));
        };
        records.push(PairRecord {
            a: a.to_string(),
            b: b.to_string(),
            score,
        });
    }

    Ok(records)
}

fn parse_listing(items: Vec<Value>) -> Result<Vec<String>, String> {
    let mut paths = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(object) => match object.get("path") {
                Some(Value::String(path)) => paths.push(ident::bare(path).to_string()),
                Some(other) => return Err(format!("'path' must be a string, got {}", kind(other))),
                None => {}
            },
            Value::String(pair) if pair.contains(PAIR_SEPARATOR) => {
                let Some((a, b)) = PairRecord::parse_key(&pair) else {
                    return Err(format!("pair {pair:?} does not have exactly two parts"));
                };
                paths.push(a.to_string());
                paths.push(b.to_string());
            }
            _ => {}
        }
    }
    Ok(paths)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
