//! Key-value records of loss and parameter statistics.
//!
//! Loss functions return a [`Record`] next to the loss tensor so that callers
//! can forward the numbers to whatever logging backend they use.
//!
//! ```rust
//! use waveft_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("actor_loss", 0.25);
//! record.insert("logp", RecordValue::Array1(vec![-1.2, -0.8]));
//!
//! assert_eq!(record.get_scalar("actor_loss").unwrap(), 0.25);
//! assert!(record.get_scalar("logp").is_err());
//! ```
use crate::error::WaveFtError;
use chrono::prelude::{DateTime, Local};
use std::collections::{
    hash_map::{IntoIter, Iter, Keys},
    HashMap,
};

/// Values stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single value such as a loss.
    Scalar(f32),

    /// A timestamp.
    DateTime(DateTime<Local>),

    /// A 1-dimensional array, e.g. per-sample log probabilities.
    Array1(Vec<f32>),
}

/// A container of named [`RecordValue`]s.
#[derive(Debug, Clone, Default)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record holding a single scalar.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> Keys<String, RecordValue> {
        self.0.keys()
    }

    /// Inserts a value, overwriting an existing one with the same key.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator over key-value pairs.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Consumes the record.
    pub fn into_iter_in_record(self) -> IntoIter<String, RecordValue> {
        self.0.into_iter()
    }

    /// Gets the value of the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the record has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merges two records. Values of `record` win on key collisions.
    pub fn merge(self, record: Record) -> Self {
        Record(self.0.into_iter().chain(record.0).collect())
    }

    /// Merges `record` into `self`. Values of `record` win on key collisions.
    pub fn merge_inplace(&mut self, record: Record) {
        self.0.extend(record.0);
    }

    /// Gets a scalar value.
    pub fn get_scalar(&self, k: &str) -> Result<f32, WaveFtError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(WaveFtError::RecordValueTypeError("Scalar".to_string())),
            None => Err(WaveFtError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a 1-dimensional array.
    pub fn get_array1(&self, k: &str) -> Result<Vec<f32>, WaveFtError> {
        match self.0.get(k) {
            Some(RecordValue::Array1(v)) => Ok(v.clone()),
            Some(_) => Err(WaveFtError::RecordValueTypeError("Array1".to_string())),
            None => Err(WaveFtError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a timestamp.
    pub fn get_datetime(&self, k: &str) -> Result<DateTime<Local>, WaveFtError> {
        match self.0.get(k) {
            Some(RecordValue::DateTime(t)) => Ok(*t),
            Some(_) => Err(WaveFtError::RecordValueTypeError("DateTime".to_string())),
            None => Err(WaveFtError::RecordKeyError(k.to_string())),
        }
    }
}
