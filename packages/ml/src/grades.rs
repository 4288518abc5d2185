//! Subject grades and named feature rows.
//!
//! The column names are part of the wire contract, including the misspelled
//! `Geograpgy` grade and the `Recommended_Progam_1` label column.

use recommender_types::Value;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

pub const HINDI: &str = "Hindi";
pub const ENGLISH: &str = "English";
pub const SCIENCE: &str = "Science";
pub const MATHS: &str = "Maths";
pub const HISTORY: &str = "History";
pub const GEOGRAPHY: &str = "Geograpgy";

/// Label column of the training CSV.
pub const LABEL_COLUMN: &str = "Recommended_Progam_1";

/// Column order the trainer fits on. Used as fallback when an artifact
/// does not carry its own fitted feature order.
pub const FEATURE_COLUMNS: [&str; 6] = [HINDI, ENGLISH, SCIENCE, MATHS, HISTORY, GEOGRAPHY];

/// One student's six grades. Values are scored as given, no range check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StudentGrades {
    #[serde(rename = "Maths")]
    pub maths: f64,
    #[serde(rename = "History")]
    pub history: f64,
    #[serde(rename = "Science")]
    pub science: f64,
    #[serde(rename = "English")]
    pub english: f64,
    #[serde(rename = "Geograpgy")]
    pub geography: f64,
    #[serde(rename = "Hindi")]
    pub hindi: f64,
}

impl StudentGrades {
    pub fn to_row(&self) -> FeatureRow {
        FeatureRow::from_iter([
            (MATHS, self.maths),
            (HISTORY, self.history),
            (SCIENCE, self.science),
            (ENGLISH, self.english),
            (GEOGRAPHY, self.geography),
            (HINDI, self.hindi),
        ])
    }

    /// Grades in [`FEATURE_COLUMNS`] order.
    pub fn to_vector(&self) -> Vec<f64> {
        vec![
            self.hindi,
            self.english,
            self.science,
            self.maths,
            self.history,
            self.geography,
        ]
    }
}

/// A single row of named columns, as received from a caller.
///
/// Numeric values are kept for scoring. Columns holding anything else
/// (strings, null, nested values) are only remembered by name, so unrelated
/// extra fields in a request body do not make it fail.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    values: BTreeMap<String, f64>,
    non_numeric: BTreeSet<String>,
}

impl FeatureRow {
    pub fn insert(&mut self, column: impl Into<String>, value: f64) -> Option<f64> {
        let column = column.into();
        self.non_numeric.remove(&column);
        self.values.insert(column, value)
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }

    /// Columns of `expected` without a numeric value, sorted and deduplicated.
    pub fn missing_columns<S: AsRef<str>>(&self, expected: &[S]) -> Vec<String> {
        self.filter_columns(expected, |column| !self.values.contains_key(column))
    }

    /// Columns of `expected` whose value was not a number, sorted and deduplicated.
    pub fn non_numeric_columns<S: AsRef<str>>(&self, expected: &[S]) -> Vec<String> {
        self.filter_columns(expected, |column| self.non_numeric.contains(column))
    }

    fn filter_columns<S: AsRef<str>>(
        &self,
        expected: &[S],
        keep: impl Fn(&str) -> bool,
    ) -> Vec<String> {
        let mut columns: Vec<String> = expected
            .iter()
            .map(|column| column.as_ref())
            .filter(|column| keep(column))
            .map(str::to_string)
            .collect();
        columns.sort();
        columns.dedup();
        columns
    }

    /// Reindex into `order`. Extra columns are dropped; `None` if any is missing.
    pub fn reindex<S: AsRef<str>>(&self, order: &[S]) -> Option<Vec<f64>> {
        order.iter().map(|column| self.get(column.as_ref())).collect()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FeatureRow {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut row = FeatureRow::default();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

impl Serialize for FeatureRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FeatureRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut row = FeatureRow::default();
        for (column, value) in raw {
            match value.as_f64() {
                Some(number) => {
                    row.values.insert(column, number);
                }
                None => {
                    row.non_numeric.insert(column);
                }
            }
        }
        Ok(row)
    }
}
