//! Training data ingestion and the train/test split.

use crate::grades::{FEATURE_COLUMNS, StudentGrades};
use ndarray::{Array1, Array2, Axis};
use recommender_types::rand::seq::SliceRandom;
use recommender_types::utils::seeded_rng;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read dataset: {0}")]
    Io(#[from] io::Error),
    #[error("malformed dataset CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("inconsistent feature matrix: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("dataset contains no records")]
    Empty,
    #[error("invalid test ratio {0}, expected a value strictly between 0 and 1")]
    InvalidRatio(f64),
    #[error("split of {0} records leaves the training set empty")]
    EmptyTrainingSet(usize),
}

/// One labeled row of the training CSV. Extra columns are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StudentRecord {
    #[serde(rename = "Hindi")]
    pub hindi: f64,
    #[serde(rename = "English")]
    pub english: f64,
    #[serde(rename = "Science")]
    pub science: f64,
    #[serde(rename = "Maths")]
    pub maths: f64,
    #[serde(rename = "History")]
    pub history: f64,
    #[serde(rename = "Geograpgy")]
    pub geography: f64,
    #[serde(rename = "Recommended_Progam_1")]
    pub program: String,
}

impl StudentRecord {
    pub fn new(grades: StudentGrades, program: impl Into<String>) -> Self {
        StudentRecord {
            hindi: grades.hindi,
            english: grades.english,
            science: grades.science,
            maths: grades.maths,
            history: grades.history,
            geography: grades.geography,
            program: program.into(),
        }
    }

    pub fn grades(&self) -> StudentGrades {
        StudentGrades {
            maths: self.maths,
            history: self.history,
            science: self.science,
            english: self.english,
            geography: self.geography,
            hindi: self.hindi,
        }
    }
}

/// Feature matrix plus encoded targets.
///
/// `classes` is sorted and shared by every split of the same dataset, so a
/// target index means the same program on both sides of a split.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Array2<f64>,
    targets: Array1<usize>,
    classes: Vec<String>,
    feature_names: Vec<String>,
}

impl Dataset {
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => DatasetError::NotFound(path.to_path_buf()),
            _ => DatasetError::Io(err),
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rows = Vec::new();
        for row in reader.deserialize::<StudentRecord>() {
            rows.push(row?);
        }
        Self::from_records(&rows)
    }

    pub fn from_records(rows: &[StudentRecord]) -> Result<Self, DatasetError> {
        if rows.is_empty() {
            return Err(DatasetError::Empty);
        }

        let classes: Vec<String> = rows
            .iter()
            .map(|row| row.program.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let class_to_idx: HashMap<&str, usize> = classes
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), idx))
            .collect();

        let mut flat = Vec::with_capacity(rows.len() * FEATURE_COLUMNS.len());
        let mut targets = Vec::with_capacity(rows.len());
        for row in rows {
            flat.extend(row.grades().to_vector());
            targets.push(class_to_idx[row.program.as_str()]);
        }

        let records = Array2::from_shape_vec((rows.len(), FEATURE_COLUMNS.len()), flat)?;

        Ok(Dataset {
            records,
            targets: Array1::from(targets),
            classes,
            feature_names: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        })
    }

    pub fn records(&self) -> &Array2<f64> {
        &self.records
    }

    pub fn targets(&self) -> &Array1<usize> {
        &self.targets
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Shuffle-split into `(train, test)`.
    ///
    /// `ceil(n * test_ratio)` rows go to the test set. The permutation only
    /// depends on `seed` and `n`.
    pub fn train_test_split(
        &self,
        test_ratio: f64,
        seed: u64,
    ) -> Result<(Dataset, Dataset), DatasetError> {
        if !(test_ratio > 0.0 && test_ratio < 1.0) {
            return Err(DatasetError::InvalidRatio(test_ratio));
        }

        let n = self.len();
        let n_test = (n as f64 * test_ratio).ceil() as usize;
        if n_test >= n {
            return Err(DatasetError::EmptyTrainingSet(n));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut seeded_rng(seed));
        let (test_idx, train_idx) = indices.split_at(n_test);

        Ok((self.select(train_idx), self.select(test_idx)))
    }

    fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            records: self.records.select(Axis(0), indices),
            targets: self.targets.select(Axis(0), indices),
            classes: self.classes.clone(),
            feature_names: self.feature_names.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
Hindi,English,Science,Maths,History,Geograpgy,Recommended_Progam_1,Recommended_Progam_2
50,60,95,70,50,40,Medical Science,Engineering
40,45,80,95,35,50,Engineering,Medical Science
60,70,30,40,92,80,History & Archaeology,Literature & Journalism
85,90,35,45,60,55,Literature & Journalism,History & Archaeology
";

    #[test]
    fn test_from_reader_parses_and_encodes() {
        let ds = Dataset::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.records().shape(), &[4, 6]);
        assert_eq!(
            ds.classes(),
            &[
                "Engineering",
                "History & Archaeology",
                "Literature & Journalism",
                "Medical Science"
            ]
        );
        // Medical Science is class 3, grades stored in fitted column order
        assert_eq!(ds.targets()[0], 3);
        assert_eq!(ds.records().row(0).to_vec(), vec![50.0, 60.0, 95.0, 70.0, 50.0, 40.0]);
        assert_eq!(ds.feature_names(), &FEATURE_COLUMNS);
    }

    #[test]
    fn test_from_reader_requires_label_column() {
        let csv = "Hindi,English,Science,Maths,History,Geograpgy\n1,2,3,4,5,6\n";
        let err = Dataset::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DatasetError::Csv(_)));
    }

    #[test]
    fn test_from_reader_rejects_non_numeric_grade() {
        let csv = "Hindi,English,Science,Maths,History,Geograpgy,Recommended_Progam_1\n\
                   x,2,3,4,5,6,Engineering\n";
        assert!(matches!(
            Dataset::from_reader(csv.as_bytes()),
            Err(DatasetError::Csv(_))
        ));
    }

    #[test]
    fn test_empty_dataset() {
        let csv = "Hindi,English,Science,Maths,History,Geograpgy,Recommended_Progam_1\n";
        assert!(matches!(
            Dataset::from_reader(csv.as_bytes()),
            Err(DatasetError::Empty)
        ));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("student_recommendations_final.csv");
        let err = Dataset::from_csv_path(&path).unwrap_err();
        assert!(matches!(err, DatasetError::NotFound(p) if p == path));
    }

    #[test]
    fn test_split_sizes_and_reproducibility() {
        let rows: Vec<StudentRecord> = (0..50)
            .map(|i| {
                let grades = StudentGrades {
                    maths: i as f64,
                    history: 0.0,
                    science: 0.0,
                    english: 0.0,
                    geography: 0.0,
                    hindi: 0.0,
                };
                StudentRecord::new(grades, if i % 2 == 0 { "A" } else { "B" })
            })
            .collect();
        let ds = Dataset::from_records(&rows).unwrap();

        let (train, test) = ds.train_test_split(0.2, 42).unwrap();
        assert_eq!(train.len(), 40);
        assert_eq!(test.len(), 10);
        assert_eq!(train.classes(), ds.classes());

        let (train2, test2) = ds.train_test_split(0.2, 42).unwrap();
        assert_eq!(train.records(), train2.records());
        assert_eq!(test.targets(), test2.targets());

        // every row lands in exactly one side
        let mut maths: Vec<f64> = train
            .records()
            .column(3)
            .iter()
            .chain(test.records().column(3).iter())
            .copied()
            .collect();
        maths.sort_by(f64::total_cmp);
        assert_eq!(maths, (0..50).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_rounds_test_size_up() {
        let ds = Dataset::from_reader(CSV.as_bytes()).unwrap();
        let (train, test) = ds.train_test_split(0.2, 1).unwrap();
        assert_eq!(test.len(), 1);
        assert_eq!(train.len(), 3);
    }

    #[test]
    fn test_split_invalid_ratio() {
        let ds = Dataset::from_reader(CSV.as_bytes()).unwrap();
        assert!(matches!(
            ds.train_test_split(1.0, 42),
            Err(DatasetError::InvalidRatio(_))
        ));
        assert!(matches!(
            ds.train_test_split(0.0, 42),
            Err(DatasetError::InvalidRatio(_))
        ));
    }
}
