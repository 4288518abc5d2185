//! Training pipeline: split, fit, evaluate.

use crate::dataset::Dataset;
use crate::forest::RandomForestParams;
use crate::metrics::ClassificationReport;
use crate::model::TrainedModel;
use recommender_types::Result;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct TrainingOptions {
    /// Share of rows held out for evaluation.
    pub test_ratio: f64,
    pub split_seed: u64,
    pub forest: RandomForestParams,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        TrainingOptions {
            test_ratio: 0.2,
            split_seed: 42,
            forest: RandomForestParams::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub report: ClassificationReport,
    pub n_train: usize,
    pub n_test: usize,
}

pub fn train(dataset: &Dataset, options: &TrainingOptions) -> Result<TrainingOutcome> {
    let (train_set, test_set) = dataset.train_test_split(options.test_ratio, options.split_seed)?;
    tracing::info!(
        "Split {} records into {} train / {} test",
        dataset.len(),
        train_set.len(),
        test_set.len()
    );

    let t0 = Instant::now();
    let forest = options.forest.fit(
        train_set.records(),
        train_set.targets(),
        dataset.classes().len(),
    )?;
    tracing::info!("Fit {} trees: {:?}", forest.n_trees(), t0.elapsed());

    let model = TrainedModel::new(
        forest,
        dataset.classes().to_vec(),
        Some(dataset.feature_names().to_vec()),
    )?;
    let report = evaluate(&model, &test_set)?;

    Ok(TrainingOutcome {
        model,
        report,
        n_train: train_set.len(),
        n_test: test_set.len(),
    })
}

/// Score `test` and compare against its labels.
pub fn evaluate(model: &TrainedModel, test: &Dataset) -> Result<ClassificationReport> {
    let predictions = model.forest().predict(test.records())?;
    ClassificationReport::from_predictions(&predictions, test.targets(), model.classes())
}
