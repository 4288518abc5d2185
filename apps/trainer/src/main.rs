use clap::Parser;
use recommender_ml::{
    DEFAULT_MODEL_PATH, Dataset, DatasetError, MODEL_FILE_EXTENSION, MaxFeatures, Predictor,
    RandomForestParams, StudentGrades, TrainingOptions, train,
};
use recommender_types::{Result, bail};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Train the student major recommender and write the model artifact.
#[derive(Parser, Debug)]
#[command(name = "recommender-trainer", version)]
struct Args {
    /// Labeled training CSV
    #[arg(long, default_value = "student_recommendations_final.csv")]
    data: PathBuf,

    /// Where to write the model (.flmodel)
    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    output: PathBuf,

    /// Share of rows held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    test_size: f64,

    /// Seed for the split and the forest
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of trees in the forest
    #[arg(long, default_value_t = 100)]
    trees: usize,

    /// Maximum tree depth, unlimited when omitted
    #[arg(long)]
    max_depth: Option<usize>,

    /// Feature columns sampled per tree, ceil(sqrt(n_features)) when omitted
    #[arg(long, conflicts_with = "all_features")]
    max_features: Option<usize>,

    /// Fit every tree on all feature columns
    #[arg(long)]
    all_features: bool,

    /// Fit every tree on the full training set instead of a resample
    #[arg(long)]
    no_bootstrap: bool,
}

impl Args {
    fn max_features(&self) -> MaxFeatures {
        match (self.all_features, self.max_features) {
            (true, _) => MaxFeatures::All,
            (false, Some(k)) => MaxFeatures::Fixed(k),
            (false, None) => MaxFeatures::Sqrt,
        }
    }
}

/// Strong in Maths and Science.
const SAMPLE_STUDENT: StudentGrades = StudentGrades {
    hindi: 50.0,
    english: 60.0,
    science: 95.0,
    maths: 98.0,
    history: 40.0,
    geography: 45.0,
};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let dataset = match Dataset::from_csv_path(&args.data) {
        Ok(dataset) => dataset,
        Err(DatasetError::NotFound(path)) => {
            tracing::error!(
                "Dataset {} not found, generate the labeled CSV first",
                path.display()
            );
            bail!("dataset {} not found", path.display());
        }
        Err(err) => return Err(err.into()),
    };
    tracing::info!(
        "Loaded {} records with {} programs",
        dataset.len(),
        dataset.classes().len()
    );

    let options = TrainingOptions {
        test_ratio: args.test_size,
        split_seed: args.seed,
        forest: RandomForestParams::default()
            .n_trees(args.trees)
            .seed(args.seed)
            .max_depth(args.max_depth)
            .max_features(args.max_features())
            .bootstrap(!args.no_bootstrap),
    };

    let t0 = Instant::now();
    let outcome = train(&dataset, &options)?;
    tracing::info!("Training finished: {:?}", t0.elapsed());

    println!("Model accuracy: {:.2}%", outcome.report.accuracy * 100.0);
    println!();
    println!("--- Classification report ---");
    println!("{}", outcome.report);

    let mut output = args.output;
    if output.extension().is_none() {
        output.set_extension(MODEL_FILE_EXTENSION);
    }
    outcome.model.save(&output)?;
    tracing::info!("Model saved to {}", output.display());

    let predictor = Predictor::new(outcome.model);
    println!("--- Sample prediction ---");
    println!("Grades: {:?}", SAMPLE_STUDENT);
    match predictor.predict(&SAMPLE_STUDENT) {
        Ok(sample) => println!(
            "Recommendation: {} ({}), then {} ({})",
            sample.first.major,
            sample.first.confidence_percent(),
            sample.second.major,
            sample.second.confidence_percent()
        ),
        Err(err) => tracing::warn!("Sample prediction failed: {}", err),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_square_root_subspace_and_bootstrap() {
        let args = Args::try_parse_from(["recommender-trainer"]).unwrap();
        assert_eq!(args.max_features(), MaxFeatures::Sqrt);
        assert!(!args.no_bootstrap);
        assert_eq!(args.trees, 100);
        assert_eq!(args.seed, 42);
    }

    #[test]
    fn test_feature_flags() {
        let args = Args::try_parse_from(["recommender-trainer", "--max-features", "2"]).unwrap();
        assert_eq!(args.max_features(), MaxFeatures::Fixed(2));

        let args =
            Args::try_parse_from(["recommender-trainer", "--all-features", "--no-bootstrap"])
                .unwrap();
        assert_eq!(args.max_features(), MaxFeatures::All);
        assert!(args.no_bootstrap);

        assert!(
            Args::try_parse_from(["recommender-trainer", "--all-features", "--max-features", "2"])
                .is_err()
        );
    }
}
