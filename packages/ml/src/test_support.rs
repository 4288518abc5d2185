use crate::dataset::{Dataset, StudentRecord};
use crate::grades::StudentGrades;
use crate::model::TrainedModel;
use crate::train::{TrainingOptions, train};
use recommender_types::rand::Rng;
use recommender_types::utils::seeded_rng;
use std::sync::LazyLock;

/// Class prototypes as (program, [Hindi, English, Science, Maths, History, Geograpgy]).
const PROTOTYPES: [(&str, [f64; 6]); 4] = [
    ("Engineering", [50.0, 55.0, 80.0, 92.0, 45.0, 50.0]),
    ("History & Archaeology", [60.0, 65.0, 40.0, 45.0, 90.0, 78.0]),
    ("Literature & Journalism", [80.0, 90.0, 40.0, 45.0, 65.0, 55.0]),
    ("Medical Science", [50.0, 55.0, 92.0, 70.0, 50.0, 45.0]),
];

pub fn synthetic_dataset() -> Dataset {
    let mut rng = seeded_rng(2024);
    let mut rows = Vec::new();
    for _ in 0..60 {
        for (program, proto) in PROTOTYPES {
            let mut g = proto.map(|v| v + rng.random_range(-8.0..=8.0));
            g.iter_mut().for_each(|v| *v = v.clamp(0.0, 100.0));
            let grades = StudentGrades {
                hindi: g[0],
                english: g[1],
                science: g[2],
                maths: g[3],
                history: g[4],
                geography: g[5],
            };
            rows.push(StudentRecord::new(grades, program));
        }
    }
    Dataset::from_records(&rows).unwrap()
}

static MODEL: LazyLock<TrainedModel> = LazyLock::new(|| {
    train(&synthetic_dataset(), &TrainingOptions::default())
        .unwrap()
        .model
});

pub fn synthetic_model() -> TrainedModel {
    MODEL.clone()
}

pub fn medical_profile() -> StudentGrades {
    StudentGrades {
        maths: 70.0,
        history: 50.0,
        science: 95.0,
        english: 60.0,
        geography: 40.0,
        hindi: 50.0,
    }
}

pub fn arts_profile() -> StudentGrades {
    StudentGrades {
        maths: 40.0,
        history: 90.0,
        science: 30.0,
        english: 85.0,
        geography: 80.0,
        hindi: 70.0,
    }
}
