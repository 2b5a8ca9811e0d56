//! Training Module - Offline model fitting
//!
//! CSV → windows → engineered features → scaler → network → artifacts.
//! Uses the same feature transform as the server so both see identical rows.

pub mod dataset;
pub mod metrics;
pub mod optimizer;
pub mod split;
pub mod trainer;


use std::path::Path;

use ndarray::Array2;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::features::{engineer_window, FeatureError, FeatureRow, TimeWindows, FEATURE_COUNT};
use crate::model::artifacts::{write_json, DEFAULT_SEQUENCE_LENGTH};
use crate::model::{LabelEncoder, ModelBundle, ModelConfig, ModelError, StandardScaler};

pub use dataset::{build_samples, load_csv, Observation, Sample};
pub use metrics::ClassificationReport;
pub use trainer::{Dataset, EpochStats, TrainerConfig};

pub const HISTORY_FILE: &str = "history.csv";
pub const METRICS_FILE: &str = "metrics.json";

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("line {line}: {reason}")]
    Record { line: usize, reason: String },

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("not enough data: {0}")]
    NotEnoughData(String),

    #[error("invalid training config: {0}")]
    Config(String),
}

/// Everything a training run needs besides the data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOptions {
    pub sequence_length: usize,
    pub validation_fraction: f32,
    pub test_fraction: f32,
    pub seed: u64,
    pub time_windows: TimeWindows,
    pub trainer: TrainerConfig,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            validation_fraction: 0.15,
            test_fraction: 0.15,
            seed: 42,
            time_windows: TimeWindows::default(),
            trainer: TrainerConfig::default(),
        }
    }
}

/// Result of a training run
pub struct TrainingRun {
    pub bundle: ModelBundle,
    pub report: ClassificationReport,
    pub test_loss: f32,
    pub history: Vec<EpochStats>,
    pub best_epoch: usize,
    pub split_sizes: (usize, usize, usize),
}

/// Serialized test-set summary
#[derive(Debug, Serialize)]
struct MetricsFile<'a> {
    test_loss: f32,
    test_accuracy: f32,
    train_samples: usize,
    validation_samples: usize,
    test_samples: usize,
    best_epoch: usize,
    report: &'a ClassificationReport,
}

/// Train from observations already loaded in memory
pub fn train_on_observations(
    observations: &[Observation],
    options: &TrainingOptions,
) -> Result<TrainingRun, TrainingError> {
    if options.validation_fraction <= 0.0
        || options.test_fraction <= 0.0
        || options.validation_fraction + options.test_fraction >= 1.0
    {
        return Err(TrainingError::Config(format!(
            "validation ({}) and test ({}) fractions must be positive and sum below 1",
            options.validation_fraction, options.test_fraction
        )));
    }

    tracing::info!("Creating sequences with window size {}...", options.sequence_length);
    let samples = build_samples(observations, options.sequence_length);
    if samples.is_empty() {
        return Err(TrainingError::NotEnoughData(format!(
            "{} records cannot fill a window of {}",
            observations.len(),
            options.sequence_length
        )));
    }
    tracing::info!("Created {} sequences", samples.len());

    let labels = LabelEncoder::fit(samples.iter().map(|s| s.label.as_str()))?;
    for (i, class) in labels.classes.iter().enumerate() {
        tracing::info!("  {}: {}", class, i);
    }
    let targets = samples
        .iter()
        .map(|s| labels.encode(&s.label))
        .collect::<Result<Vec<_>, _>>()?;

    let windows = samples
        .iter()
        .map(|s| engineer_window(&s.counts, &s.time, &options.time_windows).map(|w| w.rows))
        .collect::<Result<Vec<_>, _>>()?;

    let mut rng = StdRng::seed_from_u64(options.seed);
    let split = split::train_val_test_split(
        &targets,
        options.validation_fraction,
        options.test_fraction,
        &mut rng,
    );
    tracing::info!(
        "Dataset split: Train={}, Val={}, Test={}",
        split.train.len(),
        split.validation.len(),
        split.test.len()
    );

    let scaler = StandardScaler::fit(split.train.iter().map(|&i| windows[i].as_slice()))?;

    let build = |indices: &[usize]| -> Result<Dataset, TrainingError> {
        Ok(Dataset {
            inputs: flatten_scaled(
                indices.iter().map(|&i| windows[i].as_slice()),
                &scaler,
                options.sequence_length,
            )?,
            labels: indices.iter().map(|&i| targets[i]).collect(),
        })
    };
    let train_set = build(&split.train)?;
    let validation = build(&split.validation)?;
    let test = build(&split.test)?;

    if test.is_empty() {
        return Err(TrainingError::NotEnoughData("test split is empty".to_string()));
    }

    tracing::info!("Training started...");
    let outcome = trainer::train(&train_set, &validation, labels.len(), &options.trainer, &mut rng)?;

    let evaluation = trainer::evaluate(&outcome.network, &test);
    tracing::info!(
        "Test results: Loss={:.4}, Accuracy={:.4}",
        evaluation.loss,
        evaluation.accuracy
    );
    let report = ClassificationReport::compute(&test.labels, &evaluation.predictions, &labels.classes);

    let mut config = ModelConfig::new(
        options.sequence_length,
        options.trainer.hidden_sizes.clone(),
        labels.len(),
        options.time_windows,
    );
    config.test_accuracy = evaluation.accuracy;

    let bundle = ModelBundle {
        config,
        scaler,
        labels,
        network: outcome.network,
    };
    bundle.validate()?;

    Ok(TrainingRun {
        bundle,
        report,
        test_loss: evaluation.loss,
        history: outcome.history,
        best_epoch: outcome.best_epoch,
        split_sizes: (train_set.len(), validation.len(), test.len()),
    })
}

/// Row-major `(windows, sequence_length × FEATURE_COUNT)` matrix of scaled rows
fn flatten_scaled<'a, I>(
    windows: I,
    scaler: &StandardScaler,
    sequence_length: usize,
) -> Result<Array2<f32>, TrainingError>
where
    I: ExactSizeIterator<Item = &'a [FeatureRow]>,
{
    let count = windows.len();
    let width = sequence_length * FEATURE_COUNT;
    let mut flat = Vec::with_capacity(count * width);

    for rows in windows {
        for row in rows {
            flat.extend_from_slice(&scaler.transform_row(row));
        }
    }

    Array2::from_shape_vec((count, width), flat)
        .map_err(|e| ModelError::Invalid(format!("window shape: {}", e)).into())
}

/// Load the CSV, train, and write every artifact into `model_dir`
pub fn run(data_file: &Path, model_dir: &Path, options: &TrainingOptions) -> Result<TrainingRun, TrainingError> {
    tracing::info!("Loading data from {}...", data_file.display());
    let observations = load_csv(data_file)?;

    let run = train_on_observations(&observations, options)?;
    save_run(&run, model_dir)?;

    Ok(run)
}

/// Write the bundle, the epoch history and the test metrics
pub fn save_run(run: &TrainingRun, model_dir: &Path) -> Result<(), TrainingError> {
    run.bundle.save(model_dir)?;

    let history_path = model_dir.join(HISTORY_FILE);
    let mut writer = csv::Writer::from_path(&history_path)?;
    for stats in &run.history {
        writer.serialize(stats)?;
    }
    writer.flush().map_err(|source| TrainingError::Io {
        path: history_path.display().to_string(),
        source,
    })?;

    let (train_samples, validation_samples, test_samples) = run.split_sizes;
    let metrics = MetricsFile {
        test_loss: run.test_loss,
        test_accuracy: run.report.accuracy,
        train_samples,
        validation_samples,
        test_samples,
        best_epoch: run.best_epoch,
        report: &run.report,
    };
    write_json(&model_dir.join(METRICS_FILE), &metrics)?;

    tracing::info!("Model saved to {}/", model_dir.display());
    Ok(())
}
