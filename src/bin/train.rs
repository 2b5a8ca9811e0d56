//! Offline trainer: traffic CSV in, model bundle out.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use traffic_gate::features::TimeWindows;
use traffic_gate::training::{self, TrainerConfig, TrainingOptions};

#[derive(Parser, Debug)]
#[command(name = "traffic-gate-train", about = "Train the traffic situation classifier")]
struct Args {
    /// Traffic CSV with Time, Day of the week, Total and Traffic Situation columns
    #[arg(long, default_value = "Traffic.csv")]
    data_file: PathBuf,

    /// Output directory for the model artifacts
    #[arg(long, default_value = "model")]
    model_dir: PathBuf,

    /// Vehicle counts per window
    #[arg(long, default_value_t = 12)]
    sequence_length: usize,

    /// Hidden layer widths
    #[arg(long, value_delimiter = ',', default_value = "64,32")]
    hidden_sizes: Vec<usize>,

    #[arg(long, default_value_t = 100)]
    epochs: usize,

    #[arg(long, default_value_t = 32)]
    batch_size: usize,

    #[arg(long, default_value_t = 0.001)]
    learning_rate: f32,

    #[arg(long, default_value_t = 0.3)]
    dropout: f32,

    #[arg(long, default_value_t = 0.15)]
    val_split: f32,

    #[arg(long, default_value_t = 0.15)]
    test_split: f32,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Morning rush as START,END (inclusive hours)
    #[arg(long, value_delimiter = ',', num_args = 2, default_values_t = [7, 9])]
    morning_rush: Vec<u32>,

    /// Evening rush as START,END (inclusive hours)
    #[arg(long, value_delimiter = ',', num_args = 2, default_values_t = [16, 19])]
    evening_rush: Vec<u32>,

    /// Night as START,END: hour >= START or hour < END
    #[arg(long, value_delimiter = ',', num_args = 2, default_values_t = [22, 4])]
    night: Vec<u32>,
}

impl Args {
    fn options(&self) -> anyhow::Result<TrainingOptions> {
        let pair = |name: &str, values: &[u32]| -> anyhow::Result<(u32, u32)> {
            match values {
                [start, end] if *start < 24 && *end < 24 => Ok((*start, *end)),
                _ => anyhow::bail!("--{} expects two hours in 0..24, got {:?}", name, values),
            }
        };
        let (night_start, night_end) = pair("night", &self.night)?;

        Ok(TrainingOptions {
            sequence_length: self.sequence_length,
            validation_fraction: self.val_split,
            test_fraction: self.test_split,
            seed: self.seed,
            time_windows: TimeWindows {
                morning_rush: pair("morning-rush", &self.morning_rush)?,
                evening_rush: pair("evening-rush", &self.evening_rush)?,
                night_start,
                night_end,
            },
            trainer: TrainerConfig {
                hidden_sizes: self.hidden_sizes.clone(),
                epochs: self.epochs,
                batch_size: self.batch_size,
                learning_rate: self.learning_rate,
                dropout: self.dropout,
                ..Default::default()
            },
        })
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "traffic_gate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let options = args.options()?;

    let run = training::run(&args.data_file, &args.model_dir, &options)
        .with_context(|| format!("Training on {} failed", args.data_file.display()))?;

    println!("\nClassification Report:");
    println!("{}", run.report);
    println!(
        "Test loss {:.4}, accuracy {:.2}% (best epoch {})",
        run.test_loss,
        run.report.accuracy * 100.0,
        run.best_epoch
    );
    println!("Model saved to {}/", args.model_dir.display());

    Ok(())
}
