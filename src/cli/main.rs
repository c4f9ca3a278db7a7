use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use iris_pipeline::{
    config::Config,
    dataset::{DataPreparer, FeatureDataset},
    ml::{Classifier, ModelStore, ModelTrainer, TrainingConfig},
    telemetry::init_tracing,
};
use reqwest::Client;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "iris-pipeline-cli")]
#[command(about = "Iris pipeline stages and service client", long_about = None)]
#[command(version)]
struct Cli {
    /// Base URL of a running inference service
    #[arg(
        short,
        long,
        global = true,
        env = "IRIS_PIPELINE_ENDPOINT",
        default_value = "http://localhost:5000"
    )]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the built-in iris dataset
    Prepare {
        /// Dataset file to write (defaults to paths.dataset)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Train a random forest and store it
    Train {
        /// Dataset file to read (defaults to paths.dataset)
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Artifact file to write (defaults to paths.model)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Number of trees (defaults to training.n_trees)
        #[arg(short = 'n', long)]
        n_trees: Option<u16>,

        /// Random seed (defaults to training.seed)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Maximum tree depth
        #[arg(long)]
        max_depth: Option<u16>,
    },

    /// Score a stored model against a dataset file
    Evaluate {
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Send feature rows to the service
    Predict {
        /// JSON body, e.g. '[[5.1, 3.5, 1.4, 0.2]]'
        #[arg(value_name = "ROWS_JSON")]
        rows: String,
    },

    /// Check server health
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load_validated().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });
    init_tracing(&config.observability);

    match cli.command {
        Commands::Prepare { output } => {
            let output = output.unwrap_or_else(|| config.paths.dataset.clone());
            let summary = DataPreparer::new(output)
                .prepare()
                .context("Dataset preparation failed")?;

            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Train {
            dataset,
            model,
            n_trees,
            seed,
            max_depth,
        } => {
            let dataset = dataset.unwrap_or_else(|| config.paths.dataset.clone());
            let model = model.unwrap_or_else(|| config.paths.model.clone());
            let training = TrainingConfig {
                n_trees: n_trees.unwrap_or(config.training.n_trees),
                seed: seed.unwrap_or(config.training.seed),
                max_depth: max_depth.or(config.training.max_depth),
            };

            let report = ModelTrainer::new(training)
                .train(&dataset, &model)
                .context("Training failed")?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Evaluate { dataset, model } => {
            let dataset_path = dataset.unwrap_or_else(|| config.paths.dataset.clone());
            let model_path = model.unwrap_or_else(|| config.paths.model.clone());

            let model = ModelStore::new(&model_path)
                .load()
                .with_context(|| format!("Failed to load model from {}", model_path.display()))?;
            let dataset = FeatureDataset::read_csv(&dataset_path)
                .with_context(|| format!("Failed to read {}", dataset_path.display()))?;
            let metrics = model.evaluate(&dataset).context("Evaluation failed")?;

            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }

        Commands::Predict { rows } => {
            let body: serde_json::Value =
                serde_json::from_str(&rows).context("ROWS_JSON is not valid JSON")?;

            let response = Client::new()
                .post(format!("{}/predict", cli.endpoint))
                .json(&body)
                .send()
                .await
                .with_context(|| format!("Could not reach {}", cli.endpoint))?;

            let status = response.status();
            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);

            if !status.is_success() {
                bail!("Prediction request failed with status {}", status);
            }
        }

        Commands::Health => {
            let response = Client::new()
                .get(format!("{}/health", cli.endpoint))
                .send()
                .await
                .with_context(|| format!("Could not reach {}", cli.endpoint))?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}
