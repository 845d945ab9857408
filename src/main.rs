use anyhow::Result;
use clap::{Parser, Subcommand};
use onnx_classifier::{
    classify::{ClassificationPipeline, ClassifyOptions},
    config::Config,
    image::{ResizeFilter, ResultFormatter},
    models::ModelContext,
    web::serve,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "onnx-classifier")]
#[command(about = "Quantized ONNX image classifier")]
struct Args {
    /// Directory holding the model and labels
    #[arg(long, default_value = "models", global = true)]
    models_dir: String,

    /// Model file name inside the models directory
    #[arg(long, default_value = "model.onnx", global = true)]
    model: String,

    /// Labels file name inside the models directory
    #[arg(long, default_value = "labels.txt", global = true)]
    labels: String,

    /// Model input width
    #[arg(long, default_value_t = 224, global = true)]
    width: u32,

    /// Model input height
    #[arg(long, default_value_t = 224, global = true)]
    height: u32,

    /// Resize interpolation
    #[arg(long, value_enum, default_value_t = ResizeFilter::Bilinear, global = true)]
    filter: ResizeFilter,

    /// Decimal places in the printed confidence
    #[arg(long, default_value_t = 2, global = true)]
    precision: usize,

    /// ONNX Runtime intra-op threads
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Enable development mode
    #[arg(long, global = true)]
    dev: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify one image and print "<label> (<pct>%)"
    Classify {
        /// Image file to classify
        #[arg(long)]
        image: PathBuf,

        /// Also print the N best predictions
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Serve the HTTP API
    Serve {
        /// Server bind address
        #[arg(long, default_value = "0.0.0.0:5005")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_target(false)
        .init();

    let bind = match &args.command {
        Command::Serve { bind } => bind.clone(),
        Command::Classify { .. } => String::new(),
    };

    let config = Config::new(bind, args.models_dir, args.threads, args.dev)?
        .with_model_file(args.model)
        .with_labels_file(args.labels)
        .with_input_size(args.width, args.height)
        .with_filter(args.filter)
        .with_display_precision(args.precision);
    config.validate()?;

    tracing::info!("Models directory: {}", config.models_dir.display());

    match args.command {
        Command::Classify { image, top_k } => {
            let context = ModelContext::load(&config)?;
            let options = ClassifyOptions {
                top_k,
                precision: Some(config.display_precision),
            };
            let result = ClassificationPipeline::classify_path(&context, &image, &options)?;

            println!("{}", result.display);
            if top_k.is_some_and(|k| k > 1) {
                println!(
                    "{}",
                    ResultFormatter::format_plain_text(&result.predictions, config.display_precision)
                );
            }
        }
        Command::Serve { .. } => {
            tracing::info!("Starting ONNX classifier service...");
            tracing::info!("Bind address: {}", config.bind_addr);
            serve(config).await?;
        }
    }

    Ok(())
}
