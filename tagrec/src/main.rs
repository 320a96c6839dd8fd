//! tagrec command-line interface
//!
//! ```bash
//! tagrec recommend --input "amenity=restaurant,cuisine" --model A
//! tagrec evaluate --cases cases.jsonl --model model-a
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tagrec::evaluation::{load_cases, Evaluator};
use tagrec::llm::{HttpLlmClient, LlmReranker};
use tagrec::output::render_recommendations;
use tagrec::{
    make_preset_workflow, CooccurrenceModel, Instance, PresetDeps, Recommender, Workflow,
    WorkflowPreset,
};
use tagrec_common::config::{self, TomlConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tagrec")]
#[command(about = "Adaptive tag recommendation")]
#[command(version)]
struct Cli {
    /// Path to TOML config file
    #[arg(long, global = true, env = "TAGREC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recommend tags for one input set
    Recommend {
        /// Comma-separated input tags
        #[arg(long)]
        input: String,

        #[command(flatten)]
        model_args: ModelArgs,
    },

    /// Score a workflow against JSON Lines ground truth
    Evaluate {
        /// JSON Lines file of {"input": [...], "truth": [...]} records
        #[arg(long, value_name = "FILE")]
        cases: PathBuf,

        #[command(flatten)]
        model_args: ModelArgs,
    },
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Workflow preset (direct, best, deletelowfrequency, splitproperty,
    /// toofewrecommendations, A, C)
    #[arg(long, default_value = "A")]
    model: String,

    /// Co-occurrence model file (defaults to model_path from the config)
    #[arg(long, value_name = "FILE")]
    model_file: Option<PathBuf>,

    /// Number of recommendations to print or score
    #[arg(long, default_value = "10")]
    top: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(config::default_config_path);
    let toml_config = match &config_path {
        Some(path) => config::load_toml_config(path).context("Failed to load config")?,
        None => TomlConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&toml_config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Recommend { input, model_args } => {
            run_recommend(&toml_config, &input, &model_args).await
        }
        Command::Evaluate { cases, model_args } => {
            run_evaluate(&toml_config, &cases, &model_args).await
        }
    }
}

/// Loaded model plus the workflow built on it
struct Session {
    preset: WorkflowPreset,
    model: Arc<CooccurrenceModel>,
    workflow: Workflow,
}

fn build_session(toml_config: &TomlConfig, args: &ModelArgs) -> Result<Session> {
    // Selector and credentials are validated before the model is loaded
    let preset: WorkflowPreset = args.model.parse()?;
    let api_key = if preset.requires_llm() {
        Some(config::resolve_llm_api_key(toml_config)?)
    } else {
        None
    };

    let model_path = args
        .model_file
        .clone()
        .or_else(|| toml_config.model_path.clone())
        .context("No model file given: pass --model-file or set model_path in the config")?;
    let model = Arc::new(load_model(&model_path)?);

    let recommender: Arc<dyn Recommender> = model.clone();
    let mut deps = PresetDeps::new(recommender);
    if let Some(api_key) = api_key {
        let client = HttpLlmClient::new(&toml_config.llm, &api_key)
            .context("Failed to create LLM client")?;
        deps = deps.with_reranker(Arc::new(LlmReranker::new(
            Arc::new(client),
            model.clone(),
            toml_config.llm.model.clone(),
        )));
    }

    let workflow = make_preset_workflow(preset, &deps)?;
    Ok(Session {
        preset,
        model,
        workflow,
    })
}

fn load_model(path: &Path) -> Result<CooccurrenceModel> {
    let model = CooccurrenceModel::load(path)
        .with_context(|| format!("Failed to load model from {}", path.display()))?;
    info!(
        path = %path.display(),
        items = model.item_count(),
        properties = model.properties().properties().len(),
        "Model loaded"
    );
    Ok(model)
}

async fn run_recommend(toml_config: &TomlConfig, input: &str, args: &ModelArgs) -> Result<()> {
    let session = build_session(toml_config, args)?;
    println!("Using model: {}", args.model);

    let tags: Vec<&str> = input.split(',').collect();
    let ctx = Instance::from_tags(&tags, session.model.as_ref(), session.model.clone());
    info!(
        request_id = %ctx.request_id,
        preset = %session.preset,
        known_inputs = ctx.props().len(),
        "Recommending"
    );

    let list = session.workflow.recommend(&ctx).await?;
    print!("{}", render_recommendations(&args.model, &list, args.top));
    Ok(())
}

async fn run_evaluate(toml_config: &TomlConfig, cases_path: &Path, args: &ModelArgs) -> Result<()> {
    let session = build_session(toml_config, args)?;
    let cases = load_cases(cases_path)
        .with_context(|| format!("Failed to load cases from {}", cases_path.display()))?;
    info!(cases = cases.len(), preset = %session.preset, "Evaluating");

    let evaluator = Evaluator::new(
        &session.workflow,
        session.model.as_ref(),
        session.model.clone(),
        args.top,
    );
    let report = evaluator.run(&cases).await;

    println!("=== {} evaluation ({}) ===", session.preset, cases_path.display());
    println!("{}", report);
    Ok(())
}
