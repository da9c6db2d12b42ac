//! docforge - crew runner entry point
//!
//! Builds the pipeline from configuration, runs it once and prints the
//! terminal task's result.

use std::process::ExitCode;
use std::sync::Arc;

use docforge::{config::Config, llm::OpenAiClient, pipeline::PipelineDefinition};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenv::dotenv().ok();

    let config = Config::from_env()?;

    let default_filter = if config.verbose {
        "docforge=debug"
    } else {
        "docforge=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Loaded configuration: model={}", config.default_model);

    let definition = PipelineDefinition::from_config(&config)?;
    let llm = Arc::new(OpenAiClient::new(&config.api_key, &config.llm_base_url)?);
    let mut crew = definition.build(&config, llm)?;

    info!(
        "Running {} tasks with {} agents",
        crew.tasks().len(),
        crew.agents().len()
    );

    match crew.run().await {
        Ok(output) => {
            if let Some(artifact) = &output.artifact {
                info!(
                    "Artifact {} (sha256 {})",
                    artifact.path.display(),
                    artifact.sha256
                );
            }
            println!("{}", output.final_output);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            let completed = e.partial_context().map(|c| c.len()).unwrap_or(0);
            match e.failed_task() {
                Some(task) => error!(
                    "Run aborted at task '{}' after {} completed: {}",
                    task, completed, e
                ),
                None => error!("Run aborted: {}", e),
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
