//! `uhpm run`: one pipeline run from the command line.

use clap::Args;
use serde_json::{Value, json};
use std::time::Duration;
use uhpm_agent::Services;
use uhpm_core::task::{Payload, Task};

/// The task plus any payload fields the chosen capability may need.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// The free-text request to classify and route
    #[arg(short, long)]
    pub task: String,

    #[arg(long)]
    pub product_text: Option<String>,

    #[arg(long)]
    pub competitor_text: Option<String>,

    #[arg(long)]
    pub market_text: Option<String>,

    #[arg(long)]
    pub persona_text: Option<String>,

    #[arg(long)]
    pub channel: Option<String>,

    /// A content variant to score (repeatable)
    #[arg(long = "variant")]
    pub variants: Vec<String>,

    /// Campaign metrics, as JSON or free text
    #[arg(long)]
    pub campaign_results: Option<String>,

    #[arg(long)]
    pub customer_text: Option<String>,

    /// Override the configured pipeline timeout
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,
}

impl RunArgs {
    pub fn payload(&self) -> Payload {
        Payload {
            product_text: self.product_text.clone(),
            competitor_text: self.competitor_text.clone(),
            market_text: self.market_text.clone(),
            persona_text: self.persona_text.clone(),
            channel: self.channel.clone(),
            variants: (!self.variants.is_empty()).then(|| self.variants.clone()),
            campaign_results: self.campaign_results.as_deref().map(campaign_value),
            customer_text: self.customer_text.clone(),
        }
    }
}

/// JSON documents are kept structured; anything else is passed as text.
fn campaign_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    super::require_api_key(&config)?;

    let task = Task::new(args.task.clone())?;
    let payload = args.payload();
    let services = Services::from_config(&config)?;

    let timeout = args
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| services.runner.timeout());

    let run = services.runner.run_with_timeout(task, payload, timeout).await?;
    let output = json!({
        "status": run.status(),
        "reasoning": run.reasoning,
        "dispatch": run.dispatch,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    // The runtime stops when this returns; let the run record land first.
    services.runner.flush().await;
    Ok(())
}
