//! `uhpm plan`: run the planner alone and print the plan.

use uhpm_agent::Services;
use uhpm_core::task::Task;

pub async fn run(task: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    super::require_api_key(&config)?;

    let task = Task::new(task)?;
    let services = Services::from_config(&config)?;
    let plan = services.planner.plan(&task).await?;

    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
