//! Cancel command implementation.

use anyhow::Result;
use console::style;

use alsvid_qrmi::TaskId;

use super::common::create_resource;

/// Execute the cancel command.
pub async fn execute(resource: &str, resource_type: &str, task_id: &str) -> Result<()> {
    let mut resource_impl = create_resource(resource, resource_type)?;

    resource_impl
        .task_stop(&TaskId::from(task_id))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to stop task: {e}"))?;

    println!(
        "{} Task {} stopped",
        style("✓").green().bold(),
        style(task_id).dim()
    );

    Ok(())
}
