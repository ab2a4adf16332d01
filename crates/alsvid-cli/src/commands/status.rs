//! Status command implementation.

use anyhow::Result;
use console::style;

use alsvid_qrmi::{TaskId, TaskStatus};

use super::common::create_resource;

/// Execute the status command.
pub async fn execute(resource: &str, resource_type: &str, task_id: &str) -> Result<()> {
    let resource_impl = create_resource(resource, resource_type)?;

    let status = resource_impl
        .task_status(&TaskId::from(task_id))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to get status: {e}"))?;

    let status_styled = match status {
        TaskStatus::Completed => style(status).green().bold(),
        TaskStatus::Failed | TaskStatus::Cancelled => style(status).red().bold(),
        TaskStatus::Queued => style(status).yellow().bold(),
        TaskStatus::Running => style(status).cyan().bold(),
    };

    println!(
        "{} Task {} status: {}",
        style("→").cyan().bold(),
        style(task_id).dim(),
        status_styled
    );

    if status.is_terminal() {
        println!("  Terminal: {}", style("yes").dim());
    }

    Ok(())
}
