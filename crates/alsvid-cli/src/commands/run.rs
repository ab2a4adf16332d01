//! Run command implementation.
//!
//! Start a task on an already-leased resource, poll it to a terminal state,
//! and print the result. Ctrl-C stops the remote task before exiting.

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use alsvid_qrmi::TaskStatus;

use super::common::{create_resource, load_payload, parse_resource_type, print_result};

/// Execute the run command.
pub async fn execute(
    resource: &str,
    resource_type: &str,
    input: &str,
    program_id: &str,
    job_runs: u32,
    poll_interval: u64,
) -> Result<()> {
    let rtype = parse_resource_type(resource_type)?;
    let payload = load_payload(rtype, input, program_id, job_runs)?;

    println!(
        "{} Running {} on {} ({})",
        style("→").cyan().bold(),
        style(input).green(),
        style(resource).yellow(),
        rtype
    );

    let mut resource_impl = create_resource(resource, resource_type)?;

    // Check accessibility before submitting
    let accessible = resource_impl
        .is_accessible()
        .await
        .map_err(|e| anyhow::anyhow!("Accessibility check failed: {e}"))?;
    if !accessible {
        anyhow::bail!("Resource '{resource}' is not accessible");
    }

    // Submit task
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.set_message("Starting task...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let task_id = resource_impl
        .task_start(payload)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start task: {e}"))?;
    spinner.set_message(format!("Task {task_id} started..."));

    // Poll to a terminal state; Ctrl-C stops the remote task
    let interval = std::time::Duration::from_secs(poll_interval);
    let final_status = loop {
        let current = resource_impl
            .task_status(&task_id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get status: {e}"))?;

        if current.is_terminal() {
            break current;
        }
        spinner.set_message(format!("Task {task_id}: {current} ..."));

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                spinner.set_message(format!("Stopping task {task_id}..."));
                resource_impl
                    .task_stop(&task_id)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to stop task: {e}"))?;
                spinner.finish_and_clear();
                println!(
                    "{} Task {} stopped",
                    style("✗").red().bold(),
                    style(task_id.to_string()).dim()
                );
                return Ok(());
            }
        }
    };
    spinner.finish_and_clear();

    if final_status == TaskStatus::Completed {
        let result = resource_impl
            .task_result(&task_id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get result: {e}"))?;
        print_result(&result);
    } else {
        println!(
            "{} Task {} finished with status: {}",
            style("✗").red().bold(),
            style(task_id.to_string()).dim(),
            style(final_status).red()
        );
    }

    Ok(())
}
