//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use alsvid_qrmi::{Payload, QuantumResource, ResourceType, TaskResult};
use alsvid_slurm::builtin_registry;

/// Parse a resource type from its wire identifier.
pub fn parse_resource_type(raw: &str) -> Result<ResourceType> {
    raw.parse().map_err(|_| {
        anyhow::anyhow!(
            "Unknown resource type: '{raw}'. Available: direct-access, qiskit-runtime-service, pasqal-cloud"
        )
    })
}

/// Create the vendor client for a named resource.
///
/// Adapters read their `{name}_QRMI_*` connection settings from the process
/// environment, which a leased job already carries.
pub fn create_resource(name: &str, resource_type: &str) -> Result<Box<dyn QuantumResource>> {
    let rtype = parse_resource_type(resource_type)?;
    debug!("Creating {} client for '{}'", rtype, name);
    builtin_registry()
        .create(name, rtype)
        .map_err(|e| anyhow::anyhow!("Failed to create client for '{name}': {e}"))
}

/// Read an input file and wrap it in the payload shape the resource family
/// expects.
pub fn load_payload(
    resource_type: ResourceType,
    path: &str,
    program_id: &str,
    job_runs: u32,
) -> Result<Payload> {
    let input = read_input(path)?;
    match resource_type {
        ResourceType::DirectAccess | ResourceType::QiskitRuntimeService => {
            Ok(Payload::QiskitPrimitive {
                input,
                program_id: program_id.to_string(),
            })
        }
        ResourceType::PasqalCloud => Ok(Payload::PulserSequence {
            sequence: input,
            job_runs,
        }),
    }
}

/// Read an input file into a string.
pub fn read_input(path: &str) -> Result<String> {
    if !Path::new(path).exists() {
        anyhow::bail!("File not found: {path}");
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))
}

/// Print a task result, pretty-printing JSON documents (shared by run).
pub fn print_result(result: &TaskResult) {
    use console::style;

    println!("\n{} Result:", style("✓").green().bold());

    match serde_json::from_str::<serde_json::Value>(&result.value) {
        Ok(doc) => match serde_json::to_string_pretty(&doc) {
            Ok(pretty) => println!("{pretty}"),
            Err(_) => println!("{}", result.value),
        },
        Err(_) => println!("{}", result.value),
    }
}
