//! Target command implementation.
//!
//! Print the device target description. Output is plain JSON on stdout so
//! it can be piped into a transpiler configuration.

use anyhow::Result;

use super::common::create_resource;

/// Execute the target command.
pub async fn execute(resource: &str, resource_type: &str) -> Result<()> {
    let resource_impl = create_resource(resource, resource_type)?;

    let target = resource_impl
        .target()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to fetch target: {e}"))?;

    match serde_json::from_str::<serde_json::Value>(&target.value) {
        Ok(doc) => println!("{}", serde_json::to_string_pretty(&doc)?),
        Err(_) => println!("{}", target.value),
    }

    Ok(())
}
