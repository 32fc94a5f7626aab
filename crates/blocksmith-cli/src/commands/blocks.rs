//! List available blocks

use anyhow::{Context, Result};
use blocksmith_core::{BlockRegistry, CapabilityGate, Capability, Config};
use std::sync::Arc;

/// Run the blocks command
pub async fn run(config_path: &str, all: bool, json: bool) -> Result<()> {
    let registry = Arc::new(BlockRegistry::builtin());

    if all {
        for block_type in registry.types() {
            let unlocked_by = match &block_type.capability {
                Capability::Base => "base".to_string(),
                Capability::Components(kinds) => kinds
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            };
            println!("{:<28} {:<12} {}", block_type.id, block_type.category, unlocked_by);
        }
        return Ok(());
    }

    let config = Config::load(config_path).context("Failed to load configuration")?;
    let palette = CapabilityGate::new(registry).palette(&config.selection()?);

    if json {
        println!("{}", serde_json::to_string_pretty(&palette)?);
        return Ok(());
    }

    for category in &palette {
        println!("{}", category.name);
        for block_type in &category.types {
            println!("  {}", block_type);
        }
    }
    Ok(())
}
