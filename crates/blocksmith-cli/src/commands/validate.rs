//! Validate configuration command

use anyhow::{Context, Result};
use blocksmith_codegen::Generator;
use blocksmith_core::{BlockRegistry, CapabilityGate, Config, Workspace};
use std::sync::Arc;

/// Run the validate command
pub async fn run(config_path: &str) -> Result<()> {
    tracing::info!("Validating configuration: {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;
    let selection = config.selection()?;

    tracing::info!("✓ Project: {}", config.project.name);
    tracing::info!("✓ Version: {}", config.project.version);
    tracing::info!("✓ Board: {}", config.project.board);
    tracing::info!("✓ Components: {}", selection.len());

    let registry = Arc::new(BlockRegistry::builtin());
    let document = config.load_document().context("Failed to read sketch")?;
    let mut workspace = Workspace::new();
    workspace
        .load(&registry, &document)
        .context("Invalid sketch document")?;
    tracing::info!("✓ Sketch: {} blocks", workspace.len());

    let gate = CapabilityGate::new(registry.clone());
    let violations = gate.violations(&workspace, &gate.allowed_types(&selection));
    if !violations.is_empty() {
        for violation in &violations {
            tracing::error!(
                "✗ Block '{}' ({}) needs a component that is not selected",
                violation.block_id,
                violation.block_type
            );
        }
        anyhow::bail!("{} blocks are not available for the selected components", violations.len());
    }

    let result = Generator::new(registry).generate(&workspace);
    if let blocksmith_codegen::GenerationResult::Failed { diagnostic } = result {
        anyhow::bail!("Sketch does not generate: {}", diagnostic.message);
    }

    tracing::info!("✓ Configuration is valid");
    Ok(())
}
