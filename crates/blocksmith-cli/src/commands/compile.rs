//! Generate the project's Arduino sketch

use anyhow::{Context, Result};
use blocksmith_codegen::{CompileOptions, CompiledSketch, Compiler};
use blocksmith_core::Config;
use std::path::Path;

fn report(compiled: &CompiledSketch, path: &Path) {
    let source = if compiled.cached { "cached" } else { "generated" };
    tracing::info!(
        "✓ {} ({} bytes, {}, hash {})",
        path.display(),
        compiled.size(),
        source,
        &compiled.hash[..8]
    );
}

/// Run the compile command
pub async fn run(config_path: &str, force: bool, dir: Option<&str>) -> Result<()> {
    tracing::info!("Loading configuration from {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;
    let options = CompileOptions {
        force,
        ..CompileOptions::from_config(&config)
    };
    let compiler = Compiler::new(options);

    if let Some(dir) = dir {
        let compiled = compiler
            .compile_all(dir)
            .with_context(|| format!("Compilation of {} failed", dir))?;
        for (sketch, path) in &compiled {
            report(sketch, path);
        }
        tracing::info!("Compiled {} sketches", compiled.len());
        return Ok(());
    }

    let (compiled, path) = compiler
        .compile_sketch(&config)
        .context("Compilation failed")?;

    // Blocks the selection no longer allows are still generated
    for violation in &compiled.violations {
        tracing::warn!(
            "Block '{}' ({}) needs a component that is not selected",
            violation.block_id,
            violation.block_type
        );
    }
    report(&compiled, &path);

    Ok(())
}
