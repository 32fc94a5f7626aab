//! Initialize a new Blocksmith project

use anyhow::{Context, Result};
use blocksmith_core::config::CONFIG_FILE;
use blocksmith_core::{Block, BlockRegistry, Placement, Workspace};
use std::fs;
use std::path::Path;

/// Build the starter sketch: blink the LED on pin 13 once a second
fn blink(registry: &BlockRegistry) -> Result<Workspace> {
    let mut workspace = Workspace::with_entry_point(registry)?;
    let entry = workspace
        .entry_point()
        .map(|b| b.id.clone())
        .context("Fresh workspace has no entry point")?;

    let led = |id: &str, state: &str| -> Result<Block> {
        Ok(registry
            .instantiate("component_led", id)?
            .with_field("STATE", state))
    };
    let wait = |id: &str| registry.instantiate("arduino_delay", id);

    let program = led("led_on", "HIGH")?.with_next(
        wait("wait_on")?.with_next(led("led_off", "LOW")?.with_next(wait("wait_off")?)),
    );
    workspace.insert(
        registry,
        program,
        Placement::Socket {
            parent: entry,
            socket: "LOOP".to_string(),
        },
    )?;
    Ok(workspace)
}

/// Run the init command
pub async fn run(path: &str, name: Option<&str>) -> Result<()> {
    let project_dir = Path::new(path);

    // Create directory if it doesn't exist
    if !project_dir.exists() {
        fs::create_dir_all(project_dir)?;
    }

    // Get absolute path for deriving name
    let abs_path = project_dir.canonicalize()?;

    // Derive project name from directory name if not provided
    let project_name = match name {
        Some(n) => n.to_string(),
        None => abs_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Could not determine project name from path"))?,
    };

    // Check if already initialized
    if project_dir.join(CONFIG_FILE).exists() {
        anyhow::bail!(
            "Directory '{}' already contains a {}",
            project_dir.display(),
            CONFIG_FILE
        );
    }

    tracing::info!("Creating new Blocksmith project: {}", project_name);

    let config = format!(
        r#"# Blocksmith Project Configuration
name: {project_name}
version: "0.1.0"
board: arduino:mbed_nano:nano33ble
sketch: sketch.json

# Selected hardware; each kind unlocks its blocks
components:
  - id: led1
    kind: led
    name: Status LED

codegen:
  indent: "  "
  debounce_ms: 100
  output_dir: build
"#
    );
    fs::write(project_dir.join(CONFIG_FILE), config)?;

    let registry = BlockRegistry::builtin();
    blink(&registry)?
        .save()
        .write(project_dir.join("sketch.json"))
        .context("Failed to write starter sketch")?;

    let gitignore = r#"# Blocksmith cache and generated sketches
.blocksmith/
build/

# IDE
.idea/
.vscode/
*.swp
"#;
    fs::write(project_dir.join(".gitignore"), gitignore)?;

    tracing::info!(
        "✓ Created project '{}' at {}",
        project_name,
        abs_path.display()
    );
    tracing::info!("");
    tracing::info!("Next steps:");
    if path != "." {
        tracing::info!("  cd {}", project_dir.display());
    }
    tracing::info!("  blocksmith validate    # Check configuration and sketch");
    tracing::info!("  blocksmith compile     # Generate build/{}.ino", project_name);

    Ok(())
}
