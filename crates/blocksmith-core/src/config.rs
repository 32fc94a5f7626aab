//! Configuration parsing and validation
//!
//! This module handles loading and validating Blocksmith project files.
//!
//! # Configuration Files
//!
//! - `blocksmith.yaml` - Project root configuration
//! - `sketch.json` - The persisted block workspace (path configurable)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::component::{ComponentInstance, ComponentSelection};
use crate::document::Document;
use crate::error::{Error, Result};

/// Name of the project configuration file
pub const CONFIG_FILE: &str = "blocksmith.yaml";

/// Root project configuration from `blocksmith.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,

    /// Target board FQBN
    #[serde(default = "default_board")]
    pub board: String,

    /// Workspace document, relative to the project directory
    #[serde(default = "default_sketch")]
    pub sketch: String,

    /// Selected hardware components
    #[serde(default)]
    pub components: Vec<ComponentInstance>,

    /// Code generation settings
    #[serde(default)]
    pub codegen: CodegenConfig,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_board() -> String {
    "arduino:mbed_nano:nano33ble".to_string()
}

fn default_sketch() -> String {
    "sketch.json".to_string()
}

/// Code generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodegenConfig {
    /// Indentation unit for nested statements
    #[serde(default = "default_indent")]
    pub indent: String,

    /// Regeneration debounce window in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Directory for generated sketches
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            debounce_ms: default_debounce_ms(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_indent() -> String {
    "  ".to_string()
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_output_dir() -> String {
    "build".to_string()
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Base path of the project
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a directory
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the project directory or blocksmith.yaml file
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load("./my-project")?;
    /// println!("Project: {}", config.project.name);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join(CONFIG_FILE), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = serde_yaml::from_str(&contents)?;
        let config = Self { project, base_path };
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.project.name.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                message: "project name must not be empty".to_string(),
            });
        }
        if !self.project.codegen.indent.chars().all(|c| c == ' ' || c == '\t') {
            return Err(Error::ConfigInvalid {
                message: "codegen.indent may only contain spaces and tabs".to_string(),
            });
        }
        if self.project.codegen.debounce_ms == 0 {
            return Err(Error::ConfigInvalid {
                message: "codegen.debounce_ms must be greater than zero".to_string(),
            });
        }
        self.selection()?;
        Ok(())
    }

    /// Component selection built from the configured components
    pub fn selection(&self) -> Result<ComponentSelection> {
        ComponentSelection::from_instances(self.project.components.iter().cloned()).map_err(|e| {
            Error::ConfigInvalid {
                message: e.to_string(),
            }
        })
    }

    /// Absolute path of the workspace document
    pub fn sketch_path(&self) -> PathBuf {
        self.base_path.join(&self.project.sketch)
    }

    /// Absolute path of the output directory
    pub fn output_dir(&self) -> PathBuf {
        self.base_path.join(&self.project.codegen.output_dir)
    }

    /// Read the workspace document
    pub fn load_document(&self) -> Result<Document> {
        let path = self.sketch_path();
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        Document::read(path)
    }
}
