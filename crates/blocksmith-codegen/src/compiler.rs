//! Sketch compiler
//!
//! Turns persisted workspace documents into `.ino` files, caching output by
//! content hash.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use blocksmith_core::{BlockRegistry, CapabilityGate, Config, Document, Violation, Workspace};

use crate::error::{Error, Result};
use crate::generator::{GenerationResult, Generator, GeneratorOptions};

/// Options for the compiler
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Output directory for generated sketches
    pub output_dir: PathBuf,

    /// Cache directory for generated sources
    pub cache_dir: PathBuf,

    /// Whether to skip cache and force regeneration
    pub force: bool,

    /// Indentation unit for nested statements
    pub indent: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("build"),
            cache_dir: PathBuf::from(".blocksmith/cache"),
            force: false,
            indent: "  ".to_string(),
        }
    }
}

impl CompileOptions {
    /// Options derived from a project configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_dir: config.output_dir(),
            cache_dir: config.base_path.join(".blocksmith").join("cache"),
            force: false,
            indent: config.project.codegen.indent.clone(),
        }
    }
}

/// Sketch compiler
pub struct Compiler {
    options: CompileOptions,
    generator: Generator,
}

impl Compiler {
    /// Compiler over the built-in block registry
    pub fn new(options: CompileOptions) -> Self {
        Self::with_registry(Arc::new(BlockRegistry::builtin()), options)
    }

    /// Compiler over a custom registry
    pub fn with_registry(registry: Arc<BlockRegistry>, options: CompileOptions) -> Self {
        let generator = Generator::with_options(
            registry,
            GeneratorOptions {
                indent: options.indent.clone(),
            },
        );
        Self { options, generator }
    }

    /// Options in use
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Generator in use
    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    /// Cache key for a document: save time does not affect the output
    fn content_hash(&self, document: &Document) -> Result<String> {
        let mut document = document.clone();
        document.saved_at = None;
        let json = serde_json::to_string(&document)
            .map_err(|e| Error::CacheError(format!("Failed to hash document: {}", e)))?;

        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        hasher.update(self.options.indent.as_bytes());
        hasher.update(env!("CARGO_PKG_VERSION").as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    /// Compile a document to sketch source
    pub fn compile_document(&self, name: &str, document: &Document) -> Result<CompiledSketch> {
        let mut workspace = Workspace::new();
        workspace.load(self.generator.registry(), document)?;
        self.compile_workspace(name, document, &workspace)
    }

    /// Compile an already loaded workspace; `document` is its persisted form
    /// and keys the cache
    pub fn compile_workspace(
        &self,
        name: &str,
        document: &Document,
        workspace: &Workspace,
    ) -> Result<CompiledSketch> {
        let hash = self.content_hash(document)?;
        let cached = self.options.cache_dir.join(format!("{}.ino", hash));

        if !self.options.force && cached.exists() {
            tracing::debug!("Using cached sketch: {}", cached.display());
            let source = std::fs::read_to_string(&cached)?;
            return Ok(CompiledSketch {
                name: name.to_string(),
                source,
                hash,
                cached: true,
                violations: Vec::new(),
            });
        }

        let source = match self.generator.generate(workspace) {
            GenerationResult::Success { text } => text,
            GenerationResult::Failed { diagnostic } => {
                return Err(Error::GenerationFailed { diagnostic });
            }
        };

        std::fs::create_dir_all(&self.options.cache_dir)?;
        std::fs::write(&cached, &source)?;

        Ok(CompiledSketch {
            name: name.to_string(),
            source,
            hash,
            cached: false,
            violations: Vec::new(),
        })
    }

    /// Compile a project's sketch and write `<output_dir>/<name>.ino`.
    ///
    /// Blocks the selected components do not allow are still generated and
    /// reported in [`CompiledSketch::violations`].
    pub fn compile_sketch(&self, config: &Config) -> Result<(CompiledSketch, PathBuf)> {
        tracing::info!("Compiling project: {}", config.project.name);

        let document = config.load_document()?;
        let registry = self.generator.registry();
        let mut workspace = Workspace::new();
        workspace.load(registry, &document)?;

        let gate = CapabilityGate::new(registry.clone());
        let allowed = gate.allowed_types(&config.selection()?);
        let violations = gate.violations(&workspace, &allowed);

        let mut compiled = self.compile_workspace(&config.project.name, &document, &workspace)?;
        compiled.violations = violations;
        let path = self.write(&compiled)?;
        Ok((compiled, path))
    }

    /// Compile every `.json` document under a directory, each named after its
    /// file stem, and write the sketches to the output directory
    pub fn compile_all(
        &self,
        sketches_dir: impl AsRef<Path>,
    ) -> Result<Vec<(CompiledSketch, PathBuf)>> {
        let sketches_dir = sketches_dir.as_ref();
        let mut results = Vec::new();

        for entry in walkdir::WalkDir::new(sketches_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        {
            let compiled = self.compile_file(entry.path())?;
            let path = self.write(&compiled)?;
            results.push((compiled, path));
        }

        Ok(results)
    }

    fn compile_file(&self, path: &Path) -> Result<CompiledSketch> {
        tracing::info!("Compiling sketch: {}", path.display());
        let document = Document::read(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sketch".to_string());
        self.compile_document(&name, &document)
    }

    fn write(&self, compiled: &CompiledSketch) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.options.output_dir)?;
        let path = self
            .options
            .output_dir
            .join(format!("{}.ino", compiled.name));
        compiled.save(&path)?;
        tracing::info!("Wrote {} ({} bytes)", path.display(), compiled.size());
        Ok(path)
    }
}

/// A generated sketch ready to be written or uploaded
#[derive(Debug, Clone)]
pub struct CompiledSketch {
    /// Sketch name
    pub name: String,

    /// Generated source
    pub source: String,

    /// Content hash (for cache validation)
    pub hash: String,

    /// Whether the source came from the cache
    pub cached: bool,

    /// Placed blocks the selected components do not allow
    pub violations: Vec<Violation>,
}

impl CompiledSketch {
    /// Save the source to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), &self.source)?;
        Ok(())
    }

    /// Source size in bytes
    pub fn size(&self) -> usize {
        self.source.len()
    }
}
