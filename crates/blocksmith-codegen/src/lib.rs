//! Blocksmith Code Generation
//!
//! This crate turns a block workspace into an Arduino C++ sketch.
//!
//! # Pipeline Overview
//!
//! ```text
//! ┌───────────┐     ┌───────────┐     ┌─────────────┐     ┌─────────┐
//! │ Workspace │────▶│ Handlers  │────▶│ Definitions │────▶│  .ino   │
//! │  (graph)  │     │ (per type)│     │  + routines │     │ (text)  │
//! └───────────┘     └───────────┘     └─────────────┘     └─────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use blocksmith_codegen::Generator;
//! use blocksmith_core::{BlockRegistry, Workspace};
//!
//! let registry = Arc::new(BlockRegistry::builtin());
//! let workspace = Workspace::with_entry_point(&registry)?;
//! let result = Generator::new(registry).generate(&workspace);
//! println!("{}", result.output());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod compiler;
pub mod context;
pub mod definitions;
pub mod error;
pub mod generator;
pub mod handlers;
pub mod order;

pub use compiler::{CompileOptions, CompiledSketch, Compiler};
pub use context::{Context, sanitize_identifier};
pub use definitions::{Definitions, Section};
pub use error::{Error, Result};
pub use generator::{
    Diagnostic, DiagnosticKind, EMPTY_PROGRAM, GenerationResult, Generator, GeneratorOptions,
};
pub use handlers::{ExpressionHandler, Handler, HandlerTable, StatementHandler};
pub use order::Order;
