//! Blocksmith Core Library
//!
//! This crate provides the data model behind the Blocksmith block editor:
//! - Block types, block instances and the workspace graph
//! - The block registry and the built-in Arduino catalog
//! - The capability gate deriving placeable blocks from selected components
//! - Workspace persistence documents
//! - Project configuration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Components │────▶│ Capability  │────▶│  Workspace  │
//! │ (selection) │     │    Gate     │     │   (graph)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            ▲                   │
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │  Registry   │     │  Document   │
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use blocksmith_core::{BlockRegistry, Placement, Workspace};
//!
//! let registry = BlockRegistry::builtin();
//! let mut workspace = Workspace::with_entry_point(&registry)?;
//! let delay = registry.instantiate("arduino_delay", "d1")?;
//! workspace.insert(&registry, delay, Placement::TopLevel)?;
//! let document = workspace.save();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
pub mod catalog;
pub mod component;
pub mod config;
pub mod document;
pub mod error;
pub mod gate;
pub mod registry;
pub mod workspace;

pub use block::{
    Block, BlockType, Capability, FieldKind, FieldSpec, FieldValue, Prefill, Shape, SocketSpec,
    ValueType,
};
pub use component::{ComponentInstance, ComponentKind, ComponentSelection};
pub use config::{CodegenConfig, Config, ProjectConfig};
pub use document::{Document, deserialize, serialize};
pub use error::{Error, Result};
pub use gate::{CapabilityGate, PaletteCategory, PaletteRefresh, PaletteTracker, Violation};
pub use registry::{BlockRegistry, ENTRY_POINT, Registration, new_block_id};
pub use workspace::{Placement, Workspace};
