//! Blocksmith Runtime
//!
//! This crate connects an editing surface to the code generator.
//!
//! # Features
//!
//! - Mutation events describing workspace edits
//! - Debounced regeneration on a tokio task
//! - An editing [`Session`] that checks placements against the selected
//!   components and reports palette changes
//! - Delivery sinks for generated code
//!
//! # Usage
//!
//! ```rust,ignore
//! use blocksmith_runtime::{Session, sink::FileSink};
//!
//! let mut session = Session::from_config(&config, FileSink::new("build/sketch.ino"))?;
//! session.apply(edit)?;
//! session.shutdown().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod scheduler;
pub mod session;
pub mod sink;

pub use error::{Error, Result};
pub use events::{Edit, MutationKind};
pub use scheduler::{RegenerationScheduler, SchedulerHandle};
pub use session::Session;
pub use sink::{CallbackSink, FileSink, GenerationSink};
