//! Block registry
//!
//! The registry is the static catalog of block types. Lookups are
//! read-only; registration is idempotent so a re-initialising editor can
//! register the same catalog again without producing duplicate entries.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::block::{Block, BlockType, FieldKind, Shape, SocketSpec};
use crate::catalog;
use crate::error::{Error, Result};

/// Type id of the fixed setup/loop entry point
pub const ENTRY_POINT: &str = "controls_setup";

static BUILTIN: Lazy<BlockRegistry> = Lazy::new(|| {
    let mut registry = BlockRegistry::new();
    for block_type in catalog::builtin_types() {
        registry.register(block_type);
    }
    registry
});

/// Outcome of [`BlockRegistry::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The type id was new
    Inserted,
    /// An existing entry with the same id was replaced in place
    Replaced,
}

/// Catalog of block types keyed by id
#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
    types: Vec<BlockType>,
    index: HashMap<String, usize>,
}

impl BlockRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in block catalog
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Register a block type, replacing any entry with the same id
    pub fn register(&mut self, block_type: BlockType) -> Registration {
        match self.index.get(&block_type.id) {
            Some(&position) => {
                tracing::debug!("replacing block type '{}'", block_type.id);
                self.types[position] = block_type;
                Registration::Replaced
            }
            None => {
                self.index.insert(block_type.id.clone(), self.types.len());
                self.types.push(block_type);
                Registration::Inserted
            }
        }
    }

    /// Describe a registered type
    pub fn describe(&self, id: &str) -> Result<&BlockType> {
        self.get(id).ok_or_else(|| Error::UnknownType {
            block_type: id.to_string(),
        })
    }

    /// Look up a type without failing
    pub fn get(&self, id: &str) -> Option<&BlockType> {
        self.index.get(id).map(|&position| &self.types[position])
    }

    /// Whether a type id is registered
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Registered types in registration order
    pub fn types(&self) -> impl Iterator<Item = &BlockType> {
        self.types.iter()
    }

    /// Distinct categories in registration order
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for block_type in &self.types {
            if !categories.contains(&block_type.category.as_str()) {
                categories.push(&block_type.category);
            }
        }
        categories
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Create a block of the given type as the palette would: default field
    /// values plus any prefilled socket children (with fresh ids)
    pub fn instantiate(&self, block_type: &str, id: impl Into<String>) -> Result<Block> {
        let spec = self.describe(block_type)?;
        let mut block = Block::new(id, block_type);
        block.deletable = spec.deletable;
        for field in &spec.fields {
            block.fields.insert(field.name.clone(), field.default.clone());
        }
        for socket in &spec.sockets {
            if let SocketSpec::Value {
                name,
                prefill: Some(prefill),
                ..
            } = socket
            {
                let mut child = self.instantiate(&prefill.block_type, new_block_id())?;
                for (field, value) in &prefill.fields {
                    child.fields.insert(field.clone(), value.clone());
                }
                block.inputs.insert(name.clone(), Box::new(child));
            }
        }
        Ok(block)
    }

    /// Check that `child` may be connected to `socket` of a `parent` block
    pub fn check_connection(&self, parent: &BlockType, socket: &str, child: &Block) -> Result<()> {
        let spec = parent.socket(socket).ok_or_else(|| {
            Error::placement(format!("'{}' has no socket '{}'", parent.id, socket))
        })?;
        let child_type = self.describe(&child.block_type)?;
        if !child_type.chainable {
            return Err(Error::placement(format!(
                "'{}' cannot be nested",
                child_type.id
            )));
        }
        match spec {
            SocketSpec::Statement { .. } => {
                if child_type.shape != Shape::Statement {
                    return Err(Error::placement(format!(
                        "statement socket '{}' of '{}' cannot hold expression '{}'",
                        socket, parent.id, child_type.id
                    )));
                }
            }
            SocketSpec::Value { check, .. } => {
                if child_type.shape != Shape::Expression {
                    return Err(Error::placement(format!(
                        "value socket '{}' of '{}' cannot hold statement '{}'",
                        socket, parent.id, child_type.id
                    )));
                }
                if let (Some(accepted), Some(output)) = (check, child_type.output)
                    && !accepted.contains(&output)
                {
                    return Err(Error::placement(format!(
                        "socket '{}' of '{}' does not accept {} values",
                        socket, parent.id, output
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check that `next` may follow `previous` in a statement chain
    pub fn check_chain(&self, previous: &BlockType, next: &Block) -> Result<()> {
        let next_type = self.describe(&next.block_type)?;
        if previous.shape != Shape::Statement || !previous.chainable {
            return Err(Error::placement(format!(
                "nothing can follow '{}'",
                previous.id
            )));
        }
        if next_type.shape != Shape::Statement || !next_type.chainable {
            return Err(Error::placement(format!(
                "'{}' cannot be chained",
                next_type.id
            )));
        }
        Ok(())
    }

    /// Validate a block subtree: every type is registered, every declared
    /// field is present and within its domain, and every connection is legal
    pub fn validate_block(&self, block: &Block) -> Result<()> {
        for current in block.chain() {
            let spec = self.describe(&current.block_type)?;
            for field in &spec.fields {
                let value = current.field(&field.name).ok_or_else(|| Error::InvalidField {
                    block_id: current.id.clone(),
                    field: field.name.clone(),
                    message: "missing".to_string(),
                })?;
                field
                    .validate(value)
                    .map_err(|message| Error::InvalidField {
                        block_id: current.id.clone(),
                        field: field.name.clone(),
                        message,
                    })?;
            }
            if let Some(unknown) = current.fields.keys().find(|name| spec.field(name).is_none()) {
                return Err(Error::InvalidField {
                    block_id: current.id.clone(),
                    field: unknown.clone(),
                    message: format!("'{}' has no such field", spec.id),
                });
            }
            if spec.shape == Shape::Expression && current.next.is_some() {
                return Err(Error::placement(format!(
                    "expression '{}' cannot be followed by a statement",
                    current.id
                )));
            }
            for (socket, child) in &current.inputs {
                self.check_connection(spec, socket, child)?;
                self.validate_block(child)?;
            }
            if let Some(next) = &current.next {
                self.check_chain(spec, next)?;
            }
        }
        Ok(())
    }

    /// Names of the variable fields a block type declares
    pub fn variable_fields<'a>(&'a self, block: &Block) -> impl Iterator<Item = &'a str> + use<'a> {
        self.get(&block.block_type)
            .into_iter()
            .flat_map(|spec| spec.fields.iter())
            .filter(|field| field.kind == FieldKind::Variable)
            .map(|field| field.name.as_str())
    }
}

/// Fresh unique block id
pub fn new_block_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
