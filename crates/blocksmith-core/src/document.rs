//! Workspace persistence
//!
//! A [`Document`] is the flat, versioned JSON form of a [`Workspace`]:
//! every block is one record keyed by its stable id, and sockets and chain
//! links refer to other records by id. Loading is all-or-nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use crate::block::{Block, FieldValue};
use crate::error::{Error, Result};
use crate::registry::BlockRegistry;
use crate::workspace::{Workspace, normalize_deletable};

/// Format tag written into every document
pub const DOCUMENT_FORMAT: &str = "blocksmith-workspace";

/// Current document version
pub const DOCUMENT_VERSION: u32 = 1;

/// Persisted workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Always [`DOCUMENT_FORMAT`]
    pub format: String,

    /// Document schema version
    pub version: u32,

    /// When the document was produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,

    /// Declared variable names
    #[serde(default)]
    pub variables: Vec<String>,

    /// Ids of the top-level blocks in order
    pub roots: Vec<String>,

    /// Every block, parents before children
    pub blocks: Vec<BlockRecord>,
}

/// One persisted block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Block id
    pub id: String,

    /// Block type id
    #[serde(rename = "type")]
    pub block_type: String,

    /// Field values
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldValue>,

    /// Socket name to child block id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, String>,

    /// Following block id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,

    /// Written only for protected blocks
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub deletable: bool,
}

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

impl Document {
    /// Parse a document from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::malformed(e.to_string()))
    }

    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a document file
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Write a document file
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Capture a workspace as a document
pub fn serialize(workspace: &Workspace) -> Document {
    let mut blocks = Vec::new();
    for root in workspace.roots() {
        flatten(root, &mut blocks);
    }
    Document {
        format: DOCUMENT_FORMAT.to_string(),
        version: DOCUMENT_VERSION,
        saved_at: Some(Utc::now()),
        variables: workspace.variables().iter().cloned().collect(),
        roots: workspace.roots().iter().map(|r| r.id.clone()).collect(),
        blocks,
    }
}

fn flatten(block: &Block, out: &mut Vec<BlockRecord>) {
    for current in block.chain() {
        out.push(BlockRecord {
            id: current.id.clone(),
            block_type: current.block_type.clone(),
            fields: current.fields.clone(),
            inputs: current
                .inputs
                .iter()
                .map(|(socket, child)| (socket.clone(), child.id.clone()))
                .collect(),
            next: current.next.as_ref().map(|n| n.id.clone()),
            deletable: current.deletable,
        });
        for child in current.inputs.values() {
            flatten(child, out);
        }
    }
}

/// Rebuild a workspace from a document, validating it completely
pub fn deserialize(registry: &BlockRegistry, document: &Document) -> Result<Workspace> {
    if document.format != DOCUMENT_FORMAT {
        return Err(Error::malformed(format!(
            "unsupported format '{}'",
            document.format
        )));
    }
    if document.version != DOCUMENT_VERSION {
        return Err(Error::malformed(format!(
            "unsupported version {}",
            document.version
        )));
    }

    let mut records: HashMap<&str, &BlockRecord> = HashMap::new();
    for record in &document.blocks {
        if records.insert(record.id.as_str(), record).is_some() {
            return Err(Error::malformed(format!("duplicate block id '{}'", record.id)));
        }
    }

    let mut parents: HashMap<&str, &str> = HashMap::new();
    for record in &document.blocks {
        let children = record
            .inputs
            .values()
            .chain(record.next.iter())
            .map(String::as_str);
        for child in children {
            if !records.contains_key(child) {
                return Err(Error::malformed(format!(
                    "block '{}' refers to missing block '{}'",
                    record.id, child
                )));
            }
            if let Some(previous) = parents.insert(child, &record.id) {
                return Err(Error::malformed(format!(
                    "block '{}' is connected to both '{}' and '{}'",
                    child, previous, record.id
                )));
            }
        }
    }

    let mut root_ids = BTreeSet::new();
    for root in &document.roots {
        if !records.contains_key(root.as_str()) {
            return Err(Error::malformed(format!("root '{}' does not exist", root)));
        }
        if parents.contains_key(root.as_str()) || !root_ids.insert(root.as_str()) {
            return Err(Error::malformed(format!("root '{}' has a parent", root)));
        }
    }

    let mut visited = 0;
    let mut roots = Vec::with_capacity(document.roots.len());
    for root in &document.roots {
        roots.push(build(root, &records, &mut visited)?);
    }
    if visited != document.blocks.len() {
        return Err(Error::malformed(format!(
            "{} blocks are unreachable from the roots",
            document.blocks.len() - visited
        )));
    }

    let mut variables = BTreeSet::new();
    for name in &document.variables {
        if name.trim().is_empty() {
            return Err(Error::malformed("empty variable name"));
        }
        variables.insert(name.clone());
    }

    for root in &mut roots {
        registry.validate_block(root).map_err(|e| match e {
            Error::UnknownType { .. } => e,
            other => Error::malformed(other.to_string()),
        })?;
        normalize_deletable(registry, root);
    }

    let mut undeclared = None;
    for root in &roots {
        root.walk(&mut |b| {
            for field in registry.variable_fields(b) {
                if let Some(name) = b.field(field).and_then(FieldValue::as_text)
                    && !variables.contains(name)
                    && undeclared.is_none()
                {
                    undeclared = Some(name.to_string());
                }
            }
        });
    }
    if let Some(name) = undeclared {
        return Err(Error::malformed(format!("variable '{}' is not declared", name)));
    }

    Ok(Workspace::from_parts(roots, variables))
}

fn build(id: &str, records: &HashMap<&str, &BlockRecord>, visited: &mut usize) -> Result<Block> {
    let mut chain = Vec::new();
    let mut current = Some(id);
    while let Some(id) = current {
        *visited += 1;
        let record = records
            .get(id)
            .ok_or_else(|| Error::malformed(format!("block '{}' does not exist", id)))?;
        let mut block = Block::new(record.id.clone(), record.block_type.clone());
        block.fields = record.fields.clone();
        block.deletable = record.deletable;
        for (socket, child) in &record.inputs {
            block
                .inputs
                .insert(socket.clone(), Box::new(build(child, records, visited)?));
        }
        chain.push(block);
        current = record.next.as_deref();
    }
    Block::from_chain(chain).ok_or_else(|| Error::malformed(format!("block '{}' is empty", id)))
}

impl Workspace {
    /// Capture this workspace as a document
    pub fn save(&self) -> Document {
        serialize(self)
    }

    /// Replace this workspace with the document's contents. On failure the
    /// current contents are left untouched.
    pub fn load(&mut self, registry: &BlockRegistry, document: &Document) -> Result<()> {
        let loaded = deserialize(registry, document)?;
        tracing::info!(
            "loaded workspace with {} blocks and {} variables",
            loaded.len(),
            loaded.variables().len()
        );
        *self = loaded;
        Ok(())
    }
}
