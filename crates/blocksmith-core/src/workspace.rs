//! The block graph being edited
//!
//! A [`Workspace`] is a forest of top-level root blocks plus the set of
//! declared variable names. Every edit validates first and mutates second,
//! so a rejected edit leaves the graph untouched.

use std::collections::{BTreeSet, HashSet};

use crate::block::{Block, FieldKind, FieldValue, SocketSpec};
use crate::error::{Error, Result};
use crate::registry::{BlockRegistry, ENTRY_POINT, new_block_id};

/// Where an inserted or moved block is connected
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "at", rename_all = "snake_case")]
pub enum Placement {
    /// As a new top-level root
    TopLevel,
    /// Directly after a statement block, splicing into its chain
    After {
        /// Statement the block follows
        target: String,
    },
    /// Into a named socket of a parent block
    Socket {
        /// Parent block id
        parent: String,
        /// Socket name on the parent
        socket: String,
    },
}

/// Block graph plus declared variables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workspace {
    roots: Vec<Block>,
    variables: BTreeSet<String>,
}

impl Workspace {
    /// Workspace with no blocks at all
    pub fn new() -> Self {
        Self::default()
    }

    /// Workspace holding a single fresh entry point
    pub fn with_entry_point(registry: &BlockRegistry) -> Result<Self> {
        let entry = registry.instantiate(ENTRY_POINT, new_block_id())?;
        Ok(Self {
            roots: vec![entry],
            variables: BTreeSet::new(),
        })
    }

    pub(crate) fn from_parts(roots: Vec<Block>, variables: BTreeSet<String>) -> Self {
        Self { roots, variables }
    }

    /// Top-level blocks in insertion order
    pub fn roots(&self) -> &[Block] {
        &self.roots
    }

    /// Declared variable names
    pub fn variables(&self) -> &BTreeSet<String> {
        &self.variables
    }

    /// First entry-point root, if any
    pub fn entry_point(&self) -> Option<&Block> {
        self.roots.iter().find(|b| b.block_type == ENTRY_POINT)
    }

    /// Find a block anywhere in the graph
    pub fn find(&self, id: &str) -> Option<&Block> {
        self.roots.iter().find_map(|root| root.find(id))
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Block> {
        self.roots.iter_mut().find_map(|root| root.find_mut(id))
    }

    /// Whether a block id is present
    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Visit every block in the graph
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Block)) {
        for root in &self.roots {
            root.walk(visit);
        }
    }

    /// Total number of blocks
    pub fn len(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }

    /// Whether the graph holds no blocks
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Insert a new block subtree.
    ///
    /// The subtree is validated against the registry, its ids must be new to
    /// the workspace and variables referenced by variable fields are declared
    /// on the fly.
    pub fn insert(
        &mut self,
        registry: &BlockRegistry,
        mut block: Block,
        placement: Placement,
    ) -> Result<()> {
        registry.validate_block(&block)?;
        let mut seen = HashSet::new();
        let mut duplicate = None;
        block.walk(&mut |b| {
            if duplicate.is_none() && (!seen.insert(b.id.clone()) || self.contains(&b.id)) {
                duplicate = Some(b.id.clone());
            }
        });
        if let Some(id) = duplicate {
            return Err(Error::DuplicateBlock { id });
        }
        self.check_placement(registry, &block, &placement)?;

        normalize_deletable(registry, &mut block);
        let mut referenced = Vec::new();
        block.walk(&mut |b| {
            for field in registry.variable_fields(b) {
                if let Some(name) = b.field(field).and_then(FieldValue::as_text) {
                    referenced.push(name.to_string());
                }
            }
        });
        self.variables.extend(referenced);

        tracing::debug!("inserting block '{}' ({})", block.id, block.block_type);
        self.attach(registry, block, placement);
        Ok(())
    }

    /// Move an existing block, with the statements chained below it, to a new
    /// placement
    pub fn move_block(
        &mut self,
        registry: &BlockRegistry,
        id: &str,
        placement: Placement,
    ) -> Result<()> {
        let block = self
            .find(id)
            .ok_or_else(|| Error::BlockNotFound { id: id.to_string() })?;
        let target = match &placement {
            Placement::TopLevel => None,
            Placement::After { target } => Some(target),
            Placement::Socket { parent, .. } => Some(parent),
        };
        if let Some(target) = target
            && block.find(target).is_some()
        {
            return Err(Error::placement(format!(
                "'{}' cannot be connected inside itself",
                id
            )));
        }
        self.check_placement(registry, block, &placement)?;

        let block = self
            .take(id, false)
            .ok_or_else(|| Error::BlockNotFound { id: id.to_string() })?;
        tracing::debug!("moving block '{}' to {:?}", id, placement);
        self.attach(registry, block, placement);
        Ok(())
    }

    /// Delete a block and everything in its sockets. Statements chained below
    /// it move up to take its place.
    pub fn delete(&mut self, id: &str) -> Result<Block> {
        let block = self
            .find(id)
            .ok_or_else(|| Error::BlockNotFound { id: id.to_string() })?;
        if !block.deletable {
            return Err(Error::ProtectedBlock { id: id.to_string() });
        }
        tracing::debug!("deleting block '{}'", id);
        self.take(id, true)
            .ok_or_else(|| Error::BlockNotFound { id: id.to_string() })
    }

    /// Change a field value, validated against the field's domain
    pub fn set_field(
        &mut self,
        registry: &BlockRegistry,
        id: &str,
        name: &str,
        value: FieldValue,
    ) -> Result<()> {
        let block = self
            .find(id)
            .ok_or_else(|| Error::BlockNotFound { id: id.to_string() })?;
        let spec = registry.describe(&block.block_type)?;
        let field = spec.field(name).ok_or_else(|| Error::InvalidField {
            block_id: id.to_string(),
            field: name.to_string(),
            message: format!("'{}' has no such field", spec.id),
        })?;
        field
            .validate(&value)
            .map_err(|message| Error::InvalidField {
                block_id: id.to_string(),
                field: name.to_string(),
                message,
            })?;
        if field.kind == FieldKind::Variable
            && let Some(variable) = value.as_text()
        {
            self.variables.insert(variable.to_string());
        }
        if let Some(block) = self.find_mut(id) {
            block.fields.insert(name.to_string(), value);
        }
        Ok(())
    }

    /// Declare a variable. Returns `false` if it already existed.
    pub fn create_variable(&mut self, name: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidVariable {
                name: name.to_string(),
            });
        }
        Ok(self.variables.insert(name.to_string()))
    }

    /// Remove a variable together with every block that reads or writes it.
    /// Returns the number of blocks removed.
    pub fn delete_variable(&mut self, registry: &BlockRegistry, name: &str) -> usize {
        if !self.variables.remove(name) {
            return 0;
        }
        let mut users = Vec::new();
        self.walk(&mut |b| {
            let refers = registry
                .variable_fields(b)
                .any(|field| b.field(field).and_then(FieldValue::as_text) == Some(name));
            if refers {
                users.push(b.id.clone());
            }
        });
        let removed = users
            .iter()
            .filter(|id| self.take(id, true).is_some())
            .count();
        tracing::debug!("deleted variable '{}' and {} blocks", name, removed);
        removed
    }

    /// Replace everything with a fresh entry point
    pub fn clear(&mut self, registry: &BlockRegistry) -> Result<()> {
        *self = Self::with_entry_point(registry)?;
        Ok(())
    }

    fn check_placement(
        &self,
        registry: &BlockRegistry,
        block: &Block,
        placement: &Placement,
    ) -> Result<()> {
        match placement {
            Placement::TopLevel => Ok(()),
            Placement::After { target } => {
                let target_block = self
                    .find(target)
                    .ok_or_else(|| Error::BlockNotFound { id: target.clone() })?;
                let target_type = registry.describe(&target_block.block_type)?;
                registry.check_chain(target_type, block)
            }
            Placement::Socket { parent, socket } => {
                let parent_block = self
                    .find(parent)
                    .ok_or_else(|| Error::BlockNotFound { id: parent.clone() })?;
                let parent_type = registry.describe(&parent_block.block_type)?;
                registry.check_connection(parent_type, socket, block)?;
                let statement = parent_type
                    .socket(socket)
                    .is_some_and(SocketSpec::is_statement);
                if !statement && block.next.is_some() {
                    return Err(Error::placement(format!(
                        "value socket '{}' cannot hold a chain",
                        socket
                    )));
                }
                Ok(())
            }
        }
    }

    fn attach(&mut self, registry: &BlockRegistry, mut block: Block, placement: Placement) {
        match placement {
            Placement::TopLevel => self.roots.push(block),
            Placement::After { target } => {
                if let Some(target) = self.find_mut(&target) {
                    if let Some(tail) = target.next.take() {
                        block.append(*tail);
                    }
                    target.next = Some(Box::new(block));
                } else {
                    self.roots.push(block);
                }
            }
            Placement::Socket { parent, socket } => {
                let statement = self
                    .find(&parent)
                    .and_then(|p| registry.get(&p.block_type))
                    .and_then(|spec| spec.socket(&socket))
                    .is_some_and(SocketSpec::is_statement);
                let mut bumped = None;
                match self.find_mut(&parent) {
                    Some(parent) => {
                        match parent.inputs.remove(&socket) {
                            Some(existing) if statement => {
                                block.append(*existing);
                            }
                            Some(existing) => bumped = Some(*existing),
                            None => {}
                        }
                        parent.inputs.insert(socket, Box::new(block));
                    }
                    None => self.roots.push(block),
                }
                if let Some(bumped) = bumped {
                    tracing::debug!("socket occupant '{}' moved to the top level", bumped.id);
                    self.roots.push(bumped);
                }
            }
        }
    }

    /// Detach a block from wherever it lives
    fn take(&mut self, id: &str, heal: bool) -> Option<Block> {
        if let Some(position) = self.roots.iter().position(|root| root.id == id) {
            let mut block = self.roots.remove(position);
            if let Some(next) = block.next.take() {
                if heal {
                    self.roots.insert(position, *next);
                } else {
                    block.next = Some(next);
                }
            }
            return Some(block);
        }
        self.roots
            .iter_mut()
            .find_map(|root| root.take_descendant(id, heal))
    }
}

/// Reset the protection flag of every block in the subtree from its type.
/// Only protected types such as the entry point stay undeletable.
pub(crate) fn normalize_deletable(registry: &BlockRegistry, block: &mut Block) {
    let mut current = Some(block);
    while let Some(block) = current {
        block.deletable = registry
            .get(&block.block_type)
            .is_none_or(|spec| spec.deletable);
        for child in block.inputs.values_mut() {
            normalize_deletable(registry, child);
        }
        current = block.next.as_deref_mut();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (BlockRegistry, Workspace, String) {
        let registry = BlockRegistry::builtin();
        let workspace = Workspace::with_entry_point(&registry).unwrap();
        let entry = workspace.entry_point().unwrap().id.clone();
        (registry, workspace, entry)
    }

    fn delay(registry: &BlockRegistry, id: &str) -> Block {
        registry.instantiate("arduino_delay", id).unwrap()
    }

    fn into(parent: &str, socket: &str) -> Placement {
        Placement::Socket {
            parent: parent.to_string(),
            socket: socket.to_string(),
        }
    }

    fn setup_ids(workspace: &Workspace) -> Vec<String> {
        workspace
            .entry_point()
            .and_then(|e| e.input("SETUP"))
            .map(|head| head.chain().map(|b| b.id.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_insert_into_statement_socket_splices_existing_chain() {
        let (registry, mut workspace, entry) = setup();
        workspace
            .insert(&registry, delay(&registry, "b"), into(&entry, "SETUP"))
            .unwrap();
        workspace
            .insert(&registry, delay(&registry, "a"), into(&entry, "SETUP"))
            .unwrap();
        workspace
            .insert(
                &registry,
                delay(&registry, "c"),
                Placement::After {
                    target: "b".to_string(),
                },
            )
            .unwrap();
        assert_eq!(setup_ids(&workspace), vec!["a", "b", "c"]);
        assert_eq!(workspace.len(), 4);
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let (registry, mut workspace, entry) = setup();
        workspace
            .insert(&registry, delay(&registry, "a"), into(&entry, "SETUP"))
            .unwrap();
        let err = workspace
            .insert(&registry, delay(&registry, "a"), Placement::TopLevel)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateBlock { .. }));
        assert_eq!(workspace.len(), 2);
    }

    #[test]
    fn test_insert_rejects_mismatched_value_type() {
        let (registry, mut workspace, _) = setup();
        let branch = registry.instantiate("controls_if", "if").unwrap();
        workspace.insert(&registry, branch, Placement::TopLevel).unwrap();
        let number = registry.instantiate("math_number", "n").unwrap();
        let before = workspace.clone();
        let err = workspace
            .insert(&registry, number, into("if", "IF0"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPlacement { .. }));
        assert_eq!(workspace, before);
    }

    #[test]
    fn test_occupied_value_socket_bumps_old_child() {
        let (registry, mut workspace, _) = setup();
        let print = registry.instantiate("arduino_serial_print", "p").unwrap();
        let prefill = print.input("TEXT").unwrap().id.clone();
        workspace.insert(&registry, print, Placement::TopLevel).unwrap();
        let number = registry.instantiate("math_number", "n").unwrap();
        workspace
            .insert(&registry, number, into("p", "TEXT"))
            .unwrap();
        assert_eq!(workspace.find("p").unwrap().input("TEXT").unwrap().id, "n");
        assert!(workspace.roots().iter().any(|r| r.id == prefill));
    }

    #[test]
    fn test_entry_point_is_protected() {
        let (_, mut workspace, entry) = setup();
        let err = workspace.delete(&entry).unwrap_err();
        assert!(matches!(err, Error::ProtectedBlock { .. }));
        assert!(workspace.entry_point().is_some());
    }

    #[test]
    fn test_inserted_block_cannot_claim_protection() {
        let (registry, mut workspace, entry) = setup();
        let mut wait = delay(&registry, "d");
        wait.deletable = false;
        workspace.insert(&registry, wait, into(&entry, "SETUP")).unwrap();
        assert!(workspace.find("d").unwrap().deletable);
        workspace.delete("d").unwrap();
        assert!(!workspace.contains("d"));
    }

    #[test]
    fn test_entry_point_cannot_be_nested() {
        let (registry, mut workspace, entry) = setup();
        let branch = registry.instantiate("controls_if", "if").unwrap();
        workspace.insert(&registry, branch, Placement::TopLevel).unwrap();
        assert!(workspace.move_block(&registry, &entry, into("if", "DO0")).is_err());
    }

    #[test]
    fn test_delete_heals_chain() {
        let (registry, mut workspace, entry) = setup();
        for id in ["c", "b", "a"] {
            workspace
                .insert(&registry, delay(&registry, id), into(&entry, "SETUP"))
                .unwrap();
        }
        let removed = workspace.delete("b").unwrap();
        assert!(removed.next.is_none());
        assert_eq!(setup_ids(&workspace), vec!["a", "c"]);
    }

    #[test]
    fn test_move_carries_tail() {
        let (registry, mut workspace, entry) = setup();
        for id in ["c", "b", "a"] {
            workspace
                .insert(&registry, delay(&registry, id), into(&entry, "SETUP"))
                .unwrap();
        }
        workspace
            .move_block(&registry, "b", into(&entry, "LOOP"))
            .unwrap();
        assert_eq!(setup_ids(&workspace), vec!["a"]);
        let loop_ids: Vec<_> = workspace
            .entry_point()
            .unwrap()
            .input("LOOP")
            .unwrap()
            .chain()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(loop_ids, vec!["b", "c"]);
    }

    #[test]
    fn test_move_into_own_subtree_is_rejected() {
        let (registry, mut workspace, entry) = setup();
        let repeat = registry.instantiate("controls_repeat_ext", "r").unwrap();
        workspace.insert(&registry, repeat, into(&entry, "LOOP")).unwrap();
        workspace
            .insert(&registry, delay(&registry, "d"), into("r", "DO"))
            .unwrap();
        let before = workspace.clone();
        assert!(workspace.move_block(&registry, "r", into("d", "DO")).is_err());
        assert!(
            workspace
                .move_block(&registry, "r", Placement::After { target: "d".into() })
                .is_err()
        );
        assert_eq!(workspace, before);
    }

    #[test]
    fn test_set_field_validates_domain() {
        let (registry, mut workspace, entry) = setup();
        workspace
            .insert(&registry, delay(&registry, "d"), into(&entry, "SETUP"))
            .unwrap();
        workspace
            .set_field(&registry, "d", "TIME", FieldValue::Number(250.0))
            .unwrap();
        assert_eq!(
            workspace.find("d").unwrap().field("TIME"),
            Some(&FieldValue::Number(250.0))
        );
        assert!(
            workspace
                .set_field(&registry, "d", "TIME", FieldValue::Number(0.0))
                .is_err()
        );
        assert!(
            workspace
                .set_field(&registry, "d", "COLOR", FieldValue::from("red"))
                .is_err()
        );
    }

    #[test]
    fn test_variable_lifecycle() {
        let (registry, mut workspace, entry) = setup();
        assert!(workspace.create_variable("speed").unwrap());
        assert!(!workspace.create_variable("speed").unwrap());
        assert!(workspace.create_variable("  ").is_err());

        let set = registry
            .instantiate("variables_set", "set")
            .unwrap()
            .with_field("VAR", "speed");
        workspace.insert(&registry, set, into(&entry, "SETUP")).unwrap();
        workspace
            .insert(&registry, delay(&registry, "d"), Placement::After { target: "set".into() })
            .unwrap();

        let removed = workspace.delete_variable(&registry, "speed");
        assert_eq!(removed, 1);
        assert!(workspace.variables().is_empty());
        assert_eq!(setup_ids(&workspace), vec!["d"]);
    }

    #[test]
    fn test_insert_declares_referenced_variables() {
        let (registry, mut workspace, _) = setup();
        let get = registry
            .instantiate("variables_get", "g")
            .unwrap()
            .with_field("VAR", "level");
        workspace.insert(&registry, get, Placement::TopLevel).unwrap();
        assert!(workspace.variables().contains("level"));
    }

    #[test]
    fn test_clear_leaves_fresh_entry_point() {
        let (registry, mut workspace, entry) = setup();
        workspace
            .insert(&registry, delay(&registry, "d"), into(&entry, "SETUP"))
            .unwrap();
        workspace.create_variable("x").unwrap();
        workspace.clear(&registry).unwrap();
        assert_eq!(workspace.len(), 1);
        assert!(workspace.variables().is_empty());
        assert_ne!(workspace.entry_point().unwrap().id, entry);
    }
}
