//! Workspace edits and the mutation events they raise

use serde::{Deserialize, Serialize};

use blocksmith_core::{Block, Document, FieldValue, Placement};

/// Kind of graph mutation reported to the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// A block was created or pasted
    BlockCreated,
    /// A block was moved
    BlockMoved,
    /// A block was deleted
    BlockDeleted,
    /// A field value changed
    BlockChanged,
    /// A variable was declared
    VariableCreated,
    /// A variable and its blocks were removed
    VariableDeleted,
    /// The workspace was rebuilt empty
    WorkspaceCleared,
    /// The workspace was replaced by a document
    WorkspaceLoaded,
}

/// An edit requested by the editing surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    /// Drop a fresh block from the palette
    Create {
        /// Type to instantiate
        block_type: String,
        /// Id for the new block; generated when absent
        #[serde(default)]
        id: Option<String>,
        /// Where to connect it
        placement: Placement,
    },
    /// Insert a copied subtree
    Paste {
        /// Subtree to insert
        block: Block,
        /// Where to connect it
        placement: Placement,
    },
    /// Reconnect an existing block and its subtree
    Move {
        /// Block to move
        id: String,
        /// New position
        placement: Placement,
    },
    /// Remove a block and its subtree
    Delete {
        /// Block to delete
        id: String,
    },
    /// Set a field value
    Change {
        /// Block to change
        id: String,
        /// Field name
        field: String,
        /// New value
        value: FieldValue,
    },
    /// Declare a variable
    CreateVariable {
        /// Variable name
        name: String,
    },
    /// Remove a variable and every block that uses it
    DeleteVariable {
        /// Variable name
        name: String,
    },
    /// Rebuild an empty workspace
    Clear,
    /// Replace the workspace with a document
    Load {
        /// Document to load
        document: Document,
    },
}

impl Edit {
    /// Mutation raised by this edit
    pub fn kind(&self) -> MutationKind {
        match self {
            Edit::Create { .. } | Edit::Paste { .. } => MutationKind::BlockCreated,
            Edit::Move { .. } => MutationKind::BlockMoved,
            Edit::Delete { .. } => MutationKind::BlockDeleted,
            Edit::Change { .. } => MutationKind::BlockChanged,
            Edit::CreateVariable { .. } => MutationKind::VariableCreated,
            Edit::DeleteVariable { .. } => MutationKind::VariableDeleted,
            Edit::Clear => MutationKind::WorkspaceCleared,
            Edit::Load { .. } => MutationKind::WorkspaceLoaded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_from_json() {
        let edit: Edit = serde_json::from_str(
            r#"{"op": "create", "block_type": "arduino_delay", "placement": {"at": "top_level"}}"#,
        )
        .unwrap();
        assert_eq!(
            edit,
            Edit::Create {
                block_type: "arduino_delay".to_string(),
                id: None,
                placement: Placement::TopLevel,
            }
        );
        assert_eq!(edit.kind(), MutationKind::BlockCreated);
    }

    #[test]
    fn test_change_value_is_untagged() {
        let edit: Edit = serde_json::from_str(
            r#"{"op": "change", "id": "d1", "field": "TIME", "value": 250}"#,
        )
        .unwrap();
        let Edit::Change { value, .. } = &edit else {
            panic!("expected change");
        };
        assert_eq!(value, &FieldValue::Number(250.0));
        assert_eq!(edit.kind(), MutationKind::BlockChanged);
    }

    #[test]
    fn test_clear_kind() {
        let edit: Edit = serde_json::from_str(r#"{"op": "clear"}"#).unwrap();
        assert_eq!(edit.kind(), MutationKind::WorkspaceCleared);
    }
}
