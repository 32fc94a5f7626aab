//! Block types and block instances
//!
//! A [`BlockType`] is a registry entry describing the semantic shape of a
//! block: whether it is a statement or an expression, which sockets it
//! exposes and which literal fields it carries. A [`Block`] is one node of a
//! program graph. Blocks own their children outright: every value socket,
//! statement socket and `next` link holds a boxed child, so the graph is a
//! forest by construction.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::component::ComponentKind;

/// Statement blocks chain vertically; expression blocks plug into value sockets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// Emits one statement and may be followed by another statement
    Statement,
    /// Produces a value consumed by a parent socket
    Expression,
}

/// Type tag carried by value sockets and expression outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueType {
    /// Numeric value
    Number,
    /// Boolean value
    Boolean,
    /// Text value
    String,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Number => "Number",
            ValueType::Boolean => "Boolean",
            ValueType::String => "String",
        };
        f.write_str(name)
    }
}

/// Concrete value of a block field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Numeric literal
    Number(f64),
    /// Text, dropdown value or variable name
    Text(String),
}

impl FieldValue {
    /// Numeric content, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }

    /// Text content, if this is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Number(_) => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// Domain of an editable field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Number with optional inclusive bounds
    Number {
        /// Lower bound
        min: Option<f64>,
        /// Upper bound
        max: Option<f64>,
    },
    /// Fixed choice; options are `(label, value)` pairs
    Dropdown {
        /// Available options
        options: Vec<(String, String)>,
    },
    /// Free text
    Text,
    /// Reference to a workspace variable
    Variable,
}

/// Declaration of an editable literal parameter
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Field name (e.g. `PIN`)
    pub name: String,
    /// Field domain
    pub kind: FieldKind,
    /// Value used when a block is created from the palette
    pub default: FieldValue,
}

impl FieldSpec {
    /// Check a value against this field's domain
    pub fn validate(&self, value: &FieldValue) -> std::result::Result<(), String> {
        match (&self.kind, value) {
            (FieldKind::Number { min, max }, FieldValue::Number(n)) => {
                if !n.is_finite() {
                    return Err(format!("{} is not a finite number", n));
                }
                if let Some(min) = min
                    && n < min
                {
                    return Err(format!("{} is below the minimum {}", n, min));
                }
                if let Some(max) = max
                    && n > max
                {
                    return Err(format!("{} is above the maximum {}", n, max));
                }
                Ok(())
            }
            (FieldKind::Number { .. }, FieldValue::Text(s)) => {
                Err(format!("expected a number, got '{}'", s))
            }
            (FieldKind::Dropdown { options }, FieldValue::Text(s)) => {
                if options.iter().any(|(_, value)| value == s) {
                    Ok(())
                } else {
                    Err(format!("'{}' is not one of the allowed options", s))
                }
            }
            (FieldKind::Text, FieldValue::Text(_)) => Ok(()),
            (FieldKind::Variable, FieldValue::Text(s)) if !s.trim().is_empty() => Ok(()),
            (FieldKind::Variable, FieldValue::Text(_)) => {
                Err("variable name must not be empty".to_string())
            }
            (_, FieldValue::Number(n)) => Err(format!("expected text, got {}", n)),
        }
    }
}

/// Child expression inserted into a value socket when the block is created
/// from the palette
#[derive(Debug, Clone, PartialEq)]
pub struct Prefill {
    /// Expression block type
    pub block_type: String,
    /// Field values for the prefilled block
    pub fields: Vec<(String, FieldValue)>,
}

/// A named slot on a block
#[derive(Debug, Clone, PartialEq)]
pub enum SocketSpec {
    /// Accepts one expression block
    Value {
        /// Socket name
        name: String,
        /// Accepted value types; `None` accepts anything
        check: Option<Vec<ValueType>>,
        /// Literal substituted when nothing is connected
        default: String,
        /// Expression inserted by the palette
        prefill: Option<Prefill>,
    },
    /// Holds a nested statement chain
    Statement {
        /// Socket name
        name: String,
    },
}

impl SocketSpec {
    /// Socket name
    pub fn name(&self) -> &str {
        match self {
            SocketSpec::Value { name, .. } | SocketSpec::Statement { name } => name,
        }
    }

    /// Whether this socket holds a statement chain
    pub fn is_statement(&self) -> bool {
        matches!(self, SocketSpec::Statement { .. })
    }
}

/// Which components unlock a block type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// Always available
    Base,
    /// Available when any of these component kinds is selected
    Components(BTreeSet<ComponentKind>),
}

/// Registry entry describing one kind of block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockType {
    /// Type identifier (e.g. `arduino_delay`)
    pub id: String,
    /// Statement or expression
    pub shape: Shape,
    /// Output type tag of an expression; `None` means untyped
    pub output: Option<ValueType>,
    /// Ordered socket descriptors
    pub sockets: Vec<SocketSpec>,
    /// Editable literal fields
    pub fields: Vec<FieldSpec>,
    /// Which components unlock this type
    pub capability: Capability,
    /// Palette category
    pub category: String,
    /// Whether instances may be removed by graph edits
    pub deletable: bool,
    /// Whether instances can be chained or nested (false for root anchors)
    pub chainable: bool,
    /// Short description shown by tooling
    pub tooltip: String,
}

impl BlockType {
    /// Start a statement block type
    pub fn statement(id: impl Into<String>, category: impl Into<String>) -> Self {
        Self::with_shape(id.into(), Shape::Statement, None, category.into())
    }

    /// Start an expression block type producing `output`
    pub fn expression(
        id: impl Into<String>,
        category: impl Into<String>,
        output: Option<ValueType>,
    ) -> Self {
        Self::with_shape(id.into(), Shape::Expression, output, category.into())
    }

    fn with_shape(id: String, shape: Shape, output: Option<ValueType>, category: String) -> Self {
        Self {
            id,
            shape,
            output,
            sockets: Vec::new(),
            fields: Vec::new(),
            capability: Capability::Base,
            category,
            deletable: true,
            chainable: true,
            tooltip: String::new(),
        }
    }

    /// Add a numeric field
    pub fn number_field(
        mut self,
        name: &str,
        default: f64,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            kind: FieldKind::Number { min, max },
            default: FieldValue::Number(default),
        });
        self
    }

    /// Add a dropdown field; the first option is the default
    pub fn dropdown_field(mut self, name: &str, options: &[(&str, &str)]) -> Self {
        let default = options
            .first()
            .map(|(_, value)| FieldValue::Text(value.to_string()))
            .unwrap_or_else(|| FieldValue::Text(String::new()));
        self.fields.push(FieldSpec {
            name: name.to_string(),
            kind: FieldKind::Dropdown {
                options: options
                    .iter()
                    .map(|(label, value)| (label.to_string(), value.to_string()))
                    .collect(),
            },
            default,
        });
        self
    }

    /// Add a free text field
    pub fn text_field(mut self, name: &str, default: &str) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            kind: FieldKind::Text,
            default: FieldValue::Text(default.to_string()),
        });
        self
    }

    /// Add a variable reference field
    pub fn variable_field(mut self, name: &str, default: &str) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            kind: FieldKind::Variable,
            default: FieldValue::Text(default.to_string()),
        });
        self
    }

    /// Add a value socket
    pub fn value_socket(mut self, name: &str, check: Option<&[ValueType]>, default: &str) -> Self {
        self.sockets.push(SocketSpec::Value {
            name: name.to_string(),
            check: check.map(|types| types.to_vec()),
            default: default.to_string(),
            prefill: None,
        });
        self
    }

    /// Attach a palette prefill to the most recently added value socket
    pub fn prefilled(mut self, block_type: &str, fields: &[(&str, FieldValue)]) -> Self {
        if let Some(SocketSpec::Value { prefill, .. }) = self.sockets.last_mut() {
            *prefill = Some(Prefill {
                block_type: block_type.to_string(),
                fields: fields
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.clone()))
                    .collect(),
            });
        }
        self
    }

    /// Add a statement socket
    pub fn statement_socket(mut self, name: &str) -> Self {
        self.sockets.push(SocketSpec::Statement {
            name: name.to_string(),
        });
        self
    }

    /// Gate this type behind the given component kinds
    pub fn unlocked_by(mut self, kinds: &[ComponentKind]) -> Self {
        self.capability = Capability::Components(kinds.iter().copied().collect());
        self
    }

    /// Mark this type as a protected, unchainable root anchor
    pub fn anchor(mut self) -> Self {
        self.deletable = false;
        self.chainable = false;
        self
    }

    /// Set the tooltip
    pub fn tooltip(mut self, tooltip: &str) -> Self {
        self.tooltip = tooltip.to_string();
        self
    }

    /// Look up a socket by name
    pub fn socket(&self, name: &str) -> Option<&SocketSpec> {
        self.sockets.iter().find(|s| s.name() == name)
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether the given component kind unlocks this type
    pub fn unlocked_by_kind(&self, kind: ComponentKind) -> bool {
        match &self.capability {
            Capability::Base => false,
            Capability::Components(kinds) => kinds.contains(&kind),
        }
    }
}

/// One node of the program graph
#[derive(Debug, Serialize, Deserialize)]
pub struct Block {
    /// Unique id within the workspace
    pub id: String,

    /// Registered block type
    #[serde(rename = "type")]
    pub block_type: String,

    /// Field values
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,

    /// Socket contents keyed by socket name. Value sockets hold one
    /// expression, statement sockets hold the first block of a chain.
    #[serde(default)]
    pub inputs: BTreeMap<String, Box<Block>>,

    /// Following statement in the chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Box<Block>>,

    /// `false` for protected root anchors
    #[serde(default = "default_deletable")]
    pub deletable: bool,
}

fn default_deletable() -> bool {
    true
}

impl Block {
    /// Create an empty block of the given type
    pub fn new(id: impl Into<String>, block_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            block_type: block_type.into(),
            fields: BTreeMap::new(),
            inputs: BTreeMap::new(),
            next: None,
            deletable: true,
        }
    }

    /// Set a field value
    pub fn with_field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Connect a child into a socket
    pub fn with_input(mut self, socket: &str, child: Block) -> Self {
        self.inputs.insert(socket.to_string(), Box::new(child));
        self
    }

    /// Link the following statement
    pub fn with_next(mut self, next: Block) -> Self {
        self.next = Some(Box::new(next));
        self
    }

    /// Field value by name
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Socket content by name
    pub fn input(&self, socket: &str) -> Option<&Block> {
        self.inputs.get(socket).map(|b| b.as_ref())
    }

    /// This block followed by every successor linked through `next`
    pub fn chain(&self) -> Chain<'_> {
        Chain {
            current: Some(self),
        }
    }

    /// Link blocks into one chain, first block at the head. The last block
    /// keeps its own successors.
    pub fn from_chain(blocks: impl IntoIterator<Item = Block>) -> Option<Block> {
        let mut blocks: Vec<Block> = blocks.into_iter().collect();
        let mut head = blocks.pop()?;
        while let Some(mut previous) = blocks.pop() {
            previous.next = Some(Box::new(head));
            head = previous;
        }
        Some(head)
    }

    /// Attach `tail` after the last block of the chain starting here
    pub fn append(&mut self, tail: Block) {
        let mut rest = Vec::new();
        let mut next = self.next.take();
        while let Some(mut block) = next {
            next = block.next.take();
            rest.push(*block);
        }
        rest.push(tail);
        self.next = Block::from_chain(rest).map(Box::new);
    }

    /// Visit this block and everything it owns (sockets and successors)
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Block)) {
        for block in self.chain() {
            visit(block);
            for child in block.inputs.values() {
                child.walk(visit);
            }
        }
    }

    /// Find a block by id in this block's subtree
    pub fn find(&self, id: &str) -> Option<&Block> {
        for block in self.chain() {
            if block.id == id {
                return Some(block);
            }
            for child in block.inputs.values() {
                if let Some(found) = child.find(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Find a block by id in this block's subtree, mutably
    pub fn find_mut(&mut self, id: &str) -> Option<&mut Block> {
        let mut current = Some(self);
        while let Some(block) = current {
            if block.id == id {
                return Some(block);
            }
            for child in block.inputs.values_mut() {
                if let Some(found) = child.find_mut(id) {
                    return Some(found);
                }
            }
            current = block.next.as_deref_mut();
        }
        None
    }

    /// Detach the descendant `id` from this subtree.
    ///
    /// With `heal` set, the detached block's successor takes its place so
    /// the surrounding chain stays connected; otherwise the successors
    /// travel with the detached block.
    pub fn take_descendant(&mut self, id: &str, heal: bool) -> Option<Block> {
        let mut current = Some(self);
        while let Some(block) = current {
            if let Some(found) = block.take_child(id, heal) {
                return Some(found);
            }
            for child in block.inputs.values_mut() {
                if let Some(found) = child.take_descendant(id, heal) {
                    return Some(found);
                }
            }
            current = block.next.as_deref_mut();
        }
        None
    }

    fn take_child(&mut self, id: &str, heal: bool) -> Option<Block> {
        let socket = self
            .inputs
            .iter()
            .find(|(_, child)| child.id == id)
            .map(|(name, _)| name.clone());
        if let Some(socket) = socket {
            let mut child = self.inputs.remove(&socket)?;
            if heal && let Some(next) = child.next.take() {
                self.inputs.insert(socket, next);
            }
            return Some(*child);
        }

        if self.next.as_ref().is_some_and(|next| next.id == id) {
            let mut child = self.next.take()?;
            if heal {
                self.next = child.next.take();
            }
            return Some(*child);
        }
        None
    }

    /// Copy of this block and its sockets, without successors
    fn detached(&self) -> Block {
        Block {
            id: self.id.clone(),
            block_type: self.block_type.clone(),
            fields: self.fields.clone(),
            inputs: self.inputs.clone(),
            next: None,
            deletable: self.deletable,
        }
    }

    fn same_node(&self, other: &Block) -> bool {
        self.id == other.id
            && self.block_type == other.block_type
            && self.fields == other.fields
            && self.deletable == other.deletable
            && self.inputs == other.inputs
    }
}

// Chains can be thousands of statements long, so the impls below walk `next`
// links in a loop and only recurse into sockets.

impl Clone for Block {
    fn clone(&self) -> Self {
        let mut head = self.detached();
        head.next = Block::from_chain(self.chain().skip(1).map(Block::detached)).map(Box::new);
        head
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        let mut left = self.chain();
        let mut right = other.chain();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some(a), Some(b)) if a.same_node(b) => {}
                _ => return false,
            }
        }
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(mut block) = next {
            next = block.next.take();
        }
    }
}

/// Iterator over a statement chain
pub struct Chain<'a> {
    current: Option<&'a Block>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        self.current = current.next.as_deref();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn chain_of(ids: &[&str]) -> Block {
        let mut blocks = ids.iter().rev().map(|id| Block::new(*id, "arduino_delay"));
        let mut head = blocks.next().unwrap();
        for block in blocks {
            head = block.with_next(head);
        }
        head
    }

    #[test]
    fn test_chain_iterates_in_order() {
        let head = chain_of(&["a", "b", "c"]);
        let ids: Vec<_> = head.chain().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_find_through_sockets_and_next() {
        let head = Block::new("root", "controls_setup")
            .with_input("SETUP", chain_of(&["s1", "s2"]))
            .with_input("LOOP", chain_of(&["l1"]));
        assert!(head.find("s2").is_some());
        assert!(head.find("l1").is_some());
        assert!(head.find("missing").is_none());
    }

    #[test]
    fn test_take_descendant_heals_chain() {
        let mut head = chain_of(&["a", "b", "c"]);
        let taken = head.take_descendant("b", true).unwrap();
        assert_eq!(taken.id, "b");
        assert!(taken.next.is_none());
        let ids: Vec<_> = head.chain().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_take_descendant_keeps_tail_without_heal() {
        let mut head = chain_of(&["a", "b", "c"]);
        let taken = head.take_descendant("b", false).unwrap();
        let ids: Vec<_> = taken.chain().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert!(head.next.is_none());
    }

    #[test]
    fn test_take_descendant_from_statement_socket_heals() {
        let mut root =
            Block::new("root", "controls_setup").with_input("SETUP", chain_of(&["a", "b"]));
        root.take_descendant("a", true).unwrap();
        assert_eq!(root.input("SETUP").unwrap().id, "b");
    }

    #[test]
    fn test_append_links_after_last() {
        let mut head = chain_of(&["a", "b"]);
        head.append(chain_of(&["c", "d"]));
        let ids: Vec<_> = head.chain().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_long_chain_clone_compare_and_drop() {
        let chain = Block::from_chain(
            (0..100_000).map(|i| Block::new(format!("d{}", i), "arduino_delay")),
        )
        .unwrap();
        let mut copy = chain.clone();
        assert_eq!(copy, chain);
        assert_eq!(copy.chain().count(), 100_000);

        let last = copy.find_mut("d99999").unwrap();
        last.deletable = false;
        assert_ne!(copy, chain);

        let taken = copy.take_descendant("d50000", false).unwrap();
        assert_eq!(taken.chain().count(), 50_000);
        assert_eq!(copy.chain().count(), 50_000);
    }

    #[rstest]
    #[case(FieldValue::Number(13.0), "13")]
    #[case(FieldValue::Number(-2.0), "-2")]
    #[case(FieldValue::Number(0.5), "0.5")]
    #[case(FieldValue::Text("HIGH".into()), "HIGH")]
    fn test_field_value_display(#[case] value: FieldValue, #[case] expected: &str) {
        assert_eq!(value.to_string(), expected);
    }

    #[rstest]
    #[case(FieldValue::Number(13.0), true)]
    #[case(FieldValue::Number(54.0), false)]
    #[case(FieldValue::Number(-1.0), false)]
    #[case(FieldValue::Text("13".into()), false)]
    fn test_number_field_domain(#[case] value: FieldValue, #[case] ok: bool) {
        let spec = FieldSpec {
            name: "PIN".into(),
            kind: FieldKind::Number {
                min: Some(0.0),
                max: Some(53.0),
            },
            default: FieldValue::Number(13.0),
        };
        assert_eq!(spec.validate(&value).is_ok(), ok);
    }

    #[test]
    fn test_dropdown_field_domain() {
        let spec = BlockType::statement("t", "c")
            .dropdown_field("STATE", &[("ON", "HIGH"), ("OFF", "LOW")]);
        let field = spec.field("STATE").unwrap();
        assert_eq!(field.default, FieldValue::Text("HIGH".into()));
        assert!(field.validate(&"LOW".into()).is_ok());
        assert!(field.validate(&"ON".into()).is_err());
    }

    #[test]
    fn test_block_json_shape() {
        let block = Block::new("a", "arduino_delay").with_field("TIME", 500.0);
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "arduino_delay");
        assert_eq!(json["fields"]["TIME"], 500.0);
        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }
}
