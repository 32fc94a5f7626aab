//! Run-scoped generation context
//!
//! A [`Context`] lives for exactly one generation run. It owns the
//! [`Definitions`] table, drives the traversal and applies the chaining step
//! after every statement handler, so handlers only ever emit their own
//! statement.

use once_cell::sync::Lazy;
use regex::Regex;

use blocksmith_core::{Block, BlockRegistry, FieldValue, SocketSpec};

use crate::definitions::{Definitions, Section};
use crate::error::{Error, Result};
use crate::handlers::{Handler, HandlerTable};
use crate::order::Order;

static NON_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("Invalid identifier regex"));

/// Turn a workspace variable name into a C++ identifier
pub fn sanitize_identifier(name: &str) -> String {
    let cleaned = NON_IDENTIFIER.replace_all(name.trim(), "_");
    match cleaned.chars().next() {
        None => "_".to_string(),
        Some(first) if first.is_ascii_digit() => format!("_{}", cleaned),
        Some(_) => cleaned.into_owned(),
    }
}

/// State shared by every handler during one run
pub struct Context<'a> {
    registry: &'a BlockRegistry,
    handlers: &'a HandlerTable,
    indent: &'a str,
    definitions: Definitions,
    loop_depth: usize,
}

impl<'a> Context<'a> {
    /// Fresh context with an empty definitions table
    pub fn new(registry: &'a BlockRegistry, handlers: &'a HandlerTable, indent: &'a str) -> Self {
        Self {
            registry,
            handlers,
            indent,
            definitions: Definitions::new(),
            loop_depth: 0,
        }
    }

    /// Indentation unit
    pub fn indent(&self) -> &str {
        self.indent
    }

    /// Definitions collected so far
    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    fn handler(&self, block: &Block) -> Result<&'a Handler> {
        let unknown = || Error::UnknownType {
            block_type: block.block_type.clone(),
            block_id: block.id.clone(),
        };
        if !self.registry.contains(&block.block_type) {
            return Err(unknown());
        }
        self.handlers.get(&block.block_type).ok_or_else(unknown)
    }

    /// Code for a root block: a statement chain, or a lone expression
    pub fn root_to_code(&mut self, block: &Block) -> Result<String> {
        match self.handler(block)? {
            Handler::Statement(_) => self.chain_to_code(block),
            Handler::Expression(_) => Ok(self.expression_to_code(block)?.0),
        }
    }

    /// Code for a statement chain: every block's own statement, in chain order
    pub fn chain_to_code(&mut self, head: &Block) -> Result<String> {
        let mut code = String::new();
        for block in head.chain() {
            match self.handler(block)? {
                Handler::Statement(handler) => code.push_str(&handler.generate(block, self)?),
                Handler::Expression(_) => {
                    return Err(Error::handler(block, "expression used as a statement"));
                }
            }
        }
        Ok(code)
    }

    /// Code and order of an expression block
    pub fn expression_to_code(&mut self, block: &Block) -> Result<(String, Order)> {
        match self.handler(block)? {
            Handler::Expression(handler) => handler.generate(block, self),
            Handler::Statement(_) => Err(Error::handler(block, "statement used as a value")),
        }
    }

    /// Code of the chain in a statement socket, indented one level
    pub fn statement_to_code(&mut self, block: &Block, socket: &str) -> Result<String> {
        match block.input(socket) {
            Some(head) => {
                let code = self.chain_to_code(head)?;
                Ok(self.prefix_lines(&code, self.indent))
            }
            None => Ok(String::new()),
        }
    }

    /// Code of the expression in a value socket, parenthesised as `outer`
    /// requires. An empty socket yields its declared default.
    pub fn value_to_code(&mut self, block: &Block, socket: &str, outer: Order) -> Result<String> {
        match block.input(socket) {
            Some(child) => {
                let (code, inner) = self.expression_to_code(child)?;
                Ok(inner.wrap(code, outer))
            }
            None => {
                let spec = self.registry.describe(&block.block_type)?;
                match spec.socket(socket) {
                    Some(SocketSpec::Value { default, .. }) => Ok(default.clone()),
                    _ => Err(Error::handler(block, format!("no value socket '{}'", socket))),
                }
            }
        }
    }

    /// Field value rendered as code text
    pub fn field(&self, block: &Block, name: &str) -> Result<String> {
        block
            .field(name)
            .map(FieldValue::to_string)
            .ok_or_else(|| Error::handler(block, format!("missing field '{}'", name)))
    }

    /// Numeric field value
    pub fn number_field(&self, block: &Block, name: &str) -> Result<f64> {
        block
            .field(name)
            .and_then(FieldValue::as_number)
            .ok_or_else(|| Error::handler(block, format!("field '{}' is not a number", name)))
    }

    /// Text field value
    pub fn text_field<'b>(&self, block: &'b Block, name: &str) -> Result<&'b str> {
        block
            .field(name)
            .and_then(FieldValue::as_text)
            .ok_or_else(|| Error::handler(block, format!("field '{}' is not text", name)))
    }

    /// Record `#include <header>`
    pub fn include(&mut self, header: &str) {
        self.definitions.define(
            Section::Include,
            format!("include_{}", header),
            format!("#include <{}>", header),
        );
    }

    /// Record a global declaration or helper function
    pub fn define(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.definitions.define(Section::Global, key, text);
    }

    /// Record a statement run at the start of `setup()`
    pub fn setup_call(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.definitions.define(Section::Setup, key, text);
    }

    /// Declare a workspace variable as a global; returns its identifier
    pub fn declare_variable(&mut self, name: &str) -> String {
        let identifier = sanitize_identifier(name);
        self.define(
            format!("variable_{}", identifier),
            format!("float {} = 0;", identifier),
        );
        identifier
    }

    /// Enter a counted loop; returns the counter name for this nesting depth
    pub fn enter_loop(&mut self) -> String {
        let name = match self.loop_depth {
            0 => "count".to_string(),
            depth => format!("count{}", depth),
        };
        self.loop_depth += 1;
        name
    }

    /// Leave a counted loop
    pub fn exit_loop(&mut self) {
        self.loop_depth = self.loop_depth.saturating_sub(1);
    }

    /// Prefix every non-empty line of `code`
    pub fn prefix_lines(&self, code: &str, prefix: &str) -> String {
        code.split_inclusive('\n')
            .map(|line| {
                if line.trim().is_empty() {
                    line.to_string()
                } else {
                    format!("{}{}", prefix, line)
                }
            })
            .collect()
    }

    /// Re-indent helper code written with two-space indentation
    pub fn reindent(&self, code: &str) -> String {
        code.lines()
            .map(|line| {
                let stripped = line.trim_start_matches(' ');
                let levels = (line.len() - stripped.len()) / 2;
                format!("{}{}\n", self.indent.repeat(levels), stripped)
            })
            .collect()
    }

    /// Wrap the two routine bodies into the final program, preceded by every
    /// collected definition
    pub fn assemble(&self, setup: &str, body: &str) -> String {
        let includes: Vec<&str> = self.definitions.section(Section::Include).collect();
        let globals: Vec<&str> = self
            .definitions
            .section(Section::Global)
            .map(str::trim_end)
            .collect();

        let mut prelude = Vec::new();
        if !includes.is_empty() {
            prelude.push(includes.join("\n"));
        }
        if !globals.is_empty() {
            prelude.push(globals.join("\n\n"));
        }

        let mut code = String::new();
        if !prelude.is_empty() {
            code.push_str(&prelude.join("\n\n"));
            code.push_str("\n\n");
        }
        code.push_str("void setup() {\n");
        for line in self.definitions.section(Section::Setup) {
            code.push_str(&self.prefix_lines(&format!("{}\n", line.trim_end()), self.indent));
        }
        code.push_str(setup);
        code.push_str("}\n\nvoid loop() {\n");
        code.push_str(body);
        code.push_str("}\n");
        code
    }
}
