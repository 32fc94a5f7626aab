//! Code generation handlers
//!
//! Every block type is bound to exactly one handler. Statement handlers
//! return the text of their own statement including its line terminator;
//! expression handlers return code plus its [`Order`]. Chaining through
//! `next` is done by the [`Context`], never by handlers.

mod basics;
mod entry;
mod io;
mod logic;
mod loops;
mod sensors;
mod values;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use blocksmith_core::Block;

use crate::context::Context;
use crate::error::Result;
use crate::order::Order;

/// Generates one statement
pub trait StatementHandler: Send + Sync {
    /// Code for `block` alone, ending in a newline
    fn generate(&self, block: &Block, ctx: &mut Context<'_>) -> Result<String>;
}

/// Generates one expression
pub trait ExpressionHandler: Send + Sync {
    /// Code for `block` and the order of its outermost operator
    fn generate(&self, block: &Block, ctx: &mut Context<'_>) -> Result<(String, Order)>;
}

impl<F> StatementHandler for F
where
    F: Fn(&Block, &mut Context<'_>) -> Result<String> + Send + Sync,
{
    fn generate(&self, block: &Block, ctx: &mut Context<'_>) -> Result<String> {
        self(block, ctx)
    }
}

impl<F> ExpressionHandler for F
where
    F: Fn(&Block, &mut Context<'_>) -> Result<(String, Order)> + Send + Sync,
{
    fn generate(&self, block: &Block, ctx: &mut Context<'_>) -> Result<(String, Order)> {
        self(block, ctx)
    }
}

/// A registered handler
#[derive(Clone)]
pub enum Handler {
    /// Handler for a statement block type
    Statement(Arc<dyn StatementHandler>),
    /// Handler for an expression block type
    Expression(Arc<dyn ExpressionHandler>),
}

/// Dispatch table from block type id to handler
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<String, Handler>,
}

impl HandlerTable {
    /// Table with a handler for every built-in block type
    pub fn builtin() -> Self {
        let mut table = Self::default();
        entry::register(&mut table);
        basics::register(&mut table);
        io::register(&mut table);
        sensors::register(&mut table);
        logic::register(&mut table);
        loops::register(&mut table);
        values::register(&mut table);
        table
    }

    /// Bind a statement handler, replacing any previous binding
    pub fn statement(&mut self, block_type: &str, handler: impl StatementHandler + 'static) {
        self.handlers
            .insert(block_type.to_string(), Handler::Statement(Arc::new(handler)));
    }

    /// Bind an expression handler, replacing any previous binding
    pub fn expression(&mut self, block_type: &str, handler: impl ExpressionHandler + 'static) {
        self.handlers
            .insert(block_type.to_string(), Handler::Expression(Arc::new(handler)));
    }

    /// Handler bound to a type
    pub fn get(&self, block_type: &str) -> Option<&Handler> {
        self.handlers.get(block_type)
    }

    /// Whether a type has a handler
    pub fn contains(&self, block_type: &str) -> bool {
        self.handlers.contains_key(block_type)
    }

    /// Number of bound types
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is bound
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        f.debug_struct("HandlerTable").field("types", &types).finish()
    }
}
