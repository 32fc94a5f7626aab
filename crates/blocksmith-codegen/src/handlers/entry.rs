//! The setup/loop entry point

use blocksmith_core::{Block, ENTRY_POINT};

use super::HandlerTable;
use crate::context::Context;
use crate::error::Result;

pub(super) fn register(table: &mut HandlerTable) {
    table.statement(ENTRY_POINT, controls_setup);
}

fn controls_setup(block: &Block, ctx: &mut Context<'_>) -> Result<String> {
    let setup = ctx.statement_to_code(block, "SETUP")?;
    let body = ctx.statement_to_code(block, "LOOP")?;
    Ok(ctx.assemble(&setup, &body))
}
