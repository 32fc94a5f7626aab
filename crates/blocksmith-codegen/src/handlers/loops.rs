//! Loops

use blocksmith_core::Block;

use super::HandlerTable;
use crate::context::Context;
use crate::error::Result;
use crate::order::Order;

pub(super) fn register(table: &mut HandlerTable) {
    table.statement("controls_repeat_ext", repeat);
    table.statement("controls_whileUntil", while_until);
}

fn repeat(block: &Block, ctx: &mut Context<'_>) -> Result<String> {
    let times = ctx.value_to_code(block, "TIMES", Order::Relational)?;
    let counter = ctx.enter_loop();
    let body = ctx.statement_to_code(block, "DO");
    ctx.exit_loop();
    Ok(format!(
        "for (int {c} = 0; {c} < {times}; {c}++) {{\n{body}}}\n",
        c = counter,
        times = times,
        body = body?,
    ))
}

fn while_until(block: &Block, ctx: &mut Context<'_>) -> Result<String> {
    let until = ctx.text_field(block, "MODE")? == "UNTIL";
    let condition = if until {
        format!("!{}", ctx.value_to_code(block, "BOOL", Order::UnaryPrefix)?)
    } else {
        ctx.value_to_code(block, "BOOL", Order::None)?
    };
    let body = ctx.statement_to_code(block, "DO")?;
    Ok(format!("while ({}) {{\n{}}}\n", condition, body))
}
