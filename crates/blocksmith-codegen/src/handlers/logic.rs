//! Conditionals and boolean expressions

use blocksmith_core::Block;

use super::HandlerTable;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::order::Order;

pub(super) fn register(table: &mut HandlerTable) {
    table.statement("controls_if", controls_if);
    table.expression("logic_compare", compare);
    table.expression("logic_operation", operation);
    table.expression("logic_negate", negate);
    table.expression("logic_boolean", boolean);
}

fn controls_if(block: &Block, ctx: &mut Context<'_>) -> Result<String> {
    let condition = ctx.value_to_code(block, "IF0", Order::None)?;
    let branch = ctx.statement_to_code(block, "DO0")?;
    let mut code = format!("if ({}) {{\n{}}}", condition, branch);
    if block.input("ELSE").is_some() {
        let otherwise = ctx.statement_to_code(block, "ELSE")?;
        code.push_str(&format!(" else {{\n{}}}", otherwise));
    }
    code.push('\n');
    Ok(code)
}

fn compare(block: &Block, ctx: &mut Context<'_>) -> Result<(String, Order)> {
    let (operator, order) = match ctx.text_field(block, "OP")? {
        "EQ" => ("==", Order::Equality),
        "NEQ" => ("!=", Order::Equality),
        "LT" => ("<", Order::Relational),
        "LTE" => ("<=", Order::Relational),
        "GT" => (">", Order::Relational),
        "GTE" => (">=", Order::Relational),
        other => return Err(Error::handler(block, format!("unknown comparison '{}'", other))),
    };
    let a = ctx.value_to_code(block, "A", order)?;
    let b = ctx.value_to_code(block, "B", order)?;
    Ok((format!("{} {} {}", a, operator, b), order))
}

fn operation(block: &Block, ctx: &mut Context<'_>) -> Result<(String, Order)> {
    let (operator, order) = match ctx.text_field(block, "OP")? {
        "AND" => ("&&", Order::LogicalAnd),
        "OR" => ("||", Order::LogicalOr),
        other => return Err(Error::handler(block, format!("unknown operator '{}'", other))),
    };
    let a = ctx.value_to_code(block, "A", order)?;
    let b = ctx.value_to_code(block, "B", order)?;
    Ok((format!("{} {} {}", a, operator, b), order))
}

fn negate(block: &Block, ctx: &mut Context<'_>) -> Result<(String, Order)> {
    let value = ctx.value_to_code(block, "BOOL", Order::UnaryPrefix)?;
    Ok((format!("!{}", value), Order::UnaryPrefix))
}

fn boolean(block: &Block, ctx: &mut Context<'_>) -> Result<(String, Order)> {
    let code = match ctx.text_field(block, "BOOL")? {
        "TRUE" => "true",
        _ => "false",
    };
    Ok((code.to_string(), Order::Atomic))
}
