//! Literals, arithmetic and variables

use blocksmith_core::{Block, FieldValue};

use super::HandlerTable;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::order::Order;

pub(super) fn register(table: &mut HandlerTable) {
    table.expression("math_number", number);
    table.expression("math_arithmetic", arithmetic);
    table.expression("text", text);
    table.expression("variables_get", variable_get);
    table.statement("variables_set", variable_set);
}

fn number(block: &Block, ctx: &mut Context<'_>) -> Result<(String, Order)> {
    let value = ctx.number_field(block, "NUM")?;
    let order = if value < 0.0 {
        Order::UnaryPrefix
    } else {
        Order::Atomic
    };
    Ok((FieldValue::Number(value).to_string(), order))
}

fn arithmetic(block: &Block, ctx: &mut Context<'_>) -> Result<(String, Order)> {
    let (operator, order) = match ctx.text_field(block, "OP")? {
        "ADD" => (" + ", Order::Additive),
        "MINUS" => (" - ", Order::Additive),
        "MULTIPLY" => (" * ", Order::Multiplicative),
        "DIVIDE" => (" / ", Order::Multiplicative),
        "POWER" => {
            let a = ctx.value_to_code(block, "A", Order::None)?;
            let b = ctx.value_to_code(block, "B", Order::None)?;
            return Ok((format!("pow({}, {})", a, b), Order::UnaryPostfix));
        }
        other => return Err(Error::handler(block, format!("unknown operator '{}'", other))),
    };
    let a = ctx.value_to_code(block, "A", order)?;
    let b = ctx.value_to_code(block, "B", order)?;
    Ok((format!("{}{}{}", a, operator, b), order))
}

/// Quote text as a C++ string literal
fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

fn text(block: &Block, ctx: &mut Context<'_>) -> Result<(String, Order)> {
    let text = ctx.text_field(block, "TEXT")?;
    Ok((quote(text), Order::Atomic))
}

fn variable_get(block: &Block, ctx: &mut Context<'_>) -> Result<(String, Order)> {
    let name = ctx.text_field(block, "VAR")?;
    Ok((ctx.declare_variable(name), Order::Atomic))
}

fn variable_set(block: &Block, ctx: &mut Context<'_>) -> Result<String> {
    let name = ctx.text_field(block, "VAR")?;
    let identifier = ctx.declare_variable(name);
    let value = ctx.value_to_code(block, "VALUE", Order::Assignment)?;
    Ok(format!("{} = {};\n", identifier, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Hello World", "\"Hello World\"")]
    #[case("say \"hi\"", "\"say \\\"hi\\\"\"")]
    #[case("C:\\temp", "\"C:\\\\temp\"")]
    #[case("a\nb", "\"a\\nb\"")]
    fn test_quote(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(quote(text), expected);
    }
}
