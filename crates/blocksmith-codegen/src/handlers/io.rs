//! Digital and analog pins

use blocksmith_core::Block;

use super::HandlerTable;
use crate::context::Context;
use crate::error::Result;
use crate::order::Order;

pub(super) fn register(table: &mut HandlerTable) {
    table.statement("component_led", write_pin);
    table.statement("arduino_pin_mode", pin_mode);
    table.statement("arduino_digital_write", write_pin);
    table.statement("arduino_analog_write", analog_write);
    table.expression("arduino_digital_read", digital_read);
    table.expression("arduino_analog_read", analog_read);
}

/// Configure `pin` once in `setup()`
fn configure_pin(ctx: &mut Context<'_>, pin: &str, mode: &str) {
    ctx.setup_call(
        format!("pinMode_{}", pin),
        format!("pinMode({}, {});", pin, mode),
    );
}

fn write_pin(block: &Block, ctx: &mut Context<'_>) -> Result<String> {
    let pin = ctx.field(block, "PIN")?;
    let state = ctx.field(block, "STATE")?;
    configure_pin(ctx, &pin, "OUTPUT");
    Ok(format!("digitalWrite({}, {});\n", pin, state))
}

fn pin_mode(block: &Block, ctx: &mut Context<'_>) -> Result<String> {
    let pin = ctx.field(block, "PIN")?;
    let mode = ctx.field(block, "MODE")?;
    Ok(format!("pinMode({}, {});\n", pin, mode))
}

fn analog_write(block: &Block, ctx: &mut Context<'_>) -> Result<String> {
    let pin = ctx.field(block, "PIN")?;
    let value = ctx.value_to_code(block, "VALUE", Order::None)?;
    configure_pin(ctx, &pin, "OUTPUT");
    Ok(format!("analogWrite({}, {});\n", pin, value))
}

fn digital_read(block: &Block, ctx: &mut Context<'_>) -> Result<(String, Order)> {
    let pin = ctx.field(block, "PIN")?;
    configure_pin(ctx, &pin, "INPUT");
    Ok((format!("digitalRead({}) == HIGH", pin), Order::Equality))
}

fn analog_read(block: &Block, ctx: &mut Context<'_>) -> Result<(String, Order)> {
    let pin = ctx.field(block, "PIN")?;
    Ok((format!("analogRead({})", pin), Order::UnaryPostfix))
}
