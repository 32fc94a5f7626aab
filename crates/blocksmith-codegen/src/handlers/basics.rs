//! Timing, on-board LED and serial port

use blocksmith_core::Block;

use super::HandlerTable;
use crate::context::Context;
use crate::error::Result;
use crate::order::Order;

pub(super) fn register(table: &mut HandlerTable) {
    table.statement("arduino_delay", delay);
    table.statement("arduino_led_builtin", led_builtin);
    table.statement("arduino_serial_begin", serial_begin);
    table.statement("arduino_serial_print", serial_print);
}

fn delay(block: &Block, ctx: &mut Context<'_>) -> Result<String> {
    let time = ctx.field(block, "TIME")?;
    Ok(format!("delay({});\n", time))
}

fn led_builtin(block: &Block, ctx: &mut Context<'_>) -> Result<String> {
    let state = ctx.field(block, "STATE")?;
    ctx.setup_call("pinMode_LED_BUILTIN", "pinMode(LED_BUILTIN, OUTPUT);");
    Ok(format!("digitalWrite(LED_BUILTIN, {});\n", state))
}

fn serial_begin(block: &Block, ctx: &mut Context<'_>) -> Result<String> {
    let baud = ctx.field(block, "BAUD")?;
    Ok(format!("Serial.begin({});\n", baud))
}

fn serial_print(block: &Block, ctx: &mut Context<'_>) -> Result<String> {
    let text = ctx.value_to_code(block, "TEXT", Order::None)?;
    Ok(format!("Serial.println({});\n", text))
}
