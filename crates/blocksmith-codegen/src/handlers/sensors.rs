//! On-board sensors of the Nano 33 BLE Sense

use blocksmith_core::Block;

use super::HandlerTable;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::order::Order;

const MICROPHONE_BUFFER: &str = "short sampleBuffer[256];\nvolatile int samplesRead = 0;";

const MICROPHONE_CALLBACK: &str = "void onPDMdata() {
  int bytesAvailable = PDM.available();
  PDM.read(sampleBuffer, bytesAvailable);
  samplesRead = bytesAvailable / 2;
}";

const MICROPHONE_LEVEL: &str = "int readMicrophoneLevel() {
  if (samplesRead == 0) {
    return 0;
  }
  long sum = 0;
  for (int i = 0; i < samplesRead; i++) {
    sum += abs(sampleBuffer[i]);
  }
  int level = sum / samplesRead;
  samplesRead = 0;
  return level;
}";

pub(super) fn register(table: &mut HandlerTable) {
    table.statement("arduino_sensor_begin", sensor_begin);
    table.expression("arduino_temperature_read", temperature_read);
    table.expression("arduino_humidity_read", humidity_read);
    table.statement("arduino_imu_begin", imu_begin);
    table.expression("component_imu", component_imu);
    table.expression("arduino_imu_read", imu_read);
    table.expression("component_microphone", component_microphone);
    table.expression("arduino_microphone_read", microphone_read);
}

fn require_hts(ctx: &mut Context<'_>) {
    ctx.include("Arduino_HTS221.h");
    ctx.setup_call("begin_HTS", "if (!HTS.begin()) { while (1); }");
}

fn require_imu(ctx: &mut Context<'_>) {
    ctx.include("Arduino_LSM6DS3.h");
    ctx.setup_call("begin_IMU", "if (!IMU.begin()) { while (1); }");
}

fn require_microphone(ctx: &mut Context<'_>) {
    ctx.include("PDM.h");
    ctx.define("microphone_buffer", MICROPHONE_BUFFER);
    let callback = ctx.reindent(MICROPHONE_CALLBACK);
    ctx.define("microphone_callback", callback);
    ctx.setup_call("receive_PDM", "PDM.onReceive(onPDMdata);");
    ctx.setup_call("begin_PDM", "if (!PDM.begin(1, 16000)) { while (1); }");
}

/// Define a reader such as `readAccelerationX()` and return its call
fn imu_reader(ctx: &mut Context<'_>, quantity: &str, axis: &str) -> String {
    require_imu(ctx);
    let name = format!("read{}{}", quantity, axis);
    let variable = axis.to_ascii_lowercase();
    let helper = format!(
        "float {name}() {{
  float x, y, z;
  if (IMU.{available}Available()) {{
    IMU.read{quantity}(x, y, z);
    return {variable};
  }}
  return 0;
}}",
        name = name,
        available = quantity.to_ascii_lowercase(),
        quantity = quantity,
        variable = variable,
    );
    let helper = ctx.reindent(&helper);
    ctx.define(format!("imu_{}", name), helper);
    format!("{}()", name)
}

fn sensor_begin(block: &Block, ctx: &mut Context<'_>) -> Result<String> {
    match ctx.text_field(block, "SENSOR")? {
        "HTS" => require_hts(ctx),
        "PDM" => require_microphone(ctx),
        other => return Err(Error::handler(block, format!("unknown sensor '{}'", other))),
    }
    Ok(String::new())
}

fn temperature_read(block: &Block, ctx: &mut Context<'_>) -> Result<(String, Order)> {
    require_hts(ctx);
    let code = match ctx.text_field(block, "UNIT")? {
        "FAHRENHEIT" => "HTS.readTemperature(FAHRENHEIT)",
        _ => "HTS.readTemperature()",
    };
    Ok((code.to_string(), Order::UnaryPostfix))
}

fn humidity_read(_block: &Block, ctx: &mut Context<'_>) -> Result<(String, Order)> {
    require_hts(ctx);
    Ok(("HTS.readHumidity()".to_string(), Order::UnaryPostfix))
}

fn imu_begin(_block: &Block, ctx: &mut Context<'_>) -> Result<String> {
    require_imu(ctx);
    Ok(String::new())
}

fn component_imu(block: &Block, ctx: &mut Context<'_>) -> Result<(String, Order)> {
    let sensor_type = ctx.text_field(block, "SENSOR_TYPE")?;
    let (quantity, axis) = match sensor_type.split_once('_') {
        Some(("ACC", axis)) => ("Acceleration", axis),
        Some(("GYRO", axis)) => ("Gyroscope", axis),
        _ => {
            return Err(Error::handler(
                block,
                format!("unknown sensor type '{}'", sensor_type),
            ));
        }
    };
    Ok((imu_reader(ctx, quantity, axis), Order::UnaryPostfix))
}

fn imu_read(block: &Block, ctx: &mut Context<'_>) -> Result<(String, Order)> {
    let axis = ctx.text_field(block, "AXIS")?;
    Ok((imu_reader(ctx, "Acceleration", axis), Order::UnaryPostfix))
}

fn component_microphone(_block: &Block, ctx: &mut Context<'_>) -> Result<(String, Order)> {
    require_microphone(ctx);
    Ok((
        "samplesRead > 0 ? sampleBuffer[0] : 0".to_string(),
        Order::Conditional,
    ))
}

fn microphone_read(_block: &Block, ctx: &mut Context<'_>) -> Result<(String, Order)> {
    require_microphone(ctx);
    let level = ctx.reindent(MICROPHONE_LEVEL);
    ctx.define("microphone_level", level);
    Ok(("readMicrophoneLevel()".to_string(), Order::UnaryPostfix))
}
