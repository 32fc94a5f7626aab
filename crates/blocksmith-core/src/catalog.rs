//! Built-in block catalog for the Arduino Nano 33 BLE target

use crate::block::{BlockType, FieldValue, ValueType};
use crate::component::ComponentKind;
use crate::registry::ENTRY_POINT;

const PROGRAM: &str = "Program";
const ARDUINO: &str = "Arduino";
const SERIAL: &str = "Serial";
const LOGIC: &str = "Logic";
const LOOPS: &str = "Loops";
const MATH: &str = "Math";
const TEXT: &str = "Text";
const VARIABLES: &str = "Variables";
const COMPONENTS: &str = "Components";
const SENSORS: &str = "Sensors";

const NUMBER: &[ValueType] = &[ValueType::Number];
const BOOLEAN: &[ValueType] = &[ValueType::Boolean];
const PRINTABLE: &[ValueType] = &[ValueType::String, ValueType::Number];

const STATE: &[(&str, &str)] = &[("ON", "HIGH"), ("OFF", "LOW")];
const ANALOG_PINS: &[(&str, &str)] = &[
    ("A0", "A0"),
    ("A1", "A1"),
    ("A2", "A2"),
    ("A3", "A3"),
    ("A4", "A4"),
    ("A5", "A5"),
    ("A6", "A6"),
    ("A7", "A7"),
];
const AXES: &[(&str, &str)] = &[("X", "X"), ("Y", "Y"), ("Z", "Z")];

/// Highest digital pin number accepted by pin fields
pub const MAX_PIN: f64 = 53.0;

/// Every built-in block type, in palette order
pub fn builtin_types() -> Vec<BlockType> {
    let mut types = base_types();
    types.extend(component_types());
    types
}

fn base_types() -> Vec<BlockType> {
    vec![
        BlockType::statement(ENTRY_POINT, PROGRAM)
            .statement_socket("SETUP")
            .statement_socket("LOOP")
            .anchor()
            .tooltip("Runs SETUP once, then LOOP forever"),
        BlockType::statement("arduino_delay", ARDUINO)
            .number_field("TIME", 1000.0, Some(1.0), None)
            .tooltip("Wait for the given number of milliseconds"),
        BlockType::statement("arduino_led_builtin", ARDUINO)
            .dropdown_field("STATE", STATE)
            .tooltip("Switch the on-board LED"),
        BlockType::statement("arduino_serial_begin", SERIAL)
            .dropdown_field(
                "BAUD",
                &[
                    ("9600", "9600"),
                    ("19200", "19200"),
                    ("38400", "38400"),
                    ("57600", "57600"),
                    ("115200", "115200"),
                ],
            )
            .tooltip("Open the serial port"),
        BlockType::statement("arduino_serial_print", SERIAL)
            .value_socket("TEXT", Some(PRINTABLE), "\"\"")
            .prefilled("text", &[("TEXT", FieldValue::from("Hello World"))])
            .tooltip("Print a line to the serial port"),
        BlockType::statement("controls_if", LOGIC)
            .value_socket("IF0", Some(BOOLEAN), "false")
            .statement_socket("DO0")
            .statement_socket("ELSE"),
        BlockType::expression("logic_compare", LOGIC, Some(ValueType::Boolean))
            .dropdown_field(
                "OP",
                &[
                    ("=", "EQ"),
                    ("\u{2260}", "NEQ"),
                    ("<", "LT"),
                    ("\u{2264}", "LTE"),
                    (">", "GT"),
                    ("\u{2265}", "GTE"),
                ],
            )
            .value_socket("A", None, "0")
            .value_socket("B", None, "0"),
        BlockType::expression("logic_operation", LOGIC, Some(ValueType::Boolean))
            .dropdown_field("OP", &[("and", "AND"), ("or", "OR")])
            .value_socket("A", Some(BOOLEAN), "false")
            .value_socket("B", Some(BOOLEAN), "false"),
        BlockType::expression("logic_negate", LOGIC, Some(ValueType::Boolean))
            .value_socket("BOOL", Some(BOOLEAN), "true"),
        BlockType::expression("logic_boolean", LOGIC, Some(ValueType::Boolean))
            .dropdown_field("BOOL", &[("true", "TRUE"), ("false", "FALSE")]),
        BlockType::statement("controls_repeat_ext", LOOPS)
            .value_socket("TIMES", Some(NUMBER), "0")
            .prefilled("math_number", &[("NUM", FieldValue::Number(10.0))])
            .statement_socket("DO"),
        BlockType::statement("controls_whileUntil", LOOPS)
            .dropdown_field("MODE", &[("repeat while", "WHILE"), ("repeat until", "UNTIL")])
            .value_socket("BOOL", Some(BOOLEAN), "false")
            .statement_socket("DO"),
        BlockType::expression("math_number", MATH, Some(ValueType::Number))
            .number_field("NUM", 0.0, None, None),
        BlockType::expression("math_arithmetic", MATH, Some(ValueType::Number))
            .dropdown_field(
                "OP",
                &[
                    ("+", "ADD"),
                    ("-", "MINUS"),
                    ("\u{d7}", "MULTIPLY"),
                    ("\u{f7}", "DIVIDE"),
                    ("^", "POWER"),
                ],
            )
            .value_socket("A", Some(NUMBER), "0")
            .value_socket("B", Some(NUMBER), "0"),
        BlockType::expression("text", TEXT, Some(ValueType::String)).text_field("TEXT", ""),
        BlockType::statement("variables_set", VARIABLES)
            .variable_field("VAR", "item")
            .value_socket("VALUE", None, "0"),
        BlockType::expression("variables_get", VARIABLES, None).variable_field("VAR", "item"),
    ]
}

fn component_types() -> Vec<BlockType> {
    use ComponentKind::{Button, Humidity, Imu, Led, Microphone, Temperature};

    vec![
        BlockType::statement("component_led", COMPONENTS)
            .number_field("PIN", 13.0, Some(0.0), Some(MAX_PIN))
            .dropdown_field("STATE", STATE)
            .unlocked_by(&[Led])
            .tooltip("Switch an LED connected to a digital pin"),
        BlockType::statement("arduino_pin_mode", ARDUINO)
            .number_field("PIN", 13.0, Some(0.0), Some(MAX_PIN))
            .dropdown_field(
                "MODE",
                &[
                    ("OUTPUT", "OUTPUT"),
                    ("INPUT", "INPUT"),
                    ("INPUT_PULLUP", "INPUT_PULLUP"),
                ],
            )
            .unlocked_by(&[Led, Button]),
        BlockType::statement("arduino_digital_write", ARDUINO)
            .number_field("PIN", 13.0, Some(0.0), Some(MAX_PIN))
            .dropdown_field("STATE", &[("HIGH", "HIGH"), ("LOW", "LOW")])
            .unlocked_by(&[Led]),
        BlockType::statement("arduino_analog_write", ARDUINO)
            .number_field("PIN", 3.0, Some(0.0), Some(MAX_PIN))
            .value_socket("VALUE", Some(NUMBER), "0")
            .prefilled("math_number", &[("NUM", FieldValue::Number(128.0))])
            .unlocked_by(&[Led])
            .tooltip("Write a PWM duty cycle between 0 and 255"),
        BlockType::expression("arduino_digital_read", ARDUINO, Some(ValueType::Boolean))
            .number_field("PIN", 2.0, Some(0.0), Some(MAX_PIN))
            .unlocked_by(&[Button]),
        BlockType::expression("arduino_analog_read", ARDUINO, Some(ValueType::Number))
            .dropdown_field("PIN", ANALOG_PINS)
            .unlocked_by(&[Button]),
        BlockType::statement("arduino_sensor_begin", SENSORS)
            .dropdown_field("SENSOR", &[("HTS221", "HTS"), ("Microphone", "PDM")])
            .unlocked_by(&[Temperature, Humidity, Microphone])
            .tooltip("Initialise an on-board sensor"),
        BlockType::expression("arduino_temperature_read", SENSORS, Some(ValueType::Number))
            .dropdown_field("UNIT", &[("\u{b0}C", "CELSIUS"), ("\u{b0}F", "FAHRENHEIT")])
            .unlocked_by(&[Temperature]),
        BlockType::expression("arduino_humidity_read", SENSORS, Some(ValueType::Number))
            .unlocked_by(&[Humidity]),
        BlockType::statement("arduino_imu_begin", SENSORS)
            .unlocked_by(&[Imu])
            .tooltip("Initialise the motion sensor"),
        BlockType::expression("component_imu", COMPONENTS, Some(ValueType::Number))
            .dropdown_field(
                "SENSOR_TYPE",
                &[
                    ("acceleration X", "ACC_X"),
                    ("acceleration Y", "ACC_Y"),
                    ("acceleration Z", "ACC_Z"),
                    ("gyroscope X", "GYRO_X"),
                    ("gyroscope Y", "GYRO_Y"),
                    ("gyroscope Z", "GYRO_Z"),
                ],
            )
            .unlocked_by(&[Imu]),
        BlockType::expression("arduino_imu_read", SENSORS, Some(ValueType::Number))
            .dropdown_field("AXIS", AXES)
            .unlocked_by(&[Imu]),
        BlockType::expression("component_microphone", COMPONENTS, Some(ValueType::Number))
            .unlocked_by(&[Microphone])
            .tooltip("Most recent microphone sample"),
        BlockType::expression("arduino_microphone_read", SENSORS, Some(ValueType::Number))
            .unlocked_by(&[Microphone])
            .tooltip("Average loudness of the last sample buffer"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Capability, Shape};
    use std::collections::HashSet;

    #[test]
    fn test_type_ids_are_unique() {
        let types = builtin_types();
        let ids: HashSet<_> = types.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), types.len());
    }

    #[test]
    fn test_entry_point_is_base_anchor() {
        let types = builtin_types();
        let entry = types.iter().find(|t| t.id == ENTRY_POINT).unwrap();
        assert_eq!(entry.capability, Capability::Base);
        assert!(!entry.deletable);
        assert!(!entry.chainable);
        assert_eq!(entry.sockets.len(), 2);
    }

    #[test]
    fn test_sensor_begin_unlocked_by_three_kinds() {
        let types = builtin_types();
        let begin = types.iter().find(|t| t.id == "arduino_sensor_begin").unwrap();
        assert!(begin.unlocked_by_kind(ComponentKind::Temperature));
        assert!(begin.unlocked_by_kind(ComponentKind::Humidity));
        assert!(begin.unlocked_by_kind(ComponentKind::Microphone));
        assert!(!begin.unlocked_by_kind(ComponentKind::Imu));
    }

    #[test]
    fn test_expressions_never_carry_statement_sockets() {
        for block_type in builtin_types() {
            if block_type.shape == Shape::Expression {
                assert!(
                    block_type.sockets.iter().all(|s| !s.is_statement()),
                    "{} has a statement socket",
                    block_type.id
                );
            }
        }
    }

    #[test]
    fn test_every_kind_unlocks_something() {
        let types = builtin_types();
        for kind in ComponentKind::ALL {
            assert!(
                types.iter().any(|t| t.unlocked_by_kind(kind)),
                "{} unlocks nothing",
                kind
            );
        }
    }
}
