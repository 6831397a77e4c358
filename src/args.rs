// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Argument Tables
//!
//! Exchanges, queues and consumers accept an optional table of broker
//! arguments (`x-delayed-type`, `x-message-ttl`, ...). Configuration keeps them
//! as plain JSON values so they deserialize from any serde format; they are
//! converted into AMQP field tables right before being sent to the broker.

use lapin::types::{AMQPValue, FieldArray, FieldTable, LongString, ShortString};
use serde_json::Value;
use std::collections::BTreeMap;

/// String-keyed table of arbitrary argument values.
pub type Arguments = BTreeMap<String, Value>;

/// Converts an argument table into an AMQP field table.
pub fn to_field_table(args: &Arguments) -> FieldTable {
    let mut btree = BTreeMap::<ShortString, AMQPValue>::default();
    for (key, value) in args {
        btree.insert(ShortString::from(key.clone()), to_amqp_value(value));
    }
    FieldTable::from(btree)
}

fn to_amqp_value(value: &Value) -> AMQPValue {
    match value {
        Value::Null => AMQPValue::Void,
        Value::Bool(v) => AMQPValue::Boolean(*v),
        Value::Number(v) => match v.as_i64() {
            Some(int) => AMQPValue::LongLongInt(int),
            None => AMQPValue::Double(v.as_f64().unwrap_or_default()),
        },
        Value::String(v) => AMQPValue::LongString(LongString::from(v.clone())),
        Value::Array(v) => AMQPValue::FieldArray(FieldArray::from(
            v.iter().map(to_amqp_value).collect::<Vec<_>>(),
        )),
        Value::Object(v) => {
            let nested = v
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect::<Arguments>();
            AMQPValue::FieldTable(to_field_table(&nested))
        }
    }
}
