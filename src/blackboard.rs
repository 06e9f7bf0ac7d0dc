use parking_lot::RwLock;
use serde::Deserialize;
use std::{collections::HashMap, sync::Arc, time::Instant};

/// A value stored in vehicle memory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Float(f64),
    Text(String),
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

#[derive(Clone)]
pub struct State {
    pub values: HashMap<String, Value>,
    pub last_cmd_ts: Instant,
    pub faults: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        State {
            values: HashMap::new(),
            last_cmd_ts: Instant::now(),
            faults: Vec::new(),
        }
    }
}

pub type Blackboard = Arc<RwLock<State>>;

pub fn snapshot(bb: &Blackboard) -> State {
    (*bb.read()).clone()
}

/// Store `value` under `key` and mark the time of the latest command.
pub fn put(bb: &Blackboard, key: &str, value: impl Into<Value>) {
    let mut g = bb.write();
    g.values.insert(key.to_string(), value.into());
    g.last_cmd_ts = Instant::now();
}

/// Numeric value under `key`; `None` if absent or not a number.
pub fn get_float(bb: &Blackboard, key: &str) -> Option<f64> {
    match bb.read().values.get(key) {
        Some(Value::Float(v)) => Some(*v),
        _ => None,
    }
}

/// Text value under `key`; `None` if absent or not text.
pub fn get_text(bb: &Blackboard, key: &str) -> Option<String> {
    match bb.read().values.get(key) {
        Some(Value::Text(s)) => Some(s.clone()),
        _ => None,
    }
}

pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if !g.faults.iter().any(|s| s == msg) {
        g.faults.push(msg.to_string());
    }
}
