//! Test components shared across the integration test suites.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use pipeflow::{Component, InputField, OutputField};
use serde_json::{json, Value};

/// No inputs, constant string output.
pub struct ComponentNoParam;

#[async_trait]
impl Component for ComponentNoParam {
    fn name(&self) -> &str {
        "no_param"
    }

    fn component_outputs(&self) -> HashMap<String, OutputField> {
        HashMap::from([("result".to_string(), OutputField::new("string"))])
    }

    async fn run(&self, _inputs: HashMap<String, Value>) -> anyhow::Result<Value> {
        Ok(json!({ "result": "ok" }))
    }
}

/// Returns its mandatory `value` input as `result`.
pub struct ComponentPassThrough;

#[async_trait]
impl Component for ComponentPassThrough {
    fn name(&self) -> &str {
        "pass_through"
    }

    fn component_inputs(&self) -> HashMap<String, InputField> {
        HashMap::from([("value".to_string(), InputField::required("any"))])
    }

    fn component_outputs(&self) -> HashMap<String, OutputField> {
        HashMap::from([("result".to_string(), OutputField::new("any"))])
    }

    async fn run(&self, inputs: HashMap<String, Value>) -> anyhow::Result<Value> {
        Ok(json!({ "result": inputs.get("value").cloned().unwrap_or(Value::Null) }))
    }
}

/// Adds two mandatory numbers.
pub struct ComponentAdd;

#[async_trait]
impl Component for ComponentAdd {
    fn name(&self) -> &str {
        "add"
    }

    fn component_inputs(&self) -> HashMap<String, InputField> {
        HashMap::from([
            ("number1".to_string(), InputField::required("number")),
            ("number2".to_string(), InputField::required("number")),
        ])
    }

    fn component_outputs(&self) -> HashMap<String, OutputField> {
        HashMap::from([("result".to_string(), OutputField::new("number"))])
    }

    async fn run(&self, inputs: HashMap<String, Value>) -> anyhow::Result<Value> {
        let number1 = inputs
            .get("number1")
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow!("number1 must be an integer"))?;
        let number2 = inputs
            .get("number2")
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow!("number2 must be an integer"))?;
        Ok(json!({ "result": number1 + number2 }))
    }
}

/// Multiplies a mandatory number by an optional factor (default 2).
pub struct ComponentMultiply;

#[async_trait]
impl Component for ComponentMultiply {
    fn name(&self) -> &str {
        "multiply"
    }

    fn component_inputs(&self) -> HashMap<String, InputField> {
        HashMap::from([
            ("number1".to_string(), InputField::required("number")),
            ("factor".to_string(), InputField::optional("number")),
        ])
    }

    fn component_outputs(&self) -> HashMap<String, OutputField> {
        HashMap::from([("result".to_string(), OutputField::new("number"))])
    }

    async fn run(&self, inputs: HashMap<String, Value>) -> anyhow::Result<Value> {
        let number1 = inputs
            .get("number1")
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow!("number1 must be an integer"))?;
        let factor = inputs.get("factor").and_then(Value::as_i64).unwrap_or(2);
        Ok(json!({ "result": number1 * factor }))
    }
}

/// Emits a fixed JSON object after an optional delay; useful as a root
/// with controllable completion order.
pub struct ComponentEmit {
    pub output: Value,
    pub delay: Duration,
}

impl ComponentEmit {
    pub fn new(output: Value) -> Self {
        Self {
            output,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(output: Value, delay: Duration) -> Self {
        Self { output, delay }
    }
}

#[async_trait]
impl Component for ComponentEmit {
    fn name(&self) -> &str {
        "emit"
    }

    fn component_outputs(&self) -> HashMap<String, OutputField> {
        let Value::Object(object) = &self.output else {
            return HashMap::new();
        };
        object
            .keys()
            .map(|key| (key.clone(), OutputField::new("any")))
            .collect()
    }

    async fn run(&self, _inputs: HashMap<String, Value>) -> anyhow::Result<Value> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.output.clone())
    }
}

/// Counts how many times it ran.
pub struct ComponentCounting {
    pub calls: Arc<AtomicU32>,
}

impl ComponentCounting {
    pub fn new(calls: Arc<AtomicU32>) -> Self {
        Self { calls }
    }
}

#[async_trait]
impl Component for ComponentCounting {
    fn name(&self) -> &str {
        "counting"
    }

    fn component_outputs(&self) -> HashMap<String, OutputField> {
        HashMap::from([("result".to_string(), OutputField::new("number"))])
    }

    async fn run(&self, _inputs: HashMap<String, Value>) -> anyhow::Result<Value> {
        let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(json!({ "result": calls }))
    }
}

/// Always fails.
pub struct ComponentFailing;

#[async_trait]
impl Component for ComponentFailing {
    fn name(&self) -> &str {
        "failing"
    }

    async fn run(&self, _inputs: HashMap<String, Value>) -> anyhow::Result<Value> {
        Err(anyhow!("component exploded"))
    }
}
