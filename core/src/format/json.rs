//! JSON fallback backend via `serde_json` (with `preserve_order`).

use serde_json::{Map, Number, Value};

use crate::error::{Result, TreeError};
use crate::types::{Leaf, Node, Submapping};

use super::Format;


#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn parse(&self, text: &str) -> Result<Submapping> {
        if text.trim().is_empty() {
            return Ok(Submapping::new());
        }
        let value: Value = serde_json::from_str(text).map_err(|e| TreeError::Parse {
            format: "json",
            message: e.to_string(),
        })?;
        match value {
            Value::Null => Ok(Submapping::new()),
            Value::Object(obj) => Ok(object_to_mapping(obj)),
            _ => Err(TreeError::Parse {
                format: "json",
                message: "top level must be an object".to_string(),
            }),
        }
    }

    fn render(&self, data: &Submapping) -> Result<String> {
        let value = Value::Object(mapping_to_object(data)?);
        let mut text =
            serde_json::to_string_pretty(&value).map_err(|e| TreeError::Render(e.to_string()))?;
        text.push('\n');
        Ok(text)
    }
}


fn object_to_mapping(obj: Map<String, Value>) -> Submapping {
    obj.into_iter().map(|(k, v)| (k, value_to_node(v))).collect()
}

fn value_to_node(value: Value) -> Node {
    match value {
        Value::Null => Node::Leaf(Leaf::Null),
        Value::Bool(b) => Node::Leaf(Leaf::Bool(b)),
        Value::Number(n) => Node::Leaf(number_to_leaf(&n)),
        Value::String(s) => Node::Leaf(Leaf::Text(s)),
        Value::Array(items) => Node::Leaf(Leaf::List(items.into_iter().map(value_to_node).collect())),
        Value::Object(obj) => Node::Map(object_to_mapping(obj)),
    }
}

fn number_to_leaf(n: &Number) -> Leaf {
    if let Some(i) = n.as_i64() {
        Leaf::Int(i)
    } else if let Some(u) = n.as_u64() {
        Leaf::from(u)
    } else {
        Leaf::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

fn mapping_to_object(data: &Submapping) -> Result<Map<String, Value>> {
    let mut obj = Map::with_capacity(data.len());
    for (k, v) in data {
        obj.insert(k.clone(), node_to_value(v)?);
    }
    Ok(obj)
}

fn node_to_value(node: &Node) -> Result<Value> {
    let value = match node {
        Node::Map(map) => Value::Object(mapping_to_object(map)?),
        Node::Leaf(leaf) => match leaf {
            Leaf::Null => Value::Null,
            Leaf::Bool(b) => Value::Bool(*b),
            Leaf::Int(i) => Value::Number(Number::from(*i)),
            Leaf::Float(f) => Number::from_f64(*f).map(Value::Number).ok_or_else(|| {
                TreeError::Render(format!("{} has no JSON representation", f))
            })?,
            Leaf::Text(s) => Value::String(s.clone()),
            Leaf::List(items) => {
                Value::Array(items.iter().map(node_to_value).collect::<Result<Vec<_>>>()?)
            }
        },
    };
    Ok(value)
}
