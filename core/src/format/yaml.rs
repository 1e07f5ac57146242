//! YAML backend via `serde_yaml`.

use serde_yaml::{Mapping, Number, Value};

use crate::error::{Result, TreeError};
use crate::types::{Leaf, Node, Submapping};

use super::Format;


#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFormat;

impl Format for YamlFormat {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn extension(&self) -> &'static str {
        "yml"
    }

    fn parse(&self, text: &str) -> Result<Submapping> {
        if text.trim().is_empty() {
            return Ok(Submapping::new());
        }
        let value: Value = serde_yaml::from_str(text).map_err(|e| parse_error(e.to_string()))?;
        match untag(value) {
            Value::Null => Ok(Submapping::new()),
            Value::Mapping(m) => mapping_from_yaml(m),
            other => Err(parse_error(format!(
                "top level must be a mapping, found {}",
                kind_of(&other)
            ))),
        }
    }

    fn render(&self, data: &Submapping) -> Result<String> {
        serde_yaml::to_string(&Value::Mapping(mapping_to_yaml(data)))
            .map_err(|e| TreeError::Render(e.to_string()))
    }
}


impl YamlFormat {
    /// Parse a single YAML value, e.g. a command-line argument. Empty text
    /// is null.
    pub fn parse_value(text: &str) -> Result<Node> {
        if text.trim().is_empty() {
            return Ok(Node::Leaf(Leaf::Null));
        }
        let value: Value = serde_yaml::from_str(text).map_err(|e| parse_error(e.to_string()))?;
        node_from_yaml(value)
    }
}


fn parse_error(message: String) -> TreeError {
    TreeError::Parse {
        format: "yaml",
        message,
    }
}

fn untag(value: Value) -> Value {
    match value {
        Value::Tagged(tagged) => untag(tagged.value),
        other => other,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}


// ---------------------------------------------------------------------------
// Value <-> Node
// ---------------------------------------------------------------------------

fn mapping_from_yaml(m: Mapping) -> Result<Submapping> {
    let mut out = Submapping::with_capacity(m.len());
    for (k, v) in m {
        out.insert(key_from_yaml(k)?, node_from_yaml(v)?);
    }
    Ok(out)
}

fn key_from_yaml(key: Value) -> Result<String> {
    match untag(key) {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_string()),
        other => Err(parse_error(format!(
            "mapping keys must be scalars, found {}",
            kind_of(&other)
        ))),
    }
}

fn node_from_yaml(value: Value) -> Result<Node> {
    let node = match value {
        Value::Null => Node::Leaf(Leaf::Null),
        Value::Bool(b) => Node::Leaf(Leaf::Bool(b)),
        Value::Number(n) => Node::Leaf(number_from_yaml(&n)),
        Value::String(s) => Node::Leaf(Leaf::Text(s)),
        Value::Sequence(seq) => {
            let items = seq
                .into_iter()
                .map(node_from_yaml)
                .collect::<Result<Vec<_>>>()?;
            Node::Leaf(Leaf::List(items))
        }
        Value::Mapping(m) => Node::Map(mapping_from_yaml(m)?),
        Value::Tagged(tagged) => return node_from_yaml(tagged.value),
    };
    Ok(node)
}

fn number_from_yaml(n: &Number) -> Leaf {
    if let Some(i) = n.as_i64() {
        Leaf::Int(i)
    } else if let Some(u) = n.as_u64() {
        Leaf::from(u)
    } else {
        Leaf::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

fn mapping_to_yaml(data: &Submapping) -> Mapping {
    let mut m = Mapping::with_capacity(data.len());
    for (k, v) in data {
        m.insert(Value::String(k.clone()), node_to_yaml(v));
    }
    m
}

fn node_to_yaml(node: &Node) -> Value {
    match node {
        Node::Map(map) => Value::Mapping(mapping_to_yaml(map)),
        Node::Leaf(leaf) => match leaf {
            Leaf::Null => Value::Null,
            Leaf::Bool(b) => Value::Bool(*b),
            Leaf::Int(i) => Value::Number(Number::from(*i)),
            Leaf::Float(f) => Value::Number(Number::from(*f)),
            Leaf::Text(s) => Value::String(s.clone()),
            Leaf::List(items) => Value::Sequence(items.iter().map(node_to_yaml).collect()),
        },
    }
}
