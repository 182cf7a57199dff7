//! Command-line bindings: `NAME=JSON` values, placeholder declarations and
//! feeds.

use autostage_builtins::convert::native_to_tensor;
use autostage_builtins::Value;
use autostage_graph::{DType, Feeds, Graph, Symbolic, StaticShape};

use crate::CliError;

fn invalid(kind: &'static str, text: &str, reason: impl Into<String>) -> CliError {
    CliError::InvalidBinding {
        kind,
        text: text.to_string(),
        reason: reason.into(),
    }
}

/// JSON to host value: integers stay integers, arrays become lists.
pub fn json_to_value(json: &serde_json::Value) -> Result<Value, CliError> {
    Ok(match json {
        serde_json::Value::Null => Value::None,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => {
            Value::List(items.iter().map(json_to_value).collect::<Result<_, _>>()?)
        }
        serde_json::Value::Object(_) => {
            return Err(invalid("value", &json.to_string(), "objects have no host equivalent"))
        }
    })
}

/// Split `NAME=JSON` and decode the value.
pub fn parse_binding(text: &str) -> Result<(String, Value), CliError> {
    let (name, json) = text
        .split_once('=')
        .ok_or_else(|| invalid("binding", text, "expected NAME=JSON"))?;
    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(invalid("binding", text, "name must be an identifier"));
    }
    let json: serde_json::Value = serde_json::from_str(json)?;
    Ok((name.to_string(), json_to_value(&json)?))
}

/// A `NAME:DTYPE:DIMS` placeholder declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderSpec {
    pub name: String,
    pub dtype: DType,
    pub shape: StaticShape,
}

impl PlaceholderSpec {
    /// DIMS is comma separated: a size, `?` for an unknown size, a lone `*`
    /// for unknown rank, or empty for a scalar.
    pub fn parse(text: &str) -> Result<Self, CliError> {
        let mut parts = text.splitn(3, ':');
        let (Some(name), Some(dtype), Some(dims)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid("placeholder", text, "expected NAME:DTYPE:DIMS"));
        };
        if name.is_empty() {
            return Err(invalid("placeholder", text, "missing name"));
        }
        let dtype = DType::from_name(dtype)
            .filter(|d| *d != DType::Variant)
            .ok_or_else(|| invalid("placeholder", text, format!("unknown dtype '{}'", dtype)))?;
        let shape = match dims.trim() {
            "*" => StaticShape::unknown(),
            "" => StaticShape::scalar(),
            dims => StaticShape::known(
                dims.split(',')
                    .map(|d| match d.trim() {
                        "?" => Ok(None),
                        d => d
                            .parse::<usize>()
                            .map(Some)
                            .map_err(|_| invalid("placeholder", text, format!("bad dimension '{}'", d))),
                    })
                    .collect::<Result<_, _>>()?,
            ),
        };
        Ok(PlaceholderSpec {
            name: name.to_string(),
            dtype,
            shape,
        })
    }

    pub fn declare(&self, graph: &Graph) -> Symbolic {
        graph.placeholder(self.name.clone(), self.dtype, self.shape.clone())
    }
}

/// Build feeds from `NAME=JSON` texts for the declared placeholders.
pub fn build_feeds(texts: &[String], placeholders: &[(PlaceholderSpec, Symbolic)]) -> Result<Feeds, CliError> {
    let mut feeds = Feeds::new();
    for text in texts {
        let (name, value) = parse_binding(text)?;
        let (spec, sym) = placeholders
            .iter()
            .find(|(spec, _)| spec.name == name)
            .ok_or_else(|| CliError::UnknownPlaceholder(name.clone()))?;
        feeds.insert(sym, native_to_tensor(&value, Some(spec.dtype))?);
    }
    Ok(feeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_values_map_to_host_values() {
        let (name, value) = parse_binding("xs=[1, 2.5, \"a\", null, true]").unwrap();
        assert_eq!(name, "xs");
        assert_eq!(
            value,
            Value::List(vec![
                Value::Int(1),
                Value::Float(2.5),
                Value::str("a"),
                Value::None,
                Value::Bool(true),
            ])
        );
        assert!(parse_binding("o={}").is_err());
        assert!(parse_binding("novalue").is_err());
        assert!(matches!(parse_binding("x=[1,"), Err(CliError::Json(_))));
    }

    #[test]
    fn placeholder_dims() {
        let p = PlaceholderSpec::parse("x:f32:?,4").unwrap();
        assert_eq!(p.dtype, DType::F32);
        assert_eq!(p.shape, StaticShape::known(vec![None, Some(4)]));
        assert_eq!(PlaceholderSpec::parse("n:i32:").unwrap().shape, StaticShape::scalar());
        assert_eq!(PlaceholderSpec::parse("t:string:*").unwrap().shape, StaticShape::unknown());
        assert!(PlaceholderSpec::parse("x:complex:3").is_err());
        assert!(PlaceholderSpec::parse("x:f32:3,a").is_err());
        assert!(PlaceholderSpec::parse("x:f32").is_err());
    }
}
