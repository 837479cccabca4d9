//! Argument binding and coercion against a tool's declared parameters.

use super::registry::{DeclaredType, ParameterDefinition, ToolDefinition};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// A problem with the caller's arguments. Always reported as InvalidParams.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    #[error("Required parameter '{0}' is missing")]
    Missing(String),

    #[error("Parameter '{name}' must be {expected}, got {got}")]
    Mismatch {
        name: String,
        expected: &'static str,
        got: String,
    },

    #[error("Too many positional arguments for '{tool}': expected at most {max}")]
    TooManyPositional { tool: String, max: usize },
}

/// Bind raw arguments to the tool's parameters.
///
/// Each parameter is read under its primary name, then its aliases in
/// order; `null` counts as absent. The result is keyed by primary name and
/// holds coerced values only. Unknown arguments are dropped.
pub fn bind_arguments(
    definition: &ToolDefinition,
    arguments: &Map<String, Value>,
) -> Result<Map<String, Value>, ParamError> {
    let mut bound = Map::new();

    for parameter in &definition.parameters {
        let raw = parameter
            .names()
            .filter_map(|name| arguments.get(name))
            .find(|v| !v.is_null());

        match raw {
            Some(value) => {
                bound.insert(parameter.name.clone(), coerce(parameter, value.clone())?);
            }
            None if parameter.required => return Err(ParamError::Missing(parameter.name.clone())),
            None => {}
        }
    }

    Ok(bound)
}

/// Convert a value to the parameter's declared type.
pub fn coerce(parameter: &ParameterDefinition, value: Value) -> Result<Value, ParamError> {
    let mismatch = |value: &Value| ParamError::Mismatch {
        name: parameter.name.clone(),
        expected: parameter.declared_type.label(),
        got: describe(value),
    };

    match parameter.declared_type {
        DeclaredType::Any => Ok(value),

        DeclaredType::String => match value {
            Value::String(_) => Ok(value),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            other => Err(mismatch(&other)),
        },

        DeclaredType::Integer => match as_integer(&value) {
            Some(n) if i32::try_from(n).is_ok() => Ok(Value::from(n)),
            _ => Err(mismatch(&value)),
        },

        DeclaredType::Long => as_integer(&value).map(Value::from).ok_or_else(|| mismatch(&value)),

        DeclaredType::Double | DeclaredType::Float => as_float(&value)
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| mismatch(&value)),

        DeclaredType::Boolean => match value {
            Value::Bool(b) => Ok(Value::Bool(b)),
            Value::String(ref s) if s.trim().eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(ref s) if s.trim().eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            other => Err(mismatch(&other)),
        },

        DeclaredType::StringArray => {
            let items = match value {
                Value::Array(items) => items,
                Value::String(s) => match parse_json_array(&s) {
                    Some(items) => items,
                    None => return Ok(Value::Array(vec![Value::String(s)])),
                },
                other => return Err(mismatch(&other)),
            };
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(_) => Ok(item),
                    Value::Number(n) => Ok(Value::String(n.to_string())),
                    Value::Bool(b) => Ok(Value::String(b.to_string())),
                    other => Err(mismatch(&other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }

        DeclaredType::Array => match value {
            Value::Array(_) => Ok(value),
            other => Ok(Value::Array(vec![other])),
        },

        DeclaredType::Object => match value {
            Value::Object(_) => Ok(value),
            Value::String(ref s) => match serde_json::from_str::<Value>(s) {
                Ok(parsed @ Value::Object(_)) => Ok(parsed),
                _ => Err(mismatch(&value)),
            },
            other => Err(mismatch(&other)),
        },
    }
}

/// Map CLI positional values onto parameters not already given by name.
///
/// Values fill the remaining parameters in declaration order. When the last
/// remaining parameter is an array, it collects everything left over.
pub fn map_positional(
    definition: &ToolDefinition,
    named: &Map<String, Value>,
    values: &[String],
) -> Result<Map<String, Value>, ParamError> {
    let mut result = named.clone();
    let open: Vec<&ParameterDefinition> = definition
        .parameters
        .iter()
        .filter(|p| !p.names().any(|n| named.contains_key(n)))
        .collect();

    let mut rest = values.iter();
    for (i, parameter) in open.iter().enumerate() {
        let is_last = i + 1 == open.len();
        if is_last && parameter.declared_type.is_array() {
            let collected: Vec<Value> = rest.by_ref().cloned().map(Value::String).collect();
            if !collected.is_empty() {
                result.insert(parameter.name.clone(), Value::Array(collected));
            }
            break;
        }
        match rest.next() {
            Some(value) => {
                result.insert(parameter.name.clone(), Value::String(value.clone()));
            }
            None => break,
        }
    }

    if rest.next().is_some() {
        return Err(ParamError::TooManyPositional {
            tool: definition.name.clone(),
            max: open.len(),
        });
    }
    Ok(result)
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_float(value: &Value) -> Option<f64> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

fn parse_json_array(s: &str) -> Option<Vec<Value>> {
    if !s.trim_start().starts_with('[') {
        return None;
    }
    match serde_json::from_str(s) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string \"{}\"", s.chars().take(40).collect::<String>()),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}
