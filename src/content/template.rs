use std::{collections::HashMap, sync::LazyLock};

use regex::Regex;
use serde_json::Value;

use crate::{CrosslistError, Result};

/// Regex pattern for context lookups
/// Format: `{{#key#}}` or `{{#key.subkey#}}`
const PATH_TEMPLATE_PATTERN: &str = r"\{\{#([^#]+)#\}\}";
/// Regex pattern for listing variables
/// Format: `{{$VAR_NAME$}}`
const VAR_TEMPLATE_PATTERN: &str = r"\{\{\$([^$]+)\$\}\}";

static PATH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(PATH_TEMPLATE_PATTERN).unwrap());
static VAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(VAR_TEMPLATE_PATTERN).unwrap());

/// Walks a dotted key path through nested JSON objects.
fn lookup<'a>(
    context: &'a Value,
    key_path: &str,
) -> Option<&'a Value> {
    key_path.split('.').try_fold(context, |current, key| current.get(key))
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(value_to_string).collect::<Vec<_>>().join(", "),
        v => v.to_string(),
    }
}

/// Resolve `{{$VAR$}}` from `vars` and `{{#key.path#}}` from `context`.
/// Returns error listing every placeholder that cannot be resolved.
pub fn render_template(
    context: &Value,
    vars: &HashMap<String, String>,
    template: &str,
) -> Result<String> {
    let mut result = template.to_string();
    let mut errors: Vec<String> = Vec::new();

    for caps in VAR_RE.captures_iter(template) {
        let full_match = &caps[0];
        let var_name = &caps[1];

        match vars.get(var_name) {
            Some(value) => {
                result = result.replace(full_match, value);
            }
            None => {
                errors.push(format!("variable '{}' not found", var_name));
            }
        }
    }

    for caps in PATH_RE.captures_iter(template) {
        let full_match = &caps[0];
        let key_path = &caps[1];

        match lookup(context, key_path) {
            Some(value) => {
                result = result.replace(full_match, &value_to_string(value));
            }
            None => {
                errors.push(format!("field '{}' not found", key_path));
            }
        }
    }

    if !errors.is_empty() {
        return Err(CrosslistError::Template(errors.join(", ")));
    }

    Ok(result)
}

/// Resolve placeholders in every string of a JSON value, recursively.
pub fn render_json_value(
    context: &Value,
    vars: &HashMap<String, String>,
    value: &Value,
) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(render_template(context, vars, s)?)),
        Value::Array(arr) => {
            let resolved: Result<Vec<Value>> = arr.iter().map(|v| render_json_value(context, vars, v)).collect();
            Ok(Value::Array(resolved?))
        }
        Value::Object(obj) => {
            let resolved: Result<serde_json::Map<String, Value>> =
                obj.iter().map(|(k, v)| render_json_value(context, vars, v).map(|rv| (k.clone(), rv))).collect();
            Ok(Value::Object(resolved?))
        }
        _ => Ok(value.clone()),
    }
}
