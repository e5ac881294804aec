//! `CALL_NATIVE` dispatch: the closed set of native functions named in
//! spec §4.2. Arity is fixed per name and checked here rather than at the
//! bytecode loader, since the loader never sees argument counts (only the
//! name constant is encoded in the opcode).
//!
//! Failures in this layer never halt the VM (spec §7, "Native errors"):
//! a bad path, an unreachable URL, or a json field that isn't there comes
//! back as `Null` or an empty string, matching each native's documented
//! failure value.

use vega_value::{Array, Value};

use crate::error::VmError;

/// Dispatch one `CALL_NATIVE`, popping its arguments off `stack` (last
/// pushed is first popped) and returning the single result value the
/// interpreter pushes back.
///
/// # Errors
///
/// [`VmError::StackUnderflow`] if fewer arguments are on the stack than
/// the named native requires; [`VmError::UnknownNative`] for any name
/// outside the fixed set below.
pub fn call(name: &str, stack: &mut Vec<Value>) -> Result<Value, VmError> {
    match name {
        "file::read" => {
            let path = pop_str(stack)?;
            Ok(std::fs::read_to_string(path).map(Value::string).unwrap_or_else(|_| Value::string("")))
        }
        "file::write" => {
            let content = pop_str(stack)?;
            let path = pop_str(stack)?;
            let _ = std::fs::write(path, content);
            Ok(Value::Null)
        }
        "file::exists" => {
            let path = pop_str(stack)?;
            Ok(Value::Bool(std::path::Path::new(&path).exists()))
        }
        "str::len" => {
            let s = pop_str(stack)?;
            Ok(Value::Int(s.chars().count() as i64))
        }
        "str::contains" => {
            let sub = pop_str(stack)?;
            let s = pop_str(stack)?;
            Ok(Value::Bool(s.contains(&sub)))
        }
        "str::char_at" => {
            let i = pop_int(stack)?;
            let s = pop_str(stack)?;
            Ok(usize::try_from(i).ok().and_then(|i| s.chars().nth(i)).map_or(Value::string(""), |c| Value::string(c.to_string())))
        }
        "str::char_code" => {
            let s = pop_str(stack)?;
            Ok(s.chars().next().map_or(Value::Null, |c| Value::Int(i64::from(c as u32))))
        }
        "str::char_lower" => {
            let s = pop_str(stack)?;
            Ok(Value::string(s.to_lowercase()))
        }
        "str::from_int" => {
            let i = pop_int(stack)?;
            Ok(Value::string(i.to_string()))
        }
        "str::split" => {
            let delim = pop_str(stack)?;
            let s = pop_str(stack)?;
            let parts: Vec<Value> = if delim.is_empty() {
                s.chars().map(|c| Value::string(c.to_string())).collect()
            } else {
                s.split(delim.as_str()).map(|p| Value::string(p.to_string())).collect()
            };
            Ok(Value::Array(Array::from_vec(parts)))
        }
        "str::split_len" => {
            let delim = pop_str(stack)?;
            let s = pop_str(stack)?;
            let count = if delim.is_empty() { s.chars().count() } else { s.split(delim.as_str()).count() };
            Ok(Value::Int(count as i64))
        }
        "http::get" => {
            let url = pop_str(stack)?;
            Ok(http_get(&url))
        }
        "json::get_string" => {
            let key = pop_str(stack)?;
            let json = pop_str(stack)?;
            Ok(json_field(&json, &key).and_then(|v| v.as_str().map(|s| s.to_string())).map_or(Value::string(""), Value::string))
        }
        "json::get_int" => {
            let key = pop_str(stack)?;
            let json = pop_str(stack)?;
            Ok(json_field(&json, &key).and_then(serde_json::Value::as_i64).map_or(Value::Null, Value::Int))
        }
        "json::get_float" => {
            let key = pop_str(stack)?;
            let json = pop_str(stack)?;
            Ok(json_field(&json, &key).and_then(serde_json::Value::as_f64).map_or(Value::Null, Value::Float))
        }
        "json::get_array" => {
            let key = pop_str(stack)?;
            let json = pop_str(stack)?;
            Ok(json_field(&json, &key).filter(serde_json::Value::is_array).map_or(Value::string("[]"), |v| Value::string(v.to_string())))
        }
        "json::array_len" => {
            let arr = pop_str(stack)?;
            Ok(parse_json_array(&arr).map_or(Value::Int(0), |a| Value::Int(a.len() as i64)))
        }
        "json::array_get" => {
            let i = pop_int(stack)?;
            let arr = pop_str(stack)?;
            let element = parse_json_array(&arr).and_then(|a| usize::try_from(i).ok().and_then(|i| a.get(i).cloned()));
            Ok(Value::string(element.map_or_else(String::new, |v| v.as_str().map_or_else(|| v.to_string(), str::to_string))))
        }
        other => Err(VmError::UnknownNative(other.to_string())),
    }
}

fn pop_str(stack: &mut Vec<Value>) -> Result<String, VmError> {
    Ok(stack.pop().ok_or(VmError::StackUnderflow)?.stringify())
}

fn pop_int(stack: &mut Vec<Value>) -> Result<i64, VmError> {
    let v = stack.pop().ok_or(VmError::StackUnderflow)?;
    match v {
        Value::Int(i) => Ok(i),
        Value::Float(f) => Ok(f as i64),
        other => Err(VmError::Value(vega_value::ValueError::TypeMismatch { expected: "int", found: other.type_name() })),
    }
}

fn json_field(json: &str, key: &str) -> Option<serde_json::Value> {
    serde_json::from_str::<serde_json::Value>(json).ok().and_then(|v| v.get(key).cloned())
}

fn parse_json_array(text: &str) -> Option<Vec<serde_json::Value>> {
    serde_json::from_str::<serde_json::Value>(text).ok().and_then(|v| v.as_array().cloned())
}

/// `GET` `url` on a fresh blocking client, returning the response body or
/// an empty string on any transport/status failure. Matches spec §7's
/// "native errors are represented as Null or empty strings" rule rather
/// than surfacing `reqwest::Error` to bytecode.
fn http_get(url: &str) -> Value {
    match reqwest::blocking::get(url).and_then(reqwest::blocking::Response::text) {
        Ok(body) => Value::string(body),
        Err(e) => {
            tracing::warn!(url, error = %e, "http::get native call failed");
            Value::string("")
        }
    }
}
