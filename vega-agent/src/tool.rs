//! Tool discovery and argument decoding (spec §4.3, §4.4).

use vega_bytecode::{opcode, Image, Op};

/// The declared type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// A UTF-8 string.
    Str,
    /// A boolean.
    Bool,
    /// A 64-bit integer.
    Int,
    /// A 64-bit float.
    Float,
}

impl ParamType {
    fn from_str(s: &str) -> Self {
        match s {
            "int" => ParamType::Int,
            "float" => ParamType::Float,
            "bool" => ParamType::Bool,
            _ => ParamType::Str,
        }
    }
}

/// One tool an agent can invoke: the underlying function, and the
/// parameter names/types the model is told about.
#[derive(Debug, Clone)]
pub struct AgentTool {
    /// The tool's name (without the `<Agent>$` prefix).
    pub name: String,
    /// Index into the function table.
    pub function_index: u32,
    /// Declared parameters, in call order.
    pub params: Vec<(String, ParamType)>,
}

/// Discover every tool belonging to `agent_name` by scanning the
/// function table for `<agent_name>$<tool>` entries (skipping the
/// `$params` descriptor functions themselves).
///
/// Parameter names/types come from a `<agent_name>$<tool>$params`
/// function, if one exists: by convention its body is a single
/// `PUSH_CONST` of a string constant with the form `name:type,name:type,...`.
/// Absent that, parameters fall back to `arg0, arg1, ...` of type `str`,
/// one per declared parameter slot on the tool function itself.
#[must_use]
pub fn discover_tools(image: &Image, agent_name: &str) -> Vec<AgentTool> {
    let prefix = format!("{agent_name}$");
    let mut tools = Vec::new();

    for (index, def, name) in image.functions_with_prefix(&prefix) {
        if name.ends_with("$params") {
            continue;
        }
        let tool_name = name[prefix.len()..].to_string();
        let params = params_descriptor(image, agent_name, &tool_name)
            .unwrap_or_else(|| default_params(def.params));
        tools.push(AgentTool { name: tool_name, function_index: index, params });
    }
    tools
}

fn default_params(count: u16) -> Vec<(String, ParamType)> {
    (0..count).map(|i| (format!("arg{i}"), ParamType::Str)).collect()
}

fn params_descriptor(image: &Image, agent_name: &str, tool_name: &str) -> Option<Vec<(String, ParamType)>> {
    let full_name = format!("{agent_name}${tool_name}$params");
    let (_, def) = image.find_function(&full_name)?;
    let code = image.code().get(def.offset as usize..(def.offset + def.length) as usize)?;
    let (op, _) = opcode::decode(code, 0).ok()?;
    let Op::PushConst(idx) = op else { return None };
    let descriptor = image.constants().get_str(idx).ok()?;
    Some(parse_descriptor(descriptor))
}

fn parse_descriptor(descriptor: &str) -> Vec<(String, ParamType)> {
    descriptor
        .split(',')
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((name, ty)) => (name.to_string(), ParamType::from_str(ty)),
            None => (entry.to_string(), ParamType::Str),
        })
        .collect()
}

/// Decode declared tool arguments out of the tool-use block's JSON
/// `input` object, per spec §4.4 step 2: each declared parameter is
/// looked up by name and coerced to its declared type; a missing
/// parameter becomes `null`.
#[must_use]
pub fn decode_tool_args(tool: &AgentTool, input: &serde_json::Value) -> Vec<vega_value::Value> {
    tool.params
        .iter()
        .map(|(name, ty)| decode_one(input.get(name), *ty))
        .collect()
}

fn decode_one(raw: Option<&serde_json::Value>, ty: ParamType) -> vega_value::Value {
    use vega_value::Value;
    let Some(raw) = raw else { return Value::Null };
    match (ty, raw) {
        (_, serde_json::Value::Null) => Value::Null,
        (ParamType::Str, serde_json::Value::String(s)) => Value::string(s.as_str()),
        (ParamType::Bool, serde_json::Value::Bool(b)) => Value::Bool(*b),
        (ParamType::Int, serde_json::Value::Number(n)) => n.as_i64().map_or(Value::Null, Value::Int),
        (ParamType::Float, serde_json::Value::Number(n)) => n.as_f64().map_or(Value::Null, Value::Float),
        // Structural fallback: honor whatever shape the JSON actually carries
        // over the declared type if they disagree.
        (_, serde_json::Value::String(s)) => Value::string(s.as_str()),
        (_, serde_json::Value::Bool(b)) => Value::Bool(*b),
        (_, serde_json::Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                n.as_f64().map_or(Value::Null, Value::Float)
            }
        }
        _ => Value::Null,
    }
}
