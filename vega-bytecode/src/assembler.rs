//! A tiny in-memory image builder.
//!
//! Not part of the loader's public contract — this is how the test suite
//! (here and in `vega-vm`) constructs `.vgb` images without hand-writing
//! byte arrays. A real toolchain would replace this with a compiler; this
//! module exists purely so the loader and the interpreter can be tested
//! against images built the same way the spec's literal example programs
//! are described.

use crate::agentdef::AgentDef;
use crate::constpool::{Const, ConstPool};
use crate::function::FunctionDef;
use crate::image::Image;
use crate::opcode::Op;

/// Builds a function's code body incrementally.
#[derive(Debug, Default)]
pub struct FunctionBuilder {
    name: String,
    params: u16,
    locals: u16,
    code: Vec<u8>,
}

impl FunctionBuilder {
    /// Start a new function named `name` with `params` parameters and
    /// `locals` total local slots (including parameters).
    #[must_use]
    pub fn new(name: impl Into<String>, params: u16, locals: u16) -> Self {
        Self { name: name.into(), params, locals, code: Vec::new() }
    }

    /// Append one instruction.
    #[must_use]
    pub fn op(mut self, op: Op) -> Self {
        op.write(&mut self.code);
        self
    }

    /// Current length of this function's code so far, for computing jump
    /// offsets by hand when assembling loops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.code.len()
    }
}

/// Builds a complete `.vgb` image across multiple functions and agents.
#[derive(Debug, Default)]
pub struct ImageBuilder {
    constants: ConstPool,
    functions: Vec<(String, u16, u16, Vec<u8>)>,
    agents: Vec<(String, String, String, u16, u16)>,
}

impl ImageBuilder {
    /// Start an empty image.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string constant, returning its pool index.
    pub fn intern_str(&mut self, s: &str) -> u16 {
        self.constants.push(Const::String(s.to_string()))
    }

    /// Intern an integer constant, returning its pool index.
    pub fn intern_int(&mut self, v: i32) -> u16 {
        self.constants.push(Const::Int(v))
    }

    /// Intern a float constant, returning its pool index.
    pub fn intern_float(&mut self, v: f64) -> u16 {
        self.constants.push(Const::Float(v))
    }

    /// Add a finished function.
    pub fn function(&mut self, fb: FunctionBuilder) -> &mut Self {
        self.functions.push((fb.name, fb.params, fb.locals, fb.code));
        self
    }

    /// Add a static agent definition. `temperature` is rounded to the
    /// nearest `1/100`.
    pub fn agent(&mut self, name: &str, model: &str, system: &str, tool_count: u16, temperature: f64) -> &mut Self {
        self.agents.push((name.to_string(), model.to_string(), system.to_string(), tool_count, (temperature * 100.0).round() as u16));
        self
    }

    /// Finish building and produce a loadable [`Image`].
    #[must_use]
    pub fn build(mut self) -> Image {
        let mut code = Vec::new();
        let mut function_defs = Vec::with_capacity(self.functions.len());
        for (name, params, locals, body) in &self.functions {
            let name_idx = self.constants.push(Const::String(name.clone()));
            let offset = code.len() as u32;
            code.extend_from_slice(body);
            function_defs.push(FunctionDef {
                name_idx,
                params: *params,
                locals: *locals,
                offset,
                length: body.len() as u32,
            });
        }

        let agent_defs = self
            .agents
            .iter()
            .map(|(name, model, system, tool_count, temp_x100)| AgentDef {
                name_idx: self.constants.push(Const::String(name.clone())),
                model_idx: self.constants.push(Const::String(model.clone())),
                system_idx: self.constants.push(Const::String(system.clone())),
                tool_count: *tool_count,
                temp_x100: *temp_x100,
            })
            .collect();

        Image::from_parts(function_defs, agent_defs, self.constants, code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_loadable_image() {
        let mut b = ImageBuilder::new();
        let two = b.intern_int(2);
        let three = b.intern_int(3);
        let main = FunctionBuilder::new("main", 0, 0)
            .op(Op::PushConst(two))
            .op(Op::PushConst(three))
            .op(Op::Add)
            .op(Op::Return);
        b.function(main);
        let img = b.build();
        let bytes = img.to_bytes();
        let loaded = Image::load(&bytes).unwrap();
        assert_eq!(loaded.find_function("main").unwrap().1.params, 0);
    }
}
