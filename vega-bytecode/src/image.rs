//! The bytecode image: header, function table, agent table, constant
//! pool, and code section, as loaded from a `.vgb` file.

use crate::agentdef::AgentDef;
use crate::constpool::ConstPool;
use crate::error::{ImageError, MAGIC, VERSION};
use crate::function::FunctionDef;

const HEADER_LEN: usize = 20;

/// A fully loaded, read-only bytecode image.
///
/// Loading is pure: no side effects beyond allocating image-owned buffers.
/// Loading the same bytes twice always produces equal images.
#[derive(Debug, Clone)]
pub struct Image {
    functions: Vec<FunctionDef>,
    agents: Vec<AgentDef>,
    constants: ConstPool,
    code: Vec<u8>,
}

impl Image {
    /// Load an image from raw `.vgb` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::BadMagic`]/[`ImageError::BadVersion`] if the
    /// header doesn't match, or [`ImageError::Truncated`]/[`ImageError::Malformed`]
    /// if any section is short or structurally invalid.
    pub fn load(bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.len() < HEADER_LEN {
            return Err(ImageError::Truncated("header"));
        }

        let magic = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        if magic != MAGIC {
            return Err(ImageError::BadMagic { found: magic });
        }

        let version = u16::from_le_bytes(bytes[4..6].try_into().unwrap());
        if version != VERSION {
            return Err(ImageError::BadVersion { found: version });
        }

        // bytes[6..8] is the reserved flags field; ignored.
        let const_pool_size = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
        let code_size = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;
        let function_count = u16::from_le_bytes(bytes[16..18].try_into().unwrap()) as usize;
        let agent_count = u16::from_le_bytes(bytes[18..20].try_into().unwrap()) as usize;

        let mut pos = HEADER_LEN;

        let mut functions = Vec::with_capacity(function_count);
        for _ in 0..function_count {
            let end = pos + FunctionDef::ENCODED_LEN;
            let slice = bytes
                .get(pos..end)
                .ok_or(ImageError::Truncated("function table"))?;
            functions.push(FunctionDef::read(slice).ok_or(ImageError::Truncated("function table entry"))?);
            pos = end;
        }

        let mut agents = Vec::with_capacity(agent_count);
        for _ in 0..agent_count {
            let end = pos + AgentDef::ENCODED_LEN;
            let slice = bytes
                .get(pos..end)
                .ok_or(ImageError::Truncated("agent table"))?;
            agents.push(AgentDef::read(slice).ok_or(ImageError::Truncated("agent table entry"))?);
            pos = end;
        }

        let const_pool_end = pos + const_pool_size;
        let const_bytes = bytes
            .get(pos..const_pool_end)
            .ok_or(ImageError::Truncated("constant pool"))?;
        let constants = ConstPool::parse(const_bytes)?;
        pos = const_pool_end;

        let code_end = pos + code_size;
        let code = bytes
            .get(pos..code_end)
            .ok_or(ImageError::Truncated("code section"))?
            .to_vec();

        Ok(Self {
            functions,
            agents,
            constants,
            code,
        })
    }

    /// Serialize this image back to `.vgb` bytes.
    ///
    /// For any image this crate itself constructed (see `assembler`),
    /// `Image::load(&img.to_bytes()).unwrap() == img` (the round-trip
    /// property from the spec's testable properties).
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let const_bytes = self.constants.to_bytes();
        let mut out = Vec::with_capacity(HEADER_LEN + self.code.len() + const_bytes.len());

        out.extend_from_slice(&MAGIC.to_le_bytes());
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // reserved flags
        out.extend_from_slice(&(const_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.code.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.functions.len() as u16).to_le_bytes());
        out.extend_from_slice(&(self.agents.len() as u16).to_le_bytes());

        for f in &self.functions {
            f.write(&mut out);
        }
        for a in &self.agents {
            a.write(&mut out);
        }
        out.extend_from_slice(&const_bytes);
        out.extend_from_slice(&self.code);
        out
    }

    /// Construct an image directly from its parsed sections (used by the
    /// assembler and by any future compiler-facing crate).
    #[must_use]
    pub fn from_parts(
        functions: Vec<FunctionDef>,
        agents: Vec<AgentDef>,
        constants: ConstPool,
        code: Vec<u8>,
    ) -> Self {
        Self {
            functions,
            agents,
            constants,
            code,
        }
    }

    /// The function table.
    #[must_use]
    pub fn functions(&self) -> &[FunctionDef] {
        &self.functions
    }

    /// The static agent table.
    #[must_use]
    pub fn agents(&self) -> &[AgentDef] {
        &self.agents
    }

    /// The constant pool.
    #[must_use]
    pub fn constants(&self) -> &ConstPool {
        &self.constants
    }

    /// The code section bytes.
    #[must_use]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Find a function by exact name, resolving each function's
    /// `name_idx` against the constant pool. Returns the function's index
    /// in the function table alongside its definition.
    #[must_use]
    pub fn find_function(&self, name: &str) -> Option<(u32, &FunctionDef)> {
        self.functions.iter().enumerate().find_map(|(i, f)| {
            let resolved = self.constants.get_str(f.name_idx).ok()?;
            (resolved == name).then_some((i as u32, f))
        })
    }

    /// Find every function whose resolved name starts with `prefix`
    /// (`<AgentName>$` tool discovery per the agent manager's spawn step).
    pub fn functions_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (u32, &'a FunctionDef, &'a str)> + 'a {
        self.functions.iter().enumerate().filter_map(move |(i, f)| {
            let resolved = self.constants.get_str(f.name_idx).ok()?;
            resolved.starts_with(prefix).then_some((i as u32, f, resolved))
        })
    }

    /// Debug section-size summary for `vega-cli --debug`.
    #[must_use]
    pub fn debug_summary(&self) -> ImageDebugSummary {
        ImageDebugSummary {
            function_count: self.functions.len(),
            agent_count: self.agents.len(),
            constant_count: self.constants.len(),
            constant_bytes: self.constants.to_bytes().len(),
            code_bytes: self.code.len(),
        }
    }
}

/// Section sizes printed by `vega --debug` before running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDebugSummary {
    /// Number of function table entries.
    pub function_count: usize,
    /// Number of static agent table entries.
    pub agent_count: usize,
    /// Number of constant pool entries.
    pub constant_count: usize,
    /// Byte size of the constant pool section.
    pub constant_bytes: usize,
    /// Byte size of the code section.
    pub code_bytes: usize,
}
