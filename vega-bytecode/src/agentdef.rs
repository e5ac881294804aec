//! Agent table entries (static, compile-time agent definitions).

/// A single static agent definition, as emitted by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentDef {
    /// Index into the constant pool for the agent's name.
    pub name_idx: u16,
    /// Index into the constant pool for the model identifier.
    pub model_idx: u16,
    /// Index into the constant pool for the system prompt.
    pub system_idx: u16,
    /// Number of tools declared for this agent (informational; the actual
    /// tool set is discovered by scanning the function table for
    /// `<name>$tool` entries at spawn time).
    pub tool_count: u16,
    /// Temperature, fixed-point as `value * 100`.
    pub temp_x100: u16,
}

impl AgentDef {
    pub(crate) const ENCODED_LEN: usize = 2 + 2 + 2 + 2 + 2;

    pub(crate) fn read(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::ENCODED_LEN {
            return None;
        }
        Some(Self {
            name_idx: u16::from_le_bytes(bytes[0..2].try_into().ok()?),
            model_idx: u16::from_le_bytes(bytes[2..4].try_into().ok()?),
            system_idx: u16::from_le_bytes(bytes[4..6].try_into().ok()?),
            tool_count: u16::from_le_bytes(bytes[6..8].try_into().ok()?),
            temp_x100: u16::from_le_bytes(bytes[8..10].try_into().ok()?),
        })
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.name_idx.to_le_bytes());
        out.extend_from_slice(&self.model_idx.to_le_bytes());
        out.extend_from_slice(&self.system_idx.to_le_bytes());
        out.extend_from_slice(&self.tool_count.to_le_bytes());
        out.extend_from_slice(&self.temp_x100.to_le_bytes());
    }

    /// Temperature as a float (`temp_x100 / 100.0`).
    #[must_use]
    pub fn temperature(&self) -> f64 {
        f64::from(self.temp_x100) / 100.0
    }
}
