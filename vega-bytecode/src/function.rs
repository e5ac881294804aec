//! Function table entries.

/// A single function definition: everything the interpreter needs to open
/// a call frame and start executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionDef {
    /// Index into the constant pool for this function's name.
    pub name_idx: u16,
    /// Number of parameters. Parameters occupy the first local slots.
    pub params: u16,
    /// Number of local variable slots (including parameters).
    pub locals: u16,
    /// Byte offset of this function's first instruction within the code section.
    pub offset: u32,
    /// Length in bytes of this function's code.
    pub length: u32,
}

impl FunctionDef {
    pub(crate) const ENCODED_LEN: usize = 2 + 2 + 2 + 4 + 4;

    pub(crate) fn read(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::ENCODED_LEN {
            return None;
        }
        Some(Self {
            name_idx: u16::from_le_bytes(bytes[0..2].try_into().ok()?),
            params: u16::from_le_bytes(bytes[2..4].try_into().ok()?),
            locals: u16::from_le_bytes(bytes[4..6].try_into().ok()?),
            offset: u32::from_le_bytes(bytes[6..10].try_into().ok()?),
            length: u32::from_le_bytes(bytes[10..14].try_into().ok()?),
        })
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.name_idx.to_le_bytes());
        out.extend_from_slice(&self.params.to_le_bytes());
        out.extend_from_slice(&self.locals.to_le_bytes());
        out.extend_from_slice(&self.offset.to_le_bytes());
        out.extend_from_slice(&self.length.to_le_bytes());
    }
}
