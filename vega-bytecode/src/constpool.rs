//! Constant pool: tagged Int/String/Float entries addressed by index.

use crate::error::ImageError;
use vega_value::Value;

const TAG_INT: u8 = 0;
const TAG_STRING: u8 = 1;
const TAG_FLOAT: u8 = 2;

/// A single decoded constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Const {
    /// A 32-bit integer constant, widened to `i64` in the value model.
    Int(i32),
    /// A UTF-8 string constant.
    String(String),
    /// A 64-bit float constant.
    Float(f64),
}

impl Const {
    /// Convert this constant into a runtime [`Value`].
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Const::Int(i) => Value::Int(i64::from(*i)),
            Const::String(s) => Value::string(s.as_str()),
            Const::Float(f) => Value::Float(*f),
        }
    }

    /// Borrow the constant as a string, if it is one. Used to resolve
    /// name/model/system/tool-param indices.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Const::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// The decoded constant pool: an ordered list of tagged entries, indexed
/// by position (`PUSH_CONST idx`, `name_idx` fields elsewhere all index
/// into this list).
#[derive(Debug, Clone, Default)]
pub struct ConstPool {
    entries: Vec<Const>,
}

impl ConstPool {
    /// Parse a constant pool from its raw byte section.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Truncated`] if a tag or payload runs past the
    /// end of `bytes`, or [`ImageError::Malformed`] on an unknown tag byte.
    pub fn parse(bytes: &[u8]) -> Result<Self, ImageError> {
        let mut entries = Vec::new();
        let mut pos = 0usize;
        while pos < bytes.len() {
            let tag = *bytes
                .get(pos)
                .ok_or(ImageError::Truncated("constant pool tag"))?;
            pos += 1;
            match tag {
                TAG_INT => {
                    let raw: [u8; 4] = bytes
                        .get(pos..pos + 4)
                        .ok_or(ImageError::Truncated("int constant"))?
                        .try_into()
                        .expect("slice length checked above");
                    entries.push(Const::Int(i32::from_le_bytes(raw)));
                    pos += 4;
                }
                TAG_FLOAT => {
                    let raw: [u8; 8] = bytes
                        .get(pos..pos + 8)
                        .ok_or(ImageError::Truncated("float constant"))?
                        .try_into()
                        .expect("slice length checked above");
                    entries.push(Const::Float(f64::from_le_bytes(raw)));
                    pos += 8;
                }
                TAG_STRING => {
                    let len_raw: [u8; 2] = bytes
                        .get(pos..pos + 2)
                        .ok_or(ImageError::Truncated("string constant length"))?
                        .try_into()
                        .expect("slice length checked above");
                    let len = u16::from_le_bytes(len_raw) as usize;
                    pos += 2;
                    let data = bytes
                        .get(pos..pos + len)
                        .ok_or(ImageError::Truncated("string constant data"))?;
                    let s = String::from_utf8(data.to_vec())
                        .map_err(|e| ImageError::Malformed(format!("non-utf8 string constant: {e}")))?;
                    entries.push(Const::String(s));
                    pos += len;
                }
                other => {
                    return Err(ImageError::Malformed(format!(
                        "unknown constant tag {other} at offset {pos}"
                    )))
                }
            }
        }
        Ok(Self { entries })
    }

    /// Serialize back to the wire format.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            match entry {
                Const::Int(i) => {
                    out.push(TAG_INT);
                    out.extend_from_slice(&i.to_le_bytes());
                }
                Const::Float(f) => {
                    out.push(TAG_FLOAT);
                    out.extend_from_slice(&f.to_le_bytes());
                }
                Const::String(s) => {
                    out.push(TAG_STRING);
                    out.extend_from_slice(&(s.len() as u16).to_le_bytes());
                    out.extend_from_slice(s.as_bytes());
                }
            }
        }
        out
    }

    /// Append a constant, returning its index.
    pub fn push(&mut self, c: Const) -> u16 {
        let idx = self.entries.len() as u16;
        self.entries.push(c);
        idx
    }

    /// Look up a constant by index.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Malformed`] if `idx` is out of range.
    pub fn get(&self, idx: u16) -> Result<&Const, ImageError> {
        self.entries
            .get(idx as usize)
            .ok_or_else(|| ImageError::Malformed(format!("constant index {idx} out of range")))
    }

    /// Resolve a name/model/system index straight to its string payload.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Malformed`] if the index is out of range or
    /// does not name a string constant.
    pub fn get_str(&self, idx: u16) -> Result<&str, ImageError> {
        self.get(idx)?
            .as_str()
            .ok_or_else(|| ImageError::Malformed(format!("constant {idx} is not a string")))
    }

    /// Number of constants in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
