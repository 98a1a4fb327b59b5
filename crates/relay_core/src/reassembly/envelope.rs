//! The `SPLIT_MSG:` chunk envelope.

use super::ReassemblyError;
use serde_json::{Map, Value};

/// One fragment of a message the backend had to split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkEnvelope {
    /// 1-based position of this fragment
    pub chunk: u32,
    /// Number of fragments the message was split into
    pub total: u32,
    /// Fragment payload
    pub data: String,
}

fn positive_integer(value: &Value) -> Option<u32> {
    let number = match value.as_u64() {
        Some(number) => number,
        // Integral floats such as `2.0` are accepted
        None => {
            let float = value.as_f64()?;
            if float.fract() != 0.0 || float < 1.0 || float > f64::from(u32::MAX) {
                return None;
            }
            float as u64
        }
    };
    u32::try_from(number).ok().filter(|number| *number >= 1)
}

fn field<'a>(object: &'a Map<String, Value>, name: &'static str) -> Result<&'a Value, ReassemblyError> {
    object.get(name).ok_or(ReassemblyError::MissingField(name))
}

impl ChunkEnvelope {
    /// Parses the JSON text following the `SPLIT_MSG:` marker.
    pub fn parse(raw: &str) -> Result<Self, ReassemblyError> {
        let value: Value = serde_json::from_str(raw.trim())?;
        let object = value.as_object().ok_or(ReassemblyError::NotAnObject)?;

        let chunk = positive_integer(field(object, "chunk")?).ok_or(
            ReassemblyError::InvalidField {
                field: "chunk",
                expected: "a positive integer",
            },
        )?;
        let total = positive_integer(field(object, "total")?).ok_or(
            ReassemblyError::InvalidField {
                field: "total",
                expected: "a positive integer",
            },
        )?;
        let data = field(object, "data")?
            .as_str()
            .ok_or(ReassemblyError::InvalidField {
                field: "data",
                expected: "a string",
            })?
            .to_string();

        if chunk > total {
            return Err(ReassemblyError::ChunkOutOfRange { chunk, total });
        }

        Ok(Self { chunk, total, data })
    }
}
