use std::{convert::TryInto, fmt};

use super::Type;
use crate::{
    error::SmallError,
    io::{Serializeable, SmallReader, SmallWriter},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Cell {
    Bool(bool),
    Int64(i64),
    String(String),
}

impl Cell {
    pub fn get_int64(&self) -> Result<i64, SmallError> {
        match self {
            Cell::Int64(v) => Ok(*v),
            _ => Err(SmallError::new(&format!("not an int64 cell: {:?}", self))),
        }
    }

    pub fn get_string(&self) -> Result<String, SmallError> {
        match self {
            Cell::String(v) => Ok(v.clone()),
            _ => Err(SmallError::new(&format!("not a string cell: {:?}", self))),
        }
    }

    /// Whether the cell can be stored in a field of type `t`.
    pub fn matches(&self, t: &Type) -> bool {
        matches!(
            (self, t),
            (Cell::Bool(_), Type::Bool)
                | (Cell::Int64(_), Type::Int64)
                | (Cell::String(_), Type::Bytes(_))
        )
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Bool(v) => write!(f, "{}", v),
            Cell::Int64(v) => write!(f, "{}", v),
            Cell::String(v) => write!(f, "{}", v),
        }
    }
}

impl Serializeable for Cell {
    type Reference = Type;

    fn encode(&self, writer: &mut SmallWriter, t: &Type) {
        match (self, t) {
            (Cell::Bool(v), Type::Bool) => writer.write_bytes(&[*v as u8]),
            (Cell::Int64(v), Type::Int64) => writer.write_bytes(&v.to_be_bytes()),
            (Cell::String(v), Type::Bytes(size)) => {
                // payload longer than the field is truncated, on a char
                // boundary
                let bytes = v.as_bytes();
                let mut len = bytes.len().min(*size as usize);
                while !v.is_char_boundary(len) {
                    len -= 1;
                }
                writer.write_bytes(&[len as u8]);
                writer.write_bytes(&bytes[..len]);
                writer.write_bytes(&vec![0; *size as usize - len]);
            }
            // callers check `matches` before encoding, keep the layout
            // intact anyway
            _ => writer.write_bytes(&vec![0; t.size()]),
        }
    }

    fn decode(reader: &mut SmallReader, t: &Type) -> Result<Self, SmallError> {
        match t {
            Type::Bool => Ok(Cell::Bool(reader.read_exact(1)?[0] != 0)),
            Type::Int64 => {
                let bytes: [u8; 8] = reader
                    .read_exact(8)?
                    .try_into()
                    .map_err(|_| SmallError::new("int64 cell needs 8 bytes"))?;
                Ok(Cell::Int64(i64::from_be_bytes(bytes)))
            }
            Type::Bytes(size) => {
                let len = (reader.read_exact(1)?[0] as usize).min(*size as usize);
                let payload = reader.read_exact(*size as usize)?;
                Ok(Cell::String(
                    String::from_utf8_lossy(&payload[..len]).to_string(),
                ))
            }
        }
    }
}
