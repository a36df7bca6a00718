use std::fmt;

use itertools::Itertools;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Type {
    Bool,
    Int64,
    Bytes(u8),
}

impl Type {
    /// Get the size of the type in bytes.
    pub fn size(&self) -> usize {
        match self {
            Type::Bool => 1,
            Type::Int64 => 8,
            Type::Bytes(size) => {
                // The first byte is the length of the payload, the
                // payload itself is padded to a fixed size.
                1 + *size as usize
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Int64 => write!(f, "int64"),
            Type::Bytes(size) => write!(f, "bytes({})", size),
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Field {
    pub name: String,
    pub t: Type,
}

impl Field {
    pub fn new(field_name: &str, field_type: Type) -> Field {
        Field {
            name: field_name.to_string(),
            t: field_type,
        }
    }

    pub fn get_type(&self) -> Type {
        self.t
    }
}

/// Describes the layout of the tuples of a table.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct TableSchema {
    fields: Vec<Field>,
}

impl TableSchema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Concatenate two schemas, fields of `a` come first.
    pub fn merge(a: &TableSchema, b: &TableSchema) -> Self {
        let mut fields = a.fields.clone();
        fields.extend(b.fields.iter().cloned());
        Self { fields }
    }

    /// Get tuple size in bytes.
    pub fn get_tuple_size(&self) -> usize {
        self.fields.iter().map(|f| f.t.size()).sum()
    }

    pub fn fields_count(&self) -> usize {
        self.fields.len()
    }

    pub fn get_fields(&self) -> &Vec<Field> {
        &self.fields
    }

    pub fn get_field(&self, i: usize) -> Option<&Field> {
        self.fields.get(i)
    }

    pub fn get_field_pos(&self, field_name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == field_name)
    }
}

impl fmt::Display for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            self.fields
                .iter()
                .map(|field| format!("{}({})", field.name, field.t))
                .join(", ")
        )
    }
}

pub fn small_int_schema(width: usize, name_prefix: &str) -> TableSchema {
    let fields = (0..width)
        .map(|i| Field::new(&format!("{}-{}", name_prefix, i), Type::Int64))
        .collect();
    TableSchema::new(fields)
}
