//! The `Xvr_ValueType` tag, shared by runtime values, declared variable
//! types, and the wire encoding used by `READ`/`DECLARE`.

/// Kind of a [`crate::value::Value`]. Also doubles as the declared type
/// carried by a name string (see [`crate::string::XString::Name`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueType {
    Null = 0,
    Boolean = 1,
    Integer = 2,
    Float = 3,
    String = 4,
    Array = 5,
    Table = 6,
    Function = 7,
    Opaque = 8,
    Reference = 9,
    Type = 10,
    Any = 11,
    Unknown = 12,
}

impl ValueType {
    pub fn from_wire(byte: u8) -> Option<ValueType> {
        use ValueType::*;
        Some(match byte {
            0 => Null,
            1 => Boolean,
            2 => Integer,
            3 => Float,
            4 => String,
            5 => Array,
            6 => Table,
            7 => Function,
            8 => Opaque,
            9 => Reference,
            10 => Type,
            11 => Any,
            12 => Unknown,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Null => "null",
            ValueType::Boolean => "bool",
            ValueType::Integer => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Table => "table",
            ValueType::Function => "function",
            ValueType::Opaque => "opaque",
            ValueType::Reference => "reference",
            ValueType::Type => "type",
            ValueType::Any => "any",
            ValueType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
