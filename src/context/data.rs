//! Typed reads of emulated memory.

/// How `read_data` interprets memory.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DataType {
    /// Bytes up to a single-byte nul.
    String,

    /// 2-byte units up to a 2-byte nul.
    WideString,
    Byte,
    Word,
    Dword,
    Qword,
}

impl Default for DataType {
    fn default() -> Self {
        DataType::String
    }
}

impl DataType {
    /// Width of a fixed-size type, or of one unit of a string type.
    pub fn width(self) -> usize {
        match self {
            DataType::String | DataType::Byte => 1,
            DataType::WideString | DataType::Word => 2,
            DataType::Dword => 4,
            DataType::Qword => 8,
        }
    }

    pub fn is_string(self) -> bool {
        matches!(self, DataType::String | DataType::WideString)
    }
}

/// The result of `read_data`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Data {
    Bytes(Vec<u8>),
    Int(u64),
}

impl Data {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Data::Bytes(b) => Some(b),
            Data::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<u64> {
        match self {
            Data::Int(i) => Some(*i),
            Data::Bytes(_) => None,
        }
    }
}
