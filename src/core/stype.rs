//! Storage and logical column types
//!
//! Codes match the host-side `stype`/`ltype` enumerations, whose member
//! objects are injected at import time (see `module::registry`).

use std::fmt;
use std::str::FromStr;

/// Storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SType {
    Void = 0,
    Bool = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    Float32 = 6,
    Float64 = 7,
    Str32 = 11,
    Str64 = 12,
    Obj64 = 21,
}

impl SType {
    /// All stypes, in the order of the host's stype table
    pub const ALL: [SType; 11] = [
        SType::Void,
        SType::Bool,
        SType::Int8,
        SType::Int16,
        SType::Int32,
        SType::Int64,
        SType::Float32,
        SType::Float64,
        SType::Str32,
        SType::Str64,
        SType::Obj64,
    ];

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: i128) -> Option<SType> {
        Self::ALL.iter().copied().find(|s| i128::from(s.code()) == code)
    }

    /// Position of this stype in `SType::ALL`
    pub fn table_index(self) -> usize {
        Self::ALL.iter().position(|&s| s == self).unwrap_or(0)
    }

    pub const fn name(self) -> &'static str {
        match self {
            SType::Void => "void",
            SType::Bool => "bool8",
            SType::Int8 => "int8",
            SType::Int16 => "int16",
            SType::Int32 => "int32",
            SType::Int64 => "int64",
            SType::Float32 => "float32",
            SType::Float64 => "float64",
            SType::Str32 => "str32",
            SType::Str64 => "str64",
            SType::Obj64 => "obj64",
        }
    }

    /// Short storage code (element type letter and width)
    pub const fn short_code(self) -> &'static str {
        match self {
            SType::Void => "V",
            SType::Bool => "b1",
            SType::Int8 => "i1",
            SType::Int16 => "i2",
            SType::Int32 => "i4",
            SType::Int64 => "i8",
            SType::Float32 => "f4",
            SType::Float64 => "f8",
            SType::Str32 => "s4",
            SType::Str64 => "s8",
            SType::Obj64 => "o8",
        }
    }

    /// Size in bytes of one element of the main data buffer
    pub const fn elemsize(self) -> usize {
        match self {
            SType::Void => 0,
            SType::Bool | SType::Int8 => 1,
            SType::Int16 => 2,
            SType::Int32 | SType::Float32 | SType::Str32 => 4,
            SType::Int64 | SType::Float64 | SType::Str64 | SType::Obj64 => 8,
        }
    }

    pub const fn ltype(self) -> LType {
        match self {
            SType::Void => LType::Mu,
            SType::Bool => LType::Bool,
            SType::Int8 | SType::Int16 | SType::Int32 | SType::Int64 => LType::Int,
            SType::Float32 | SType::Float64 => LType::Real,
            SType::Str32 | SType::Str64 => LType::String,
            SType::Obj64 => LType::Object,
        }
    }

    /// Bit width for integer stypes
    pub const fn int_bits(self) -> Option<u32> {
        match self {
            SType::Int8 => Some(8),
            SType::Int16 => Some(16),
            SType::Int32 => Some(32),
            SType::Int64 => Some(64),
            _ => None,
        }
    }
}

impl fmt::Display for SType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stype.{}", self.name())
    }
}

impl FromStr for SType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("stype.").unwrap_or(s);
        Self::ALL
            .iter()
            .copied()
            .find(|st| st.name() == s || st.short_code() == s)
            .or(match s {
                "bool" => Some(SType::Bool),
                "str" => Some(SType::Str32),
                "int" => Some(SType::Int64),
                "float" => Some(SType::Float64),
                "obj" | "object" => Some(SType::Obj64),
                _ => None,
            })
            .ok_or(())
    }
}

/// Logical type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LType {
    Mu = 0,
    Bool = 1,
    Int = 2,
    Real = 3,
    String = 5,
    Object = 7,
}

impl LType {
    /// All ltypes, in the order of the host's ltype table
    pub const ALL: [LType; 6] = [
        LType::Mu,
        LType::Bool,
        LType::Int,
        LType::Real,
        LType::String,
        LType::Object,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            LType::Mu => "void",
            LType::Bool => "bool",
            LType::Int => "int",
            LType::Real => "real",
            LType::String => "str",
            LType::Object => "obj",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip() {
        for st in SType::ALL {
            assert_eq!(SType::from_code(i128::from(st.code())), Some(st));
        }
        assert_eq!(SType::from_code(8), None);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("int32".parse::<SType>(), Ok(SType::Int32));
        assert_eq!("i4".parse::<SType>(), Ok(SType::Int32));
        assert_eq!("stype.float64".parse::<SType>(), Ok(SType::Float64));
        assert_eq!("str".parse::<SType>(), Ok(SType::Str32));
        assert!("int128".parse::<SType>().is_err());
    }

    #[test]
    fn test_ltypes() {
        assert_eq!(SType::Int16.ltype(), LType::Int);
        assert_eq!(SType::Str64.ltype(), LType::String);
    }
}
