//! Subsystem static initializers
//!
//! Design: every storage/codec subsystem prepares its process-wide state
//! independently, during module initialization.
//! - Initializers run in registration order
//! - Each may install constants on the module being built
//! - The first failure aborts the whole initialization

use once_cell::sync::Lazy;
use tracing::debug;

use super::init::ModuleBuilder;
use crate::core::{HostRef, HostValue, SType};
use crate::errors::{Error, Result};
use crate::frame::RowIndex;

/// Independent static initializer run by the init sequencer
pub trait Subsystem: Send + Sync {
    fn name(&self) -> &str;

    fn static_init(&self, builder: &mut ModuleBuilder) -> Result<()>;
}

/// Built-in subsystems, in initialization order
pub fn builtin_subsystems() -> Vec<Box<dyn Subsystem>> {
    vec![
        Box::new(ColumnStorage),
        Box::new(RowIndexStorage),
        Box::new(EncodingTables),
        Box::new(JayReader),
    ]
}

// ============================================================================
// Column storage
// ============================================================================

/// Per-stype element sizes of column buffers
pub struct ColumnStorage;

impl Subsystem for ColumnStorage {
    fn name(&self) -> &str {
        "column"
    }

    fn static_init(&self, builder: &mut ModuleBuilder) -> Result<()> {
        let elemsizes = SType::ALL
            .iter()
            .map(|st| (HostRef::str(st.name()), HostRef::int(st.elemsize() as i128)))
            .collect();
        builder.add_constant("_column_elemsizes", HostRef::dict(elemsizes));
        Ok(())
    }
}

// ============================================================================
// Row-index storage
// ============================================================================

/// Row index kinds known to the storage layer
pub struct RowIndexStorage;

impl Subsystem for RowIndexStorage {
    fn name(&self) -> &str {
        "rowindex"
    }

    fn static_init(&self, builder: &mut ModuleBuilder) -> Result<()> {
        let kinds = [
            RowIndex::slice(0, 0, 1),
            RowIndex::Array32(Vec::new()),
            RowIndex::Array64(Vec::new()),
        ]
        .iter()
        .map(|ri| HostRef::str(ri.kind_name()))
        .collect();
        builder.add_constant("_rowindex_kinds", HostRef::tuple(kinds));
        Ok(())
    }
}

// ============================================================================
// Encodings
// ============================================================================

/// Sequence length implied by each UTF-8 lead byte; 0 for invalid leads
pub static UTF8_LEAD_LENGTHS: Lazy<[u8; 256]> = Lazy::new(|| {
    let mut table = [0u8; 256];
    for (byte, len) in table.iter_mut().enumerate() {
        *len = match byte {
            0x00..=0x7F => 1,
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => 0,
        };
    }
    table
});

/// Length of the UTF-8 sequence starting with `lead`
pub fn utf8_sequence_len(lead: u8) -> Option<usize> {
    match UTF8_LEAD_LENGTHS[lead as usize] {
        0 => None,
        n => Some(n as usize),
    }
}

pub struct EncodingTables;

impl Subsystem for EncodingTables {
    fn name(&self) -> &str {
        "encodings"
    }

    fn static_init(&self, builder: &mut ModuleBuilder) -> Result<()> {
        let table = &*UTF8_LEAD_LENGTHS;
        if table[b'a' as usize] != 1 || table[0xE2] != 3 {
            return Err(Error::invalid_value("UTF-8 lead byte table is inconsistent"));
        }
        builder.add_constant("_utf8_lead_lengths", HostRef::new(HostValue::Bytes(table.to_vec())));
        Ok(())
    }
}

// ============================================================================
// Binary format reader
// ============================================================================

/// Leading bytes of a `.jay` file
pub const JAY_MAGIC: &[u8; 8] = b"JAY1\0\0\0\0";

pub struct JayReader;

impl Subsystem for JayReader {
    fn name(&self) -> &str {
        "jay"
    }

    fn static_init(&self, builder: &mut ModuleBuilder) -> Result<()> {
        builder.add_constant("_jay_magic", HostRef::new(HostValue::Bytes(JAY_MAGIC.to_vec())));
        debug!(magic = ?JAY_MAGIC, "jay reader ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_lead_lengths() {
        assert_eq!(utf8_sequence_len(b'x'), Some(1));
        assert_eq!(utf8_sequence_len(0xC3), Some(2));
        assert_eq!(utf8_sequence_len(0xF0), Some(4));
        assert_eq!(utf8_sequence_len(0x80), None);
        assert_eq!(utf8_sequence_len(0xFF), None);
        for s in ["é", "€", "😀"] {
            assert_eq!(utf8_sequence_len(s.as_bytes()[0]), Some(s.len()));
        }
    }

    #[test]
    fn test_builtin_order() {
        let names: Vec<String> =
            builtin_subsystems().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, ["column", "rowindex", "encodings", "jay"]);
    }
}
