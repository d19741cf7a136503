//! Registration slots - host objects injected after import
//!
//! Design: an explicit, process-scoped table of numbered slots.
//! - The host writes each slot once the native module is importable
//! - Re-registration replaces the previous object (host-side reload)
//! - Unknown slot ids are rejected with a ValueError naming the id
//! - Reading an unwritten slot yields `None`; consumers decide what that means

use std::fmt;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::core::{HostRef, HostValue, SType};
use crate::errors::{Error, ExcType, Result};

/// Number of entries in the slot table (ids 0 and 1 are reserved)
pub const SLOT_COUNT: usize = 9;

/// Enumerated registration slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Slot {
    /// Host `stype` members, ordered like `SType::ALL`
    STypeTable = 2,
    /// Host `ltype` members, ordered like `LType::ALL`
    LTypeTable = 3,
    TypeError = 4,
    ValueError = 5,
    Warning = 6,
    FrameType = 7,
    FreadFn = 8,
}

impl Slot {
    pub const ALL: [Slot; 7] = [
        Slot::STypeTable,
        Slot::LTypeTable,
        Slot::TypeError,
        Slot::ValueError,
        Slot::Warning,
        Slot::FrameType,
        Slot::FreadFn,
    ];

    pub fn from_id(id: i128) -> Option<Slot> {
        Self::ALL.iter().copied().find(|s| i128::from(*s as u8) == id)
    }

    pub const fn id(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Slot::STypeTable => "stype",
            Slot::LTypeTable => "ltype",
            Slot::TypeError => "TypeError",
            Slot::ValueError => "ValueError",
            Slot::Warning => "DtWarning",
            Slot::FrameType => "Frame",
            Slot::FreadFn => "fread",
        }
    }

    /// Slot whose object replaces the builtin class for `exc`
    pub const fn for_exception(exc: ExcType) -> Option<Slot> {
        match exc {
            ExcType::TypeError => Some(Slot::TypeError),
            ExcType::ValueError => Some(Slot::ValueError),
            ExcType::Warning => Some(Slot::Warning),
            ExcType::ImportError => None,
        }
    }
}

/// The registration slot table
pub struct Registry {
    slots: RwLock<[Option<HostRef>; SLOT_COUNT]>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Default::default()),
        }
    }

    /// Store `obj` under slot id `id`
    pub fn register(&self, id: i128, obj: HostRef) -> Result<Slot> {
        let slot = Slot::from_id(id).ok_or_else(|| Error::unknown_slot(id))?;
        self.set(slot, obj);
        Ok(slot)
    }

    pub fn set(&self, slot: Slot, obj: HostRef) {
        let previous = self.slots.write()[slot.id()].replace(obj.clone());
        match previous {
            None => info!(
                slot = slot.id(),
                name = slot.name(),
                kind = obj.type_name(),
                "registered host object"
            ),
            Some(_) => debug!(
                slot = slot.id(),
                name = slot.name(),
                kind = obj.type_name(),
                "re-registered host object"
            ),
        }
    }

    pub fn get(&self, slot: Slot) -> Option<HostRef> {
        self.slots.read()[slot.id()].clone()
    }

    pub fn is_registered(&self, slot: Slot) -> bool {
        self.slots.read()[slot.id()].is_some()
    }

    /// Remove every registration
    pub fn clear(&self) {
        *self.slots.write() = Default::default();
    }

    // ========================================================================
    // Typed readers
    // ========================================================================

    /// Host object for `stype` from the registered stype table
    pub fn stype_object(&self, stype: SType) -> Option<HostRef> {
        self.table_entry(Slot::STypeTable, stype.table_index())
    }

    /// Reverse lookup of a registered stype object, by identity
    pub fn stype_from_object(&self, obj: &HostRef) -> Option<SType> {
        self.stype_from_value(obj.value())
    }

    pub(crate) fn stype_from_value(&self, value: &HostValue) -> Option<SType> {
        let target = value.as_object()?.identity();
        let table = self.get(Slot::STypeTable)?;
        let members = table.value().to_list(&crate::errors::DefaultErrors).ok()?;
        members
            .iter()
            .position(|m| m.as_object().map_or(false, |o| o.identity() == target))
            .and_then(|i| SType::ALL.get(i).copied())
    }

    /// Class raised for `exc`, when the host has registered one
    pub fn exception_class(&self, exc: ExcType) -> Option<HostRef> {
        Slot::for_exception(exc).and_then(|slot| self.get(slot))
    }

    pub fn frame_type(&self) -> Option<HostRef> {
        self.get(Slot::FrameType)
    }

    pub fn fread_fn(&self) -> Option<HostRef> {
        self.get(Slot::FreadFn)
    }

    fn table_entry(&self, slot: Slot, index: usize) -> Option<HostRef> {
        let table = self.get(slot)?;
        match table.value() {
            HostValue::List(items) => items.get(index).cloned(),
            other => other.as_tuple().and_then(|items| items.get(index).cloned()),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.read();
        f.debug_map()
            .entries(
                Slot::ALL
                    .iter()
                    .filter_map(|s| {
                        let obj = slots[s.id()].as_ref()?;
                        Some((s.name(), obj.type_name().to_string()))
                    }),
            )
            .finish()
    }
}
