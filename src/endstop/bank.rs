//! Named endstop storage for composed boards.

use core::cell::Cell;

use embedded_hal::digital::InputPin;
use heapless::{String, Vec};

use crate::error::{short_name, ConfigError, Result};

use super::{sample_merged, Endstop, SwitchEndstop};

/// Maximum number of endstops in a bank.
pub const MAX_ENDSTOPS: usize = 16;

/// Position of an endstop inside its bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndstopId(usize);

impl EndstopId {
    /// Position in definition order.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
enum Slot<P> {
    None,
    Switch(SwitchEndstop<P>),
    Merged {
        first: EndstopId,
        second: EndstopId,
        state: Cell<bool>,
    },
}

/// All endstops of a board, in definition order.
///
/// Merged entries refer to earlier positions only, so evaluating one always
/// terminates. Drivers receive [`EndstopHandle`]s, which borrow the bank.
#[derive(Debug)]
pub struct EndstopBank<P> {
    slots: Vec<(String<32>, Slot<P>), MAX_ENDSTOPS>,
}

impl<P: InputPin> Default for EndstopBank<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: InputPin> EndstopBank<P> {
    /// Create an empty bank.
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Add an endstop that never triggers.
    pub fn push_none(&mut self, name: &str) -> Result<EndstopId> {
        self.push(name, Slot::None)
    }

    /// Add a hardware switch.
    pub fn push_switch(&mut self, name: &str, switch: SwitchEndstop<P>) -> Result<EndstopId> {
        self.push(name, Slot::Switch(switch))
    }

    /// Add the logical OR of two earlier endstops.
    pub fn push_merged(&mut self, name: &str, first: EndstopId, second: EndstopId) -> Result<EndstopId> {
        for source in [first, second] {
            if source.0 >= self.slots.len() {
                return Err(ConfigError::ForwardReference {
                    device: short_name(name),
                    reference: short_name("<endstop>"),
                }
                .into());
            }
        }
        self.push(
            name,
            Slot::Merged {
                first,
                second,
                state: Cell::new(false),
            },
        )
    }

    fn push(&mut self, name: &str, slot: Slot<P>) -> Result<EndstopId> {
        if self.id(name).is_some() {
            return Err(ConfigError::DuplicateDevice(short_name(name)).into());
        }
        let id = EndstopId(self.slots.len());
        self.slots
            .push((short_name(name), slot))
            .map_err(|_| ConfigError::CapacityExceeded("endstops"))?;
        Ok(id)
    }

    /// Look up an endstop by name.
    pub fn id(&self, name: &str) -> Option<EndstopId> {
        self.slots
            .iter()
            .position(|(n, _)| n.as_str() == name)
            .map(EndstopId)
    }

    /// Non-owning handle to an endstop, by name.
    pub fn handle(&self, name: &str) -> Option<EndstopHandle<'_, P>> {
        self.id(name).map(|id| EndstopHandle { bank: self, id })
    }

    /// Sample an endstop.
    pub fn triggered(&self, id: EndstopId) -> bool {
        match self.slots.get(id.0).map(|(_, slot)| slot) {
            None | Some(Slot::None) => false,
            Some(Slot::Switch(switch)) => switch.triggered(),
            Some(Slot::Merged { first, second, state }) => {
                let first = EndstopHandle { bank: self, id: *first };
                let second = EndstopHandle { bank: self, id: *second };
                sample_merged(&first, &second, state)
            }
        }
    }

    /// Cached result of the last sample.
    pub fn state(&self, id: EndstopId) -> bool {
        match self.slots.get(id.0).map(|(_, slot)| slot) {
            None | Some(Slot::None) => false,
            Some(Slot::Switch(switch)) => switch.state(),
            Some(Slot::Merged { state, .. }) => state.get(),
        }
    }

    /// Endstop names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|(n, _)| n.as_str())
    }

    /// Number of endstops.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the bank is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Non-owning reference to an endstop in a bank.
#[derive(Debug)]
pub struct EndstopHandle<'a, P> {
    bank: &'a EndstopBank<P>,
    id: EndstopId,
}

impl<P> Clone for EndstopHandle<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for EndstopHandle<'_, P> {}

impl<P> EndstopHandle<'_, P> {
    /// Id of the referenced endstop.
    #[inline]
    pub fn id(&self) -> EndstopId {
        self.id
    }
}

impl<P: InputPin> Endstop for EndstopHandle<'_, P> {
    #[inline]
    fn triggered(&self) -> bool {
        self.bank.triggered(self.id)
    }

    #[inline]
    fn state(&self) -> bool {
        self.bank.state(self.id)
    }
}
