//! Pin registry: the discovered pins and the analog channel map.
//!
//! The registry is replaced wholesale whenever the board answers a
//! capability query, and its channel map whenever it answers an analog
//! mapping query. Each replacement bumps a generation counter, so a
//! [`PinHandle`] taken before the replacement is rejected with
//! [`Error::StalePin`] instead of silently pointing at a different pin.

use std::collections::BTreeMap;

use firmata_core::{Error, Pin, Result};
use tracing::{debug, warn};

use crate::constants::PINS_PER_PORT;

/// A generation-checked reference to a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinHandle {
    index: usize,
    generation: u64,
}

impl PinHandle {
    /// The pin index this handle refers to.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The registry generation the handle was taken at.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Owns the board's pins and its analog channel → pin map.
#[derive(Debug, Default, Clone)]
pub struct PinRegistry {
    pins: Vec<Pin>,
    analog_pins: BTreeMap<u8, usize>,
    generation: u64,
}

impl PinRegistry {
    /// Create an empty registry (nothing discovered yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of discovered pins.
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// All pins in discovery order.
    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    /// Analog channel → pin index, for every channel the board reported.
    pub fn analog_pins(&self) -> &BTreeMap<u8, usize> {
        &self.analog_pins
    }

    /// Pin index carrying `channel`, if mapped.
    pub fn analog_pin(&self, channel: u8) -> Option<usize> {
        self.analog_pins.get(&channel).copied()
    }

    /// Incremented on every pin or channel map replacement.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn out_of_range(&self, index: usize) -> Error {
        Error::OutOfRangePin {
            pin: index,
            count: self.pins.len(),
        }
    }

    pub fn get(&self, index: usize) -> Result<&Pin> {
        self.pins.get(index).ok_or_else(|| self.out_of_range(index))
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut Pin> {
        let count = self.pins.len();
        self.pins
            .get_mut(index)
            .ok_or(Error::OutOfRangePin { pin: index, count })
    }

    /// Swap in a freshly discovered pin set. The channel map is cleared
    /// since the new pins carry no analog channels yet.
    pub fn replace_all(&mut self, pins: Vec<Pin>) {
        self.pins = pins;
        self.analog_pins.clear();
        self.generation += 1;
        debug!(
            pins = self.pins.len(),
            generation = self.generation,
            "pin registry replaced"
        );
    }

    /// Assign `channel` to `pin`, taking it away from any other pin.
    pub fn set_analog_channel(&mut self, pin: usize, channel: u8) -> Result<()> {
        self.get(pin)?;
        if let Some(previous) = self.analog_pins.insert(channel, pin) {
            if previous != pin {
                if let Some(p) = self.pins.get_mut(previous) {
                    p.analog_channel = None;
                }
            }
        }
        if let Some(old) = self.pins[pin].analog_channel.replace(channel) {
            if old != channel {
                self.analog_pins.remove(&old);
            }
        }
        Ok(())
    }

    /// Replace the channel map from an analog mapping response (one entry
    /// per pin, `None` for pins without a channel). Entries for pins that
    /// were never discovered are dropped, and a channel listed for several
    /// pins goes to the last of them. Returns the number of channels
    /// now mapped.
    pub fn replace_analog_mapping(&mut self, mapping: &[Option<u8>]) -> usize {
        if mapping.len() > self.pins.len() {
            warn!(
                entries = mapping.len(),
                pins = self.pins.len(),
                "analog mapping lists more pins than were discovered"
            );
        }

        self.analog_pins.clear();
        for (index, pin) in self.pins.iter_mut().enumerate() {
            pin.analog_channel = None;
            if let Some(channel) = mapping.get(index).copied().flatten() {
                if let Some(previous) = self.analog_pins.insert(channel, index) {
                    warn!(channel, previous, pin = index, "analog channel mapped twice");
                }
            }
        }
        // A channel named twice belongs to the last pin naming it.
        for (&channel, &index) in &self.analog_pins {
            self.pins[index].analog_channel = Some(channel);
        }
        self.generation += 1;
        debug!(
            channels = self.analog_pins.len(),
            generation = self.generation,
            "analog mapping replaced"
        );
        self.analog_pins.len()
    }

    /// Take a handle to `index` valid until the next replacement.
    pub fn handle(&self, index: usize) -> Result<PinHandle> {
        self.get(index)?;
        Ok(PinHandle {
            index,
            generation: self.generation,
        })
    }

    fn check(&self, handle: PinHandle) -> Result<()> {
        if handle.generation != self.generation {
            return Err(Error::StalePin {
                pin: handle.index,
                held: handle.generation,
                current: self.generation,
            });
        }
        Ok(())
    }

    pub fn resolve(&self, handle: PinHandle) -> Result<&Pin> {
        self.check(handle)?;
        self.get(handle.index)
    }

    pub fn resolve_mut(&mut self, handle: PinHandle) -> Result<&mut Pin> {
        self.check(handle)?;
        self.get_mut(handle.index)
    }

    /// Digital port mask from cached values: bit `i` is set when pin
    /// `port * 8 + i` exists and has a non-zero value.
    pub fn port_value(&self, port: usize) -> u8 {
        let base = port * PINS_PER_PORT;
        (0..PINS_PER_PORT)
            .filter(|i| self.pins.get(base + i).is_some_and(|p| p.value != 0))
            .fold(0u8, |mask, i| mask | (1 << i))
    }
}
