//! Peripheral I/O channels.
//!
//! A channel is one port in the I/O namespace the `IN`/`OUT` instructions
//! address. The host hands in closures for the device ends: a reader that
//! produces the next input byte, a writer that consumes an output byte.

use crate::bus::{BusCommand, SystemBus, OP_IO_IN, OP_IO_OUT};

/// Closure producing the next input byte of a channel.
pub type ChannelReader = Box<dyn FnMut() -> u8>;
/// Closure consuming one output byte of a channel.
pub type ChannelWriter = Box<dyn FnMut(u8)>;

/// One I/O port on the peripheral bus.
pub struct IoChannel {
    id: u8,
    name: &'static str,
    reader: Option<ChannelReader>,
    writer: Option<ChannelWriter>,
}

impl std::fmt::Debug for IoChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoChannel")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("readable", &self.reader.is_some())
            .field("writable", &self.writer.is_some())
            .finish()
    }
}

impl IoChannel {
    /// Creates an input-only channel.
    #[must_use]
    pub fn reader(id: u8, name: &'static str, reader: ChannelReader) -> Self {
        Self {
            id,
            name,
            reader: Some(reader),
            writer: None,
        }
    }

    /// Creates an output-only channel.
    #[must_use]
    pub fn writer(id: u8, name: &'static str, writer: ChannelWriter) -> Self {
        Self {
            id,
            name,
            reader: None,
            writer: Some(writer),
        }
    }

    /// Channel id in the I/O namespace.
    #[must_use]
    pub const fn id(&self) -> u8 {
        self.id
    }

    /// Display name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Input transfers: the channel drives the data bus on the rising edge.
    pub fn on_rising_edge(&mut self, bus: &mut SystemBus) {
        if bus.command() == BusCommand::Io
            && bus.put_id() == self.id
            && bus.opflags() & OP_IO_IN != 0
        {
            if let Some(reader) = self.reader.as_mut() {
                bus.put_on_data_bus(reader());
            }
        }
    }

    /// Output transfers: the channel consumes the data bus on the high
    /// clock.
    pub fn on_high_clock(&mut self, bus: &mut SystemBus) {
        if bus.command() == BusCommand::Io
            && bus.put_id() == self.id
            && bus.opflags() & OP_IO_OUT != 0
        {
            if let Some(writer) = self.writer.as_mut() {
                writer(bus.read_data_bus());
            }
        }
    }
}
