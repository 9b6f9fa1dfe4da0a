//! The machine assembly: bus, component table, I/O channels, and the clock
//! driver external callers pulse.

use crate::alu::Alu;
use crate::bus::{Event, SystemBus};
use crate::component::{
    Component, BP, COMPONENTS, DI, GP_A, GP_B, GP_C, GP_D, PC, SI, SP, TX,
};
use crate::controller::Controller;
use crate::fault::Fault;
use crate::io::IoChannel;
use crate::memory::Memory;
use crate::microcode::table::MICROCODE;
use crate::register::{AddressRegister, Register};

/// The wired machine.
///
/// Owns the [`SystemBus`], the 16-slot component table (with alias mapping
/// for the dual-role controller and memory), and the I/O channel table.
/// External callers drive it one full clock pulse at a time; there is no
/// background thread and no suspension point inside a pulse.
#[derive(Debug)]
pub struct Backplane {
    bus: SystemBus,
    slots: Vec<Option<Component>>,
    aliases: Vec<Option<usize>>,
    channels: Vec<IoChannel>,
    events: Vec<Event>,
    instructions: u64,
}

impl Default for Backplane {
    fn default() -> Self {
        Self::new()
    }
}

impl Backplane {
    /// Creates an empty backplane with no components wired.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bus: SystemBus::new(),
            slots: (0..COMPONENTS).map(|_| None).collect(),
            aliases: vec![None; COMPONENTS],
            channels: Vec::new(),
            events: Vec::new(),
            instructions: 0,
        }
    }

    /// Creates the standard machine: four general registers, the ALU, the
    /// controller with the standard microcode table, the address registers
    /// `PC`/`SP`/`BP`/`SI`/`DI`/`TX`, and memory with no banks mapped yet.
    #[must_use]
    pub fn standard() -> Self {
        let mut plane = Self::new();
        plane.insert(Component::Register(Register::new(GP_A, "A")));
        plane.insert(Component::Register(Register::new(GP_B, "B")));
        plane.insert(Component::Register(Register::new(GP_C, "C")));
        plane.insert(Component::Register(Register::new(GP_D, "D")));
        plane.insert(Component::Alu(Alu::new()));
        plane.insert(Component::Controller(Controller::new(&MICROCODE)));
        plane.insert(Component::AddressRegister(AddressRegister::new(PC, "PC")));
        plane.insert(Component::AddressRegister(AddressRegister::new(SP, "SP")));
        plane.insert(Component::AddressRegister(AddressRegister::new(BP, "BP")));
        plane.insert(Component::AddressRegister(AddressRegister::new(SI, "Si")));
        plane.insert(Component::AddressRegister(AddressRegister::new(DI, "Di")));
        plane.insert(Component::AddressRegister(AddressRegister::new(TX, "TX")));
        plane.insert(Component::Memory(Memory::new()));
        plane
    }

    /// Wires a component into its slot, registering its alias.
    pub fn insert(&mut self, component: Component) {
        let id = usize::from(component.id());
        let alias = usize::from(component.alias());
        self.aliases[id] = Some(id);
        self.aliases[alias] = Some(id);
        self.slots[id] = Some(component);
    }

    /// Wires an I/O channel. Channel ids are their own namespace.
    pub fn insert_io(&mut self, channel: IoChannel) {
        self.channels.push(channel);
    }

    /// The shared bus.
    #[must_use]
    pub const fn bus(&self) -> &SystemBus {
        &self.bus
    }

    /// The shared bus, mutably (flag setup, NMI line, run mode).
    pub const fn bus_mut(&mut self) -> &mut SystemBus {
        &mut self.bus
    }

    /// Looks up a component by any of its bus addresses.
    #[must_use]
    pub fn component(&self, id: u8) -> Option<&Component> {
        let slot = (*self.aliases.get(usize::from(id))?)?;
        self.slots[slot].as_ref()
    }

    fn component_mut(&mut self, id: u8) -> Option<&mut Component> {
        let slot = (*self.aliases.get(usize::from(id))?)?;
        self.slots[slot].as_mut()
    }

    /// The 8-bit register at `id`, if one is wired there.
    #[must_use]
    pub fn register(&self, id: u8) -> Option<&Register> {
        match self.component(id)? {
            Component::Register(r) => Some(r),
            _ => None,
        }
    }

    /// Mutable access to the 8-bit register at `id`.
    pub fn register_mut(&mut self, id: u8) -> Option<&mut Register> {
        match self.component_mut(id)? {
            Component::Register(r) => Some(r),
            _ => None,
        }
    }

    /// The address register at `id`, if one is wired there.
    #[must_use]
    pub fn address_register(&self, id: u8) -> Option<&AddressRegister> {
        match self.component(id)? {
            Component::AddressRegister(r) => Some(r),
            _ => None,
        }
    }

    /// Mutable access to the address register at `id`.
    pub fn address_register_mut(&mut self, id: u8) -> Option<&mut AddressRegister> {
        match self.component_mut(id)? {
            Component::AddressRegister(r) => Some(r),
            _ => None,
        }
    }

    /// The memory component.
    #[must_use]
    pub fn memory(&self) -> Option<&Memory> {
        self.slots.iter().flatten().find_map(|c| match c {
            Component::Memory(m) => Some(m),
            _ => None,
        })
    }

    /// Mutable access to the memory component.
    pub fn memory_mut(&mut self) -> Option<&mut Memory> {
        self.slots.iter_mut().flatten().find_map(|c| match c {
            Component::Memory(m) => Some(m),
            _ => None,
        })
    }

    /// The controller.
    #[must_use]
    pub fn controller(&self) -> Option<&Controller> {
        self.slots.iter().flatten().find_map(|c| match c {
            Component::Controller(ctl) => Some(ctl),
            _ => None,
        })
    }

    /// The ALU.
    #[must_use]
    pub fn alu(&self) -> Option<&Alu> {
        self.slots.iter().flatten().find_map(|c| match c {
            Component::Alu(a) => Some(a),
            _ => None,
        })
    }

    /// Installs a program image and resets the machine, the entry point the
    /// external image loader uses.
    ///
    /// # Errors
    ///
    /// Returns the memory fault when the image does not fit the bank map.
    pub fn load_image(
        &mut self,
        addr: u16,
        image: &[u8],
        writable: bool,
    ) -> Result<(), Fault> {
        self.memory_mut()
            .ok_or(Fault::UnmappedAddress { addr })?
            .install(addr, image, writable)?;
        self.reset();
        Ok(())
    }

    /// Resets the bus and every component. Memory contents survive; the run
    /// mode survives; event and instruction accounting restarts.
    pub fn reset(&mut self) {
        self.bus.reset();
        for component in self.slots.iter_mut().flatten() {
            component.reset();
        }
        self.events.clear();
        self.instructions = 0;
    }

    /// One full clock pulse: rising edge, high phase, low phase, across all
    /// components then all channels.
    ///
    /// # Errors
    ///
    /// A fault from any phase aborts the pulse immediately, leaving bus and
    /// register state exactly as the fault found it.
    pub fn cycle(&mut self) -> Result<(), Fault> {
        for component in self.slots.iter_mut().flatten() {
            component.on_rising_edge(&mut self.bus)?;
        }
        for channel in &mut self.channels {
            channel.on_rising_edge(&mut self.bus);
        }
        for component in self.slots.iter_mut().flatten() {
            component.on_high_clock(&mut self.bus)?;
        }
        for channel in &mut self.channels {
            channel.on_high_clock(&mut self.bus);
        }
        for component in self.slots.iter_mut().flatten() {
            component.on_low_clock(&mut self.bus)?;
        }
        for event in self.bus.take_events() {
            if event == Event::AfterInstruction {
                self.instructions += 1;
            }
            self.events.push(event);
        }
        Ok(())
    }

    /// Pulses the clock until the machine halts or suspends, returning the
    /// number of pulses driven.
    ///
    /// # Errors
    ///
    /// Propagates the first fault; the machine must be reset before it can
    /// run again.
    pub fn run(&mut self) -> Result<u64, Fault> {
        self.bus.clear_suspend();
        let mut cycles = 0;
        loop {
            self.cycle()?;
            cycles += 1;
            if self.bus.halted() || self.bus.suspended() {
                return Ok(cycles);
            }
        }
    }

    /// Sets the program counter and runs, the `run from address` command of
    /// front-ends.
    ///
    /// # Errors
    ///
    /// Propagates the first fault raised while running.
    pub fn run_from(&mut self, addr: u16) -> Result<u64, Fault> {
        if let Some(pc) = self.address_register_mut(PC) {
            pc.set_value(addr);
        }
        self.run()
    }

    /// Drives exactly `count` pulses.
    ///
    /// # Errors
    ///
    /// Propagates the first fault raised.
    pub fn run_for(&mut self, count: u64) -> Result<(), Fault> {
        for _ in 0..count {
            self.cycle()?;
        }
        Ok(())
    }

    /// Events observed since the last drain, in emission order.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Instructions completed since the last reset.
    #[must_use]
    pub const fn instructions(&self) -> u64 {
        self.instructions
    }
}

#[cfg(test)]
mod tests {
    use super::Backplane;
    use crate::bus::RunMode;
    use crate::component::{GP_A, GP_B, IR, LHS, MEM, PC, RHS, SI};
    use crate::microcode::opcodes::{HLT, MOV_A_IMM};

    fn machine_with_ram() -> Backplane {
        let mut plane = Backplane::standard();
        plane
            .memory_mut()
            .expect("memory wired")
            .add(0x0000, 0x1000, true)
            .expect("empty map");
        plane
    }

    #[test]
    fn alias_lookup_reaches_dual_role_components() {
        let plane = Backplane::standard();
        assert!(plane.component(IR).is_some());
        assert!(plane.component(MEM).is_some());
        assert!(plane.component(LHS).is_some());
        assert_eq!(
            plane.component(RHS).map(crate::component::Component::id),
            Some(RHS)
        );
        assert!(plane.register(GP_B).is_some());
        assert!(plane.address_register(SI).is_some());
    }

    #[test]
    fn load_store_scenario_counts_instructions() {
        let mut plane = machine_with_ram();
        plane
            .load_image(0x0000, &[MOV_A_IMM, 0x55, HLT], true)
            .expect("image fits");

        let cycles = plane.run().expect("clean run");
        assert_eq!(cycles, 7);
        assert!(plane.bus().halted());
        assert_eq!(plane.register(GP_A).expect("wired").byte(), 0x55);
        assert_eq!(plane.instructions(), 2);
    }

    #[test]
    fn reset_replays_the_stream_identically() {
        let mut plane = machine_with_ram();
        plane
            .load_image(0x0000, &[MOV_A_IMM, 0x55, HLT], true)
            .expect("image fits");
        plane.run().expect("first run");

        plane.reset();
        assert_eq!(plane.address_register(PC).expect("wired").value(), 0);
        let cycles = plane.run().expect("second run");
        assert_eq!(cycles, 7);
        assert_eq!(plane.instructions(), 2);
        assert_eq!(plane.register(GP_A).expect("wired").byte(), 0x55);
    }

    #[test]
    fn break_at_clock_suspends_after_one_pulse() {
        let mut plane = machine_with_ram();
        plane
            .load_image(0x0000, &[MOV_A_IMM, 0x55, HLT], true)
            .expect("image fits");
        plane.bus_mut().set_run_mode(RunMode::BreakAtClock);

        assert_eq!(plane.run().expect("suspended"), 1);
        assert!(plane.bus().suspended());
        assert!(!plane.bus().halted());
    }
}
