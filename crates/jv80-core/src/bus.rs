//! The shared system bus: address/data lines, processor flags, and the
//! control signals every component reacts to.

/// `FLAGS` bit for a zero result.
pub const FLAG_Z: u8 = 0x01;
/// `FLAGS` bit for carry out / borrow.
pub const FLAG_C: u8 = 0x02;
/// `FLAGS` bit for signed two's-complement overflow.
pub const FLAG_V: u8 = 0x04;
/// `FLAGS` bit for a negative result (bit 7 of the result set).
pub const FLAG_N: u8 = 0x08;

/// Transfer op-flag: no modifier.
pub const OP_NONE: u8 = 0x00;
/// Transfer op-flag: post-increment the driving address register.
pub const OP_INC: u8 = 0x01;
/// Transfer op-flag: the I/O channel drives the register (input transfer).
pub const OP_IO_IN: u8 = 0x01;
/// Transfer op-flag: pre-decrement the driving address register.
pub const OP_DEC: u8 = 0x02;
/// Transfer op-flag: the latching address register adds the signed data byte
/// to its current value instead of overwriting it.
pub const OP_IDX: u8 = 0x04;
/// Transfer op-flag: an address-register step updates the Z/C flags.
pub const OP_FLAGS: u8 = 0x04;
/// Transfer op-flag: select the high byte of a 16-bit value.
pub const OP_MSB: u8 = 0x08;
/// Transfer op-flag: halt the machine (`OTHER` action only).
pub const OP_HALT: u8 = 0x08;
/// Transfer op-flag: the register drives the I/O channel (output transfer).
pub const OP_IO_OUT: u8 = 0x08;
/// Mask selecting the op-flag nibble that travels on the bus.
pub const OP_MASK: u8 = 0x0F;
/// Marks the last step of a microcode step sequence. Never put on the bus.
pub const OP_DONE: u8 = 0x10;

/// Which kind of transfer is currently latched on the bus.
///
/// Exactly one transfer command can be active at a time; a new command
/// replaces the previous one, and a standing command keeps being served by
/// the addressed components on every edge until it is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BusCommand {
    /// No transfer in progress (power-on / reset state).
    #[default]
    Idle,
    /// Byte transfer over the data lines (`xdata`).
    Data,
    /// 16-bit transfer split over data (LSB) and address (MSB) lines
    /// (`xaddr`).
    Addr,
    /// Peripheral I/O transfer between a register and a channel (`io`).
    Io,
}

/// How the clock driver advances the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunMode {
    /// Run freely until a `HLT` executes.
    #[default]
    Continuous,
    /// Suspend at the next instruction boundary.
    BreakAtInstruction,
    /// Suspend after every clock pulse.
    BreakAtClock,
}

/// Observable machine events, queued on the bus and drained by the
/// [`Backplane`](crate::Backplane) once per pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Event {
    /// The controller advanced its micro-step counter.
    StepChanged,
    /// The executing instruction's operand constant fully resolved.
    ValueChanged,
    /// An instruction completed. Emitted exactly once per instruction,
    /// including for `HLT` itself.
    AfterInstruction,
}

/// The shared wiring backplane of the machine.
///
/// Carries the 8-bit data bus, the 8-bit address-high bus, the processor
/// flags, and the halt / suspend / NMI control lines. A transfer command
/// names the driving component (`get`), the latching component (`put`) and
/// an op-flag nibble; at most one component drives each line per micro-op,
/// which the controller guarantees by issuing a single command per step.
#[derive(Debug, Default)]
pub struct SystemBus {
    data_bus: u8,
    addr_bus: u8,
    get: u8,
    put: u8,
    op: u8,
    command: BusCommand,
    halted: bool,
    suspended: bool,
    nmi: bool,
    flags: u8,
    run_mode: RunMode,
    events: Vec<Event>,
}

impl SystemBus {
    /// Creates an idle bus with all lines released.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value currently latched on the data lines.
    #[must_use]
    pub const fn read_data_bus(&self) -> u8 {
        self.data_bus
    }

    /// Drives the data lines. Only the component addressed as the current
    /// source may call this during a pulse.
    pub const fn put_on_data_bus(&mut self, value: u8) {
        self.data_bus = value;
    }

    /// Value currently latched on the address-high lines.
    #[must_use]
    pub const fn read_addr_bus(&self) -> u8 {
        self.addr_bus
    }

    /// Drives the address-high lines.
    pub const fn put_on_addr_bus(&mut self, value: u8) {
        self.addr_bus = value;
    }

    /// The transfer command currently standing on the bus.
    #[must_use]
    pub const fn command(&self) -> BusCommand {
        self.command
    }

    /// Component id currently addressed as the transfer source.
    #[must_use]
    pub const fn get_id(&self) -> u8 {
        self.get
    }

    /// Component id currently addressed as the transfer target.
    #[must_use]
    pub const fn put_id(&self) -> u8 {
        self.put
    }

    /// Op-flag nibble of the standing command.
    #[must_use]
    pub const fn opflags(&self) -> u8 {
        self.op
    }

    /// Latches a data-bus transfer command.
    pub const fn xdata(&mut self, src: u8, target: u8, opflags: u8) {
        self.command = BusCommand::Data;
        self.get = src;
        self.put = target;
        self.op = opflags;
    }

    /// Latches a 16-bit transfer command (LSB over data, MSB over address).
    pub const fn xaddr(&mut self, src: u8, target: u8, opflags: u8) {
        self.command = BusCommand::Addr;
        self.get = src;
        self.put = target;
        self.op = opflags;
    }

    /// Latches a peripheral I/O transfer between register `src` and channel
    /// `channel`.
    pub const fn io(&mut self, src: u8, channel: u8, opflags: u8) {
        self.command = BusCommand::Io;
        self.get = src;
        self.put = channel;
        self.op = opflags;
    }

    /// Pulls the halt line: a `HLT` micro-op executed.
    pub const fn stop(&mut self) {
        self.halted = true;
    }

    /// Whether a `HLT` micro-op has executed since the last reset.
    #[must_use]
    pub const fn halted(&self) -> bool {
        self.halted
    }

    /// Requests a cooperative stop of the clock driver, used by the
    /// single-stepping run modes.
    pub const fn suspend(&mut self) {
        self.suspended = true;
    }

    /// Releases the suspend line so the clock driver can resume.
    pub const fn clear_suspend(&mut self) {
        self.suspended = false;
    }

    /// Whether the suspend line is pulled.
    #[must_use]
    pub const fn suspended(&self) -> bool {
        self.suspended
    }

    /// Asserts the non-maskable interrupt line.
    pub const fn set_nmi(&mut self) {
        self.nmi = true;
    }

    /// Releases the non-maskable interrupt line.
    pub const fn clear_nmi(&mut self) {
        self.nmi = false;
    }

    /// Whether the NMI line is asserted. The line is edge-triggered: the
    /// controller clears it as soon as it commits to servicing.
    #[must_use]
    pub const fn nmi_pending(&self) -> bool {
        self.nmi
    }

    /// Raw processor flags byte.
    #[must_use]
    pub const fn flags(&self) -> u8 {
        self.flags
    }

    /// Replaces the whole flags byte, used when popping saved flags.
    pub const fn set_flags(&mut self, flags: u8) {
        self.flags = flags;
    }

    /// Sets or clears one flag bit.
    pub const fn set_flag(&mut self, flag: u8, value: bool) {
        if value {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }

    /// Clears one flag bit.
    pub const fn clear_flag(&mut self, flag: u8) {
        self.set_flag(flag, false);
    }

    /// Clears every processor flag.
    pub const fn clear_flags(&mut self) {
        self.flags = 0;
    }

    /// Whether a flag bit is set.
    #[must_use]
    pub const fn is_set(&self, flag: u8) -> bool {
        (self.flags & flag) != 0
    }

    /// Flags rendered for display, one letter per set flag.
    #[must_use]
    pub fn flags_string(&self) -> String {
        [
            (FLAG_C, 'C'),
            (FLAG_Z, 'Z'),
            (FLAG_V, 'V'),
            (FLAG_N, 'N'),
        ]
        .iter()
        .map(|&(bit, ch)| if self.is_set(bit) { ch } else { '-' })
        .collect()
    }

    /// Current run mode.
    #[must_use]
    pub const fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    /// Selects the run mode. Survives [`reset`](Self::reset).
    pub const fn set_run_mode(&mut self, run_mode: RunMode) {
        self.run_mode = run_mode;
    }

    /// Queues an event for the backplane to drain after the pulse.
    pub fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Removes and returns all queued events.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Releases every line and clears the flags. The run mode is wiring, not
    /// state, and survives.
    pub fn reset(&mut self) {
        let run_mode = self.run_mode;
        *self = Self {
            run_mode,
            ..Self::default()
        };
    }

    /// Latches an arbitrary bus state in one call. Test scaffolding for
    /// exercising single components without a controller.
    pub const fn initialize(
        &mut self,
        command: BusCommand,
        src: u8,
        target: u8,
        opflags: u8,
        data_bus: u8,
        addr_bus: u8,
    ) {
        self.command = command;
        self.get = src;
        self.put = target;
        self.op = opflags;
        self.data_bus = data_bus;
        self.addr_bus = addr_bus;
    }
}
