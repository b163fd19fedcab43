//! 16-bit interval timer.
//!
//! The counter decrements once per counted event while Start is set. A tick
//! that finds the counter already at zero is an underflow: the counter is
//! reloaded from the latch, so a latch of N gives a period of N+1 events.

/// Control register bit: timer running.
pub const START: u8 = 0x01;
/// Control register bit: underflow appears on the port B pin.
pub const PB_ON: u8 = 0x02;
/// Control register bit: port B pin toggles (1) or pulses (0) on underflow.
pub const TOGGLE: u8 = 0x04;
/// Control register bit: stop after the next underflow.
pub const ONE_SHOT: u8 = 0x08;
/// Control register bit: strobe, copy latch into counter. Never stored.
pub const FORCE_LOAD: u8 = 0x10;

/// What the timer counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountSource {
    /// System clock cycles.
    Phi2,
    /// Positive edges on the CNT pin.
    Cnt,
    /// Timer A underflows (Timer B only).
    TimerA,
    /// Timer A underflows while CNT is high (Timer B only).
    TimerAWithCnt,
}

/// Decoded control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerControl {
    pub start: bool,
    pub one_shot: bool,
    pub toggle: bool,
    pub pb_on: bool,
    pub source: CountSource,
}

/// Which of the two timers this is. Timer B has a two-bit count source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerId {
    A,
    B,
}

/// A CIA interval timer.
#[derive(Debug, Clone)]
pub struct Timer {
    id: TimerId,
    counter: u16,
    latch: u16,
    control: TimerControl,
    /// Control bits this model does not interpret, kept for read-back.
    extra_bits: u8,
    /// Sticky underflow flag, cleared by `acknowledge()`.
    underflow: bool,
    /// ICR mask bit for this timer.
    interrupt_enable: bool,
    /// Port B output pin state.
    output: bool,
}

impl Timer {
    /// Power-on state: stopped, counter and latch at $FFFF.
    #[must_use]
    pub fn new(id: TimerId) -> Self {
        Self {
            id,
            counter: 0xFFFF,
            latch: 0xFFFF,
            control: TimerControl {
                start: false,
                one_shot: false,
                toggle: false,
                pb_on: false,
                source: CountSource::Phi2,
            },
            extra_bits: 0,
            underflow: false,
            interrupt_enable: false,
            output: false,
        }
    }

    /// Set the latch low byte.
    pub fn write_latch_lo(&mut self, value: u8) {
        self.latch = (self.latch & 0xFF00) | u16::from(value);
    }

    /// Set the latch high byte. A stopped timer also loads its counter.
    pub fn write_latch_hi(&mut self, value: u8) {
        self.latch = (self.latch & 0x00FF) | (u16::from(value) << 8);
        if !self.control.start {
            self.counter = self.latch;
        }
    }

    /// Decode a control register write.
    pub fn write_control(&mut self, value: u8) {
        let was_running = self.control.start;
        let source = match (self.id, (value >> 5) & 0x03) {
            (TimerId::A, bits) if bits & 0x01 == 0 => CountSource::Phi2,
            (TimerId::A, _) => CountSource::Cnt,
            (TimerId::B, 0) => CountSource::Phi2,
            (TimerId::B, 1) => CountSource::Cnt,
            (TimerId::B, 2) => CountSource::TimerA,
            (TimerId::B, _) => CountSource::TimerAWithCnt,
        };
        self.control = TimerControl {
            start: value & START != 0,
            one_shot: value & ONE_SHOT != 0,
            toggle: value & TOGGLE != 0,
            pb_on: value & PB_ON != 0,
            source,
        };
        self.extra_bits = match self.id {
            TimerId::A => value & 0xC0,
            TimerId::B => value & 0x80,
        };
        if value & FORCE_LOAD != 0 {
            self.counter = self.latch;
        }
        if self.control.start && !was_running && self.control.toggle {
            self.output = true;
        }
    }

    /// Control register as read back by software. The strobe reads as 0.
    #[must_use]
    pub fn control_byte(&self) -> u8 {
        let c = self.control;
        let source_bits = match c.source {
            CountSource::Phi2 => 0x00,
            CountSource::Cnt => 0x20,
            CountSource::TimerA => 0x40,
            CountSource::TimerAWithCnt => 0x60,
        };
        u8::from(c.start)
            | (u8::from(c.pb_on) << 1)
            | (u8::from(c.toggle) << 2)
            | (u8::from(c.one_shot) << 3)
            | source_bits
            | self.extra_bits
    }

    #[must_use]
    pub fn control(&self) -> TimerControl {
        self.control
    }

    /// Advance by one system clock cycle. Returns true on underflow.
    ///
    /// Only counts when the source is Phi2. The CNT pin is not connected,
    /// so CNT-sourced timers never count.
    pub fn tick(&mut self) -> bool {
        if self.control.source == CountSource::Phi2 {
            self.count()
        } else {
            false
        }
    }

    /// Feed one Timer A underflow. Returns true if this timer underflowed.
    ///
    /// With CNT unconnected the pin floats high, so both cascade modes
    /// count every Timer A underflow.
    pub fn cascade(&mut self) -> bool {
        match self.control.source {
            CountSource::TimerA | CountSource::TimerAWithCnt => self.count(),
            CountSource::Phi2 | CountSource::Cnt => false,
        }
    }

    fn count(&mut self) -> bool {
        if !self.control.start {
            return false;
        }
        if !self.control.toggle {
            self.output = false;
        }
        if self.counter > 0 {
            self.counter -= 1;
            return false;
        }

        self.underflow = true;
        self.counter = self.latch;
        self.output = if self.control.toggle {
            !self.output
        } else {
            true
        };
        if self.control.one_shot {
            self.control.start = false;
        }
        true
    }

    /// Live counter value.
    #[must_use]
    pub fn counter(&self) -> u16 {
        self.counter
    }

    #[must_use]
    pub fn latch(&self) -> u16 {
        self.latch
    }

    /// True if the timer has underflowed since the last acknowledge.
    #[must_use]
    pub fn underflowed(&self) -> bool {
        self.underflow
    }

    /// Clear the sticky underflow flag.
    pub fn acknowledge(&mut self) {
        self.underflow = false;
    }

    pub fn set_interrupt_enable(&mut self, enabled: bool) {
        self.interrupt_enable = enabled;
    }

    #[must_use]
    pub fn interrupt_enable(&self) -> bool {
        self.interrupt_enable
    }

    /// Interrupt request output: an unacknowledged underflow with
    /// InterruptEnable set.
    #[must_use]
    pub fn irq_requested(&self) -> bool {
        self.underflow && self.interrupt_enable
    }

    /// Port B pin state driven by underflows.
    #[must_use]
    pub fn output(&self) -> bool {
        self.output
    }
}
