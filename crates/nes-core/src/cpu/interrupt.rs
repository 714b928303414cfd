//! Interrupt deadlines
//!
//! NMI and IRQ are tracked as absolute master-clock deadlines. A deadline of
//! [`NEVER`] means nothing is pending. Asserting a line schedules the deadline
//! one CPU cycle after the assertion, which models the 6502 polling the lines
//! during the last cycle of an instruction.

/// Sentinel for "no interrupt pending"
pub const NEVER: u64 = u64::MAX;

/// Independent IRQ sources; the IRQ input is the OR of all of them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IrqLine {
    External = 0x01,
    FrameCounter = 0x40,
    Dmc = 0x80,
}

/// Interrupt line state shared between the CPU and the devices driving it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interrupt {
    pub(crate) nmi_clock: u64,
    pub(crate) irq_clock: u64,
    pub(crate) irq_lines: u8,
    /// Master clocks per CPU cycle
    pub(crate) latency: u64,
    pub(crate) jammed: bool,
}

impl Interrupt {
    pub fn new(latency: u64) -> Self {
        Self {
            nmi_clock: NEVER,
            irq_clock: NEVER,
            irq_lines: 0,
            latency,
            jammed: false,
        }
    }

    /// Signal an NMI edge at master clock `cycle`
    pub fn do_nmi(&mut self, cycle: u64) {
        if !self.jammed && self.nmi_clock == NEVER {
            self.nmi_clock = cycle.saturating_add(self.latency);
        }
    }

    /// Raise one IRQ source at master clock `cycle`
    pub fn do_irq(&mut self, line: IrqLine, cycle: u64) {
        self.irq_lines |= line as u8;
        if !self.jammed && self.irq_clock == NEVER {
            self.irq_clock = cycle.saturating_add(self.latency);
        }
    }

    /// Release one IRQ source; the deadline is dropped once no source is left
    pub fn clear_irq(&mut self, line: IrqLine) {
        self.irq_lines &= !(line as u8);
        if self.irq_lines == 0 {
            self.irq_clock = NEVER;
        }
    }

    pub fn irq_lines(&self) -> u8 {
        self.irq_lines
    }

    pub fn nmi_pending(&self) -> bool {
        self.nmi_clock != NEVER
    }

    pub fn is_jammed(&self) -> bool {
        self.jammed
    }

    pub(crate) fn nmi_due(&self, cycle: u64) -> bool {
        self.nmi_clock <= cycle
    }

    pub(crate) fn irq_due(&self, cycle: u64) -> bool {
        self.irq_clock <= cycle
    }

    /// Shift pending deadlines back by `frame` master clocks
    pub(crate) fn rebase(&mut self, frame: u64) {
        if self.nmi_clock != NEVER {
            self.nmi_clock = self.nmi_clock.saturating_sub(frame);
        }
        if self.irq_clock != NEVER {
            self.irq_clock = self.irq_clock.saturating_sub(frame);
        }
    }

    pub(crate) fn reset(&mut self) {
        self.nmi_clock = NEVER;
        self.irq_clock = NEVER;
        self.irq_lines = 0;
        self.jammed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_irq_is_level_triggered() {
        let mut int = Interrupt::new(12);
        int.do_irq(IrqLine::External, 100);
        int.do_irq(IrqLine::Dmc, 200);
        assert_eq!(int.irq_clock, 112);

        int.clear_irq(IrqLine::External);
        assert!(int.irq_due(112));
        int.clear_irq(IrqLine::Dmc);
        assert_eq!(int.irq_clock, NEVER);
    }

    #[test]
    fn test_nmi_latency() {
        let mut int = Interrupt::new(12);
        int.do_nmi(24);
        assert!(!int.nmi_due(35));
        assert!(int.nmi_due(36));
    }

    #[test]
    fn test_jam_suppresses() {
        let mut int = Interrupt::new(12);
        int.jammed = true;
        int.do_nmi(0);
        int.do_irq(IrqLine::External, 0);
        assert!(!int.nmi_pending());
        assert_eq!(int.irq_clock, NEVER);
    }

    #[test]
    fn test_rebase() {
        let mut int = Interrupt::new(12);
        int.do_nmi(1000);
        int.rebase(900);
        assert_eq!(int.nmi_clock, 112);
        assert_eq!(int.irq_clock, NEVER);
    }
}
