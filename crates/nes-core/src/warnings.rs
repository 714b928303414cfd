//! Logged-once bookkeeping
//!
//! Conditions such as a jammed CPU or OAM writes during rendering are modeled
//! hardware behavior, not errors. They are reported through `log` once per
//! machine instance.

/// Condition kinds that are reported at most once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Warning {
    CpuJam = 0,
    UnstableOpcode = 1,
    OamWriteWhileRendering = 2,
    WriteOnlyRegisterRead = 3,
    UnsupportedMapper = 4,
}

/// Per-instance bitset of already reported warnings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Warnings(u32);

impl Warnings {
    pub fn new() -> Self {
        Self(0)
    }

    /// Returns true the first time `warning` is seen, false afterwards
    pub fn first(&mut self, warning: Warning) -> bool {
        let bit = 1u32 << warning as u8;
        let fresh = self.0 & bit == 0;
        self.0 |= bit;
        fresh
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_only_once() {
        let mut warnings = Warnings::new();
        assert!(warnings.first(Warning::CpuJam));
        assert!(!warnings.first(Warning::CpuJam));
        assert!(warnings.first(Warning::OamWriteWhileRendering));
    }

    #[test]
    fn test_instances_are_independent() {
        let mut a = Warnings::new();
        let mut b = Warnings::new();
        assert!(a.first(Warning::UnstableOpcode));
        assert!(b.first(Warning::UnstableOpcode));
        a.clear();
        assert!(a.first(Warning::UnstableOpcode));
    }
}
