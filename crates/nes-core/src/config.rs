//! Machine configuration
//!
//! Every timing quantity in the core is expressed in master clock ticks. The
//! region fixes how many ticks one CPU cycle and one PPU dot take.

/// Television standard the machine runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    #[default]
    Ntsc,
    Pal,
}

impl Region {
    /// Master clocks per CPU cycle
    pub const fn cpu_divider(self) -> u64 {
        match self {
            Region::Ntsc => 12,
            Region::Pal => 16,
        }
    }

    /// Master clocks per PPU dot
    pub const fn ppu_divider(self) -> u64 {
        match self {
            Region::Ntsc => 4,
            Region::Pal => 5,
        }
    }

    /// Total scanlines per frame, pre-render line included
    pub const fn scanlines(self) -> u16 {
        match self {
            Region::Ntsc => 262,
            Region::Pal => 312,
        }
    }

    /// Index of the pre-render scanline
    pub const fn pre_render_line(self) -> u16 {
        self.scanlines() - 1
    }

    /// Only NTSC drops a dot on odd frames
    pub const fn skips_odd_dot(self) -> bool {
        matches!(self, Region::Ntsc)
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Region::Ntsc => 0,
            Region::Pal => 1,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Region::Ntsc),
            1 => Some(Region::Pal),
            _ => None,
        }
    }
}

impl std::str::FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ntsc" => Ok(Region::Ntsc),
            "pal" => Ok(Region::Pal),
            other => Err(format!("unknown region '{}'", other)),
        }
    }
}

/// Power-on configuration for [`crate::system::NesSystem`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub region: Region,
    /// Run the PPU warm-up frame after power-on (register writes ignored)
    pub warm_up: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: Region::Ntsc,
            warm_up: true,
        }
    }
}
