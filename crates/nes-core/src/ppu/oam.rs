//! Sprite memory and per-scanline sprite evaluation

/// Visible sprites per scanline
pub const SLOTS: usize = 8;

/// One sprite loaded for the next scanline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpriteSlot {
    pub x: u8,
    pub attributes: u8,
    /// Pattern bits with horizontal flip already applied
    pub low: u8,
    pub high: u8,
}

impl SpriteSlot {
    /// 2-bit colour of the sprite at screen column `x`, 0 if transparent
    #[inline]
    pub fn pixel(&self, x: u8) -> u8 {
        let offset = x.wrapping_sub(self.x);
        if offset >= 8 {
            return 0;
        }
        let shift = 7 - offset;
        (((self.high >> shift) & 1) << 1) | ((self.low >> shift) & 1)
    }

    pub fn palette(&self) -> u8 {
        self.attributes & 0x03
    }

    pub fn behind_background(&self) -> bool {
        self.attributes & 0x20 != 0
    }
}

/// Primary OAM plus the evaluation working buffers
#[derive(Debug, Clone)]
pub struct Oam {
    pub ram: [u8; 256],
    pub secondary: [u8; SLOTS * 4],
    /// Sprites found by the last evaluation
    pub found: usize,
    /// Sprite 0 is among the found sprites
    pub zero_found: bool,
    /// Sprites being drawn on the current scanline
    pub slots: [SpriteSlot; SLOTS],
    pub active: usize,
    pub zero_active: bool,
}

impl Default for Oam {
    fn default() -> Self {
        Self {
            ram: [0; 256],
            secondary: [0xFF; SLOTS * 4],
            found: 0,
            zero_found: false,
            slots: [SpriteSlot::default(); SLOTS],
            active: 0,
            zero_active: false,
        }
    }
}

impl Oam {
    /// Select the sprites of the line after `line` and return the overflow flag
    ///
    /// Once eight sprites are found the hardware keeps scanning for a ninth,
    /// but it increments the byte index along with the sprite index, so it
    /// compares tile numbers, attributes and X positions against the scanline
    /// as if they were Y coordinates. That diagonal walk is reproduced here,
    /// false positives and misses included.
    pub fn evaluate(&mut self, line: u16, height: u16) -> bool {
        self.secondary = [0xFF; SLOTS * 4];
        self.found = 0;
        self.zero_found = false;

        let in_range = |y: u8| {
            let row = line.wrapping_sub(y as u16);
            row < height
        };

        let mut m = 0;
        for n in 0..64 {
            if self.found < SLOTS {
                let base = n * 4;
                if in_range(self.ram[base]) {
                    let slot = self.found * 4;
                    self.secondary[slot..slot + 4].copy_from_slice(&self.ram[base..base + 4]);
                    if n == 0 {
                        self.zero_found = true;
                    }
                    self.found += 1;
                }
            } else {
                if in_range(self.ram[n * 4 + m]) {
                    return true;
                }
                m = (m + 1) & 3;
            }
        }
        false
    }

    /// Forget the sprites of the current line
    pub fn clear_slots(&mut self) {
        self.active = 0;
        self.zero_active = false;
    }

    /// First opaque sprite pixel at `x`: (colour, slot)
    #[inline]
    pub fn sprite_pixel(&self, x: u8) -> Option<(u8, usize)> {
        self.slots[..self.active]
            .iter()
            .enumerate()
            .find_map(|(i, slot)| match slot.pixel(x) {
                0 => None,
                colour => Some((colour, i)),
            })
    }
}
