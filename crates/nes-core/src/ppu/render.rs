//! Frame timeline: phase machine, fetch pipeline and pixel compositing
//!
//! Each [`Phase`] owns a span of the frame. Its handler runs dots until
//! either the span ends (it records the next phase and returns) or the
//! caller's target clock is reached (the phase stays put and resumes on the
//! next [`Ppu::update`]).

use super::oam::SpriteSlot;
use super::{palette_index, Ppu, PpuMask, PpuStatus, DOTS_PER_LINE, SCREEN_HEIGHT, SCREEN_WIDTH};

/// Position in the per-frame timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// First frame after power or reset: no output, most writes ignored
    WarmUp,
    /// Dummy scanline that primes the fetch pipeline
    PreRender,
    /// Dots 0-256 of a visible scanline
    Visible,
    /// Dots 257-340 of a visible scanline: sprite fetch and tile prefetch
    HBlank,
    /// Scanline 240
    PostRender,
    /// Scanline 241 up to the vblank flag
    VBlankIn,
    VBlank,
}

type PhaseFn = fn(&mut Ppu, u64);

/// Jump table indexed by `Phase as usize`
pub(super) const PHASES: [PhaseFn; 7] = [warm_up, pre_render, visible, hblank, post_render, vblank_in, vblank];

/// First scanline of vertical blank
const VBLANK_LINE: u16 = 241;

fn warm_up(ppu: &mut Ppu, target: u64) {
    let pre = ppu.region.pre_render_line();
    while ppu.cycles < target {
        match (ppu.scanline, ppu.dot) {
            (VBLANK_LINE, 0) => {
                ppu.frame_end = Some(ppu.cycles);
                ppu.next_dot();
            }
            (VBLANK_LINE, 1) => {
                ppu.status.set(PpuStatus::VBLANK, true);
                ppu.next_dot();
            }
            (line, _) if line == pre => {
                ppu.phase = Phase::PreRender;
                return;
            }
            (line, _) if line < VBLANK_LINE => {
                ppu.skip_to(target, VBLANK_LINE, 0);
            }
            _ => {
                ppu.skip_to(target, pre, 0);
            }
        }
    }
}

fn pre_render(ppu: &mut Ppu, target: u64) {
    while ppu.cycles < target {
        let dot = ppu.dot;
        if dot == 1 {
            ppu.status.set(
                PpuStatus::VBLANK | PpuStatus::SPRITE_ZERO_HIT | PpuStatus::SPRITE_OVERFLOW,
                false,
            );
        }
        let rendering = ppu.mask.rendering();
        if rendering {
            ppu.fetch_background(dot);
            if (280..=304).contains(&dot) {
                ppu.copy_y();
            }
            if (257..=320).contains(&dot) {
                ppu.oam_addr = 0;
            }
        }
        if dot == 257 {
            ppu.oam.clear_slots();
        }

        let last = if rendering && ppu.odd_frame && ppu.region.skips_odd_dot() {
            DOTS_PER_LINE - 2
        } else {
            DOTS_PER_LINE - 1
        };
        ppu.next_dot();
        if dot >= last {
            ppu.scanline = 0;
            ppu.dot = 0;
            ppu.frame += 1;
            ppu.odd_frame = !ppu.odd_frame;
            ppu.phase = Phase::Visible;
            return;
        }
    }
}

fn visible(ppu: &mut Ppu, target: u64) {
    while ppu.cycles < target {
        let dot = ppu.dot;
        if dot > SCREEN_WIDTH as u16 {
            ppu.phase = Phase::HBlank;
            return;
        }
        if dot > 0 {
            let rendering = ppu.mask.rendering();
            if rendering {
                ppu.fetch_background(dot);
            }
            ppu.render_pixel(dot - 1);
            if dot == SCREEN_WIDTH as u16 && rendering {
                let height = ppu.ctrl.sprite_height();
                if ppu.oam.evaluate(ppu.scanline, height) {
                    ppu.status.set(PpuStatus::SPRITE_OVERFLOW, true);
                }
            }
        }
        ppu.next_dot();
    }
}

fn hblank(ppu: &mut Ppu, target: u64) {
    while ppu.cycles < target {
        let dot = ppu.dot;
        if dot == 257 {
            ppu.oam.clear_slots();
        }
        if ppu.mask.rendering() {
            ppu.fetch_background(dot);
            if (257..=320).contains(&dot) {
                ppu.oam_addr = 0;
                if (dot - 257) & 7 == 7 {
                    ppu.fetch_sprite(((dot - 257) / 8) as usize);
                }
            }
        }
        ppu.next_dot();
        if dot == DOTS_PER_LINE - 1 {
            ppu.scanline += 1;
            ppu.dot = 0;
            ppu.phase = if ppu.scanline == SCREEN_HEIGHT as u16 {
                Phase::PostRender
            } else {
                Phase::Visible
            };
            return;
        }
    }
}

fn post_render(ppu: &mut Ppu, target: u64) {
    if ppu.skip_to(target, VBLANK_LINE, 0) {
        ppu.phase = Phase::VBlankIn;
    }
}

fn vblank_in(ppu: &mut Ppu, target: u64) {
    while ppu.cycles < target {
        match ppu.dot {
            0 => {
                ppu.frame_end = Some(ppu.cycles);
                ppu.next_dot();
            }
            1 => {
                if !ppu.suppress_vblank {
                    ppu.status.set(PpuStatus::VBLANK, true);
                    if ppu.ctrl.nmi_enable() {
                        ppu.nmi = Some(ppu.cycles);
                    }
                }
                ppu.suppress_vblank = false;
                ppu.next_dot();
            }
            _ => {
                ppu.phase = Phase::VBlank;
                return;
            }
        }
    }
}

fn vblank(ppu: &mut Ppu, target: u64) {
    let pre = ppu.region.pre_render_line();
    if ppu.skip_to(target, pre, 0) {
        ppu.phase = Phase::PreRender;
    }
}

impl Ppu {
    #[inline]
    fn next_dot(&mut self) {
        self.cycles += self.dot_clock;
        self.dot += 1;
    }

    /// Run idle dots toward (`line`, `dot`) without passing `target`
    ///
    /// Returns true once the position is reached.
    fn skip_to(&mut self, target: u64, line: u16, dot: u16) -> bool {
        let here = self.scanline as u64 * DOTS_PER_LINE as u64 + self.dot as u64;
        let goal = line as u64 * DOTS_PER_LINE as u64 + dot as u64;
        if here >= goal {
            return true;
        }
        let budget = (target.saturating_sub(self.cycles) + self.dot_clock - 1) / self.dot_clock;
        let step = budget.min(goal - here);
        self.cycles += step * self.dot_clock;
        let here = here + step;
        self.scanline = (here / DOTS_PER_LINE as u64) as u16;
        self.dot = (here % DOTS_PER_LINE as u64) as u16;
        here == goal
    }

    /// One dot of the background pipeline
    ///
    /// Over each 8-dot group the PPU fetches the nametable byte, the attribute
    /// byte and both pattern planes, then moves to the next tile column.
    fn fetch_background(&mut self, dot: u16) {
        if (1..=257).contains(&dot) || (321..=337).contains(&dot) {
            if dot != 1 && dot != 321 {
                self.shift_background();
            }
            match (dot - 1) & 7 {
                0 => {
                    self.load_shifters();
                    self.bg.nametable = self.vram_read(0x2000 | (self.v & 0x0FFF));
                }
                2 => {
                    let v = self.v;
                    let address = 0x23C0 | (v & 0x0C00) | ((v >> 4) & 0x38) | ((v >> 2) & 0x07);
                    let shift = ((v >> 4) & 0x04) | (v & 0x02);
                    self.bg.attribute = (self.vram_read(address) >> shift) & 0x03;
                }
                4 => {
                    let address = self.bg_pattern_address();
                    self.bg.low = self.vram_read(address);
                }
                6 => {
                    let address = self.bg_pattern_address() + 8;
                    self.bg.high = self.vram_read(address);
                }
                7 => self.increment_x(),
                _ => {}
            }
        }
        match dot {
            256 => self.increment_y(),
            257 => self.copy_x(),
            _ => {}
        }
    }

    fn bg_pattern_address(&self) -> u16 {
        self.ctrl.bg_table() + self.bg.nametable as u16 * 16 + ((self.v >> 12) & 0x07)
    }

    fn shift_background(&mut self) {
        self.bg.pattern_low <<= 1;
        self.bg.pattern_high <<= 1;
        self.bg.attribute_low <<= 1;
        self.bg.attribute_high <<= 1;
    }

    fn load_shifters(&mut self) {
        let fill = |bit: bool| if bit { 0x00FF } else { 0x0000 };
        self.bg.pattern_low = (self.bg.pattern_low & 0xFF00) | self.bg.low as u16;
        self.bg.pattern_high = (self.bg.pattern_high & 0xFF00) | self.bg.high as u16;
        self.bg.attribute_low = (self.bg.attribute_low & 0xFF00) | fill(self.bg.attribute & 1 != 0);
        self.bg.attribute_high = (self.bg.attribute_high & 0xFF00) | fill(self.bg.attribute & 2 != 0);
    }

    pub(super) fn increment_x(&mut self) {
        if self.v & 0x001F == 31 {
            self.v &= !0x001F;
            self.v ^= 0x0400;
        } else {
            self.v += 1;
        }
    }

    pub(super) fn increment_y(&mut self) {
        if self.v & 0x7000 != 0x7000 {
            self.v += 0x1000;
            return;
        }
        self.v &= !0x7000;
        let mut coarse_y = (self.v & 0x03E0) >> 5;
        if coarse_y == 29 {
            coarse_y = 0;
            self.v ^= 0x0800;
        } else if coarse_y == 31 {
            coarse_y = 0;
        } else {
            coarse_y += 1;
        }
        self.v = (self.v & !0x03E0) | (coarse_y << 5);
    }

    fn copy_x(&mut self) {
        self.v = (self.v & !0x041F) | (self.t & 0x041F);
    }

    fn copy_y(&mut self) {
        self.v = (self.v & !0x7BE0) | (self.t & 0x7BE0);
    }

    /// Load sprite slot `slot` for the next scanline from secondary OAM
    fn fetch_sprite(&mut self, slot: usize) {
        if slot >= self.oam.found {
            return;
        }
        let height = self.ctrl.sprite_height();
        let entry = &self.oam.secondary[slot * 4..slot * 4 + 4];
        let (y, tile, attributes, x) = (entry[0], entry[1], entry[2], entry[3]);

        let mut row = self.scanline.wrapping_sub(y as u16) & (height - 1);
        if attributes & 0x80 != 0 {
            row = height - 1 - row;
        }
        let address = if height == 16 {
            let table = (tile as u16 & 1) * 0x1000;
            let tile = (tile & 0xFE) as u16 + (row >> 3);
            table + tile * 16 + (row & 7)
        } else {
            self.ctrl.sprite_table() + tile as u16 * 16 + row
        };

        let mut low = self.vram_read(address);
        let mut high = self.vram_read(address + 8);
        if attributes & 0x40 != 0 {
            low = low.reverse_bits();
            high = high.reverse_bits();
        }
        self.oam.slots[slot] = SpriteSlot {
            x,
            attributes,
            low,
            high,
        };
        self.oam.active = slot + 1;
        if slot == 0 {
            self.oam.zero_active = self.oam.zero_found;
        }
    }

    /// Composite the pixel at column `x` of the current scanline
    fn render_pixel(&mut self, x: u16) {
        let index = if self.mask.rendering() {
            self.composite(x)
        } else if self.v & 0x3F00 == 0x3F00 {
            // rendering off with v in palette space shows that entry
            palette_index(self.v)
        } else {
            0
        };
        let colour = self.palette[index] & self.mask.colour_mask();
        let y = self.scanline as usize;
        self.output[y * SCREEN_WIDTH + x as usize] = colour as u16 | self.mask.emphasis();
    }

    fn composite(&mut self, x: u16) -> usize {
        let mask = self.mask.bits();
        let (bg_colour, bg_palette) = if self.mask.render_background() && (x >= 8 || mask & PpuMask::BG_LEFT != 0) {
            let bit = 0x8000 >> self.fine_x;
            let plane = |reg: u16| (reg & bit != 0) as u8;
            (
                plane(self.bg.pattern_high) << 1 | plane(self.bg.pattern_low),
                plane(self.bg.attribute_high) << 1 | plane(self.bg.attribute_low),
            )
        } else {
            (0, 0)
        };

        let sprite = if self.mask.render_sprites() && (x >= 8 || mask & PpuMask::SPR_LEFT != 0) {
            self.oam.sprite_pixel(x as u8)
        } else {
            None
        };

        let background = (bg_palette << 2 | bg_colour) as usize;
        match sprite {
            None => {
                if bg_colour == 0 {
                    0
                } else {
                    background
                }
            }
            Some((colour, slot)) => {
                let sprite = self.oam.slots[slot];
                let foreground = (0x10 | sprite.palette() << 2 | colour) as usize;
                if bg_colour == 0 {
                    return foreground;
                }
                if slot == 0 && self.oam.zero_active && x != 255 {
                    self.status.set(PpuStatus::SPRITE_ZERO_HIT, true);
                }
                if sprite.behind_background() {
                    background
                } else {
                    foreground
                }
            }
        }
    }
}
