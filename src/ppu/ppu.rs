use super::palette::PaletteRam;
use super::registers::Registers;
use super::sprites::{SpriteWithAttribute, Tile, build_sprite_grid};
use crate::interrupts::Interrupts;
use crate::ppu_bus::PpuBus;
use crate::ram::Ram;
use std::cell::RefCell;
use std::rc::Rc;

/// Dot-cycles per scanline
const CYCLES_PER_LINE: u64 = 341;
/// Scanline on which the vertical blanking interval begins
const VBLANK_LINE: u16 = 241;
/// Scanlines per field; reaching this wraps the counter and emits a frame
const LINES_PER_FIELD: u16 = 262;
/// Sprite attribute table capacity
const SPRITE_COUNT: u16 = 64;

/// One field's worth of renderable data, handed to the renderer collaborator
pub struct FrameData {
    /// Background tile rows, present only while background rendering is on
    pub background: Option<Vec<Tile>>,
    /// Resolved sprite list, present only while sprite rendering is on
    pub sprites: Option<Vec<SpriteWithAttribute>>,
    /// The 32-entry palette with mirrors resolved
    pub palette: [u8; 0x20],
}

/// Scanline/dot-driven picture processing unit.
///
/// `run` accumulates dot-cycles (three per CPU cycle); every 341 dots one
/// scanline completes, and after 262 scanlines the assembled frame data is
/// returned and the line counter wraps. Tile and sprite bitmaps are built
/// from character memory reached through the picture bus; name tables and
/// the palette are internal.
pub struct Ppu {
    registers: Registers,
    /// Name-table RAM, 2KB behind the mirroring fold
    vram: Ram,
    /// Sprite attribute table: 64 sprites, 4 bytes each
    sprite_ram: Ram,
    palette: PaletteRam,
    bus: PpuBus,
    interrupts: Rc<RefCell<Interrupts>>,
    is_horizontal_mirror: bool,
    cycle: u64,
    line: u16,
    /// Read-ahead latch for buffered video data reads
    vram_read_buffer: u8,
    background: Vec<Tile>,
    sprites: Vec<SpriteWithAttribute>,
}

impl Ppu {
    pub fn new(bus: PpuBus, interrupts: Rc<RefCell<Interrupts>>, is_horizontal_mirror: bool) -> Self {
        Self {
            registers: Registers::new(),
            vram: Ram::new(0x0800),
            sprite_ram: Ram::new(0x100),
            palette: PaletteRam::new(),
            bus,
            interrupts,
            is_horizontal_mirror,
            cycle: 0,
            line: 0,
            vram_read_buffer: 0,
            background: Vec::new(),
            sprites: Vec::new(),
        }
    }

    /// Reinitialize registers, counters and latches. Memory buffers keep
    /// their contents, as on the real unit.
    pub fn reset(&mut self) {
        self.registers.reset();
        self.cycle = 0;
        self.line = 0;
        self.vram_read_buffer = 0;
        self.background.clear();
        self.sprites.clear();
    }

    /// Feed accumulated dot-cycles into the scanline state machine. Returns
    /// the completed frame when the field wraps.
    pub fn run(&mut self, cycles: u64) -> Option<FrameData> {
        self.cycle += cycles;

        if self.line == 0 {
            self.registers.clear_sprite_zero_hit();
            self.background.clear();
            self.build_sprites();
        }

        while self.cycle >= CYCLES_PER_LINE {
            self.cycle -= CYCLES_PER_LINE;
            self.line += 1;

            self.check_sprite_zero_hit();
            self.check_sprite_overflow();

            // One row of background tiles every eighth visible line;
            // vertical scroll values past the visible field suppress it
            if self.line <= 240 && self.line % 8 == 0 && self.registers.scroll_y() <= 240 {
                self.build_background();
            }

            if self.line == VBLANK_LINE {
                self.registers.set_vblank();
                if self.registers.nmi_enabled() {
                    self.interrupts.borrow_mut().assert_nmi();
                }
            }

            if self.line == LINES_PER_FIELD {
                self.registers.clear_vblank();
                self.registers.clear_sprite_zero_hit();
                self.registers.clear_sprite_overflow();
                self.interrupts.borrow_mut().deassert_nmi();
                self.line = 0;
                return Some(self.take_frame());
            }
        }
        None
    }

    fn take_frame(&mut self) -> FrameData {
        FrameData {
            background: if self.registers.background_enabled() {
                Some(std::mem::take(&mut self.background))
            } else {
                None
            },
            sprites: if self.registers.sprite_enabled() {
                Some(self.sprites.clone())
            } else {
                None
            },
            palette: self.palette.read_resolved(),
        }
    }

    /// True while the unit is inside the vertical blanking interval
    pub fn is_vblank(&self) -> bool {
        self.registers.is_vblank()
    }

    /// DMA entry point: store one byte into the sprite attribute table
    pub fn transfer_sprite(&mut self, index: u8, value: u8) {
        self.sprite_ram.write(index as u16, value);
    }

    // --- register window --------------------------------------------------

    /// Read one of the eight bus-visible registers (index 0-7)
    pub fn read_register(&mut self, index: u16) -> u8 {
        match index {
            0x02 => self.registers.read_status(),
            0x04 => self.sprite_ram.read(self.registers.sprite_addr() as u16),
            0x07 => self.read_vram_data(),
            // The rest are write-only; reads see open bus, approximated as 0
            _ => 0,
        }
    }

    /// Write one of the eight bus-visible registers (index 0-7)
    pub fn write_register(&mut self, index: u16, value: u8) {
        match index {
            0x00 => self.registers.write_control(value),
            0x01 => self.registers.write_mask(value),
            0x02 => { /* status is read-only */ }
            0x03 => self.registers.write_sprite_addr(value),
            0x04 => {
                self.sprite_ram
                    .write(self.registers.sprite_addr() as u16, value);
                self.registers.increment_sprite_addr();
            }
            0x05 => self.registers.write_scroll(value),
            0x06 => self.registers.write_vram_addr(value),
            0x07 => self.write_vram_data(value),
            _ => panic!("PPU register index out of range: {index}"),
        }
    }

    /// Buffered video data read: palette reads are immediate, everything
    /// else returns the previously latched byte and refills the latch
    fn read_vram_data(&mut self) -> u8 {
        let addr = self.registers.vram_addr();
        self.registers.increment_vram_addr();

        if addr >= 0x3F00 {
            return self.palette.read(addr - 0x3F00);
        }

        let buffered = self.vram_read_buffer;
        self.vram_read_buffer = if addr < 0x2000 {
            self.bus.read_character(addr)
        } else {
            self.vram.read(self.name_table_index(addr))
        };
        buffered
    }

    fn write_vram_data(&mut self, value: u8) {
        let addr = self.registers.vram_addr();
        if addr >= 0x3F00 {
            self.palette.write(addr - 0x3F00, value);
        } else if addr < 0x2000 {
            self.bus.write_character(addr, value);
        } else {
            self.vram.write(self.name_table_index(addr), value);
        }
        self.registers.increment_vram_addr();
    }

    // --- name tables ------------------------------------------------------

    /// Fold a name-table address onto physical VRAM. Horizontal mirroring
    /// drops the second and fourth 1KB banks onto the first and third;
    /// vertical mirroring folds the upper pair onto the lower.
    fn name_table_index(&self, addr: u16) -> u16 {
        // 0x3000-0x3EFF mirrors 0x2000-0x2EFF
        let offset = (addr - 0x2000) & 0x0FFF;
        let bank = offset / 0x400;
        let physical_bank = if self.is_horizontal_mirror {
            bank / 2
        } else {
            bank % 2
        };
        physical_bank * 0x400 + (offset & 0x3FF)
    }

    fn read_name_table(&self, addr: u16) -> u8 {
        self.vram.read(self.name_table_index(addr))
    }

    // --- sprite list ------------------------------------------------------

    /// Rebuild the 64-entry sprite list from the attribute table. The first
    /// and last eight lines of the field are never rendered, so stored y
    /// coordinates are offset by 8; an entry above the top of the screen
    /// terminates the whole build, a quirk games rely on to hide trailing
    /// entries.
    fn build_sprites(&mut self) {
        let table_offset = self.registers.sprite_table_offset();
        self.sprites.clear();
        for i in 0..SPRITE_COUNT {
            let base = i * 4;
            let raw_y = self.sprite_ram.read(base);
            if raw_y < 8 {
                return;
            }
            let y = raw_y - 8;
            let id = self.sprite_ram.read(base + 1);
            let attr = self.sprite_ram.read(base + 2);
            let x = self.sprite_ram.read(base + 3);
            let grid = build_sprite_grid(|addr| self.bus.read_character(addr), id, table_offset);
            self.sprites.push(SpriteWithAttribute { grid, x, y, attr, id });
        }
    }

    /// Latch the hit flag when the first sprite-table slot's y coordinate
    /// matches the current line while both render enables are on
    fn check_sprite_zero_hit(&mut self) {
        let sprite_zero_y = self.sprite_ram.read(0) as u16;
        if sprite_zero_y == self.line
            && self.registers.background_enabled()
            && self.registers.sprite_enabled()
        {
            self.registers.set_sprite_zero_hit();
        }
    }

    /// Latch the overflow flag when more than eight sprites fall on the
    /// current visible line
    fn check_sprite_overflow(&mut self) {
        if self.line >= 240 || !self.registers.sprite_enabled() {
            return;
        }
        let mut count = 0;
        for i in 0..SPRITE_COUNT {
            let y = self.sprite_ram.read(i * 4) as u16;
            if self.line >= y && self.line < y + 8 {
                count += 1;
            }
        }
        if count > 8 {
            self.registers.set_sprite_overflow();
        }
    }

    // --- background -------------------------------------------------------

    fn scroll_tile_x(&self) -> u16 {
        (self.registers.scroll_x() as u16 + self.registers.nametable_x() * 256) / 8
    }

    fn scroll_tile_y(&self) -> u16 {
        (self.registers.scroll_y() as u16 + self.registers.nametable_y() * 240) / 8
    }

    fn tile_y(&self) -> u16 {
        self.line / 8 + self.scroll_tile_y()
    }

    /// Build one 33-tile row (32 visible plus one of scroll overscan) from
    /// the currently selected name-table quadrant and scroll registers
    fn build_background(&mut self) {
        let clamped_tile_y = self.tile_y() % 30;
        let table_row_offset = if (self.tile_y() / 30) % 2 == 1 { 2 } else { 0 };
        let scroll_tile_x = self.scroll_tile_x();

        for x in 0..33u16 {
            let tile_x = x + scroll_tile_x;
            let clamped_tile_x = tile_x % 32;
            let name_table_id = (tile_x / 32) % 2 + table_row_offset;
            let tile = self.build_tile(clamped_tile_x, clamped_tile_y, name_table_id);
            self.background.push(tile);
        }
    }

    fn build_tile(&self, tile_x: u16, tile_y: u16, name_table_id: u16) -> Tile {
        // Attribute bytes cover 4x4 tile blocks, two palette bits per 2x2 quadrant
        let block_id = (tile_x % 4) / 2 + ((tile_y % 4) / 2) * 2;
        let table_base = 0x2000 + name_table_id * 0x400;
        let tile_id = self.read_name_table(table_base + tile_y * 32 + tile_x);
        let attr_addr = table_base + 0x03C0 + tile_x / 4 + (tile_y / 4) * 8;
        let attr = self.read_name_table(attr_addr);
        let palette_id = (attr >> (block_id * 2)) & 0x03;
        let grid = build_sprite_grid(
            |addr| self.bus.read_character(addr),
            tile_id,
            self.registers.background_table_offset(),
        );
        Tile {
            grid,
            palette_id,
            scroll_x: self.registers.scroll_x(),
            scroll_y: self.registers.scroll_y(),
        }
    }
}
