use crate::ppu::Ppu;
use crate::ram::Ram;

/// Base cycle cost of a sprite-table DMA transfer; one more is charged when
/// the transfer starts on an odd processor cycle
const BASE_CYCLES: u64 = 513;

/// Sprite-table DMA controller.
///
/// A single-byte write to the trigger address arms a transfer; the byte,
/// shifted left eight bits, becomes the source page base in work RAM. The
/// console services the transfer before the next instruction, copying the
/// full 256-byte page into the picture unit's sprite attribute table and
/// charging the fixed stall instead of an instruction's cost.
pub struct Dma {
    pending: bool,
    base_addr: u16,
}

impl Dma {
    pub fn new() -> Self {
        Self {
            pending: false,
            base_addr: 0x0000,
        }
    }

    /// Arm a transfer from `page << 8`. Only one transfer may be in flight;
    /// triggering while one is pending is an invariant violation.
    pub fn trigger(&mut self, page: u8) {
        assert!(
            !self.pending,
            "DMA triggered while a transfer is already pending"
        );
        self.base_addr = (page as u16) << 8;
        self.pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Stall cost for a transfer starting at the given total cycle count
    pub fn cycles(total_cycles: u64) -> u64 {
        BASE_CYCLES + (total_cycles & 1)
    }

    /// Copy the armed page into the sprite attribute table. Source addresses
    /// wrap through the work-RAM mirror.
    pub fn run(&mut self, ram: &Ram, ppu: &mut Ppu) {
        if !self.pending {
            return;
        }
        for i in 0..0x100u16 {
            let value = ram.read((self.base_addr | i) & 0x07FF);
            ppu.transfer_sprite(i as u8, value);
        }
        self.pending = false;
    }
}

impl Default for Dma {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupts::Interrupts;
    use crate::ppu_bus::PpuBus;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn setup_ppu() -> Ppu {
        let interrupts = Rc::new(RefCell::new(Interrupts::new()));
        Ppu::new(PpuBus::new(Ram::new(0x2000), true), interrupts, true)
    }

    #[test]
    fn test_trigger_arms_transfer() {
        let mut dma = Dma::new();
        assert!(!dma.is_pending());
        dma.trigger(0x02);
        assert!(dma.is_pending());
    }

    #[test]
    fn test_run_copies_page_into_sprite_table() {
        let mut dma = Dma::new();
        let mut ram = Ram::new(0x0800);
        for i in 0..0x100u16 {
            ram.write(0x0200 + i, i as u8);
        }
        let mut ppu = setup_ppu();

        dma.trigger(0x02);
        dma.run(&ram, &mut ppu);

        assert!(!dma.is_pending());
        for i in 0..0x100u16 {
            ppu.write_register(0x03, i as u8);
            assert_eq!(
                ppu.read_register(0x04),
                i as u8,
                "sprite table byte {i} copied unchanged"
            );
        }
    }

    #[test]
    fn test_run_without_trigger_is_a_no_op() {
        let mut dma = Dma::new();
        let ram = Ram::new(0x0800);
        let mut ppu = setup_ppu();
        dma.run(&ram, &mut ppu);
        assert!(!dma.is_pending());
    }

    #[test]
    #[should_panic(expected = "already pending")]
    fn test_double_trigger_is_an_invariant_violation() {
        let mut dma = Dma::new();
        dma.trigger(0x02);
        dma.trigger(0x03);
    }

    #[test]
    fn test_cycle_cost_even_and_odd() {
        assert_eq!(Dma::cycles(100), 513);
        assert_eq!(Dma::cycles(101), 514);
    }
}
