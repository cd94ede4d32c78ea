use crate::apu::{Apu, AudioSink};
use crate::cartridge::Cartridge;
use crate::cpu::Cpu;
use crate::cpu_bus::CpuBus;
use crate::dma::Dma;
use crate::interrupts::Interrupts;
use crate::keypad::{Button, Keypad};
use crate::ppu::{FrameData, Ppu};
use crate::ppu_bus::PpuBus;
use crate::ram::Ram;
use crate::rom::Rom;
use std::cell::RefCell;
use std::rc::Rc;

/// The picture unit runs three dot-cycles per processor cycle
const PPU_CYCLES_PER_CPU_CYCLE: u64 = 3;

/// Top-level orchestrator: owns every component, wires the interrupt and
/// DMA interactions, and drives the per-frame execution loop.
///
/// The loop alternates between one processor instruction (or one pending
/// DMA transfer) and the matching picture/audio unit cycles, so neither
/// side ever runs more than one instruction's worth of cycles ahead.
pub struct Console {
    pub cpu: Cpu,
    pub ppu: Rc<RefCell<Ppu>>,
    pub apu: Rc<RefCell<Apu>>,
    pub bus: Rc<RefCell<CpuBus>>,
    keypad: Rc<RefCell<Keypad>>,
    work_ram: Rc<RefCell<Ram>>,
    dma: Rc<RefCell<Dma>>,
}

impl Console {
    /// Assemble a console around parsed cartridge data and an audio
    /// collaborator
    pub fn new(cartridge: Cartridge, sink: Box<dyn AudioSink>) -> Self {
        let (prg_rom, chr_rom, is_horizontal_mirror) = cartridge.into_parts();
        let interrupts = Rc::new(RefCell::new(Interrupts::new()));

        // Character memory stays writable when the cartridge ships no CHR
        // ROM of its own
        let chr_writable = chr_rom.is_empty();
        let mut character = Ram::new(0x2000);
        for (i, &byte) in chr_rom.iter().enumerate() {
            character.write(i as u16, byte);
        }

        let ppu = Rc::new(RefCell::new(Ppu::new(
            PpuBus::new(character, chr_writable),
            interrupts.clone(),
            is_horizontal_mirror,
        )));
        let apu = Rc::new(RefCell::new(Apu::new(interrupts.clone(), sink)));
        let work_ram = Rc::new(RefCell::new(Ram::new(0x0800)));
        let dma = Rc::new(RefCell::new(Dma::new()));
        let keypad = Rc::new(RefCell::new(Keypad::new()));
        let bus = Rc::new(RefCell::new(CpuBus::new(
            work_ram.clone(),
            Rom::new(prg_rom),
            ppu.clone(),
            apu.clone(),
            keypad.clone(),
            dma.clone(),
        )));
        let cpu = Cpu::new(bus.clone(), interrupts);

        Self {
            cpu,
            ppu,
            apu,
            bus,
            keypad,
            work_ram,
            dma,
        }
    }

    pub fn reset(&mut self) {
        self.ppu.borrow_mut().reset();
        self.apu.borrow_mut().reset();
        self.cpu.reset();
    }

    /// Run the execution loop until the picture unit completes one field
    pub fn frame(&mut self) -> FrameData {
        loop {
            let cycles = match self.service_pending_dma() {
                Some(dma_cycles) => dma_cycles,
                None => self.cpu.step() as u64,
            };

            self.apu.borrow_mut().exec(cycles);
            let frame = self
                .ppu
                .borrow_mut()
                .run(cycles * PPU_CYCLES_PER_CPU_CYCLE);
            if let Some(frame) = frame {
                return frame;
            }
        }
    }

    /// Service an armed DMA transfer in place of an instruction, charging
    /// the fixed stall (one cycle more when starting on an odd cycle)
    fn service_pending_dma(&mut self) -> Option<u64> {
        if !self.dma.borrow().is_pending() {
            return None;
        }
        let cycles = Dma::cycles(self.cpu.total_cycles());
        self.dma
            .borrow_mut()
            .run(&self.work_ram.borrow(), &mut self.ppu.borrow_mut());
        self.cpu.add_cycles(cycles);
        Some(cycles)
    }

    /// Frontend passthrough for controller key-down events
    pub fn press(&mut self, button: Button) {
        self.keypad.borrow_mut().press(button);
    }

    /// Frontend passthrough for controller key-up events
    pub fn release(&mut self, button: Button) {
        self.keypad.borrow_mut().release(button);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apu::NullSink;

    /// Build a console whose program is an infinite loop at 0x8000
    fn setup_console() -> Console {
        setup_console_with(&[0x4C, 0x00, 0x80]) // JMP $8000
    }

    fn setup_console_with(program: &[u8]) -> Console {
        let mut prg_rom = vec![0; 0x4000];
        prg_rom[..program.len()].copy_from_slice(program);
        prg_rom[0x3FFC] = 0x00; // reset vector -> 0x8000
        prg_rom[0x3FFD] = 0x80;
        let cartridge = Cartridge::from_parts(prg_rom, vec![], true);
        let mut console = Console::new(cartridge, Box::new(NullSink));
        console.reset();
        console
    }

    #[test]
    fn test_reset_loads_reset_vector() {
        let console = setup_console();
        assert_eq!(console.cpu.pc, 0x8000);
    }

    #[test]
    fn test_frame_completes_a_field() {
        let mut console = setup_console();
        console.frame();
        // One field is 89342 dot-cycles; the CPU ran a third of that,
        // give or take one instruction
        let cpu_cycles = console.cpu.total_cycles();
        assert!(cpu_cycles >= 89342 / 3, "got {cpu_cycles}");
        assert!(cpu_cycles < 89342 / 3 + 10, "got {cpu_cycles}");
    }

    #[test]
    fn test_dma_copies_page_and_charges_fixed_cycles() {
        let mut console = setup_console();
        // Fill work-RAM page 2 with a known pattern
        for i in 0..0x100u16 {
            console.bus.borrow_mut().write(0x0200 + i, i as u8);
        }
        // Trigger a transfer from page 2
        console.bus.borrow_mut().write(0x4014, 0x02);

        let cycles = console
            .service_pending_dma()
            .expect("transfer was pending");
        assert_eq!(cycles, 513, "even start cycle costs 513");

        let mut ppu = console.ppu.borrow_mut();
        for i in 0..0x100u16 {
            ppu.write_register(0x03, i as u8);
            assert_eq!(ppu.read_register(0x04), i as u8, "sprite byte {i}");
        }
    }

    #[test]
    fn test_dma_on_odd_cycle_costs_one_more() {
        let mut console = setup_console();
        console.cpu.add_cycles(1);
        console.bus.borrow_mut().write(0x4014, 0x00);
        let cycles = console.service_pending_dma().expect("pending");
        assert_eq!(cycles, 514);
    }

    #[test]
    fn test_dma_service_is_one_shot() {
        let mut console = setup_console();
        console.bus.borrow_mut().write(0x4014, 0x00);
        assert!(console.service_pending_dma().is_some());
        assert!(console.service_pending_dma().is_none());
    }

    #[test]
    fn test_dma_stall_counts_into_cpu_cycle_clock() {
        let mut console = setup_console();
        console.bus.borrow_mut().write(0x4014, 0x00);
        console.service_pending_dma();
        assert_eq!(console.cpu.total_cycles(), 513);
    }

    #[test]
    fn test_keypad_events_reach_the_bus() {
        let mut console = setup_console();
        console.press(Button::Start);
        console.bus.borrow_mut().write(0x4016, 1);
        console.bus.borrow_mut().write(0x4016, 0);
        let bus = console.bus.borrow();
        assert_eq!(bus.read(0x4016), 0, "A");
        assert_eq!(bus.read(0x4016), 0, "B");
        assert_eq!(bus.read(0x4016), 0, "Select");
        assert_eq!(bus.read(0x4016), 1, "Start");
    }

    #[test]
    fn test_nmi_reaches_cpu_next_frame() {
        // Program: enable vblank NMI (write 0x80 to 0x2000), then loop.
        // LDA #$80; STA $2000; JMP $8005
        let program = [0xA9, 0x80, 0x8D, 0x00, 0x20, 0x4C, 0x05, 0x80];
        let mut prg_rom = vec![0; 0x4000];
        prg_rom[..program.len()].copy_from_slice(&program);
        prg_rom[0x3FFA] = 0x05; // NMI vector -> the loop itself
        prg_rom[0x3FFB] = 0x80;
        prg_rom[0x3FFC] = 0x00;
        prg_rom[0x3FFD] = 0x80;
        let cartridge = Cartridge::from_parts(prg_rom, vec![], true);
        let mut console = Console::new(cartridge, Box::new(NullSink));
        console.reset();

        console.frame();
        // The vblank interrupt pushed three bytes before the handler ran
        assert_eq!(console.cpu.sp, 0xFD - 3);
    }
}
