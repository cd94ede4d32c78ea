use super::opcode::{self, Mnemonic, Mode};
use super::status::Status;
use crate::cpu_bus::CpuBus;
use crate::interrupts::Interrupts;
use std::cell::RefCell;
use std::rc::Rc;

// Interrupt vector addresses
const NMI_VECTOR: u16 = 0xFFFA;
const RESET_VECTOR: u16 = 0xFFFC;
const IRQ_VECTOR: u16 = 0xFFFE;

// The stack lives in the fixed 0x0100 page
const STACK_PAGE: u16 = 0x0100;

/// Cycles consumed by NMI/IRQ service
const INTERRUPT_CYCLES: u8 = 7;

/// Resolved operand: a literal for immediate mode, an address otherwise,
/// plus whether resolution crossed a page boundary
struct Operand {
    value: u16,
    page_crossed: bool,
}

impl Operand {
    fn at(value: u16) -> Self {
        Self {
            value,
            page_crossed: false,
        }
    }
}

/// 6502-family processor core.
///
/// `step` executes exactly one instruction (or services a pending interrupt)
/// and returns the consumed cycle count; the console feeds that count to the
/// picture and audio units to keep the three clocks in lockstep.
pub struct Cpu {
    /// Accumulator
    pub a: u8,
    /// X index register
    pub x: u8,
    /// Y index register
    pub y: u8,
    /// Stack pointer, an offset into the 0x0100 page
    pub sp: u8,
    /// Program counter
    pub pc: u16,
    /// Status flags
    pub status: Status,
    /// Memory bus
    pub bus: Rc<RefCell<CpuBus>>,
    /// Interrupt lines, polled at instruction boundaries
    pub interrupts: Rc<RefCell<Interrupts>>,
    /// Set by a taken branch during execution of the current instruction
    has_branched: bool,
    total_cycles: u64,
}

impl Cpu {
    pub fn new(bus: Rc<RefCell<CpuBus>>, interrupts: Rc<RefCell<Interrupts>>) -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            status: Status::power_up(),
            bus,
            interrupts,
            has_branched: false,
            total_cycles: 0,
        }
    }

    /// Reset the CPU to power-up state. Produces a fresh register value every
    /// time; nothing is shared with previous resets. The program counter is
    /// loaded from the reset vector through the bus.
    pub fn reset(&mut self) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xFD;
        self.status = Status::power_up();
        self.has_branched = false;
        self.total_cycles = 0;
        self.pc = self.read_word(RESET_VECTOR);
    }

    /// Total cycles consumed since reset, including DMA stalls charged by the
    /// console. Used for the DMA odd/even-cycle cost rule.
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Charge cycles consumed outside instruction execution (DMA stalls)
    pub fn add_cycles(&mut self, cycles: u64) {
        self.total_cycles += cycles;
    }

    /// Execute one instruction and return its cycle count.
    ///
    /// A pending non-maskable interrupt is serviced instead, ahead of the
    /// fetch, and charged the documented 7-cycle cost; the maskable line is
    /// honored the same way when the interrupt-disable flag is clear.
    pub fn step(&mut self) -> u8 {
        if self.interrupts.borrow().is_nmi_asserted() {
            self.service_nmi();
            self.total_cycles += INTERRUPT_CYCLES as u64;
            return INTERRUPT_CYCLES;
        }
        if self.interrupts.borrow().is_irq_asserted() && !self.status.interrupt {
            self.service_irq();
            self.total_cycles += INTERRUPT_CYCLES as u64;
            return INTERRUPT_CYCLES;
        }

        let instruction_pc = self.pc;
        let code = self.fetch_byte();
        let op = opcode::lookup(code).unwrap_or_else(|| {
            panic!("Unknown opcode 0x{code:02X} at 0x{instruction_pc:04X}");
        });

        let operand = self.resolve(op.mode);
        self.has_branched = false;
        self.execute(op.mnemonic, op.mode, operand.value);

        let mut cycles = op.cycles;
        if operand.page_crossed && op.page_penalty {
            cycles += 1;
        }
        if self.has_branched {
            cycles += 1;
        }
        self.total_cycles += cycles as u64;
        cycles
    }

    // --- bus access -------------------------------------------------------

    fn read(&self, addr: u16) -> u8 {
        self.bus.borrow().read(addr)
    }

    fn read_word(&self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.bus.borrow_mut().write(addr, value);
    }

    fn fetch_byte(&mut self) -> u8 {
        let value = self.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch_byte() as u16;
        let hi = self.fetch_byte() as u16;
        (hi << 8) | lo
    }

    // --- stack ------------------------------------------------------------

    fn push(&mut self, value: u8) {
        self.write(STACK_PAGE | self.sp as u16, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pop(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.read(STACK_PAGE | self.sp as u16)
    }

    fn push_word(&mut self, value: u16) {
        self.push((value >> 8) as u8);
        self.push((value & 0xFF) as u8);
    }

    fn pop_word(&mut self) -> u16 {
        let lo = self.pop() as u16;
        let hi = self.pop() as u16;
        (hi << 8) | lo
    }

    // --- interrupt service ------------------------------------------------

    fn service_nmi(&mut self) {
        self.interrupts.borrow_mut().deassert_nmi();
        self.status.brk = false;
        self.push_word(self.pc);
        self.push(self.status.pack());
        self.status.interrupt = true;
        self.pc = self.read_word(NMI_VECTOR);
    }

    fn service_irq(&mut self) {
        self.interrupts.borrow_mut().deassert_irq();
        self.status.brk = false;
        self.push_word(self.pc);
        self.push(self.status.pack());
        self.status.interrupt = true;
        self.pc = self.read_word(IRQ_VECTOR);
    }

    // --- addressing -------------------------------------------------------

    /// Resolve the operand for an addressing mode, consuming operand bytes
    /// and reporting page crossings where the mode is subject to them
    fn resolve(&mut self, mode: Mode) -> Operand {
        match mode {
            Mode::Accumulator | Mode::Implied => Operand::at(0),
            Mode::Immediate => Operand::at(self.fetch_byte() as u16),
            Mode::ZeroPage => Operand::at(self.fetch_byte() as u16),
            Mode::ZeroPageX => {
                let base = self.fetch_byte();
                Operand::at(base.wrapping_add(self.x) as u16)
            }
            Mode::ZeroPageY => {
                let base = self.fetch_byte();
                Operand::at(base.wrapping_add(self.y) as u16)
            }
            Mode::Absolute => Operand::at(self.fetch_word()),
            Mode::AbsoluteX => {
                let base = self.fetch_word();
                let addr = base.wrapping_add(self.x as u16);
                Operand {
                    value: addr,
                    page_crossed: Self::page_crossed(base, addr),
                }
            }
            Mode::AbsoluteY => {
                let base = self.fetch_word();
                let addr = base.wrapping_add(self.y as u16);
                Operand {
                    value: addr,
                    page_crossed: Self::page_crossed(base, addr),
                }
            }
            Mode::Relative => {
                // Displacement bytes >= 0x80 branch backwards
                let offset = self.fetch_byte() as u16;
                let addr = if offset < 0x80 {
                    self.pc.wrapping_add(offset)
                } else {
                    self.pc.wrapping_add(offset).wrapping_sub(256)
                };
                Operand {
                    value: addr,
                    page_crossed: Self::page_crossed(self.pc, addr),
                }
            }
            Mode::IndirectX => {
                let base = self.fetch_byte().wrapping_add(self.x);
                let lo = self.read(base as u16) as u16;
                let hi = self.read(base.wrapping_add(1) as u16) as u16;
                Operand::at((hi << 8) | lo)
            }
            Mode::IndirectY => {
                let ptr = self.fetch_byte();
                let lo = self.read(ptr as u16) as u16;
                let hi = self.read(ptr.wrapping_add(1) as u16) as u16;
                let base = (hi << 8) | lo;
                let addr = base.wrapping_add(self.y as u16);
                Operand {
                    value: addr,
                    page_crossed: Self::page_crossed(base, addr),
                }
            }
            Mode::Indirect => {
                // A pointer ending in 0xFF fetches its high byte from the
                // start of the same page, reproducing the hardware bug
                let ptr = self.fetch_word();
                let lo = self.read(ptr) as u16;
                let hi_addr = (ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF);
                let hi = self.read(hi_addr) as u16;
                Operand::at((hi << 8) | lo)
            }
        }
    }

    fn page_crossed(from: u16, to: u16) -> bool {
        (from & 0xFF00) != (to & 0xFF00)
    }

    /// Fetch the value an instruction operates on: the literal itself in
    /// immediate mode, otherwise the byte at the resolved address
    fn operand_value(&self, mode: Mode, operand: u16) -> u8 {
        if mode == Mode::Immediate {
            operand as u8
        } else {
            self.read(operand)
        }
    }

    // --- flag helpers -----------------------------------------------------

    fn update_zn(&mut self, value: u8) {
        self.status.zero = value == 0;
        self.status.negative = value & 0x80 != 0;
    }

    fn adc_value(&mut self, value: u8) {
        let sum = self.a as u16 + value as u16 + self.status.carry as u16;
        let result = sum as u8;
        // Two's-complement overflow: operands agree in sign, result does not
        self.status.overflow = (self.a ^ value) & 0x80 == 0 && (self.a ^ result) & 0x80 != 0;
        self.status.carry = sum > 0xFF;
        self.a = result;
        self.update_zn(result);
    }

    fn sbc_value(&mut self, value: u8) {
        let diff = self.a as i16 - value as i16 - (!self.status.carry as i16);
        let result = diff as u8;
        self.status.overflow = (self.a ^ value) & 0x80 != 0 && (self.a ^ result) & 0x80 != 0;
        self.status.carry = diff >= 0;
        self.a = result;
        self.update_zn(result);
    }

    /// Compare via subtraction without storing the result
    fn compare(&mut self, register: u8, value: u8) {
        let diff = register as i16 - value as i16;
        self.status.carry = diff >= 0;
        self.update_zn(diff as u8);
    }

    fn branch_if(&mut self, condition: bool, addr: u16) {
        if condition {
            self.pc = addr;
            self.has_branched = true;
        }
    }

    // --- read-modify-write helpers ----------------------------------------

    fn shift_left(&mut self, value: u8) -> u8 {
        self.status.carry = value & 0x80 != 0;
        let result = value << 1;
        self.update_zn(result);
        result
    }

    fn shift_right(&mut self, value: u8) -> u8 {
        self.status.carry = value & 0x01 != 0;
        let result = value >> 1;
        self.update_zn(result);
        result
    }

    fn rotate_left(&mut self, value: u8) -> u8 {
        let result = (value << 1) | self.status.carry as u8;
        self.status.carry = value & 0x80 != 0;
        self.update_zn(result);
        result
    }

    fn rotate_right(&mut self, value: u8) -> u8 {
        let result = (value >> 1) | (self.status.carry as u8) << 7;
        self.status.carry = value & 0x01 != 0;
        self.update_zn(result);
        result
    }

    /// Apply a read-modify-write helper either to the accumulator or to the
    /// byte at the operand address
    fn modify(&mut self, mode: Mode, operand: u16, f: fn(&mut Self, u8) -> u8) {
        if mode == Mode::Accumulator {
            let result = f(self, self.a);
            self.a = result;
        } else {
            let value = self.read(operand);
            let result = f(self, value);
            self.write(operand, result);
        }
    }

    // --- execution --------------------------------------------------------

    fn execute(&mut self, mnemonic: Mnemonic, mode: Mode, operand: u16) {
        match mnemonic {
            Mnemonic::Lda => {
                self.a = self.operand_value(mode, operand);
                self.update_zn(self.a);
            }
            Mnemonic::Ldx => {
                self.x = self.operand_value(mode, operand);
                self.update_zn(self.x);
            }
            Mnemonic::Ldy => {
                self.y = self.operand_value(mode, operand);
                self.update_zn(self.y);
            }
            Mnemonic::Sta => self.write(operand, self.a),
            Mnemonic::Stx => self.write(operand, self.x),
            Mnemonic::Sty => self.write(operand, self.y),

            Mnemonic::Tax => {
                self.x = self.a;
                self.update_zn(self.x);
            }
            Mnemonic::Tay => {
                self.y = self.a;
                self.update_zn(self.y);
            }
            Mnemonic::Tsx => {
                self.x = self.sp;
                self.update_zn(self.x);
            }
            Mnemonic::Txa => {
                self.a = self.x;
                self.update_zn(self.a);
            }
            // TXS touches no flags
            Mnemonic::Txs => self.sp = self.x,
            Mnemonic::Tya => {
                self.a = self.y;
                self.update_zn(self.a);
            }

            Mnemonic::Adc => {
                let value = self.operand_value(mode, operand);
                self.adc_value(value);
            }
            Mnemonic::Sbc => {
                let value = self.operand_value(mode, operand);
                self.sbc_value(value);
            }
            Mnemonic::And => {
                self.a &= self.operand_value(mode, operand);
                self.update_zn(self.a);
            }
            Mnemonic::Ora => {
                self.a |= self.operand_value(mode, operand);
                self.update_zn(self.a);
            }
            Mnemonic::Eor => {
                self.a ^= self.operand_value(mode, operand);
                self.update_zn(self.a);
            }
            Mnemonic::Bit => {
                let value = self.read(operand);
                self.status.negative = value & 0x80 != 0;
                self.status.overflow = value & 0x40 != 0;
                self.status.zero = self.a & value == 0;
            }

            Mnemonic::Cmp => {
                let value = self.operand_value(mode, operand);
                self.compare(self.a, value);
            }
            Mnemonic::Cpx => {
                let value = self.operand_value(mode, operand);
                self.compare(self.x, value);
            }
            Mnemonic::Cpy => {
                let value = self.operand_value(mode, operand);
                self.compare(self.y, value);
            }

            Mnemonic::Asl => self.modify(mode, operand, Self::shift_left),
            Mnemonic::Lsr => self.modify(mode, operand, Self::shift_right),
            Mnemonic::Rol => self.modify(mode, operand, Self::rotate_left),
            Mnemonic::Ror => self.modify(mode, operand, Self::rotate_right),

            Mnemonic::Inc => {
                let value = self.read(operand).wrapping_add(1);
                self.write(operand, value);
                self.update_zn(value);
            }
            Mnemonic::Dec => {
                let value = self.read(operand).wrapping_sub(1);
                self.write(operand, value);
                self.update_zn(value);
            }
            Mnemonic::Inx => {
                self.x = self.x.wrapping_add(1);
                self.update_zn(self.x);
            }
            Mnemonic::Iny => {
                self.y = self.y.wrapping_add(1);
                self.update_zn(self.y);
            }
            Mnemonic::Dex => {
                self.x = self.x.wrapping_sub(1);
                self.update_zn(self.x);
            }
            Mnemonic::Dey => {
                self.y = self.y.wrapping_sub(1);
                self.update_zn(self.y);
            }

            Mnemonic::Pha => self.push(self.a),
            Mnemonic::Php => {
                // The pushed copy always carries the break bit
                self.status.brk = true;
                self.push(self.status.pack());
            }
            Mnemonic::Pla => {
                self.a = self.pop();
                self.update_zn(self.a);
            }
            Mnemonic::Plp => {
                self.status = Status::unpack(self.pop());
                self.status.reserved = true;
            }

            Mnemonic::Jmp => self.pc = operand,
            Mnemonic::Jsr => {
                // Return address is the last byte of this instruction
                let return_addr = self.pc.wrapping_sub(1);
                self.push_word(return_addr);
                self.pc = operand;
            }
            Mnemonic::Rts => self.pc = self.pop_word().wrapping_add(1),
            Mnemonic::Rti => {
                self.status = Status::unpack(self.pop());
                self.status.reserved = true;
                self.pc = self.pop_word();
            }

            Mnemonic::Bcc => self.branch_if(!self.status.carry, operand),
            Mnemonic::Bcs => self.branch_if(self.status.carry, operand),
            Mnemonic::Beq => self.branch_if(self.status.zero, operand),
            Mnemonic::Bne => self.branch_if(!self.status.zero, operand),
            Mnemonic::Bmi => self.branch_if(self.status.negative, operand),
            Mnemonic::Bpl => self.branch_if(!self.status.negative, operand),
            Mnemonic::Bvs => self.branch_if(self.status.overflow, operand),
            Mnemonic::Bvc => self.branch_if(!self.status.overflow, operand),

            Mnemonic::Clc => self.status.carry = false,
            Mnemonic::Sec => self.status.carry = true,
            Mnemonic::Cli => self.status.interrupt = false,
            Mnemonic::Sei => self.status.interrupt = true,
            Mnemonic::Clv => self.status.overflow = false,
            Mnemonic::Cld => self.status.decimal = false,
            Mnemonic::Sed => self.status.decimal = true,

            Mnemonic::Brk => {
                self.pc = self.pc.wrapping_add(1);
                self.push_word(self.pc);
                self.status.brk = true;
                self.push(self.status.pack());
                self.status.interrupt = true;
                self.pc = self.read_word(IRQ_VECTOR);
            }
            Mnemonic::Nop => {}

            // Unofficial opcodes
            Mnemonic::Lax => {
                let value = self.operand_value(mode, operand);
                self.a = value;
                self.x = value;
                self.update_zn(value);
            }
            Mnemonic::Sax => self.write(operand, self.a & self.x),
            Mnemonic::Dcp => {
                let value = self.read(operand).wrapping_sub(1);
                self.write(operand, value);
                self.compare(self.a, value);
            }
            Mnemonic::Isb => {
                let value = self.read(operand).wrapping_add(1);
                self.write(operand, value);
                self.sbc_value(value);
            }
            Mnemonic::Slo => {
                let value = self.read(operand);
                self.status.carry = value & 0x80 != 0;
                let shifted = value << 1;
                self.write(operand, shifted);
                self.a |= shifted;
                self.update_zn(self.a);
            }
            Mnemonic::Rla => {
                let value = self.read(operand);
                let rolled = (value << 1) | self.status.carry as u8;
                self.status.carry = value & 0x80 != 0;
                self.write(operand, rolled);
                self.a &= rolled;
                self.update_zn(self.a);
            }
            Mnemonic::Sre => {
                let value = self.read(operand);
                self.status.carry = value & 0x01 != 0;
                let shifted = value >> 1;
                self.write(operand, shifted);
                self.a ^= shifted;
                self.update_zn(self.a);
            }
            Mnemonic::Rra => {
                let value = self.read(operand);
                let rotated = (value >> 1) | (self.status.carry as u8) << 7;
                self.write(operand, rotated);
                // The rotated-out bit feeds the addition as carry-in
                self.status.carry = value & 0x01 != 0;
                self.adc_value(rotated);
            }
        }
    }
}
