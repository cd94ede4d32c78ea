/// Interrupt lines shared between the PPU, APU and CPU.
///
/// Two boolean flip-flops: the non-maskable line raised by the PPU on vblank
/// entry, and the maskable line raised by the APU frame sequencer. The CPU
/// polls both once per instruction boundary, never mid-instruction.
pub struct Interrupts {
    nmi: bool,
    irq: bool,
}

impl Interrupts {
    pub fn new() -> Self {
        Self {
            nmi: false,
            irq: false,
        }
    }

    pub fn assert_nmi(&mut self) {
        self.nmi = true;
    }

    pub fn deassert_nmi(&mut self) {
        self.nmi = false;
    }

    pub fn is_nmi_asserted(&self) -> bool {
        self.nmi
    }

    pub fn assert_irq(&mut self) {
        self.irq = true;
    }

    pub fn deassert_irq(&mut self) {
        self.irq = false;
    }

    pub fn is_irq_asserted(&self) -> bool {
        self.irq
    }
}

impl Default for Interrupts {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_start_deasserted() {
        let interrupts = Interrupts::new();
        assert!(!interrupts.is_nmi_asserted());
        assert!(!interrupts.is_irq_asserted());
    }

    #[test]
    fn test_nmi_assert_and_deassert() {
        let mut interrupts = Interrupts::new();
        interrupts.assert_nmi();
        assert!(interrupts.is_nmi_asserted());
        interrupts.deassert_nmi();
        assert!(!interrupts.is_nmi_asserted());
    }

    #[test]
    fn test_irq_independent_of_nmi() {
        let mut interrupts = Interrupts::new();
        interrupts.assert_irq();
        assert!(interrupts.is_irq_asserted());
        assert!(!interrupts.is_nmi_asserted());
        interrupts.deassert_irq();
        assert!(!interrupts.is_irq_asserted());
    }
}
