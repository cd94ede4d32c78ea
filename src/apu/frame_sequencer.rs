/// CPU cycles per sequencer step (the NTSC quarter-frame interval,
/// truncated from 7457.5)
const STEP_CYCLES: u64 = 7457;

/// Clock edges produced by a batch of cycles
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SequencerClocks {
    pub quarter_frames: u32,
    pub half_frames: u32,
    /// The 4-step sequence raises the frame interrupt on its last step
    pub raise_irq: bool,
}

/// Frame sequencer: divides CPU cycles into the quarter- and half-frame
/// clocks that drive envelopes, sweeps, linear counters and length counters.
/// Runs in a 4-step mode (with a frame interrupt) or a 5-step mode.
pub struct FrameSequencer {
    five_step_mode: bool,
    irq_inhibit: bool,
    cycle: u64,
    step: u8,
    frame_irq: bool,
}

impl FrameSequencer {
    pub fn new() -> Self {
        Self {
            five_step_mode: false,
            irq_inhibit: false,
            cycle: 0,
            step: 0,
            frame_irq: false,
        }
    }

    /// Mode register (0x4017). Bit 7 selects 5-step mode, bit 6 inhibits
    /// (and clears) the frame interrupt. Writing restarts the sequence;
    /// selecting 5-step mode clocks everything immediately.
    pub fn write_register(&mut self, value: u8) -> SequencerClocks {
        self.five_step_mode = value & 0x80 != 0;
        self.irq_inhibit = value & 0x40 != 0;
        if self.irq_inhibit {
            self.frame_irq = false;
        }
        self.cycle = 0;
        self.step = 0;

        if self.five_step_mode {
            SequencerClocks {
                quarter_frames: 1,
                half_frames: 1,
                raise_irq: false,
            }
        } else {
            SequencerClocks::default()
        }
    }

    /// Advance by a batch of CPU cycles, reporting the clock edges crossed
    pub fn exec(&mut self, cycles: u64) -> SequencerClocks {
        self.cycle += cycles;
        let mut clocks = SequencerClocks::default();

        while self.cycle >= STEP_CYCLES {
            self.cycle -= STEP_CYCLES;
            self.step += 1;

            if self.five_step_mode {
                // Steps 1,2,3,5 clock envelopes; 2 and 5 clock lengths;
                // step 4 is idle
                if self.step != 4 {
                    clocks.quarter_frames += 1;
                }
                if self.step == 2 || self.step == 5 {
                    clocks.half_frames += 1;
                }
                if self.step == 5 {
                    self.step = 0;
                }
            } else {
                clocks.quarter_frames += 1;
                if self.step == 2 || self.step == 4 {
                    clocks.half_frames += 1;
                }
                if self.step == 4 {
                    self.step = 0;
                    if !self.irq_inhibit {
                        self.frame_irq = true;
                        clocks.raise_irq = true;
                    }
                }
            }
        }
        clocks
    }

    /// Frame interrupt flag, reported in the status register
    pub fn frame_irq(&self) -> bool {
        self.frame_irq
    }

    /// Status reads clear the frame interrupt flag
    pub fn clear_frame_irq(&mut self) {
        self.frame_irq = false;
    }

    pub fn is_five_step_mode(&self) -> bool {
        self.five_step_mode
    }
}

impl Default for FrameSequencer {
    fn default() -> Self {
        Self::new()
    }
}
