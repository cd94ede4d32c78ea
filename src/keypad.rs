/// Controller button, in hardware polling order
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Button {
    A = 0,
    B = 1,
    Select = 2,
    Start = 3,
    Up = 4,
    Down = 5,
    Left = 6,
    Right = 7,
}

impl Button {
    /// All buttons in polling order
    pub const ALL: [Button; 8] = [
        Button::A,
        Button::B,
        Button::Select,
        Button::Start,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
    ];
}

/// Standard controller with a shift-register-like protocol.
///
/// Writing bit 0 high arms the latch; the following write with bit 0 low
/// copies the live button buffer into the latched register and resets the
/// read index. Sequential reads then return one button state each, in the
/// fixed A, B, Select, Start, Up, Down, Left, Right order.
///
/// Live state is fed by the frontend through `press`/`release`; the keypad
/// never reaches out to any global key-event source.
pub struct Keypad {
    strobe: bool,
    index: usize,
    buffer: [bool; 8],
    latched: [bool; 8],
}

impl Keypad {
    pub fn new() -> Self {
        Self {
            strobe: false,
            index: 0,
            buffer: [false; 8],
            latched: [false; 8],
        }
    }

    /// Record a key-down event for a button
    pub fn press(&mut self, button: Button) {
        self.buffer[button as usize] = true;
    }

    /// Record a key-up event for a button
    pub fn release(&mut self, button: Button) {
        self.buffer[button as usize] = false;
    }

    /// Write to the strobe register
    pub fn write(&mut self, value: u8) {
        if value & 0x01 != 0 {
            self.strobe = true;
        } else if self.strobe {
            // Falling edge: latch the live buffer and rewind
            self.strobe = false;
            self.index = 0;
            self.latched = self.buffer;
        }
    }

    /// Read the next latched button state. Reads past the eighth button
    /// report pressed, as the real shift register does.
    pub fn read(&mut self) -> bool {
        if self.index >= 8 {
            return true;
        }
        let state = self.latched[self.index];
        self.index += 1;
        state
    }
}

impl Default for Keypad {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latch(keypad: &mut Keypad) {
        keypad.write(1);
        keypad.write(0);
    }

    #[test]
    fn test_new_keypad_reads_unpressed() {
        let mut keypad = Keypad::new();
        latch(&mut keypad);
        for _ in 0..8 {
            assert!(!keypad.read());
        }
    }

    #[test]
    fn test_sequential_button_reading() {
        let mut keypad = Keypad::new();
        keypad.press(Button::A);
        keypad.press(Button::Start);
        keypad.press(Button::Right);
        latch(&mut keypad);

        assert!(keypad.read()); // A
        assert!(!keypad.read()); // B
        assert!(!keypad.read()); // Select
        assert!(keypad.read()); // Start
        assert!(!keypad.read()); // Up
        assert!(!keypad.read()); // Down
        assert!(!keypad.read()); // Left
        assert!(keypad.read()); // Right
    }

    #[test]
    fn test_reads_past_eighth_report_pressed() {
        let mut keypad = Keypad::new();
        latch(&mut keypad);
        for _ in 0..8 {
            keypad.read();
        }
        assert!(keypad.read());
        assert!(keypad.read());
    }

    #[test]
    fn test_state_latched_on_falling_edge_only() {
        let mut keypad = Keypad::new();
        keypad.press(Button::B);
        keypad.write(1);
        // Button released while strobe still high: falling edge sees the
        // release because the buffer is copied at that point
        keypad.release(Button::B);
        keypad.write(0);

        keypad.read(); // A
        assert!(!keypad.read()); // B
    }

    #[test]
    fn test_relatch_resets_read_index() {
        let mut keypad = Keypad::new();
        keypad.press(Button::A);
        latch(&mut keypad);
        assert!(keypad.read()); // A
        assert!(!keypad.read()); // B

        latch(&mut keypad);
        assert!(keypad.read()); // back at A
    }

    #[test]
    fn test_all_buttons_read_in_polling_order() {
        let mut keypad = Keypad::new();
        for button in Button::ALL {
            keypad.press(button);
        }
        latch(&mut keypad);
        for button in Button::ALL {
            assert!(keypad.read(), "{button:?} should read pressed");
        }
    }

    #[test]
    fn test_press_then_release_updates_buffer() {
        let mut keypad = Keypad::new();
        keypad.press(Button::Left);
        latch(&mut keypad);
        keypad.release(Button::Left);
        // Old latch still holds the press
        for _ in 0..6 {
            keypad.read();
        }
        assert!(keypad.read()); // Left from the old latch

        latch(&mut keypad);
        for _ in 0..6 {
            keypad.read();
        }
        assert!(!keypad.read()); // Left released in the new latch
    }
}
