use crate::cpu::InterruptType;
use crate::memory::ioregisters::{IoRegister, IoRegisters};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

pub const ALL_BUTTONS: [Button; 8] = [
    Button::Right,
    Button::Left,
    Button::Up,
    Button::Down,
    Button::A,
    Button::B,
    Button::Select,
    Button::Start,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoypadState {
    right: bool,
    left: bool,
    up: bool,
    down: bool,
    a: bool,
    b: bool,
    select: bool,
    start: bool,
}

impl JoypadState {
    pub fn new() -> Self {
        Self {
            right: false,
            left: false,
            up: false,
            down: false,
            a: false,
            b: false,
            select: false,
            start: false,
        }
    }

    pub fn set_pressed(&mut self, button: Button, pressed: bool) {
        let field = match button {
            Button::Right => &mut self.right,
            Button::Left => &mut self.left,
            Button::Up => &mut self.up,
            Button::Down => &mut self.down,
            Button::A => &mut self.a,
            Button::B => &mut self.b,
            Button::Select => &mut self.select,
            Button::Start => &mut self.start,
        };
        *field = pressed;
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        match button {
            Button::Right => self.right,
            Button::Left => self.left,
            Button::Up => self.up,
            Button::Down => self.down,
            Button::A => self.a,
            Button::B => self.b,
            Button::Select => self.select,
            Button::Start => self.start,
        }
    }

    // Active-low: a pressed button pulls its bit to 0
    fn direction_nibble(&self) -> u8 {
        !(u8::from(self.right)
            | (u8::from(self.left) << 1)
            | (u8::from(self.up) << 2)
            | (u8::from(self.down) << 3))
            & 0x0F
    }

    fn action_nibble(&self) -> u8 {
        !(u8::from(self.a)
            | (u8::from(self.b) << 1)
            | (u8::from(self.select) << 2)
            | (u8::from(self.start) << 3))
            & 0x0F
    }
}

/// Refresh the low nibble of JOYP from the current button state and the two
/// select bits, raising the JOYPAD interrupt on any high-to-low transition.
pub fn update_joyp_register(joypad_state: &JoypadState, io_registers: &mut IoRegisters) {
    let joyp = io_registers.read_register(IoRegister::JOYP);
    let select_directions = joyp & 0x10 == 0;
    let select_actions = joyp & 0x20 == 0;

    let mut low_nibble = 0x0F;
    if select_directions {
        low_nibble &= joypad_state.direction_nibble();
    }
    if select_actions {
        low_nibble &= joypad_state.action_nibble();
    }

    let old_nibble = joyp & 0x0F;
    io_registers.privileged_set_joyp_low(low_nibble);

    if old_nibble & !low_nibble & 0x0F != 0 {
        io_registers.interrupt_flags().set(InterruptType::Joypad);
    }
}
