use crate::config::{HotkeyConfig, InputConfig};
use dotmatrix_core::{Button, Emulator};
use sdl2::keyboard::Keycode;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyMapError {
    #[error("invalid keycode in input config: {keycode}")]
    InvalidKeycode { keycode: String },
    #[error("keycode used for multiple buttons: {keycode}")]
    DuplicateKeycode { keycode: String },
}

fn try_parse_keycode(s: &str) -> Result<Keycode, KeyMapError> {
    Keycode::from_name(s).ok_or_else(|| KeyMapError::InvalidKeycode { keycode: s.into() })
}

macro_rules! build_key_map {
    ($($config_field:expr => $button:expr),+$(,)?) => {
        {
            let mut map = HashMap::new();

            $(
                let keycode = try_parse_keycode(&$config_field)?;
                if map.insert(keycode, $button).is_some() {
                    return Err(KeyMapError::DuplicateKeycode { keycode: keycode.name() });
                }
            )*

            map
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyMap(HashMap<Keycode, Button>);

impl KeyMap {
    pub fn from_config(input_config: &InputConfig) -> Result<Self, KeyMapError> {
        let map = build_key_map!(
            input_config.up => Button::Up,
            input_config.down => Button::Down,
            input_config.left => Button::Left,
            input_config.right => Button::Right,
            input_config.a => Button::A,
            input_config.b => Button::B,
            input_config.start => Button::Start,
            input_config.select => Button::Select,
        );

        Ok(Self(map))
    }

    pub fn key_down(&self, emulator: &mut Emulator, keycode: Keycode) {
        if let Some(&button) = self.0.get(&keycode) {
            emulator.set_button(button, true);
        }
    }

    pub fn key_up(&self, emulator: &mut Emulator, keycode: Keycode) {
        if let Some(&button) = self.0.get(&keycode) {
            emulator.set_button(button, false);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hotkey {
    Exit,
    ToggleFullscreen,
    SaveState,
    LoadState,
    FastForward,
}

macro_rules! build_hotkey_map {
    ($($config_field:expr => $hotkey:expr),+$(,)?) => {
        {
            let mut map = HashMap::new();

            $(
                if let Some(keycode) = $config_field.as_ref() {
                    let keycode = try_parse_keycode(keycode)?;
                    if map.insert(keycode, $hotkey).is_some() {
                        return Err(KeyMapError::DuplicateKeycode { keycode: keycode.name() });
                    }
                }
            )*

            map
        }
    }
}

#[derive(Debug, Clone)]
pub struct HotkeyMap(HashMap<Keycode, Hotkey>);

impl HotkeyMap {
    pub fn from_config(hotkey_config: &HotkeyConfig) -> Result<Self, KeyMapError> {
        let map = build_hotkey_map!(
            hotkey_config.exit => Hotkey::Exit,
            hotkey_config.toggle_fullscreen => Hotkey::ToggleFullscreen,
            hotkey_config.save_state => Hotkey::SaveState,
            hotkey_config.load_state => Hotkey::LoadState,
            hotkey_config.fast_forward => Hotkey::FastForward,
        );

        Ok(Self(map))
    }

    pub fn check_for_hotkey(&self, keycode: Keycode) -> Option<Hotkey> {
        self.0.get(&keycode).copied()
    }
}
