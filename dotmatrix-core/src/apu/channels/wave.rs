use crate::apu::channels::{read_frequency, Channel, SampleQueue};
use crate::memory::ioregisters::{IoRegister, IoRegisters};
use serde::{Deserialize, Serialize};

// 32 samples per waveform period of 65536 / (2048 - frequency) Hz, so one
// sample step every 2 * (2048 - frequency) CPU cycles
fn sample_step_period(frequency: u16) -> u64 {
    u64::from(2 * (2048 - frequency))
}

/// Wavetable channel: 32 4-bit samples from wave RAM, with a coarse output
/// level shift instead of an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WaveChannel {
    pub(crate) generation_on: bool,
    dac_on: bool,
    frequency: u16,
    length_timer: u16,
    length_timer_enabled: bool,
    volume_shift: u8,
    sample_index: u8,
    last_sample: u8,
    frequency_timer: u64,
    #[serde(skip)]
    pub(crate) sample_queue: SampleQueue,
}

impl WaveChannel {
    pub(crate) fn new() -> Self {
        Self {
            generation_on: false,
            dac_on: false,
            frequency: 0,
            length_timer: 0,
            length_timer_enabled: false,
            volume_shift: 8,
            sample_index: 0,
            last_sample: 0,
            frequency_timer: 0,
            sample_queue: SampleQueue::default(),
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self { sample_queue: self.sample_queue.clone(), ..Self::new() };
    }

    pub(crate) fn process_register_updates(&mut self, io_registers: &mut IoRegisters) {
        let nr30_value = io_registers.apu_read_register(IoRegister::NR30);
        let nr31_value = io_registers.apu_read_register(IoRegister::NR31);
        let nr32_value = io_registers.apu_read_register(IoRegister::NR32);
        let nr34_value = io_registers.apu_read_register(IoRegister::NR34);

        // Output level: mute, x1, x1/2, x1/4
        self.volume_shift = match nr32_value & 0x60 {
            0x00 => 8,
            0x20 => 0,
            0x40 => 1,
            0x60 => 2,
            _ => unreachable!("{nr32_value} & 0x60 was not 0x00/0x20/0x40/0x60"),
        };

        self.length_timer_enabled = nr34_value & 0x40 != 0;
        self.frequency = read_frequency(io_registers, IoRegister::NR33, IoRegister::NR34);

        let triggered = nr34_value & 0x80 != 0;
        if triggered {
            io_registers.apu_write_register(IoRegister::NR34, nr34_value & 0x7F);

            self.length_timer = 256 - u16::from(nr31_value);
            self.frequency_timer = 0;
            self.sample_index = 0;
            self.generation_on = true;
        }

        self.dac_on = nr30_value & 0x80 != 0;
        if !self.dac_on {
            self.generation_on = false;
        }
    }

    pub(crate) fn tick_divider(&mut self, divider_ticks: u64) {
        if self.length_timer_enabled && super::length_timer_ticks(divider_ticks) {
            self.length_timer = self.length_timer.saturating_sub(1);
            if self.length_timer == 0 {
                self.generation_on = false;
            }
        }
    }

    pub(crate) fn tick_clock(&mut self, cycles: u32, io_registers: &IoRegisters) {
        let prev_clock = self.frequency_timer;
        self.frequency_timer += u64::from(cycles);

        let step_period = sample_step_period(self.frequency);
        let steps = self.frequency_timer / step_period - prev_clock / step_period;
        if steps == 0 {
            return;
        }

        self.sample_index = ((u64::from(self.sample_index) + steps) % 32) as u8;

        // Two 4-bit samples per byte, high nibble first
        let samples = io_registers.wave_ram_byte(self.sample_index / 2);
        self.last_sample =
            if self.sample_index % 2 == 0 { samples >> 4 } else { samples & 0x0F };
    }
}

impl Channel for WaveChannel {
    fn sample_digital(&self) -> Option<u8> {
        if !self.dac_on {
            return None;
        }

        if !self.generation_on || self.volume_shift == 8 {
            return Some(0);
        }

        Some(self.last_sample >> self.volume_shift)
    }
}
