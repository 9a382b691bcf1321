use crate::apu::channels::{Channel, SampleQueue, VolumeControl};
use crate::memory::ioregisters::{IoRegister, IoRegisters};
use serde::{Deserialize, Serialize};

/// Pseudo-random noise channel: a 15- or 7-bit linear-feedback shift register
/// clocked at 524288 / r / 2^(s+1) Hz, output scaled by the envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct NoiseChannel {
    pub(crate) generation_on: bool,
    dac_on: bool,
    length_timer: u8,
    length_timer_enabled: bool,
    volume_control: VolumeControl,
    clock_shift: u8,
    clock_divider_code: u8,
    lfsr: u16,
    seven_bit_mode: bool,
    frequency_timer: u64,
    #[serde(skip)]
    pub(crate) sample_queue: SampleQueue,
}

impl NoiseChannel {
    pub(crate) fn new() -> Self {
        Self {
            generation_on: false,
            dac_on: false,
            length_timer: 0,
            length_timer_enabled: false,
            volume_control: VolumeControl::new(),
            clock_shift: 0,
            clock_divider_code: 0,
            lfsr: 0x7FFF,
            seven_bit_mode: false,
            frequency_timer: 0,
            sample_queue: SampleQueue::default(),
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self { sample_queue: self.sample_queue.clone(), ..Self::new() };
    }

    pub(crate) fn process_register_updates(&mut self, io_registers: &mut IoRegisters) {
        let nr41_value = io_registers.apu_read_register(IoRegister::NR41);
        let nr42_value = io_registers.apu_read_register(IoRegister::NR42);
        let nr43_value = io_registers.apu_read_register(IoRegister::NR43);
        let nr44_value = io_registers.apu_read_register(IoRegister::NR44);

        self.clock_shift = nr43_value >> 4;
        self.seven_bit_mode = nr43_value & 0x08 != 0;
        self.clock_divider_code = nr43_value & 0x07;

        self.length_timer_enabled = nr44_value & 0x40 != 0;

        let triggered = nr44_value & 0x80 != 0;
        if triggered {
            io_registers.apu_write_register(IoRegister::NR44, nr44_value & 0x7F);

            self.volume_control = VolumeControl::from_byte(nr42_value);
            self.length_timer = 64 - (nr41_value & 0x3F);
            self.frequency_timer = 0;
            // An all-ones seed; all-zero would never leave silence
            self.lfsr = 0x7FFF;
            self.generation_on = true;
        }

        self.dac_on = nr42_value & 0xF8 != 0;
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

        if self.volume_control.should_step(divider_ticks) {
            self.volume_control.step();
        }
    }

    pub(crate) fn tick_clock(&mut self, cycles: u32) {
        let prev_clock = self.frequency_timer;
        self.frequency_timer += u64::from(cycles);

        // Divider code 0 counts as 0.5; one LFSR clock every
        // 16 * divider * 2^shift CPU cycles
        let step_period: u64 = if self.clock_divider_code == 0 {
            8 << self.clock_shift
        } else {
            (16 * u64::from(self.clock_divider_code)) << self.clock_shift
        };

        let steps = self.frequency_timer / step_period - prev_clock / step_period;
        for _ in 0..steps {
            self.step_lfsr();
        }
    }

    // XOR the two low bits, shift right, insert the XOR bit at position 14
    // (and position 6 in 7-bit mode)
    fn step_lfsr(&mut self) {
        let feedback = (self.lfsr ^ (self.lfsr >> 1)) & 0x0001;
        self.lfsr >>= 1;
        self.lfsr = (self.lfsr & !(1 << 14)) | (feedback << 14);
        if self.seven_bit_mode {
            self.lfsr = (self.lfsr & !(1 << 6)) | (feedback << 6);
        }
    }
}

impl Channel for NoiseChannel {
    fn sample_digital(&self) -> Option<u8> {
        if !self.dac_on {
            return None;
        }

        if !self.generation_on {
            return Some(0);
        }

        if self.lfsr & 0x0001 != 0 {
            Some(self.volume_control.volume)
        } else {
            Some(0)
        }
    }
}
