use crate::apu::channels::{
    read_frequency, Channel, DutyCycle, SampleQueue, SweepDirection, VolumeControl,
};
use crate::memory::ioregisters::{IoRegister, IoRegisters};
use serde::{Deserialize, Serialize};

// Waveform step rate is 8 * 131072 / (2048 - frequency) Hz, so one step
// every 4 * (2048 - frequency) CPU cycles
fn waveform_step_period(frequency: u16) -> u64 {
    u64::from(4 * (2048 - frequency))
}

/// Square-wave channel with envelope; channel 1 additionally has the
/// frequency sweep unit (nr0 register present).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PulseChannel {
    pub(crate) generation_on: bool,
    dac_on: bool,
    duty_cycle: DutyCycle,
    length_timer: u8,
    length_timer_enabled: bool,
    pub(crate) volume_control: VolumeControl,
    frequency: u16,
    phase_position: u64,
    frequency_timer: u64,
    nr0: Option<IoRegister>,
    nr1: IoRegister,
    nr2: IoRegister,
    nr3: IoRegister,
    nr4: IoRegister,
    #[serde(skip)]
    pub(crate) sample_queue: SampleQueue,
}

impl PulseChannel {
    fn new(
        nr0: Option<IoRegister>,
        nr1: IoRegister,
        nr2: IoRegister,
        nr3: IoRegister,
        nr4: IoRegister,
    ) -> Self {
        Self {
            generation_on: false,
            dac_on: false,
            duty_cycle: DutyCycle::OneEighth,
            length_timer: 0,
            length_timer_enabled: false,
            volume_control: VolumeControl::new(),
            frequency: 0,
            phase_position: 0,
            frequency_timer: 0,
            nr0,
            nr1,
            nr2,
            nr3,
            nr4,
            sample_queue: SampleQueue::default(),
        }
    }

    pub(crate) fn new_channel_1() -> Self {
        Self::new(
            Some(IoRegister::NR10),
            IoRegister::NR11,
            IoRegister::NR12,
            IoRegister::NR13,
            IoRegister::NR14,
        )
    }

    pub(crate) fn new_channel_2() -> Self {
        Self::new(None, IoRegister::NR21, IoRegister::NR22, IoRegister::NR23, IoRegister::NR24)
    }

    // Clears generation state but keeps the host's queue handle alive
    pub(crate) fn reset(&mut self) {
        *self = Self { sample_queue: self.sample_queue.clone(), ..Self::new(self.nr0, self.nr1, self.nr2, self.nr3, self.nr4) };
    }

    pub(crate) fn process_register_updates(&mut self, io_registers: &mut IoRegisters) {
        let nr1_value = io_registers.apu_read_register(self.nr1);
        let nr2_value = io_registers.apu_read_register(self.nr2);
        let nr4_value = io_registers.apu_read_register(self.nr4);

        self.duty_cycle = DutyCycle::from_bits(nr1_value);
        self.length_timer_enabled = nr4_value & 0x40 != 0;
        self.frequency = read_frequency(io_registers, self.nr3, self.nr4);

        let triggered = nr4_value & 0x80 != 0;
        if triggered {
            // Clear the trigger flag
            io_registers.apu_write_register(self.nr4, nr4_value & 0x7F);

            self.volume_control = VolumeControl::from_byte(nr2_value);
            self.length_timer = 64 - (nr1_value & 0x3F);
            self.frequency_timer = 0;
            self.phase_position = 0;
            self.generation_on = true;
        }

        self.dac_on = nr2_value & 0xF8 != 0;
        if !self.dac_on {
            self.generation_on = false;
        }
    }

    pub(crate) fn tick_divider(&mut self, divider_ticks: u64, io_registers: &mut IoRegisters) {
        if let Some(nr0) = self.nr0 {
            self.tick_sweep(divider_ticks, nr0, io_registers);
        }

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

    // Sweep base rate is 128 Hz; pace N adjusts the frequency every N base
    // periods by +/- (f >> shift)
    fn tick_sweep(&mut self, divider_ticks: u64, nr0: IoRegister, io_registers: &mut IoRegisters) {
        let nr0_value = io_registers.apu_read_register(nr0);
        let pace = (nr0_value & 0x70) >> 4;
        let shift = nr0_value & 0x07;
        let direction = if nr0_value & 0x08 != 0 {
            SweepDirection::Decreasing
        } else {
            SweepDirection::Increasing
        };

        if pace == 0 || !self.generation_on {
            return;
        }

        self.frequency = read_frequency(io_registers, self.nr3, self.nr4);
        if self.frequency == 0 || divider_ticks % (4 * u64::from(pace)) != 2 {
            return;
        }

        let delta = self.frequency >> shift;
        let new_frequency = match direction {
            SweepDirection::Increasing => self.frequency + delta,
            SweepDirection::Decreasing => self.frequency.saturating_sub(delta),
        };

        if new_frequency > 0x07FF {
            // Sweep overflow silences the channel
            self.generation_on = false;
            return;
        }

        if shift > 0 {
            self.frequency = new_frequency;

            io_registers.apu_write_register(self.nr3, (self.frequency & 0xFF) as u8);
            let nr4 = io_registers.apu_read_register(self.nr4);
            io_registers
                .apu_write_register(self.nr4, (nr4 & 0xF8) | (self.frequency >> 8) as u8);
        }
    }

    pub(crate) fn tick_clock(&mut self, cycles: u32) {
        let prev_clock = self.frequency_timer;
        self.frequency_timer += u64::from(cycles);

        let step_period = waveform_step_period(self.frequency);
        let steps = self.frequency_timer / step_period - prev_clock / step_period;
        self.phase_position = (self.phase_position + steps) % 8;
    }
}

impl Channel for PulseChannel {
    fn sample_digital(&self) -> Option<u8> {
        if !self.dac_on {
            return None;
        }

        if !self.generation_on {
            return Some(0);
        }

        let wave_step = self.duty_cycle.waveform()[self.phase_position as usize];
        Some(wave_step * self.volume_control.volume)
    }
}
