mod channels;

use crate::apu::channels::noise::NoiseChannel;
use crate::apu::channels::pulse::PulseChannel;
use crate::apu::channels::wave::WaveChannel;
use crate::apu::channels::Channel;
use crate::memory::ioregisters::{IoRegister, IoRegisters};
use serde::{Deserialize, Serialize};

pub use channels::SampleQueue;

/// Output sample rate of the per-channel queues.
pub const OUTPUT_FREQUENCY: u64 = 44_100;

// The envelope/length/sweep divider runs at 512 Hz
const DIVIDER_PERIOD_CYCLES: u64 = crate::CPU_CLOCK_SPEED / 512;

// Per-channel scale so that four simultaneous channels cannot clip
const CHANNEL_MIX_SCALE: f64 = 0.25;
const OUTPUT_AMPLITUDE: f64 = 30000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioChannel {
    Pulse1,
    Pulse2,
    Wave,
    Noise,
}

const ALL_AUDIO_REGISTERS: [IoRegister; 21] = [
    IoRegister::NR10,
    IoRegister::NR11,
    IoRegister::NR12,
    IoRegister::NR13,
    IoRegister::NR14,
    IoRegister::NR21,
    IoRegister::NR22,
    IoRegister::NR23,
    IoRegister::NR24,
    IoRegister::NR30,
    IoRegister::NR31,
    IoRegister::NR32,
    IoRegister::NR33,
    IoRegister::NR34,
    IoRegister::NR41,
    IoRegister::NR42,
    IoRegister::NR43,
    IoRegister::NR44,
    IoRegister::NR50,
    IoRegister::NR51,
    IoRegister::NR52,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApuState {
    enabled: bool,
    divider_cycles: u64,
    divider_ticks: u64,
    clock_cycles: u64,
    channel_1: PulseChannel,
    channel_2: PulseChannel,
    channel_3: WaveChannel,
    channel_4: NoiseChannel,
}

impl ApuState {
    pub fn new() -> Self {
        Self {
            enabled: true,
            divider_cycles: 0,
            divider_ticks: 0,
            clock_cycles: 0,
            channel_1: PulseChannel::new_channel_1(),
            channel_2: PulseChannel::new_channel_2(),
            channel_3: WaveChannel::new(),
            channel_4: NoiseChannel::new(),
        }
    }

    /// A handle to the given channel's output queue. The handle stays valid
    /// for the lifetime of the APU, across save-state loads and APU disables.
    pub fn sample_queue(&self, channel: AudioChannel) -> SampleQueue {
        match channel {
            AudioChannel::Pulse1 => self.channel_1.sample_queue.clone(),
            AudioChannel::Pulse2 => self.channel_2.sample_queue.clone(),
            AudioChannel::Wave => self.channel_3.sample_queue.clone(),
            AudioChannel::Noise => self.channel_4.sample_queue.clone(),
        }
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.channel_1.reset();
        self.channel_2.reset();
        self.channel_3.reset();
        self.channel_4.reset();
    }

    fn process_register_updates(&mut self, io_registers: &mut IoRegisters) {
        self.channel_1.process_register_updates(io_registers);
        self.channel_2.process_register_updates(io_registers);
        self.channel_3.process_register_updates(io_registers);
        self.channel_4.process_register_updates(io_registers);
    }

    // Advances the 512 Hz divider and distributes its ticks to the channels'
    // length/envelope/sweep units
    fn tick_divider(&mut self, cycles: u32, io_registers: &mut IoRegisters) {
        let prev_cycles = self.divider_cycles;
        self.divider_cycles += u64::from(cycles);

        let ticks = self.divider_cycles / DIVIDER_PERIOD_CYCLES
            - prev_cycles / DIVIDER_PERIOD_CYCLES;
        for _ in 0..ticks {
            self.divider_ticks += 1;
            self.channel_1.tick_divider(self.divider_ticks, io_registers);
            self.channel_2.tick_divider(self.divider_ticks, io_registers);
            self.channel_3.tick_divider(self.divider_ticks);
            self.channel_4.tick_divider(self.divider_ticks);
        }
    }

    // One output sample is due whenever the elapsed-cycle counter crosses a
    // sample-period boundary
    fn advance_sample_clock(&mut self, cycles: u32) -> bool {
        let prev_cycles = self.clock_cycles;
        self.clock_cycles += u64::from(cycles);

        prev_cycles * OUTPUT_FREQUENCY / crate::CPU_CLOCK_SPEED
            != self.clock_cycles * OUTPUT_FREQUENCY / crate::CPU_CLOCK_SPEED
    }

    fn emit_samples(&self, io_registers: &IoRegisters) {
        let nr50_value = io_registers.apu_read_register(IoRegister::NR50);
        let nr51_value = io_registers.apu_read_register(IoRegister::NR51);

        let left_volume = f64::from((nr50_value & 0x70) >> 4) / 7.0;
        let right_volume = f64::from(nr50_value & 0x07) / 7.0;

        let channels: [(&dyn Channel, &SampleQueue, u8); 4] = [
            (&self.channel_1, &self.channel_1.sample_queue, 0),
            (&self.channel_2, &self.channel_2.sample_queue, 1),
            (&self.channel_3, &self.channel_3.sample_queue, 2),
            (&self.channel_4, &self.channel_4.sample_queue, 3),
        ];

        for (channel, sample_queue, pan_bit) in channels {
            let analog = channel.sample_analog();

            let left_enabled = nr51_value & (0x10 << pan_bit) != 0;
            let right_enabled = nr51_value & (0x01 << pan_bit) != 0;

            let sample_l = scale_sample(analog, left_enabled, left_volume);
            let sample_r = scale_sample(analog, right_enabled, right_volume);
            sample_queue.push_stereo(sample_l, sample_r);
        }
    }

    fn emit_silence(&self) {
        for sample_queue in [
            &self.channel_1.sample_queue,
            &self.channel_2.sample_queue,
            &self.channel_3.sample_queue,
            &self.channel_4.sample_queue,
        ] {
            sample_queue.push_stereo(0, 0);
        }
    }
}

fn scale_sample(analog: f64, pan_enabled: bool, master_volume: f64) -> i16 {
    if !pan_enabled {
        return 0;
    }

    (analog * master_volume * CHANNEL_MIX_SCALE * OUTPUT_AMPLITUDE).round() as i16
}

/// Advance the APU by the given number of CPU cycles: apply register writes
/// (triggers), clock the channels, refresh the NR52 channel-active bits, and
/// emit one stereo sample per channel whenever a sample period elapses.
pub fn tick(apu_state: &mut ApuState, io_registers: &mut IoRegisters, cycles: u32) {
    let nr52_value = io_registers.apu_read_register(IoRegister::NR52);
    let apu_enabled = nr52_value & 0x80 != 0;

    if !apu_enabled {
        if apu_state.enabled {
            // The master disable clears every audio register and resets all
            // channels
            for audio_register in ALL_AUDIO_REGISTERS {
                io_registers.apu_write_register(audio_register, 0x00);
            }
            apu_state.disable();
        }

        // Keep the host fed with silence at the output rate
        if apu_state.advance_sample_clock(cycles) {
            apu_state.emit_silence();
        }

        return;
    }
    apu_state.enabled = true;

    apu_state.process_register_updates(io_registers);
    apu_state.tick_divider(cycles, io_registers);
    apu_state.channel_1.tick_clock(cycles);
    apu_state.channel_2.tick_clock(cycles);
    apu_state.channel_3.tick_clock(cycles, io_registers);
    apu_state.channel_4.tick_clock(cycles);

    let new_nr52_value = (nr52_value & 0x80)
        | (u8::from(apu_state.channel_4.generation_on) << 3)
        | (u8::from(apu_state.channel_3.generation_on) << 2)
        | (u8::from(apu_state.channel_2.generation_on) << 1)
        | u8::from(apu_state.channel_1.generation_on);
    io_registers.apu_write_register(IoRegister::NR52, new_nr52_value);

    if apu_state.advance_sample_clock(cycles) {
        apu_state.emit_samples(io_registers);
    }
}
