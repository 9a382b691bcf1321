use dotmatrix_core::{AudioChannel, Emulator, SampleQueue, AUDIO_SAMPLE_RATE};
use sdl2::audio::{AudioQueue, AudioSpecDesired};
use sdl2::AudioSubsystem;
use std::thread;
use std::time::Duration;
use thiserror::Error;

const AUDIO_QUEUE_SIZE: u32 = 1024;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("error pushing audio samples to device sample queue: {msg}")]
    Playback { msg: String },
}

pub fn initialize(audio_subsystem: &AudioSubsystem) -> Result<AudioQueue<i16>, String> {
    let queue = audio_subsystem.open_queue(
        None,
        &AudioSpecDesired {
            freq: Some(AUDIO_SAMPLE_RATE as i32),
            channels: Some(2),
            samples: Some(AUDIO_QUEUE_SIZE as u16),
        },
    )?;
    queue.resume();

    Ok(queue)
}

/// Handles to all four channel queues, refreshed after save-state loads
/// because loading replaces the APU the queues belong to.
pub struct ChannelQueues([SampleQueue; 4]);

impl ChannelQueues {
    pub fn from_emulator(emulator: &Emulator) -> Self {
        Self([
            emulator.audio_samples(AudioChannel::Pulse1),
            emulator.audio_samples(AudioChannel::Pulse2),
            emulator.audio_samples(AudioChannel::Wave),
            emulator.audio_samples(AudioChannel::Noise),
        ])
    }

    // Drains all four channels and sums them into one interleaved stream
    fn mix(&self) -> Vec<i16> {
        let drained = self.0.each_ref().map(SampleQueue::drain);

        let mix_len = drained.iter().map(Vec::len).max().unwrap_or(0);
        let mut mixed = vec![0_i16; mix_len];
        for channel_samples in &drained {
            for (mixed_sample, &sample) in mixed.iter_mut().zip(channel_samples) {
                *mixed_sample = mixed_sample.saturating_add(sample);
            }
        }

        mixed
    }
}

/// Push mixed audio samples to the playback queue if it is not full.
///
/// If it is full and sync_to_audio is enabled, this function will block until
/// it is not full and then push samples.
pub fn push_samples(
    device_queue: &AudioQueue<i16>,
    channel_queues: &ChannelQueues,
    sync_to_audio: bool,
    fast_forwarding: bool,
) -> Result<(), AudioError> {
    // AudioQueue::size returns size in bytes, so multiply by 4 (2 channels *
    // 2 bytes per sample)
    while device_queue.size() >= 4 * AUDIO_QUEUE_SIZE {
        if !sync_to_audio || fast_forwarding {
            // Drop this batch rather than stalling the emulator
            channel_queues.mix();
            return Ok(());
        }

        thread::sleep(Duration::from_micros(250));
    }

    let samples = channel_queues.mix();
    device_queue.queue_audio(&samples).map_err(|msg| AudioError::Playback { msg })?;

    Ok(())
}
