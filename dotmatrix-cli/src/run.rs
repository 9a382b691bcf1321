use crate::audio::{self, AudioError, ChannelQueues};
use crate::config::RunConfig;
use crate::graphics::{self, GraphicsError};
use crate::input::{Hotkey, HotkeyMap, KeyMap, KeyMapError};
use dotmatrix_core::serialize;
use dotmatrix_core::{CartridgeLoadError, Emulator, SaveStateError, CPU_CLOCK_SPEED};
use sdl2::event::Event;
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("error loading cartridge: {source}")]
    CartridgeLoad {
        #[from]
        source: CartridgeLoadError,
    },
    #[error("rendering error: {source}")]
    Rendering {
        #[from]
        source: GraphicsError,
    },
    #[error("audio playback error: {source}")]
    AudioPlayback {
        #[from]
        source: AudioError,
    },
    #[error("SDL2 audio initialization error: {msg}")]
    AudioInit { msg: String },
    #[error("error writing cartridge RAM to sav file: {source}")]
    RamPersist {
        #[source]
        source: io::Error,
    },
    #[error("error processing input config: {source}")]
    InputConfig {
        #[from]
        source: KeyMapError,
    },
    #[error("error saving/loading save state: {source}")]
    SaveState {
        #[from]
        source: SaveStateError,
    },
    #[error("SDL2 error: {sdl_error}")]
    GenericSdl { sdl_error: String },
}

impl From<String> for RunError {
    fn from(value: String) -> Self {
        Self::GenericSdl { sdl_error: value }
    }
}

const CYCLES_PER_FRAME: u64 = 70224;

fn frame_duration() -> Duration {
    Duration::from_nanos(CYCLES_PER_FRAME * 1_000_000_000 / CPU_CLOCK_SPEED)
}

fn window_title(rom_file_path: &str) -> String {
    let file_name =
        Path::new(rom_file_path).file_name().and_then(OsStr::to_str).unwrap_or("<Unknown>");
    format!("dotmatrix - {file_name}")
}

/// Start and run the emulator until it terminates, either by closing it or
/// due to an error.
pub fn run(run_config: &RunConfig) -> Result<(), RunError> {
    log::info!("Running with config:\n{run_config}");

    let mut emulator = Emulator::from_file(&run_config.rom_file_path)?;
    let mut channel_queues = ChannelQueues::from_emulator(&emulator);

    let sdl = sdl2::init()?;
    let video = sdl.video()?;
    let mut event_pump = sdl.event_pump()?;

    let window = video
        .window(
            &window_title(&run_config.rom_file_path),
            run_config.window_width,
            run_config.window_height,
        )
        .resizable()
        .build()
        .map_err(|err| RunError::GenericSdl { sdl_error: err.to_string() })?;
    let mut canvas = graphics::create_renderer(window, run_config)?;
    let texture_creator = canvas.texture_creator();
    let mut texture = graphics::create_frame_texture(&texture_creator)?;

    let audio_playback_queue = if run_config.audio_enabled {
        let audio_subsystem = sdl.audio()?;
        let queue = audio::initialize(&audio_subsystem)
            .map_err(|msg| RunError::AudioInit { msg })?;
        Some(queue)
    } else {
        None
    };

    let key_map = KeyMap::from_config(&run_config.input_config)?;
    let hotkey_map = HotkeyMap::from_config(&run_config.hotkey_config)?;

    let save_state_path = serialize::determine_save_state_path(&run_config.rom_file_path);

    let mut fast_forwarding = false;
    let mut total_frames = 0_u64;
    let mut cycles_since_frame = 0_u64;
    let mut next_frame_time = Instant::now() + frame_duration();

    loop {
        let prev_mode = emulator.ppu_mode();
        cycles_since_frame += u64::from(emulator.step());

        let entered_vblank = prev_mode != dotmatrix_core::ppu::PpuMode::VBlank
            && emulator.ppu_mode() == dotmatrix_core::ppu::PpuMode::VBlank;

        // The cycle-count fallback keeps the host loop alive while the LCD is
        // disabled and no V-Blank transitions occur
        if !entered_vblank && cycles_since_frame < 2 * CYCLES_PER_FRAME {
            continue;
        }
        cycles_since_frame = 0;
        total_frames += 1;

        // Skip every other frame when fast-forwarding
        if entered_vblank && (!fast_forwarding || total_frames % 2 == 0) {
            graphics::render_frame(emulator.frame_buffer(), &mut canvas, &mut texture, run_config)?;
        }

        if let Some(audio_playback_queue) = &audio_playback_queue {
            audio::push_samples(
                audio_playback_queue,
                &channel_queues,
                run_config.sync_to_audio,
                fast_forwarding,
            )?;
        }

        // Write out cartridge RAM roughly once per second at most
        if total_frames % 60 == 0 {
            emulator.persist_cartridge_ram().map_err(|err| RunError::RamPersist { source: err })?;
        }

        for event in event_pump.poll_iter() {
            log::debug!("Received SDL event: {event:?}");
            match event {
                Event::Quit { .. } => {
                    return Ok(());
                }
                Event::KeyDown { keycode: Some(keycode), .. } => {
                    key_map.key_down(&mut emulator, keycode);

                    match hotkey_map.check_for_hotkey(keycode) {
                        Some(Hotkey::Exit) => {
                            return Ok(());
                        }
                        Some(Hotkey::ToggleFullscreen) => {
                            graphics::toggle_fullscreen(&mut canvas, run_config)?;
                        }
                        Some(Hotkey::SaveState) => {
                            serialize::save_state(&emulator, &save_state_path)?;
                        }
                        Some(Hotkey::LoadState) => {
                            match serialize::load_state(&save_state_path, &emulator) {
                                Ok(loaded) => {
                                    emulator = loaded;
                                    // The loaded emulator has fresh sample queues
                                    channel_queues = ChannelQueues::from_emulator(&emulator);
                                }
                                Err(err) => {
                                    log::error!("error loading save state: {err}");
                                }
                            }
                        }
                        Some(Hotkey::FastForward) => {
                            fast_forwarding = true;
                        }
                        None => {}
                    }
                }
                Event::KeyUp { keycode: Some(keycode), .. } => {
                    key_map.key_up(&mut emulator, keycode);

                    if hotkey_map.check_for_hotkey(keycode) == Some(Hotkey::FastForward) {
                        fast_forwarding = false;
                    }
                }
                _ => {}
            }
        }

        // Pace against the wall clock unless audio sync or the display's
        // VSync is already limiting the loop
        let audio_synced = audio_playback_queue.is_some() && run_config.sync_to_audio;
        if !fast_forwarding && !audio_synced && !run_config.vsync_enabled {
            let now = Instant::now();
            if now < next_frame_time {
                std::thread::sleep(next_frame_time - now);
            }
            next_frame_time += frame_duration();
            if next_frame_time < now {
                // Fell behind; don't try to catch up
                next_frame_time = now + frame_duration();
            }
        }
    }
}
