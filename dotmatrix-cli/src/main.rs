mod audio;
mod config;
mod graphics;
mod input;
mod run;

use clap::Parser;
use config::{HotkeyConfig, InputConfig, RunConfig};
use std::error::Error;

#[derive(Parser)]
struct Cli {
    #[arg(short = 'f', long = "rom-file-path")]
    rom_file_path: String,
    #[arg(short = 'a', long = "audio-enabled", default_value_t = false)]
    audio_enabled: bool,
    #[arg(long = "no-audio-sync", default_value_t = true, action = clap::ArgAction::SetFalse)]
    sync_to_audio: bool,
    #[arg(long = "no-vsync", default_value_t = true, action = clap::ArgAction::SetFalse)]
    vsync_enabled: bool,
    #[arg(long = "launch-fullscreen", default_value_t = false)]
    launch_fullscreen: bool,
    #[arg(long = "borderless-fullscreen", default_value_t = false)]
    borderless_fullscreen: bool,
    #[arg(long = "force-integer-scaling", default_value_t = false)]
    force_integer_scaling: bool,
    #[arg(short = 'w', long = "window-width", default_value_t = 640)]
    window_width: u32,
    #[arg(short = 'l', long = "window-height", default_value_t = 576)]
    window_height: u32,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = Cli::parse();

    let run_config = RunConfig {
        rom_file_path: args.rom_file_path,
        audio_enabled: args.audio_enabled,
        sync_to_audio: args.sync_to_audio,
        vsync_enabled: args.vsync_enabled,
        launch_fullscreen: args.launch_fullscreen,
        borderless_fullscreen: args.borderless_fullscreen,
        force_integer_scaling: args.force_integer_scaling,
        window_width: args.window_width,
        window_height: args.window_height,
        input_config: InputConfig::default(),
        hotkey_config: HotkeyConfig::default(),
    };

    run::run(&run_config)?;

    Ok(())
}
