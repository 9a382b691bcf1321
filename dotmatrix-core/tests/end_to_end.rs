use dotmatrix_core::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};
use dotmatrix_core::{AudioChannel, Button, Emulator, AUDIO_SAMPLE_RATE, CPU_CLOCK_SPEED};

// A ROM whose entry point spins in a tight `JP 0x0150` loop (16 cycles per
// iteration)
fn spin_loop_rom() -> Vec<u8> {
    let mut rom = vec![0x00; 0x8000];
    rom[0x100..0x104].copy_from_slice(&[0x00, 0xC3, 0x50, 0x01]);
    rom[0x150..0x153].copy_from_slice(&[0xC3, 0x50, 0x01]);
    rom
}

fn load(rom: Vec<u8>) -> Emulator {
    Emulator::load(rom, None).expect("synthesized test ROM should load")
}

#[test]
fn post_boot_register_state() {
    let emulator = load(spin_loop_rom());

    assert_eq!(0x0100, emulator.pc());
    assert_eq!(0xFFFE, emulator.sp());
    assert_eq!(0x3F, emulator.read_memory(0xFF00));
    assert_eq!(0x91, emulator.read_memory(0xFF40));
    assert_eq!(0xFC, emulator.read_memory(0xFF47));
    assert_eq!(0x00, emulator.read_memory(0xFF05));
    assert_eq!(0x00, emulator.read_memory(0xFFFF));
}

#[test]
fn nop_and_jump_cycle_counts() {
    let mut rom = vec![0x00; 0x8000];
    rom[0x100..0x104].copy_from_slice(&[0x00, 0xC3, 0x50, 0x01]);
    let mut emulator = load(rom);

    // NOP
    assert_eq!(4, emulator.step());
    assert_eq!(0x0101, emulator.pc());

    // JP 0x0150
    assert_eq!(16, emulator.step());
    assert_eq!(0x0150, emulator.pc());

    // Next instruction (NOP at 0x0150)
    assert_eq!(4, emulator.step());
    assert_eq!(0x0151, emulator.pc());
}

#[test]
fn blank_frame_and_vblank_interrupt() {
    let mut emulator = load(spin_loop_rom());
    emulator.write_memory(0xFF47, 0xE4);
    emulator.write_memory(0xFF0F, 0x00);

    while emulator.read_memory(0xFF44) < SCREEN_HEIGHT {
        emulator.step();
    }

    // VBLANK raised as LY reached 144
    assert_eq!(0x01, emulator.read_memory(0xFF0F) & 0x01);

    // With all of VRAM zero every pixel passes color index 0 through the
    // palette; BGP=0xE4 maps index 0 to shade 0, the brightest luminance
    let frame = emulator.frame_buffer().as_bytes();
    assert_eq!(usize::from(SCREEN_WIDTH) * usize::from(SCREEN_HEIGHT) * 4, frame.len());

    for pixel in frame.chunks_exact(4) {
        assert_eq!(255, pixel[0]);
        assert_eq!(255, pixel[1]);
        assert_eq!(255, pixel[2]);
        assert_eq!(0xFF, pixel[3]);
    }
}

#[test]
fn square_channel_samples() {
    let mut emulator = load(spin_loop_rom());

    emulator.write_memory(0xFF26, 0x80);
    emulator.write_memory(0xFF25, 0xFF);
    emulator.write_memory(0xFF24, 0x77);
    emulator.write_memory(0xFF11, 0xBF);
    emulator.write_memory(0xFF12, 0xF0);
    emulator.write_memory(0xFF13, 0x00);
    emulator.write_memory(0xFF14, 0x87);

    let queue = emulator.audio_samples(AudioChannel::Pulse1);
    queue.drain();

    let mut total_cycles = 0_u64;
    while total_cycles < CPU_CLOCK_SPEED / 10 {
        total_cycles += u64::from(emulator.step());
    }

    let samples = queue.drain();
    let expected_stereo_pairs = total_cycles * AUDIO_SAMPLE_RATE / CPU_CLOCK_SPEED;
    assert_eq!(2 * expected_stereo_pairs as usize, samples.len());

    // Full volume, full pan, full master: the waveform alternates between the
    // two full-scale amplitudes
    let amplitude = (0.25 * 30000.0) as i16;
    assert!(samples.iter().all(|&sample| sample == amplitude || sample == -amplitude));
    assert!(samples.iter().any(|&sample| sample == amplitude));
    assert!(samples.iter().any(|&sample| sample == -amplitude));

    // The other channels emitted the same number of (silent) samples
    assert_eq!(samples.len(), emulator.audio_samples(AudioChannel::Noise).drain().len());
}

#[test]
fn timer_increments_and_overflow_interrupt() {
    let mut emulator = load(spin_loop_rom());

    // Enabled, rate 1/16
    emulator.write_memory(0xFF07, 0x05);
    emulator.write_memory(0xFF06, 0xFE);

    // 3 spin iterations = 48 cycles = 3 TIMA increments
    for _ in 0..3 {
        emulator.step();
    }
    assert_eq!(3, emulator.read_memory(0xFF05));
    assert_eq!(0x00, emulator.read_memory(0xFF0F) & 0x04);

    // Run until the overflow
    let mut steps = 0;
    while emulator.read_memory(0xFF0F) & 0x04 == 0 {
        emulator.step();
        steps += 1;
        assert!(steps < 10000, "timer interrupt should have been raised");
    }

    // TIMA reloaded from TMA
    assert_eq!(0xFE, emulator.read_memory(0xFF05));
}

#[test]
fn lyc_interrupt_once_per_frame() {
    let mut emulator = load(spin_loop_rom());

    emulator.write_memory(0xFF45, 10);
    // Enable only the LYC interrupt source
    emulator.write_memory(0xFF41, 0x40);
    emulator.write_memory(0xFF0F, 0x00);

    const FRAME_CYCLES: u64 = 70224;

    let mut stat_interrupts = 0;
    let mut total_cycles = 0_u64;
    while total_cycles < 2 * FRAME_CYCLES {
        total_cycles += u64::from(emulator.step());

        if emulator.read_memory(0xFF0F) & 0x02 != 0 {
            stat_interrupts += 1;
            emulator.write_memory(0xFF0F, emulator.read_memory(0xFF0F) & !0x02);
        }
    }

    assert_eq!(2, stat_interrupts);
}

#[test]
fn button_press_raises_joypad_interrupt() {
    let mut emulator = load(spin_loop_rom());

    // Select the action group (bit 5 low)
    emulator.write_memory(0xFF00, 0x10);
    emulator.step();
    emulator.write_memory(0xFF0F, 0x00);

    emulator.set_button(Button::A, true);
    emulator.step();

    assert_eq!(0x10, emulator.read_memory(0xFF0F) & 0x10);
    // A is bit 0, active-low
    assert_eq!(0x0E, emulator.read_memory(0xFF00) & 0x0F);
}

#[test]
fn halt_wakes_without_service_when_ime_off() {
    let mut rom = vec![0x00; 0x8000];
    rom[0x100..0x104].copy_from_slice(&[0x00, 0xC3, 0x50, 0x01]);
    // HALT; LD C, 0x42
    rom[0x150..0x153].copy_from_slice(&[0x76, 0x0E, 0x42]);
    let mut emulator = load(rom);

    // Timer interrupt enabled in IE, fast timer, IME off
    emulator.write_memory(0xFFFF, 0x04);
    emulator.write_memory(0xFF07, 0x05);
    emulator.write_memory(0xFF0F, 0x00);

    // NOP, JP, HALT
    for _ in 0..3 {
        emulator.step();
    }
    assert_eq!(0x0151, emulator.pc());

    // Halted steps bill 4 cycles each until the timer request fires
    let mut steps = 0;
    while emulator.read_memory(0xFF0F) & 0x04 == 0 {
        assert_eq!(4, emulator.step());
        steps += 1;
        assert!(steps < 100000, "timer interrupt should have been requested");
    }

    // The next step leaves halt and executes LD C, 0x42 without jumping to
    // the handler
    emulator.step();
    emulator.step();
    assert_eq!(0x0153, emulator.pc());
    // Request still pending, not serviced
    assert_eq!(0x04, emulator.read_memory(0xFF0F) & 0x04);
}

#[test]
fn halt_service_when_ime_on() {
    let mut rom = vec![0x00; 0x8000];
    rom[0x100..0x104].copy_from_slice(&[0x00, 0xC3, 0x50, 0x01]);
    // EI; NOP; HALT
    rom[0x150..0x153].copy_from_slice(&[0xFB, 0x00, 0x76]);
    let mut emulator = load(rom);

    emulator.write_memory(0xFFFF, 0x04);
    emulator.write_memory(0xFF07, 0x05);
    emulator.write_memory(0xFF0F, 0x00);

    // NOP, JP, EI, NOP, HALT
    for _ in 0..5 {
        emulator.step();
    }
    assert_eq!(0x0153, emulator.pc());

    let mut steps = 0;
    while emulator.pc() != 0x0050 {
        emulator.step();
        steps += 1;
        assert!(steps < 100000, "timer interrupt should have been serviced");
    }

    // Serviced: IF bit cleared, return address on the stack
    assert_eq!(0x00, emulator.read_memory(0xFF0F) & 0x04);
    assert_eq!(0xFFFC, emulator.sp());
    assert_eq!(0x53, emulator.read_memory(0xFFFC));
    assert_eq!(0x01, emulator.read_memory(0xFFFD));
}

#[test]
fn echo_ram_and_div_reset_through_the_bus() {
    let mut emulator = load(spin_loop_rom());

    emulator.write_memory(0xC123, 0x5A);
    assert_eq!(0x5A, emulator.read_memory(0xE123));

    emulator.write_memory(0xFF04, 0x99);
    assert_eq!(0x00, emulator.read_memory(0xFF04));

    emulator.write_memory(0xFF0F, 0xFF);
    assert_eq!(0xFF, emulator.read_memory(0xFF0F));
}
