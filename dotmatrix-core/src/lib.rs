//! A system-on-chip emulator for the original monochrome handheld: CPU
//! interpreter, banked memory map, pixel-processing unit, four-channel sound
//! generator, timer block, interrupt controller, and joypad latch, advanced in
//! lockstep one instruction at a time.
//!
//! The host drives timing and presentation: call [`Emulator::step`] in a loop
//! paced against [`CPU_CLOCK_SPEED`], present [`Emulator::frame_buffer`], and
//! drain the per-channel [`SampleQueue`]s.

pub mod apu;
pub mod cpu;
pub mod joypad;
pub mod memory;
pub mod ppu;
pub mod serialize;
pub mod timer;

use crate::apu::ApuState;
use crate::cpu::{CpuRegisters, ImeState};
use crate::joypad::JoypadState;
use crate::memory::ioregisters::IoRegister;
use crate::memory::{AddressSpace, Cartridge};
use crate::ppu::PpuState;
use crate::timer::TimerCounter;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;

pub use apu::{AudioChannel, SampleQueue, OUTPUT_FREQUENCY as AUDIO_SAMPLE_RATE};
pub use joypad::Button;
pub use memory::CartridgeLoadError;
pub use ppu::FrameBuffer;
pub use serialize::SaveStateError;

/// CPU clock frequency in Hz.
pub const CPU_CLOCK_SPEED: u64 = 4_194_304;

#[derive(Serialize, Deserialize)]
pub struct Emulator {
    pub(crate) address_space: AddressSpace,
    cpu_registers: CpuRegisters,
    ppu_state: PpuState,
    apu_state: ApuState,
    timer_counter: TimerCounter,
    joypad_state: JoypadState,
}

impl Emulator {
    /// Configure the memory-bank controller from the cartridge header and
    /// initialize all state to the documented post-boot values.
    ///
    /// If `sav_path` is given and the cartridge has a battery, external RAM is
    /// loaded from and persisted to that path.
    pub fn load(rom: Vec<u8>, sav_path: Option<PathBuf>) -> Result<Self, CartridgeLoadError> {
        let cartridge = Cartridge::new(rom, sav_path)?;

        Ok(Self {
            address_space: AddressSpace::new(cartridge),
            cpu_registers: CpuRegisters::new(),
            ppu_state: PpuState::new(),
            apu_state: ApuState::new(),
            timer_counter: TimerCounter::new(),
            joypad_state: JoypadState::new(),
        })
    }

    pub fn from_file(file_path: &str) -> Result<Self, CartridgeLoadError> {
        let cartridge = Cartridge::from_file(file_path)?;

        Ok(Self {
            address_space: AddressSpace::new(cartridge),
            cpu_registers: CpuRegisters::new(),
            ppu_state: PpuState::new(),
            apu_state: ApuState::new(),
            timer_counter: TimerCounter::new(),
            joypad_state: JoypadState::new(),
        })
    }

    /// Execute one instruction (or bill an idle cycle while halted), service a
    /// pending interrupt, and advance the PPU, APU, timer, and joypad by the
    /// elapsed cycle count, which is returned.
    pub fn step(&mut self) -> u32 {
        // Interrupt requests raised by the peripherals below are only
        // considered on the next step
        let pending = self.address_space.get_io_registers().read_register(IoRegister::IF)
            & self.address_space.get_ie_register()
            & 0x1F;

        // TMA is latched before the instruction in case the instruction
        // overwrites it mid-reload
        let timer_modulo = timer::read_timer_modulo(self.address_space.get_io_registers());

        let mut cycles = if self.cpu_registers.halted {
            // Halt is left on any pending request, even with IME off (in
            // which case no interrupt is serviced)
            if pending != 0 && self.cpu_registers.ime != ImeState::Enabled {
                self.cpu_registers.halted = false;
            }
            4
        } else {
            let (instruction, pc) =
                cpu::instructions::parse_next_instruction(&self.address_space, self.cpu_registers.pc);

            log::trace!(
                "Executing instruction {instruction:04X?} at PC {:04X}",
                self.cpu_registers.pc
            );

            self.cpu_registers.pc = pc;
            let cycles = instruction.cycles_required(&self.cpu_registers);
            instruction.execute(&mut self.address_space, &mut self.cpu_registers);
            cycles
        };

        if self.cpu_registers.ime == ImeState::Enabled && pending != 0 {
            cpu::execute_interrupt_service_routine(
                &mut self.cpu_registers,
                &mut self.address_space,
                pending,
            );
            cycles += cpu::ISR_CYCLES_REQUIRED;
        }

        ppu::tick(&mut self.ppu_state, &mut self.address_space, cycles);
        apu::tick(&mut self.apu_state, self.address_space.get_io_registers_mut(), cycles);
        timer::update_timer_registers(
            self.address_space.get_io_registers_mut(),
            &mut self.timer_counter,
            timer_modulo,
            cycles,
        );
        joypad::update_joyp_register(
            &self.joypad_state,
            self.address_space.get_io_registers_mut(),
        );

        cycles
    }

    /// The 160x144 RGBA frame buffer. A frame is complete each time the PPU
    /// enters V-Blank (VBLANK interrupt flag, or [`Emulator::ppu_mode`]).
    pub fn frame_buffer(&self) -> &FrameBuffer {
        self.ppu_state.frame_buffer()
    }

    pub fn ppu_mode(&self) -> ppu::PpuMode {
        self.ppu_state.mode()
    }

    /// Update one entry of the button-state array. Takes effect on the next
    /// step.
    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.joypad_state.set_pressed(button, pressed);
    }

    pub fn button_pressed(&self, button: Button) -> bool {
        self.joypad_state.is_pressed(button)
    }

    /// A handle to the given sound channel's stereo sample queue.
    pub fn audio_samples(&self, channel: AudioChannel) -> SampleQueue {
        self.apu_state.sample_queue(channel)
    }

    /// Write battery-backed cartridge RAM to its sav file if it changed since
    /// the last call.
    pub fn persist_cartridge_ram(&mut self) -> Result<(), io::Error> {
        self.address_space.persist_cartridge_ram()
    }

    /// Read a byte from the emulated address space. Intended for host-side
    /// inspection and tests.
    pub fn read_memory(&self, address: u16) -> u8 {
        self.address_space.read_address_u8(address)
    }

    /// Write a byte into the emulated address space, as if the CPU had
    /// written it.
    pub fn write_memory(&mut self, address: u16, value: u8) {
        self.address_space.write_address_u8(address, value);
    }

    pub fn pc(&self) -> u16 {
        self.cpu_registers.pc
    }

    pub fn sp(&self) -> u16 {
        self.cpu_registers.sp
    }
}
