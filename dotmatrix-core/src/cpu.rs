pub(crate) mod instructions;
mod registers;


use crate::memory::AddressSpace;

pub use registers::{CpuRegisters, ImeState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptType {
    VBlank,
    LcdStatus,
    Timer,
    Serial,
    Joypad,
}

impl InterruptType {
    pub fn bit(self) -> u8 {
        match self {
            Self::VBlank => 1 << 0,
            Self::LcdStatus => 1 << 1,
            Self::Timer => 1 << 2,
            Self::Serial => 1 << 3,
            Self::Joypad => 1 << 4,
        }
    }

    pub fn handler_address(self) -> u16 {
        match self {
            Self::VBlank => 0x0040,
            Self::LcdStatus => 0x0048,
            Self::Timer => 0x0050,
            Self::Serial => 0x0058,
            Self::Joypad => 0x0060,
        }
    }

    // Lowest set bit wins
    fn highest_priority_pending(pending: u8) -> Option<Self> {
        [Self::VBlank, Self::LcdStatus, Self::Timer, Self::Serial, Self::Joypad]
            .into_iter()
            .find(|interrupt_type| pending & interrupt_type.bit() != 0)
    }
}

/// Cycles billed for redirecting execution into an interrupt handler.
pub const ISR_CYCLES_REQUIRED: u32 = 20;

/// Service the highest-priority interrupt in the given pending mask
/// (`IF & IE`): clear IME and the chosen IF bit, push PC, jump to the fixed
/// handler address, and wake the CPU if it was halted.
pub fn execute_interrupt_service_routine(
    cpu_registers: &mut CpuRegisters,
    address_space: &mut AddressSpace,
    pending: u8,
) {
    let Some(interrupt_type) = InterruptType::highest_priority_pending(pending) else {
        return;
    };

    log::trace!(
        "Servicing {interrupt_type:?} interrupt, handler address {:04X}",
        interrupt_type.handler_address()
    );

    cpu_registers.ime = ImeState::Disabled;
    address_space.get_io_registers_mut().interrupt_flags().clear(interrupt_type);

    cpu_registers.sp = cpu_registers.sp.wrapping_sub(2);
    address_space.write_address_u16(cpu_registers.sp, cpu_registers.pc);

    cpu_registers.pc = interrupt_type.handler_address();
    cpu_registers.halted = false;
}
