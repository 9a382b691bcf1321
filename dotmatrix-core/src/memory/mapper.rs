use crate::memory::address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MapperType {
    None,
    Mbc1,
    Mbc2,
    Mbc3,
    Mbc5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RamMapResult {
    // Relative address into the full RAM array
    RamAddress(u32),
    // The RAM address is currently mapped to an MBC3 clock register
    RtcRegister,
    // The RAM address is invalid or RAM access is disabled
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum Mapper {
    None,
    Mbc1 {
        rom_bank_bit_mask: u8,
        ram_bank_bit_mask: u8,
        ram_enable: u8,
        rom_bank_number: u8,
        ram_bank_number: u8,
        banking_mode_select: u8,
    },
    Mbc2 {
        rom_bank_bit_mask: u8,
        ram_enable: u8,
        rom_bank_number: u8,
    },
    Mbc3 {
        rom_bank_bit_mask: u8,
        ram_enable: u8,
        rom_bank_number: u8,
        ram_bank_number: u8,
    },
    Mbc5 {
        rom_bank_bit_mask: u16,
        ram_bank_bit_mask: u8,
        ram_enable: u8,
        rom_bank_number: u16,
        ram_bank_number: u8,
    },
}

impl Mapper {
    pub(crate) fn new(mapper_type: MapperType, rom_size: u32, ram_size: u32) -> Self {
        let rom_bank_bit_mask =
            if rom_size >= 1 << 14 { ((rom_size >> 14) - 1) as u16 } else { 0 };
        let ram_bank_bit_mask = if ram_size >= 1 << 13 { ((ram_size >> 13) - 1) as u8 } else { 0 };

        log::debug!("setting ROM bit mask to {rom_bank_bit_mask:02X} for size {rom_size}");
        log::debug!("setting RAM bit mask to {ram_bank_bit_mask:02X} for size {ram_size}");

        match mapper_type {
            MapperType::None => Self::None,
            MapperType::Mbc1 => Self::Mbc1 {
                rom_bank_bit_mask: rom_bank_bit_mask as u8,
                ram_bank_bit_mask,
                ram_enable: 0x00,
                rom_bank_number: 0x00,
                ram_bank_number: 0x00,
                banking_mode_select: 0x00,
            },
            MapperType::Mbc2 => Self::Mbc2 {
                rom_bank_bit_mask: rom_bank_bit_mask as u8,
                ram_enable: 0x00,
                rom_bank_number: 0x00,
            },
            MapperType::Mbc3 => Self::Mbc3 {
                rom_bank_bit_mask: rom_bank_bit_mask as u8,
                ram_enable: 0x00,
                rom_bank_number: 0x00,
                ram_bank_number: 0x00,
            },
            MapperType::Mbc5 => Self::Mbc5 {
                rom_bank_bit_mask,
                ram_bank_bit_mask,
                ram_enable: 0x00,
                rom_bank_number: 0x01,
                ram_bank_number: 0x00,
            },
        }
    }

    pub(crate) fn map_rom_address(&self, address: u16) -> u32 {
        match self {
            Self::None => u32::from(address),
            &Self::Mbc1 {
                rom_bank_bit_mask,
                rom_bank_number,
                ram_bank_number,
                banking_mode_select,
                ..
            } => {
                let rom_bank_number = promote_bank_0(rom_bank_number);

                match address {
                    address @ 0x0000..=0x3FFF => {
                        if banking_mode_select == 0x00 {
                            u32::from(address)
                        } else {
                            let bank_number = (ram_bank_number << 5) & rom_bank_bit_mask;
                            u32::from(address) + (u32::from(bank_number) << 14)
                        }
                    }
                    address @ 0x4000..=0x7FFF => {
                        let bank_number = if banking_mode_select == 0x00 {
                            rom_bank_number & rom_bank_bit_mask
                        } else {
                            (rom_bank_number | (ram_bank_number << 5)) & rom_bank_bit_mask
                        };
                        u32::from(address - 0x4000) + (u32::from(bank_number) << 14)
                    }
                    _ => panic!(
                        "mapper called for address outside of cartridge address range: {address:04X}"
                    ),
                }
            }
            &Self::Mbc2 { rom_bank_bit_mask, rom_bank_number, .. }
            | &Self::Mbc3 { rom_bank_bit_mask, rom_bank_number, .. } => {
                let rom_bank_number = promote_bank_0(rom_bank_number);

                match address {
                    address @ 0x0000..=0x3FFF => u32::from(address),
                    address @ 0x4000..=0x7FFF => {
                        let bank_number = rom_bank_number & rom_bank_bit_mask;
                        u32::from(address - 0x4000) + (u32::from(bank_number) << 14)
                    }
                    _ => panic!(
                        "mapper called for address outside of cartridge address range: {address:04X}"
                    ),
                }
            }
            &Self::Mbc5 { rom_bank_bit_mask, rom_bank_number, .. } => {
                let rom_bank_number = if rom_bank_number == 0x0000 { 0x0001 } else { rom_bank_number };

                match address {
                    address @ 0x0000..=0x3FFF => u32::from(address),
                    address @ 0x4000..=0x7FFF => {
                        let bank_number = rom_bank_number & rom_bank_bit_mask;
                        u32::from(address - 0x4000) + (u32::from(bank_number) << 14)
                    }
                    _ => panic!(
                        "mapper called for address outside of cartridge address range: {address:04X}"
                    ),
                }
            }
        }
    }

    // ROM writes don't modify the ROM, they set cartridge control registers
    pub(crate) fn write_rom_address(&mut self, address: u16, value: u8) {
        match self {
            Self::None => {}
            Self::Mbc1 {
                ram_enable,
                rom_bank_number,
                ram_bank_number,
                banking_mode_select,
                ..
            } => match address {
                _address @ 0x0000..=0x1FFF => {
                    log::trace!("MBC1 ram_enable changed to {value:02X}");
                    *ram_enable = value;
                }
                _address @ 0x2000..=0x3FFF => {
                    log::trace!("MBC1 rom_bank_number changed to {value:02X}");
                    *rom_bank_number = value & 0x1F;
                }
                _address @ 0x4000..=0x5FFF => {
                    log::trace!("MBC1 ram_bank_number changed to {value:02X}");
                    *ram_bank_number = value & 0x03;
                }
                _address @ 0x6000..=0x7FFF => {
                    log::trace!("MBC1 banking_mode_select changed to {value:02X}");
                    *banking_mode_select = value & 0x01;
                }
                _ => panic!("invalid ROM write address in MBC1 mapper: {address:04X}"),
            },
            Self::Mbc2 { ram_enable, rom_bank_number, .. } => match address {
                // Address bit 8 selects between the RAM enable and ROM bank registers
                address @ 0x0000..=0x3FFF => {
                    if address & 0x0100 != 0 {
                        *rom_bank_number = value & 0x0F;
                    } else {
                        *ram_enable = value;
                    }
                }
                _address @ 0x4000..=0x7FFF => {}
                _ => panic!("invalid ROM write address in MBC2 mapper: {address:04X}"),
            },
            Self::Mbc3 { ram_enable, rom_bank_number, ram_bank_number, .. } => match address {
                _address @ 0x0000..=0x1FFF => {
                    *ram_enable = value;
                }
                _address @ 0x2000..=0x3FFF => {
                    *rom_bank_number = value & 0x7F;
                }
                _address @ 0x4000..=0x5FFF => {
                    *ram_bank_number = value;
                }
                // RTC latch; the clock is out of scope so latching is a no-op
                _address @ 0x6000..=0x7FFF => {}
                _ => panic!("invalid ROM write address in MBC3 mapper: {address:04X}"),
            },
            Self::Mbc5 { ram_enable, rom_bank_number, ram_bank_number, .. } => match address {
                _address @ 0x0000..=0x1FFF => {
                    *ram_enable = value;
                }
                _address @ 0x2000..=0x2FFF => {
                    *rom_bank_number = (*rom_bank_number & 0xFF00) | u16::from(value);
                }
                _address @ 0x3000..=0x3FFF => {
                    *rom_bank_number =
                        (u16::from(value & 0x01) << 8) | (*rom_bank_number & 0x00FF);
                }
                _address @ 0x4000..=0x5FFF => {
                    *ram_bank_number = value;
                }
                _address @ 0x6000..=0x7FFF => {}
                _ => panic!("invalid ROM write address in MBC5 mapper: {address:04X}"),
            },
        }
    }

    pub(crate) fn map_ram_address(&self, address: u16) -> RamMapResult {
        let relative_address = address - address::EXTERNAL_RAM_START;

        match self {
            Self::None => RamMapResult::RamAddress(u32::from(relative_address)),
            &Self::Mbc1 {
                ram_bank_bit_mask,
                ram_enable,
                ram_bank_number,
                banking_mode_select,
                ..
            } => {
                if ram_enable & 0x0F == 0x0A {
                    if banking_mode_select == 0x00 {
                        RamMapResult::RamAddress(u32::from(relative_address))
                    } else {
                        let bank_number = ram_bank_number & ram_bank_bit_mask;
                        RamMapResult::RamAddress(
                            u32::from(relative_address) + (u32::from(bank_number) << 13),
                        )
                    }
                } else {
                    RamMapResult::None
                }
            }
            &Self::Mbc2 { ram_enable, .. } => {
                if ram_enable & 0x0F == 0x0A {
                    // The built-in 512-byte RAM repeats through the window
                    RamMapResult::RamAddress(u32::from(relative_address & 0x01FF))
                } else {
                    RamMapResult::None
                }
            }
            &Self::Mbc3 { ram_enable, ram_bank_number, .. } => {
                if ram_enable & 0x0F == 0x0A {
                    match ram_bank_number {
                        ram_bank_number @ 0x00..=0x03 => RamMapResult::RamAddress(
                            u32::from(relative_address) + (u32::from(ram_bank_number) << 13),
                        ),
                        _ram_bank_number @ 0x08..=0x0C => RamMapResult::RtcRegister,
                        _ => RamMapResult::None,
                    }
                } else {
                    RamMapResult::None
                }
            }
            &Self::Mbc5 { ram_bank_bit_mask, ram_enable, ram_bank_number, .. } => {
                if ram_enable & 0x0F == 0x0A {
                    let bank_number = ram_bank_number & ram_bank_bit_mask;
                    RamMapResult::RamAddress(
                        u32::from(relative_address) + (u32::from(bank_number) << 13),
                    )
                } else {
                    RamMapResult::None
                }
            }
        }
    }
}

// The switchable window never exposes bank 0; a low-bit slot write of 0
// selects bank 1 instead
fn promote_bank_0(rom_bank_number: u8) -> u8 {
    if rom_bank_number == 0x00 { 0x01 } else { rom_bank_number }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MapperFeatures {
    pub(crate) has_ram: bool,
    pub(crate) has_battery: bool,
}

impl std::fmt::Display for MapperFeatures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "has_ram={}, has_battery={}", self.has_ram, self.has_battery)
    }
}

pub(crate) fn parse_byte(mapper_byte: u8) -> Option<(MapperType, MapperFeatures)> {
    let (mapper_type, has_ram, has_battery) = match mapper_byte {
        0x00 => (MapperType::None, false, false),
        0x01 => (MapperType::Mbc1, false, false),
        0x02 => (MapperType::Mbc1, true, false),
        0x03 => (MapperType::Mbc1, true, true),
        0x05 => (MapperType::Mbc2, true, false),
        0x06 => (MapperType::Mbc2, true, true),
        // 0x0F/0x10 carry the clock, which this core treats as absent
        0x0F => (MapperType::Mbc3, false, true),
        0x10 | 0x13 => (MapperType::Mbc3, true, true),
        0x11 => (MapperType::Mbc3, false, false),
        0x12 => (MapperType::Mbc3, true, false),
        // 0x19-0x1B are w/o rumble, 0x1C-0x1E are w/ rumble
        0x19 | 0x1C => (MapperType::Mbc5, false, false),
        0x1A | 0x1D => (MapperType::Mbc5, true, false),
        0x1B | 0x1E => (MapperType::Mbc5, true, true),
        _ => return None,
    };

    Some((mapper_type, MapperFeatures { has_ram, has_battery }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mbc1_mapper_rom_small() {
        // 256KB ROM
        let mut mapper = Mapper::new(MapperType::Mbc1, 1 << 18, 0);

        assert_eq!(0x0000, mapper.map_rom_address(0x0000));
        assert_eq!(0x3FFF, mapper.map_rom_address(0x3FFF));
        assert_eq!(0x4000, mapper.map_rom_address(0x4000));
        assert_eq!(0x7FFF, mapper.map_rom_address(0x7FFF));

        // Set ROM bank number
        mapper.write_rom_address(0x2000, 0x05);

        assert_eq!(0x0000, mapper.map_rom_address(0x0000));
        assert_eq!(0x3FFF, mapper.map_rom_address(0x3FFF));
        assert_eq!(0x14000, mapper.map_rom_address(0x4000));
        assert_eq!(0x15324, mapper.map_rom_address(0x5324));
        assert_eq!(0x17FFF, mapper.map_rom_address(0x7FFF));

        // Set ROM bank number higher than the highest bank, should get masked to 0x05
        mapper.write_rom_address(0x2000, 0x15);

        assert_eq!(0x14000, mapper.map_rom_address(0x4000));
        assert_eq!(0x17FFF, mapper.map_rom_address(0x7FFF));

        // Banking select mode + RAM bank number should be ignored for small ROMs
        mapper.write_rom_address(0x6000, 0x01);
        mapper.write_rom_address(0x4000, 0x01);

        assert_eq!(0x0000, mapper.map_rom_address(0x0000));
        assert_eq!(0x14000, mapper.map_rom_address(0x4000));
        assert_eq!(0x17FFF, mapper.map_rom_address(0x7FFF));
    }

    #[test]
    fn mbc1_mapper_rom_large() {
        // 2MB ROM
        let mut mapper = Mapper::new(MapperType::Mbc1, 1 << 21, 0);

        // Set banking select mode, ROM bank number, RAM bank number
        mapper.write_rom_address(0x6000, 0x01);
        mapper.write_rom_address(0x2000, 0x05);
        mapper.write_rom_address(0x4000, 0x02);

        assert_eq!(0x100000, mapper.map_rom_address(0x0000));
        assert_eq!(0x103FFF, mapper.map_rom_address(0x3FFF));
        assert_eq!(0x114000, mapper.map_rom_address(0x4000));
        assert_eq!(0x115234, mapper.map_rom_address(0x5234));
        assert_eq!(0x117FFF, mapper.map_rom_address(0x7FFF));

        // Set ROM bank number to 00, should be treated as 01
        mapper.write_rom_address(0x2000, 0x00);

        assert_eq!(0x100000, mapper.map_rom_address(0x0000));
        assert_eq!(0x104000, mapper.map_rom_address(0x4000));
        assert_eq!(0x107FFF, mapper.map_rom_address(0x7FFF));
    }

    #[test]
    fn mbc1_mapper_ram() {
        // 256KB ROM, 8KB RAM
        let mut mapper = Mapper::new(MapperType::Mbc1, 1 << 18, 8192);

        assert_eq!(RamMapResult::None, mapper.map_ram_address(0xA000));

        // Enable RAM
        mapper.write_rom_address(0x0000, 0x0A);

        assert_eq!(RamMapResult::RamAddress(0x0000), mapper.map_ram_address(0xA000));
        assert_eq!(RamMapResult::RamAddress(0x1000), mapper.map_ram_address(0xB000));
        assert_eq!(RamMapResult::RamAddress(0x1234), mapper.map_ram_address(0xB234));

        // Disable RAM again
        mapper.write_rom_address(0x0000, 0x00);
        assert_eq!(RamMapResult::None, mapper.map_ram_address(0xB234));
    }

    #[test]
    fn bank_0_never_selectable_in_switch_window() {
        for mapper_type in [MapperType::Mbc1, MapperType::Mbc2, MapperType::Mbc3] {
            let mut mapper = Mapper::new(mapper_type, 1 << 20, 0);

            let bank_select_address =
                if mapper_type == MapperType::Mbc2 { 0x2100 } else { 0x2000 };
            mapper.write_rom_address(bank_select_address, 0x00);

            assert_eq!(
                0x4000,
                mapper.map_rom_address(0x4000),
                "bank 0 select should map to bank 1 for {mapper_type:?}"
            );
        }

        let mut mapper = Mapper::new(MapperType::Mbc5, 1 << 20, 0);
        mapper.write_rom_address(0x2000, 0x00);
        mapper.write_rom_address(0x3000, 0x00);
        assert_eq!(0x4000, mapper.map_rom_address(0x4000));
    }

    #[test]
    fn mbc2_register_select_by_address_bit() {
        let mut mapper = Mapper::new(MapperType::Mbc2, 1 << 18, 512);

        // Bit 8 clear: RAM enable register
        mapper.write_rom_address(0x0000, 0x0A);
        assert_eq!(RamMapResult::RamAddress(0x0000), mapper.map_ram_address(0xA000));

        // The 512-byte RAM echoes through the whole window
        assert_eq!(RamMapResult::RamAddress(0x0034), mapper.map_ram_address(0xA234));

        // Bit 8 set: ROM bank register
        mapper.write_rom_address(0x0100, 0x03);
        assert_eq!(0x4000 * 3, mapper.map_rom_address(0x4000));
    }

    #[test]
    fn mbc3_rtc_registers_selected() {
        let mut mapper = Mapper::new(MapperType::Mbc3, 1 << 20, 32768);

        mapper.write_rom_address(0x0000, 0x0A);
        mapper.write_rom_address(0x4000, 0x02);
        assert_eq!(RamMapResult::RamAddress(0x4000), mapper.map_ram_address(0xA000));

        mapper.write_rom_address(0x4000, 0x08);
        assert_eq!(RamMapResult::RtcRegister, mapper.map_ram_address(0xA000));

        mapper.write_rom_address(0x4000, 0x05);
        assert_eq!(RamMapResult::None, mapper.map_ram_address(0xA000));
    }

    #[test]
    fn mbc5_high_bank_bit() {
        // 8MB ROM (512 banks)
        let mut mapper = Mapper::new(MapperType::Mbc5, 1 << 23, 0);

        mapper.write_rom_address(0x2000, 0x34);
        assert_eq!(0x34 << 14, mapper.map_rom_address(0x4000));

        mapper.write_rom_address(0x3000, 0x01);
        assert_eq!(0x134 << 14, mapper.map_rom_address(0x4000));
    }
}
