pub mod address;
pub mod ioregisters;
mod mapper;

use crate::memory::ioregisters::{IoRegister, IoRegisters};
use crate::memory::mapper::{Mapper, MapperType, RamMapResult};
use crate::serialize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{fs, io};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CartridgeLoadError {
    #[error("header should be at least 336 bytes, was {header_len} bytes")]
    HeaderTooShort { header_len: usize },
    #[error("unsupported cartridge kind byte in header: {mapper_byte:02X}")]
    UnsupportedCartridgeKind { mapper_byte: u8 },
    #[error("invalid ROM size code in header, expected 0-8: {rom_size_code}")]
    InvalidRomSize { rom_size_code: u8 },
    #[error("invalid RAM size code in header, expected 0-5: {ram_size_code}")]
    InvalidRamSize { ram_size_code: u8 },
    #[error("error reading data from {file_path}: {source}")]
    FileReadError {
        file_path: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FsRamBattery {
    dirty: bool,
    sav_path: PathBuf,
}

impl FsRamBattery {
    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn persist_ram(&mut self, ram: &[u8]) -> Result<(), io::Error> {
        if !self.dirty {
            return Ok(());
        }

        let tmp_file = self.sav_path.with_extension("sav.tmp");
        fs::write(&tmp_file, ram)?;
        fs::rename(&tmp_file, &self.sav_path)?;

        self.dirty = false;

        Ok(())
    }
}

fn load_sav_file<P>(sav_file: P) -> Result<Option<Vec<u8>>, CartridgeLoadError>
where
    P: AsRef<Path>,
{
    let ram = if fs::metadata(sav_file.as_ref()).map(|metadata| metadata.is_file()).unwrap_or(false)
    {
        Some(fs::read(sav_file.as_ref()).map_err(|err| CartridgeLoadError::FileReadError {
            file_path: sav_file.as_ref().to_str().unwrap_or("").into(),
            source: err,
        })?)
    } else {
        None
    };

    if ram.is_some() {
        log::info!("Loaded external RAM from {}", sav_file.as_ref().display());
    }

    Ok(ram)
}

// RAM size code at 0x0149 -> number of 8KB banks
const RAM_BANK_COUNTS: [u32; 6] = [0, 1, 1, 4, 16, 8];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cartridge {
    #[serde(skip)]
    rom: Vec<u8>,
    mapper: Mapper,
    ram: Vec<u8>,
    ram_battery: Option<FsRamBattery>,
}

impl Cartridge {
    /// Create a new Cartridge value from the given ROM image.
    ///
    /// # Errors
    ///
    /// This function will return an error in the following scenarios:
    /// * The ROM is too short to contain a header (must be at least 0x150 bytes)
    /// * The cartridge kind byte names an unsupported controller
    /// * The ROM or RAM size byte in the header is invalid
    pub fn new(rom: Vec<u8>, sav_path: Option<PathBuf>) -> Result<Self, CartridgeLoadError> {
        log::info!("Initializing cartridge using {} bytes of data", rom.len());

        if rom.len() < 0x0150 {
            return Err(CartridgeLoadError::HeaderTooShort { header_len: rom.len() });
        }

        let mapper_byte = rom[address::MAPPER as usize];
        let Some((mapper_type, mapper_features)) = mapper::parse_byte(mapper_byte) else {
            return Err(CartridgeLoadError::UnsupportedCartridgeKind { mapper_byte });
        };

        log::info!("Detected mapper type {mapper_type:?} (byte: {mapper_byte:02X})");
        log::info!("Mapper features: {mapper_features}");

        let rom_size_code = rom[address::ROM_SIZE as usize];
        if rom_size_code > 0x08 {
            return Err(CartridgeLoadError::InvalidRomSize { rom_size_code });
        }
        // banks = 2 << n, 16KB per bank
        let rom_size = 32768_u32 << rom_size_code;

        let ram_size_code = rom[address::RAM_SIZE as usize];
        let ram_size = if mapper_type == MapperType::Mbc2 {
            // MBC2 has 512 bytes built into the controller; the header
            // advertises none
            512
        } else {
            let bank_count = RAM_BANK_COUNTS
                .get(usize::from(ram_size_code))
                .copied()
                .ok_or(CartridgeLoadError::InvalidRamSize { ram_size_code })?;
            bank_count * 8192
        };

        let loaded_ram = if mapper_features.has_battery {
            match &sav_path {
                Some(sav_path) => load_sav_file(sav_path)?,
                None => None,
            }
        } else {
            None
        };

        let ram = match loaded_ram {
            Some(ram) if ram.len() == ram_size as usize => ram,
            Some(ram) => {
                log::warn!(
                    "Ignoring sav file of {} bytes, cartridge has {ram_size} bytes of RAM",
                    ram.len()
                );
                vec![0; ram_size as usize]
            }
            None => vec![0; ram_size as usize],
        };

        let ram_battery = match (mapper_features.has_battery, sav_path) {
            (true, Some(sav_path)) => Some(FsRamBattery { dirty: false, sav_path }),
            _ => None,
        };

        if let Some(ram_battery) = &ram_battery {
            log::info!("Persisting external RAM to {}", ram_battery.sav_path.display());
        }

        let mapper = Mapper::new(mapper_type, rom_size, ram_size);

        log::info!("Cartridge has {} bytes of external RAM", ram.len());
        log::info!("Cartridge has battery: {}", mapper_features.has_battery);

        Ok(Self { rom, mapper, ram, ram_battery })
    }

    pub fn from_file(file_path: &str) -> Result<Self, CartridgeLoadError> {
        log::info!("Loading cartridge from '{file_path}'");

        let rom =
            fs::read(Path::new(file_path)).map_err(|err| CartridgeLoadError::FileReadError {
                file_path: file_path.into(),
                source: err,
            })?;

        let sav_file = Path::new(file_path).with_extension("sav");

        Self::new(rom, Some(sav_file))
    }

    /// Read a value from the given ROM address. Addresses past the end of the
    /// ROM image read 0xFF.
    pub fn read_rom_address(&self, address: u16) -> u8 {
        let mapped_address = self.mapper.map_rom_address(address);
        self.rom.get(mapped_address as usize).copied().unwrap_or(0xFF)
    }

    /// Write a value to the given ROM address (in reality, set a cartridge
    /// control register).
    pub fn write_rom_address(&mut self, address: u16, value: u8) {
        self.mapper.write_rom_address(address, value);
    }

    /// Read a value from the given cartridge RAM address. Returns 0xFF if the
    /// address is not currently mapped.
    pub fn read_ram_address(&self, address: u16) -> u8 {
        match self.mapper.map_ram_address(address) {
            RamMapResult::RamAddress(mapped_address) => {
                self.ram.get(mapped_address as usize).copied().unwrap_or(0xFF)
            }
            // The real-time clock is out of scope; its registers read zero
            RamMapResult::RtcRegister => 0x00,
            RamMapResult::None => 0xFF,
        }
    }

    /// Write a value to the given cartridge RAM address. Does nothing if the
    /// address is not currently mapped.
    pub fn write_ram_address(&mut self, address: u16, value: u8) {
        match self.mapper.map_ram_address(address) {
            RamMapResult::RamAddress(mapped_address) => {
                if let Some(ram_value) = self.ram.get_mut(mapped_address as usize) {
                    *ram_value = value;
                    if let Some(ram_battery) = &mut self.ram_battery {
                        ram_battery.mark_dirty();
                    }
                }
            }
            RamMapResult::RtcRegister | RamMapResult::None => {}
        }
    }

    /// If this cartridge has battery-backed RAM, save it to disk if it has
    /// been modified since the last time this method was called.
    pub fn persist_external_ram(&mut self) -> Result<(), io::Error> {
        if let Some(ram_battery) = &mut self.ram_battery {
            ram_battery.persist_ram(&self.ram)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressSpace {
    cartridge: Cartridge,
    #[serde(
        serialize_with = "serialize::serialize_array",
        deserialize_with = "serialize::deserialize_array"
    )]
    vram: [u8; 8192],
    #[serde(
        serialize_with = "serialize::serialize_array",
        deserialize_with = "serialize::deserialize_array"
    )]
    working_ram: [u8; 8192],
    #[serde(
        serialize_with = "serialize::serialize_array",
        deserialize_with = "serialize::deserialize_array"
    )]
    oam: [u8; 160],
    io_registers: IoRegisters,
    #[serde(
        serialize_with = "serialize::serialize_array",
        deserialize_with = "serialize::deserialize_array"
    )]
    hram: [u8; 127],
    ie_register: u8,
}

impl AddressSpace {
    pub fn new(cartridge: Cartridge) -> Self {
        Self {
            cartridge,
            vram: [0; 8192],
            working_ram: [0; 8192],
            oam: [0; 160],
            io_registers: IoRegisters::new(),
            hram: [0; 127],
            ie_register: 0,
        }
    }

    /// Read the value at the given address from the perspective of the CPU.
    pub fn read_address_u8(&self, address: u16) -> u8 {
        match address {
            address @ address::ROM_START..=address::ROM_END => {
                self.cartridge.read_rom_address(address)
            }
            address @ address::VRAM_START..=address::VRAM_END => {
                self.vram[(address - address::VRAM_START) as usize]
            }
            address @ address::EXTERNAL_RAM_START..=address::EXTERNAL_RAM_END => {
                self.cartridge.read_ram_address(address)
            }
            address @ address::WORKING_RAM_START..=address::WORKING_RAM_END => {
                self.working_ram[(address - address::WORKING_RAM_START) as usize]
            }
            address @ address::ECHO_RAM_START..=address::ECHO_RAM_END => {
                self.working_ram[(address - address::ECHO_RAM_START) as usize]
            }
            address @ address::OAM_START..=address::OAM_END => {
                self.oam[(address - address::OAM_START) as usize]
            }
            _address @ address::UNUSABLE_START..=address::UNUSABLE_END => 0x00,
            address @ address::IO_REGISTERS_START..=address::IO_REGISTERS_END => {
                self.io_registers.read_address(address)
            }
            address @ address::HRAM_START..=address::HRAM_END => {
                self.hram[(address - address::HRAM_START) as usize]
            }
            address::IE_REGISTER => self.ie_register,
        }
    }

    /// Read the value at the given address and the following address as a
    /// little-endian 16-bit value.
    pub fn read_address_u16(&self, address: u16) -> u16 {
        let lsb = self.read_address_u8(address);
        let msb = self.read_address_u8(address.wrapping_add(1));
        u16::from_le_bytes([lsb, msb])
    }

    /// Assign a value to the given address from the perspective of the CPU.
    pub fn write_address_u8(&mut self, address: u16, value: u8) {
        match address {
            address @ address::ROM_START..=address::ROM_END => {
                self.cartridge.write_rom_address(address, value);
            }
            address @ address::VRAM_START..=address::VRAM_END => {
                self.vram[(address - address::VRAM_START) as usize] = value;
            }
            address @ address::EXTERNAL_RAM_START..=address::EXTERNAL_RAM_END => {
                self.cartridge.write_ram_address(address, value);
            }
            address @ address::WORKING_RAM_START..=address::WORKING_RAM_END => {
                self.working_ram[(address - address::WORKING_RAM_START) as usize] = value;
            }
            address @ address::ECHO_RAM_START..=address::ECHO_RAM_END => {
                self.working_ram[(address - address::ECHO_RAM_START) as usize] = value;
            }
            address @ address::OAM_START..=address::OAM_END => {
                self.oam[(address - address::OAM_START) as usize] = value;
            }
            _address @ address::UNUSABLE_START..=address::UNUSABLE_END => {}
            address @ address::IO_REGISTERS_START..=address::IO_REGISTERS_END => {
                self.io_registers.write_address(address, value);
                if address == IoRegister::DMA.to_address() {
                    self.oam_dma_transfer(value);
                }
            }
            address @ address::HRAM_START..=address::HRAM_END => {
                self.hram[(address - address::HRAM_START) as usize] = value;
            }
            address::IE_REGISTER => {
                self.ie_register = value;
            }
        }
    }

    /// Assign a 16-bit value to the given address and the following address,
    /// using little-endian.
    pub fn write_address_u16(&mut self, address: u16, value: u16) {
        let [lsb, msb] = value.to_le_bytes();
        self.write_address_u8(address, lsb);
        self.write_address_u8(address.wrapping_add(1), msb);
    }

    // Copies 160 bytes from (source_page << 8) into OAM. Real hardware takes
    // 640 cycles and locks out most bus access; this core performs the copy
    // synchronously and does not model the lockout.
    fn oam_dma_transfer(&mut self, source_page: u8) {
        let source_base = u16::from(source_page) << 8;
        for offset in 0..0xA0 {
            self.oam[offset as usize] = self.read_address_u8(source_base + offset);
        }
    }

    /// Read the OAM/VRAM value at the given address from the perspective of
    /// the PPU.
    ///
    /// # Panics
    ///
    /// This method will panic if the address is not an OAM or VRAM address.
    pub fn ppu_read_address_u8(&self, address: u16) -> u8 {
        match address {
            address @ address::VRAM_START..=address::VRAM_END => {
                self.vram[(address - address::VRAM_START) as usize]
            }
            address @ address::OAM_START..=address::OAM_END => {
                self.oam[(address - address::OAM_START) as usize]
            }
            _ => panic!("PPU read method is only allowed to read OAM and VRAM"),
        }
    }

    pub fn get_io_registers(&self) -> &IoRegisters {
        &self.io_registers
    }

    pub fn get_io_registers_mut(&mut self) -> &mut IoRegisters {
        &mut self.io_registers
    }

    /// Retrieve the current value of the IE register (interrupts enabled).
    pub fn get_ie_register(&self) -> u8 {
        self.ie_register
    }

    pub fn persist_cartridge_ram(&mut self) -> Result<(), io::Error> {
        self.cartridge.persist_external_ram()
    }

    pub fn copy_cartridge_rom_from(&mut self, other: &Self) {
        self.cartridge.rom = other.cartridge.rom.clone();
    }
}
