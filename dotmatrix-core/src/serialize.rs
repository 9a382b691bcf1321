use crate::Emulator;
use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Formatter;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::{fs, io};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SaveStateError {
    #[error("error serializing/deserializing state: {source}")]
    Serialization {
        #[from]
        source: bincode::Error,
    },
    #[error("error reading/writing state: {source}")]
    FileSystem {
        #[from]
        source: io::Error,
    },
}

// serde only derives array impls up to 32 elements, so the large fixed-size
// buffers serialize as tuples through these helpers

pub fn serialize_array<S, T, const N: usize>(
    array: &[T; N],
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    let mut state = serializer.serialize_tuple(N)?;
    for value in array {
        state.serialize_element(value)?;
    }
    state.end()
}

struct DeserializeArrayVisitor<T, const N: usize> {
    marker: PhantomData<T>,
}

impl<T, const N: usize> DeserializeArrayVisitor<T, N> {
    fn new() -> Self {
        Self { marker: PhantomData }
    }
}

impl<'de, T, const N: usize> Visitor<'de> for DeserializeArrayVisitor<T, N>
where
    T: Deserialize<'de> + Default + Copy,
{
    type Value = [T; N];

    fn expecting(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "an array of size {N}")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut array = [T::default(); N];

        for (i, value) in array.iter_mut().enumerate() {
            let Some(elem) = seq.next_element()? else {
                return Err(de::Error::custom(format!(
                    "expected array to have {N} elements, only got {i}",
                )));
            };

            *value = elem;
        }

        if seq.next_element::<T>()?.is_some() {
            return Err(de::Error::custom(format!("array has more than {N} elements")));
        }

        Ok(array)
    }
}

pub fn deserialize_array<'de, D, T, const N: usize>(deserializer: D) -> Result<[T; N], D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default + Copy,
{
    deserializer.deserialize_tuple(N, DeserializeArrayVisitor::new())
}

pub fn determine_save_state_path(rom_file_path: &str) -> PathBuf {
    Path::new(rom_file_path).with_extension("ss0")
}

pub fn save_state<P>(emulator: &Emulator, path: P) -> Result<(), SaveStateError>
where
    P: AsRef<Path>,
{
    let serialized_state = bincode::serialize(emulator)?;
    fs::write(path.as_ref(), serialized_state)?;

    log::info!("Successfully wrote save state to '{}'", path.as_ref().display());

    Ok(())
}

/// Load a save state. The cartridge ROM is not stored in save states, so it
/// is re-attached from the currently running emulator.
pub fn load_state<P>(path: P, existing: &Emulator) -> Result<Emulator, SaveStateError>
where
    P: AsRef<Path>,
{
    let serialized_state = fs::read(path.as_ref())?;
    let mut emulator: Emulator = bincode::deserialize(&serialized_state)?;

    emulator.address_space.copy_cartridge_rom_from(&existing.address_space);

    log::info!("Successfully loaded save state from '{}'", path.as_ref().display());

    Ok(emulator)
}
