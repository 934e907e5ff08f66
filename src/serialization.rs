/// Serialization format options for sparse grid data.
///
/// Each format has both compressed (Lz4) and uncompressed variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SerializationFormat {
    /// JSON format - human readable, larger size
    Json,
    /// JSON format with LZ4 compression
    JsonLz4,
    /// bincode format - compact binary
    Bincode,
    /// bincode format with LZ4 compression
    #[default]
    BincodeLz4,
}

impl SerializationFormat {
    /// Returns true if this format uses LZ4 compression
    pub fn is_compressed(&self) -> bool {
        matches!(self, SerializationFormat::JsonLz4 | SerializationFormat::BincodeLz4)
    }
}

use crate::errors::SGError;
use serde::{de::DeserializeOwned, Serialize};
use std::io::{Read, Write};

fn serialize_serde<T: Serialize>(data: &T, format: SerializationFormat) -> Result<Vec<u8>, SGError> {
    match format {
        SerializationFormat::Json | SerializationFormat::JsonLz4 => {
            serde_json::to_vec(data).map_err(|_| SGError::SerializationFailed)
        }
        SerializationFormat::Bincode | SerializationFormat::BincodeLz4 => {
            bincode::serde::encode_to_vec(data, bincode::config::standard()).map_err(|_| SGError::SerializationFailed)
        }
    }
}

fn deserialize_serde<T: DeserializeOwned>(data: &[u8], format: SerializationFormat) -> Result<T, SGError> {
    match format {
        SerializationFormat::Json | SerializationFormat::JsonLz4 => {
            serde_json::from_slice(data).map_err(|_| SGError::DeserializationFailed)
        }
        SerializationFormat::Bincode | SerializationFormat::BincodeLz4 => {
            bincode::serde::decode_from_slice(data, bincode::config::standard())
                .map(|(value, _)| value)
                .map_err(|_| SGError::DeserializationFailed)
        }
    }
}

/// Serialize data to bytes using the specified format.
/// Applies LZ4 compression if the format variant ends with Lz4.
pub fn serialize<T: Serialize>(data: &T, format: SerializationFormat) -> Result<Vec<u8>, SGError> {
    let bytes = serialize_serde(data, format)?;
    if format.is_compressed() {
        Ok(lz4_flex::compress_prepend_size(&bytes))
    } else {
        Ok(bytes)
    }
}

/// Deserialize data from bytes using the specified format.
/// Applies LZ4 decompression if the format variant ends with Lz4.
pub fn deserialize<T: DeserializeOwned>(data: &[u8], format: SerializationFormat) -> Result<T, SGError> {
    if format.is_compressed() {
        let decompressed = lz4_flex::decompress_size_prepended(data)
            .map_err(|_| SGError::LZ4DecompressionFailed)?;
        deserialize_serde(&decompressed, format)
    } else {
        deserialize_serde(data, format)
    }
}

/// Serialize `data` and write it to `writer`.
pub fn write<T: Serialize, W: Write>(data: &T, mut writer: W, format: SerializationFormat) -> Result<(), SGError> {
    let bytes = serialize(data, format)?;
    writer.write_all(&bytes).map_err(|_| SGError::WriteBufferFailed)?;
    writer.flush().map_err(|_| SGError::WriteBufferFailed)
}

/// Read everything from `reader` and deserialize it.
pub fn read<T: DeserializeOwned, R: Read>(mut reader: R, format: SerializationFormat) -> Result<T, SGError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(|_| SGError::ReadBufferFailed)?;
    deserialize(&bytes, format)
}

/// Save data to path
pub fn save<T: Serialize>(data: &T, path: &str, format: SerializationFormat) -> Result<(), SGError> {
    let file = std::fs::File::create(path).map_err(|_| SGError::FileIOError)?;
    write(data, std::io::BufWriter::new(file), format)
}

/// Load data from path
pub fn load<T: DeserializeOwned>(path: &str, format: SerializationFormat) -> Result<T, SGError> {
    let file = std::fs::File::open(path).map_err(|_| SGError::FileIOError)?;
    read(std::io::BufReader::new(file), format)
}
