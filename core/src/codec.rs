//! Versioned binary images.
//!
//! An image is a `u32` version tag followed by a bincode body, both written
//! with fixed-width little-endian integers. Each image kind owns a distinct
//! tag, so feeding one kind's image to another's reader fails on the tag.
//!
//! Decoding runs over an in-memory byte slice: length prefixes larger than
//! the remaining input fail as truncation before anything is allocated, and
//! prefixes beyond [`MAX_IMAGE_BYTES`] fail as allocation errors.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::DeserializeError;

/// Upper bound on the decoded size of a single image.
pub const MAX_IMAGE_BYTES: u64 = 1 << 30;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(MAX_IMAGE_BYTES)
}

/// Write `version` then `body`.
pub fn write_image<W: Write, T: Serialize>(
    writer: W,
    version: u32,
    body: &T,
) -> bincode::Result<()> {
    let mut writer = BufWriter::new(writer);
    options().serialize_into(&mut writer, &version)?;
    options().serialize_into(&mut writer, body)?;
    writer.flush().map_err(|e| Box::new(bincode::ErrorKind::Io(e)))
}

/// Write an image to `path`, creating or truncating the file.
pub fn save_image<P: AsRef<Path>, T: Serialize>(
    path: P,
    version: u32,
    body: &T,
) -> bincode::Result<()> {
    let file = File::create(path.as_ref()).map_err(|e| Box::new(bincode::ErrorKind::Io(e)))?;
    write_image(file, version, body)
}

/// Decode an image from bytes, checking the tag first. Trailing bytes after
/// the body are rejected.
pub fn decode_image<T: DeserializeOwned>(bytes: &[u8], version: u32) -> Result<T, DeserializeError> {
    let (tag, body) = match bytes.split_first_chunk::<4>() {
        Some((tag, body)) => (u32::from_le_bytes(*tag), body),
        None => return Err(DeserializeError::out_of_range("image shorter than its version tag")),
    };
    if tag != version {
        return Err(DeserializeError::BinaryVersionInvalid {
            expected: version,
            found: tag,
        });
    }
    Ok(options().deserialize(body)?)
}

/// Read a whole stream into memory and decode it.
pub fn read_image<R: Read, T: DeserializeOwned>(
    mut reader: R,
    version: u32,
) -> Result<T, DeserializeError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| DeserializeError::file_not_open("stream", e))?;
    decode_image(&bytes, version)
}

/// Open `path` and decode its image. The file handle is released before
/// decoding starts.
pub fn load_image<P: AsRef<Path>, T: DeserializeOwned>(
    path: P,
    version: u32,
) -> Result<T, DeserializeError> {
    let path = path.as_ref();
    let target = path.display().to_string();
    let bytes = {
        let mut file = File::open(path).map_err(|e| DeserializeError::file_not_open(&target, e))?;
        let expected = file
            .metadata()
            .map_err(|e| DeserializeError::file_not_open(&target, e))?
            .len();
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(expected as usize)
            .map_err(|_| DeserializeError::BadAlloc)?;
        file.read_to_end(&mut bytes)
            .map_err(|e| DeserializeError::file_not_open(&target, e))?;
        bytes
    };
    tracing::debug!(path = %target, bytes = bytes.len(), "decoding image");
    decode_image(&bytes, version)
}
