use crate::atoms::FourCC;
use crate::reader::{ReadError, read_exact_or_eof};
use byteorder::{BigEndian, WriteBytesExt};
use std::io::{Read, Seek, Write};

/// Width of the compact size + kind prefix.
pub const COMPACT_HEADER_LEN: u64 = 8;
/// Width of the extended size field that follows the kind tag when the
/// compact size holds the sentinel `1`.
pub const EXTENDED_SIZE_LEN: u64 = 8;

/// Decoded atom header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomHeader {
    /// Total declared size in bytes, header included.
    pub size: u64,
    pub kind: FourCC,
    /// The extended 8-byte size form was used.
    pub extended: bool,
    /// Stream offset of the first header byte.
    pub start: u64,
}

impl AtomHeader {
    pub fn header_len(&self) -> u64 {
        if self.extended {
            COMPACT_HEADER_LEN + EXTENDED_SIZE_LEN
        } else {
            COMPACT_HEADER_LEN
        }
    }
}

/// Read one atom header: big-endian 4-byte size + 4-byte kind, with the
/// `size == 1` extended-size escape.
///
/// `size == 0` ("extends to end of stream") is unsupported and rejected as a
/// parse error, as is a kind tag whose first byte is zero (reading into
/// padding or garbage). A clean end of stream before the first header byte
/// surfaces as [`ReadError::Eof`].
pub fn read_header<R: Read + Seek>(r: &mut R) -> Result<AtomHeader, ReadError> {
    let start = r.stream_position()?;
    let mut raw = [0u8; 8];
    read_exact_or_eof(r, &mut raw)?;

    let size32 = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
    let kind = FourCC([raw[4], raw[5], raw[6], raw[7]]);

    if kind.0[0] == 0 {
        return Err(ReadError::Parse {
            message: "atom with null kind".to_string(),
            offset: start,
        });
    }

    let mut size = size32 as u64;
    let mut extended = false;

    if size32 == 1 {
        let mut ext = [0u8; 8];
        read_exact_or_eof(r, &mut ext)?;
        size = u64::from_be_bytes(ext);
        extended = true;
    } else if size32 == 0 {
        return Err(ReadError::Parse {
            message: "atoms of size 0 are unsupported".to_string(),
            offset: start,
        });
    }

    let header_len = if extended {
        COMPACT_HEADER_LEN + EXTENDED_SIZE_LEN
    } else {
        COMPACT_HEADER_LEN
    };
    if size < header_len {
        return Err(ReadError::Parse {
            message: format!("declared size {size} smaller than header"),
            offset: start,
        });
    }

    Ok(AtomHeader {
        size,
        kind,
        extended,
        start,
    })
}

/// Write an atom header. The compact 4+4 form is used unless `size` does not
/// fit the 32-bit size field or `extended_hint` asks for the extended form.
pub fn write_header<W: Write>(
    w: &mut W,
    size: u64,
    kind: FourCC,
    extended_hint: bool,
) -> std::io::Result<()> {
    if extended_hint || size > u32::MAX as u64 {
        w.write_u32::<BigEndian>(1)?;
        w.write_all(&kind.0)?;
        w.write_u64::<BigEndian>(size)?;
    } else {
        w.write_u32::<BigEndian>(size as u32)?;
        w.write_all(&kind.0)?;
    }
    Ok(())
}
