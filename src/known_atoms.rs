//! Atom types for useful kinds encountered in the wild. Also serves as the
//! reference for writing custom [`AtomType`] implementations.

use crate::atoms::FourCC;
use crate::reader::{ReadError, ReadSeek};
use crate::registry::{AtomType, Registry};
use crate::value::{FieldDef, Fields, Layout, Value, field, read_schema};
use std::io::Read;

/// Kinds whose body is a plain sequence of child atoms.
const CONTAINER_KINDS: &[[u8; 4]] = &[
    *b"aaid", *b"akid", *b"\xa9alb", *b"apid", *b"aART", *b"\xa9ART", *b"atid", *b"clip",
    *b"\xa9cmt", *b"\xa9com", *b"covr", *b"cpil", *b"cprt", *b"\xa9day", *b"dinf", *b"disk",
    *b"edts", *b"geid", *b"gnre", *b"\xa9grp", *b"hinf", *b"hnti", *b"ilst", *b"matt",
    *b"mdia", *b"minf", *b"moof", *b"moov", *b"\xa9nam", *b"pinf", *b"plid", *b"rtng",
    *b"schi", *b"sinf", *b"stbl", *b"stik", *b"tmpo", *b"\xa9too", *b"traf", *b"trak",
    *b"trkn", *b"\xa9wrt",
];

/// Generic container with no fields of its own.
pub struct ContainerAtom;

impl AtomType for ContainerAtom {
    fn name(&self) -> &'static str {
        "container"
    }

    fn supports(&self, kind: FourCC) -> bool {
        CONTAINER_KINDS.contains(&kind.0)
    }

    fn is_container(&self) -> bool {
        true
    }
}

/// `ftyp`: major/minor brand plus a brand list running to the end of the atom.
pub struct FileTypeAtom;

const FTYP_FIELDS: &[FieldDef] = &[
    field("major_brand", Layout::FourCC),
    field("minor_version", Layout::U32),
];

impl AtomType for FileTypeAtom {
    fn name(&self) -> &'static str {
        "ftyp"
    }

    fn supports(&self, kind: FourCC) -> bool {
        kind.0 == *b"ftyp"
    }

    fn field_schema(&self) -> &[FieldDef] {
        FTYP_FIELDS
    }

    fn read_body(
        &self,
        r: &mut dyn ReadSeek,
        fields: &mut Fields,
        end: u64,
    ) -> Result<(), ReadError> {
        read_schema(r, self.field_schema(), fields)?;

        let mut brands = Vec::new();
        while r.stream_position()? < end {
            brands.push(Layout::FourCC.read(r)?);
        }
        fields.push("compatible_brands", Value::List(brands));
        Ok(())
    }
}

/// `stsd`: count-prefixed container of sample description atoms.
pub struct SampleDescriptionsAtom;

const STSD_FIELDS: &[FieldDef] = &[
    field("version", Layout::U8),
    field("flags", Layout::Bytes(3)),
    field("num_descriptions", Layout::U32),
];

impl AtomType for SampleDescriptionsAtom {
    fn name(&self) -> &'static str {
        "stsd"
    }

    fn supports(&self, kind: FourCC) -> bool {
        kind.0 == *b"stsd"
    }

    fn is_container(&self) -> bool {
        true
    }

    fn field_schema(&self) -> &[FieldDef] {
        STSD_FIELDS
    }
}

/// Video sample descriptions for the ProRes family. Containers: codec
/// extension atoms follow the fixed part, then a trailing null.
pub struct VideoDescriptionAtom;

const VIDEO_DESC_FIELDS: &[FieldDef] = &[
    field("reserved", Layout::Bytes(6)),
    field("index", Layout::U16),
    field("version", Layout::U16),
    field("revision", Layout::U16),
    field("vendor", Layout::FourCC),
    field("temporal_quality", Layout::U32),
    field("spatial_quality", Layout::U32),
    field("width", Layout::U16),
    field("height", Layout::U16),
    field("horizontal_res", Layout::U32),
    field("vertical_res", Layout::U32),
    field("zero_data_size", Layout::U32),
    field("frame_count", Layout::U16),
    // Apple specs say this is a Pascal string, but NULs show up mid-string
    // in the wild; keep all 32 bytes as-is.
    field("compressor", Layout::Bytes(32)),
    field("depth", Layout::I16),
    field("color_table", Layout::I16),
];

impl AtomType for VideoDescriptionAtom {
    fn name(&self) -> &'static str {
        "video description"
    }

    fn supports(&self, kind: FourCC) -> bool {
        matches!(&kind.0, b"apcn" | b"apch" | b"ap4h")
    }

    fn is_container(&self) -> bool {
        true
    }

    fn trailing_null(&self) -> bool {
        true
    }

    fn field_schema(&self) -> &[FieldDef] {
        VIDEO_DESC_FIELDS
    }
}

/// `tmcd`: timecode sample description.
pub struct TimecodeDescriptionAtom;

const TMCD_FIELDS: &[FieldDef] = &[
    field("reserved", Layout::Bytes(6)),
    field("index", Layout::U16),
    field("reserved2", Layout::U32),
    field("flags", Layout::U32),
    field("timescale", Layout::U32),
    field("duration", Layout::U32),
    field("fps", Layout::I8),
    // Docs say this should be a 24-bit field.
    field("reserved3", Layout::Bytes(1)),
];

impl AtomType for TimecodeDescriptionAtom {
    fn name(&self) -> &'static str {
        "tmcd"
    }

    fn supports(&self, kind: FourCC) -> bool {
        kind.0 == *b"tmcd"
    }

    fn is_container(&self) -> bool {
        true
    }

    fn trailing_null(&self) -> bool {
        true
    }

    fn field_schema(&self) -> &[FieldDef] {
        TMCD_FIELDS
    }
}

/// `udta`: user data container, conventionally null-terminated.
pub struct UserDataAtom;

impl AtomType for UserDataAtom {
    fn name(&self) -> &'static str {
        "udta"
    }

    fn supports(&self, kind: FourCC) -> bool {
        kind.0 == *b"udta"
    }

    fn is_container(&self) -> bool {
        true
    }

    fn trailing_null(&self) -> bool {
        true
    }
}

const TABLE_HEADER_FIELDS: &[FieldDef] = &[
    field("version", Layout::U8),
    field("flags", Layout::Bytes(3)),
    field("num_table_entries", Layout::U32),
];

/// `stsc`: sample-to-chunk table, rows of three 32-bit values.
pub struct SampleToChunkAtom;

impl AtomType for SampleToChunkAtom {
    fn name(&self) -> &'static str {
        "stsc"
    }

    fn supports(&self, kind: FourCC) -> bool {
        kind.0 == *b"stsc"
    }

    fn field_schema(&self) -> &[FieldDef] {
        TABLE_HEADER_FIELDS
    }

    fn read_body(
        &self,
        r: &mut dyn ReadSeek,
        fields: &mut Fields,
        end: u64,
    ) -> Result<(), ReadError> {
        read_schema(r, self.field_schema(), fields)?;

        let mut table = Vec::new();
        while r.stream_position()? < end {
            let row = vec![
                Layout::U32.read(r)?,
                Layout::U32.read(r)?,
                Layout::U32.read(r)?,
            ];
            table.push(Value::List(row));
        }
        fields.push("table", Value::List(table));
        Ok(())
    }
}

/// `stco`: 32-bit chunk offset table.
pub struct ChunkOffsetAtom;

impl AtomType for ChunkOffsetAtom {
    fn name(&self) -> &'static str {
        "stco"
    }

    fn supports(&self, kind: FourCC) -> bool {
        kind.0 == *b"stco"
    }

    fn field_schema(&self) -> &[FieldDef] {
        TABLE_HEADER_FIELDS
    }

    fn read_body(
        &self,
        r: &mut dyn ReadSeek,
        fields: &mut Fields,
        end: u64,
    ) -> Result<(), ReadError> {
        read_schema(r, self.field_schema(), fields)?;

        let mut table = Vec::new();
        while r.stream_position()? < end {
            table.push(Layout::U32.read(r)?);
        }
        fields.push("table", Value::List(table));
        Ok(())
    }
}

/// `co64`: 64-bit variant of the chunk offset table.
pub struct ChunkOffset64Atom;

impl AtomType for ChunkOffset64Atom {
    fn name(&self) -> &'static str {
        "co64"
    }

    fn supports(&self, kind: FourCC) -> bool {
        kind.0 == *b"co64"
    }

    fn field_schema(&self) -> &[FieldDef] {
        TABLE_HEADER_FIELDS
    }

    fn read_body(
        &self,
        r: &mut dyn ReadSeek,
        fields: &mut Fields,
        end: u64,
    ) -> Result<(), ReadError> {
        read_schema(r, self.field_schema(), fields)?;

        let mut table = Vec::new();
        while r.stream_position()? < end {
            table.push(Layout::U64.read(r)?);
        }
        fields.push("table", Value::List(table));
        Ok(())
    }
}

/// `colr`: color parameters.
/// <https://developer.apple.com/quicktime/icefloe/dispatch019.html#extensions>
pub struct ColorParametersAtom;

const COLR_FIELDS: &[FieldDef] = &[
    field("parameter_type", Layout::FourCC),
    field("primaries", Layout::U16),
    field("transfer_func", Layout::U16),
    field("matrix", Layout::U16),
];

impl AtomType for ColorParametersAtom {
    fn name(&self) -> &'static str {
        "colr"
    }

    fn supports(&self, kind: FourCC) -> bool {
        kind.0 == *b"colr"
    }

    fn field_schema(&self) -> &[FieldDef] {
        COLR_FIELDS
    }
}

/// `hdlr`: handler reference with reserved runs and a variable trailing name.
pub struct MetadataHandlerAtom;

const HDLR_FIELDS: &[FieldDef] = &[
    field("version", Layout::U8),
    field("flags", Layout::Bytes(3)),
    field("predefined", Layout::U32),
    field("handler_type", Layout::FourCC),
];

const HDLR_RESERVED_COUNT: usize = 3;

impl AtomType for MetadataHandlerAtom {
    fn name(&self) -> &'static str {
        "hdlr"
    }

    fn supports(&self, kind: FourCC) -> bool {
        kind.0 == *b"hdlr"
    }

    fn field_schema(&self) -> &[FieldDef] {
        HDLR_FIELDS
    }

    fn read_body(
        &self,
        r: &mut dyn ReadSeek,
        fields: &mut Fields,
        end: u64,
    ) -> Result<(), ReadError> {
        read_schema(r, self.field_schema(), fields)?;

        let mut reserved = Vec::new();
        for _ in 0..HDLR_RESERVED_COUNT {
            reserved.push(Layout::Bytes(4).read(r)?);
        }
        fields.push("reserved", Value::List(reserved));

        // `end` comes from the untrusted declared size; read what the stream
        // actually holds and let the size check flag any shortfall.
        let remaining = end.saturating_sub(r.stream_position()?);
        let mut name = Vec::new();
        (&mut *r).take(remaining).read_to_end(&mut name)?;
        fields.push("name", Value::Bytes(name));
        Ok(())
    }
}

/// Registry with all bundled atom types.
pub fn default_registry() -> Registry {
    Registry::new()
        .with_type(Box::new(FileTypeAtom))
        .with_type(Box::new(ContainerAtom))
        .with_type(Box::new(SampleDescriptionsAtom))
        .with_type(Box::new(VideoDescriptionAtom))
        .with_type(Box::new(TimecodeDescriptionAtom))
        .with_type(Box::new(UserDataAtom))
        .with_type(Box::new(SampleToChunkAtom))
        .with_type(Box::new(ChunkOffsetAtom))
        .with_type(Box::new(ChunkOffset64Atom))
        .with_type(Box::new(ColorParametersAtom))
        .with_type(Box::new(MetadataHandlerAtom))
}
