use qtfile::reader::{ReadError, ReadSeek};
use qtfile::value::{FieldDef, Fields, Layout, field};
use qtfile::{
    AtomType, Diagnostics, FourCC, Movie, ReadBound, Registry, TreeReader, TreeWriter, Value,
    default_registry,
};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

fn atom(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&((8 + payload.len()) as u32).to_be_bytes());
    v.extend_from_slice(kind);
    v.extend_from_slice(payload);
    v
}

fn colr_payload(primaries: u16) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(b"nclc");
    p.extend_from_slice(&primaries.to_be_bytes());
    p.extend_from_slice(&1u16.to_be_bytes());
    p.extend_from_slice(&1u16.to_be_bytes());
    p
}

fn write_back(movie: &Movie, input: &[u8], registry: &Registry) -> Vec<u8> {
    let mut src = Cursor::new(input.to_vec());
    let mut out = Cursor::new(Vec::new());
    let mut diag = Diagnostics::new();
    movie
        .write(&mut src, &mut out, registry, &mut diag)
        .expect("write failed");
    out.into_inner()
}

#[test]
fn passthrough_only_roundtrip_is_byte_exact() {
    let mut input = atom(b"ab12", &[0x5A; 16]);
    input.extend_from_slice(&atom(b"cd34", &[0xC3; 40]));

    let registry = default_registry();
    let mut diag = Diagnostics::new();
    let movie = Movie::read(&mut Cursor::new(input.clone()), &registry, &mut diag);

    assert!(diag.is_clean());
    assert_eq!(write_back(&movie, &input, &registry), input);
}

#[test]
fn container_of_unknown_leaves_roundtrips() {
    // 64-byte moov: 8-byte header plus leaves of 24 and 32 bytes.
    let mut payload = atom(b"ab12", &[0xAA; 16]);
    payload.extend_from_slice(&atom(b"cd34", &[0xBB; 24]));
    let input = atom(b"moov", &payload);
    assert_eq!(input.len(), 64);

    let registry = default_registry();
    let mut diag = Diagnostics::new();
    let movie = Movie::read(&mut Cursor::new(input.clone()), &registry, &mut diag);

    assert!(diag.is_clean());
    let hits = movie.find(&[FourCC(*b"ab12"), FourCC(*b"cd34")]);
    assert_eq!(hits.len(), 2);
    assert_eq!(movie.size_of(movie.roots()[0]), 64);
    assert_eq!(write_back(&movie, &input, &registry), input);
}

#[test]
fn extended_header_is_sticky_across_a_rewrite() {
    // colr forced into the 64-bit size form: 16 header + 10 body = 26.
    let mut input = Vec::new();
    input.extend_from_slice(&1u32.to_be_bytes());
    input.extend_from_slice(b"colr");
    input.extend_from_slice(&26u64.to_be_bytes());
    input.extend_from_slice(&colr_payload(6));

    let registry = default_registry();
    let mut diag = Diagnostics::new();
    let movie = Movie::read(&mut Cursor::new(input.clone()), &registry, &mut diag);

    assert!(diag.is_clean());
    let colr = movie.roots()[0];
    assert!(movie.node(colr).extended_header);
    assert_eq!(movie.size_of(colr), 26);
    assert_eq!(write_back(&movie, &input, &registry), input);
}

#[test]
fn field_edit_changes_exactly_those_bytes() {
    let input = atom(b"colr", &colr_payload(0));

    let registry = default_registry();
    let mut diag = Diagnostics::new();
    let mut movie = Movie::read(&mut Cursor::new(input.clone()), &registry, &mut diag);

    let colr = movie.roots()[0];
    movie
        .node_mut(colr)
        .fields_mut()
        .expect("colr should be parsed")
        .set("primaries", Value::U16(2));

    let output = write_back(&movie, &input, &registry);
    assert_eq!(output.len(), input.len());
    // Header (8) + parameter_type (4), then the primaries field.
    let mut expected = input.clone();
    expected[12..14].copy_from_slice(&2u16.to_be_bytes());
    assert_eq!(output, expected);
}

#[test]
fn free_keeps_size_and_only_rewrites_the_kind() {
    let input = atom(b"colr", &colr_payload(6));

    let registry = default_registry();
    let mut diag = Diagnostics::new();
    let mut movie = Movie::read(&mut Cursor::new(input.clone()), &registry, &mut diag);

    let colr = movie.roots()[0];
    let before = movie.size_of(colr);
    movie.free(colr);
    movie.free(colr); // idempotent
    assert_eq!(movie.node(colr).kind, FourCC(*b"free"));
    assert_eq!(movie.size_of(colr), before);

    let output = write_back(&movie, &input, &registry);
    let mut expected = input.clone();
    expected[4..8].copy_from_slice(b"free");
    assert_eq!(output, expected);
}

#[test]
fn two_phase_write_matches_the_recursive_write() {
    // udta with one leaf and a terminating null, emitted once recursively and
    // once through the header/children/write_end protocol.
    let mut udta_payload = atom(b"xyz ", &[0x11; 4]);
    udta_payload.extend_from_slice(&[0u8; 4]);
    let input = atom(b"moov", &atom(b"udta", &udta_payload));

    let registry = default_registry();
    let mut diag = Diagnostics::new();
    let movie = Movie::read(&mut Cursor::new(input.clone()), &registry, &mut diag);
    assert!(diag.is_clean());

    let udta = movie.find(&[FourCC(*b"udta")])[0];
    assert!(movie.node(udta).terminating_null());

    let mut src = Cursor::new(input.clone());
    let mut writer = TreeWriter::new(&registry, &mut diag);

    let mut recursive = Cursor::new(Vec::new());
    writer
        .write_atom(&movie, udta, &mut src, &mut recursive, true)
        .expect("write failed");

    let mut phased = Cursor::new(Vec::new());
    writer
        .write_atom(&movie, udta, &mut src, &mut phased, false)
        .expect("write failed");
    for &child in movie.node(udta).children() {
        writer
            .write_atom(&movie, child, &mut src, &mut phased, true)
            .expect("write failed");
    }
    writer.write_end(&movie, udta, &mut phased).expect("write failed");

    let recursive = recursive.into_inner();
    assert_eq!(recursive, phased.into_inner());
    // Both equal the udta's bytes in the source.
    assert_eq!(recursive, input[8..].to_vec());
}

/// Body parser that decodes less than the atom declares, to exercise the
/// reader's recovery path.
struct ShortAtom;

const SHORT_FIELDS: &[FieldDef] = &[field("val", Layout::U16)];

impl AtomType for ShortAtom {
    fn name(&self) -> &'static str {
        "short"
    }

    fn supports(&self, kind: FourCC) -> bool {
        kind.0 == *b"shrt"
    }

    fn field_schema(&self) -> &[FieldDef] {
        SHORT_FIELDS
    }
}

#[test]
fn under_reading_body_damages_only_its_own_atom() {
    // shrt declares 4 body bytes but its type decodes 2; the sibling after it
    // must still parse from the right offset.
    let mut input = atom(b"shrt", &[0, 7, 0xDE, 0xAD]);
    input.extend_from_slice(&atom(b"tail", &[0x11; 8]));

    let registry = Registry::new().with_type(Box::new(ShortAtom));
    let mut diag = Diagnostics::new();
    let movie = Movie::read(&mut Cursor::new(input), &registry, &mut diag);

    assert_eq!(movie.roots().len(), 2);
    assert_eq!(movie.node(movie.roots()[0]).field("val"), Some(&Value::U16(7)));
    assert_eq!(movie.node(movie.roots()[1]).kind, FourCC(*b"tail"));

    let warnings: Vec<_> = diag.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("size mismatch"));
    assert!(!diag.has_errors());
}

#[test]
fn parse_error_inside_a_container_stays_local() {
    // moov whose payload starts with a size-0 header; the atom after the
    // container is still reached through the boundary seek.
    let mut payload = Vec::new();
    payload.extend_from_slice(&0u32.to_be_bytes());
    payload.extend_from_slice(b"bad!");
    payload.extend_from_slice(&[0u8; 8]);
    let mut input = atom(b"moov", &payload);
    input.extend_from_slice(&atom(b"tail", &[0x22; 4]));

    let registry = default_registry();
    let mut diag = Diagnostics::new();
    let movie = Movie::read(&mut Cursor::new(input), &registry, &mut diag);

    assert_eq!(movie.roots().len(), 2);
    let moov = movie.roots()[0];
    assert!(movie.node(moov).children().is_empty());
    assert_eq!(movie.node(movie.roots()[1]).kind, FourCC(*b"tail"));
    assert!(diag.has_errors());
    assert!(diag.warnings().any(|w| w.message.contains("size mismatch")));
}

#[test]
fn roundtrip_through_real_files() {
    let mut payload = atom(b"ab12", &[0x77; 16]);
    payload.extend_from_slice(&atom(b"cd34", &[0x88; 24]));
    let mut input = atom(b"moov", &payload);
    input.extend_from_slice(&atom(b"mdat", &[0x99; 64]));

    let mut src = tempfile::tempfile().expect("tempfile failed");
    src.write_all(&input).expect("write failed");
    src.seek(SeekFrom::Start(0)).expect("seek failed");

    let registry = default_registry();
    let mut diag = Diagnostics::new();
    let movie = Movie::read(&mut src, &registry, &mut diag);
    assert!(diag.is_clean());

    let mut out = tempfile::tempfile().expect("tempfile failed");
    movie
        .write(&mut src, &mut out, &registry, &mut diag)
        .expect("write failed");

    out.seek(SeekFrom::Start(0)).expect("seek failed");
    let mut written = Vec::new();
    out.read_to_end(&mut written).expect("read failed");
    assert_eq!(written, input);
}

#[test]
fn read_bound_one_stops_after_a_single_atom() {
    let mut input = atom(b"ab12", &[0x10; 8]);
    input.extend_from_slice(&atom(b"cd34", &[0x20; 8]));
    let mut cur = Cursor::new(input);

    let registry = default_registry();
    let mut diag = Diagnostics::new();
    let mut movie = Movie::new();
    let mut reader = TreeReader::new(&registry, &mut diag);
    let ids = reader.read(&mut cur, &mut movie, None, ReadBound::One, None);

    assert_eq!(ids.len(), 1);
    assert_eq!(movie.node(ids[0]).kind, FourCC(*b"ab12"));
    assert_eq!(cur.position(), 16);
}

/// Writer hook that emits fewer bytes than the fields account for.
struct LossyAtom;

impl AtomType for LossyAtom {
    fn name(&self) -> &'static str {
        "lossy"
    }

    fn supports(&self, kind: FourCC) -> bool {
        kind.0 == *b"lssy"
    }

    fn read_body(
        &self,
        r: &mut dyn ReadSeek,
        fields: &mut Fields,
        _end: u64,
    ) -> Result<(), ReadError> {
        fields.push("data", Layout::Bytes(4).read(r)?);
        Ok(())
    }

    fn write_body(&self, w: &mut dyn Write, _fields: &Fields) -> std::io::Result<()> {
        w.write_all(&[0u8; 2])
    }
}

#[test]
fn short_body_write_is_reported_not_fatal() {
    let input = atom(b"lssy", &[1, 2, 3, 4]);

    let registry = Registry::new().with_type(Box::new(LossyAtom));
    let mut diag = Diagnostics::new();
    let movie = Movie::read(&mut Cursor::new(input.clone()), &registry, &mut diag);
    assert!(diag.is_clean());

    let mut src = Cursor::new(input);
    let mut out = Cursor::new(Vec::new());
    movie
        .write(&mut src, &mut out, &registry, &mut diag)
        .expect("write failed");

    assert_eq!(out.into_inner().len(), 10);
    assert!(diag.warnings().any(|w| w.message.contains("partial write")));
}
