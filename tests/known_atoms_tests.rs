use qtfile::{Diagnostics, FourCC, Movie, Value, default_registry};
use std::io::Cursor;

fn atom(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&((8 + payload.len()) as u32).to_be_bytes());
    v.extend_from_slice(kind);
    v.extend_from_slice(payload);
    v
}

fn read_one(input: &[u8]) -> (Movie, Diagnostics) {
    let registry = default_registry();
    let mut diag = Diagnostics::new();
    let movie = Movie::read(&mut Cursor::new(input.to_vec()), &registry, &mut diag);
    (movie, diag)
}

#[test]
fn stsc_rows_are_triples() {
    let mut payload = Vec::new();
    payload.push(0);
    payload.extend_from_slice(&[0, 0, 0]);
    payload.extend_from_slice(&2u32.to_be_bytes());
    for n in [1u32, 2, 3, 4, 5, 6] {
        payload.extend_from_slice(&n.to_be_bytes());
    }

    let (movie, diag) = read_one(&atom(b"stsc", &payload));
    assert!(diag.is_clean());

    let node = movie.node(movie.roots()[0]);
    let table = node.field("table").and_then(Value::as_list).expect("table missing");
    assert_eq!(table.len(), 2);
    assert_eq!(
        table[0],
        Value::List(vec![Value::U32(1), Value::U32(2), Value::U32(3)])
    );
    assert_eq!(
        table[1],
        Value::List(vec![Value::U32(4), Value::U32(5), Value::U32(6)])
    );
}

#[test]
fn co64_table_is_64_bit() {
    let mut payload = Vec::new();
    payload.push(0);
    payload.extend_from_slice(&[0, 0, 0]);
    payload.extend_from_slice(&2u32.to_be_bytes());
    payload.extend_from_slice(&0x1_0000_0000u64.to_be_bytes());
    payload.extend_from_slice(&0x2_0000_0000u64.to_be_bytes());

    let (movie, diag) = read_one(&atom(b"co64", &payload));
    assert!(diag.is_clean());

    let node = movie.node(movie.roots()[0]);
    assert_eq!(
        node.field("table"),
        Some(&Value::List(vec![
            Value::U64(0x1_0000_0000),
            Value::U64(0x2_0000_0000),
        ]))
    );
    assert_eq!(movie.size_of(movie.roots()[0]), 32);
}

fn prores_description() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&[0u8; 6]); // reserved
    body.extend_from_slice(&1u16.to_be_bytes()); // index
    body.extend_from_slice(&0u16.to_be_bytes()); // version
    body.extend_from_slice(&0u16.to_be_bytes()); // revision
    body.extend_from_slice(b"appl"); // vendor
    body.extend_from_slice(&512u32.to_be_bytes()); // temporal_quality
    body.extend_from_slice(&512u32.to_be_bytes()); // spatial_quality
    body.extend_from_slice(&1920u16.to_be_bytes()); // width
    body.extend_from_slice(&1080u16.to_be_bytes()); // height
    body.extend_from_slice(&0x0048_0000u32.to_be_bytes()); // horizontal_res
    body.extend_from_slice(&0x0048_0000u32.to_be_bytes()); // vertical_res
    body.extend_from_slice(&0u32.to_be_bytes()); // zero_data_size
    body.extend_from_slice(&1u16.to_be_bytes()); // frame_count

    let mut compressor = [0u8; 32];
    let name = b"Apple ProRes 422";
    compressor[0] = name.len() as u8;
    compressor[1..1 + name.len()].copy_from_slice(name);
    body.extend_from_slice(&compressor);

    body.extend_from_slice(&24i16.to_be_bytes()); // depth
    body.extend_from_slice(&(-1i16).to_be_bytes()); // color_table
    assert_eq!(body.len(), 78);

    // colr extension, then the terminating null.
    let mut colr = Vec::new();
    colr.extend_from_slice(b"nclc");
    colr.extend_from_slice(&1u16.to_be_bytes());
    colr.extend_from_slice(&1u16.to_be_bytes());
    colr.extend_from_slice(&1u16.to_be_bytes());
    body.extend_from_slice(&atom(b"colr", &colr));
    body.extend_from_slice(&[0u8; 4]);

    atom(b"apcn", &body)
}

#[test]
fn prores_description_decodes_fully() {
    let input = prores_description();
    assert_eq!(input.len(), 108);

    let (movie, diag) = read_one(&input);
    assert!(diag.is_clean());

    let apcn = movie.roots()[0];
    let node = movie.node(apcn);
    assert_eq!(node.kind, FourCC(*b"apcn"));
    assert_eq!(node.field("vendor"), Some(&Value::FourCC(FourCC(*b"appl"))));
    assert_eq!(node.field("width"), Some(&Value::U16(1920)));
    assert_eq!(node.field("height"), Some(&Value::U16(1080)));
    assert_eq!(node.field("depth"), Some(&Value::I16(24)));
    assert_eq!(node.field("color_table"), Some(&Value::I16(-1)));

    let compressor = node
        .field("compressor")
        .and_then(Value::as_bytes)
        .expect("compressor missing");
    assert_eq!(compressor.len(), 32);
    assert_eq!(&compressor[1..17], b"Apple ProRes 422");

    assert_eq!(node.children().len(), 1);
    assert_eq!(movie.node(node.children()[0]).kind, FourCC(*b"colr"));
    assert!(node.terminating_null());
    assert_eq!(movie.size_of(apcn), 108);
}

#[test]
fn prores_description_roundtrips() {
    let input = prores_description();
    let (movie, mut diag) = read_one(&input);

    let mut src = Cursor::new(input.clone());
    let mut out = Cursor::new(Vec::new());
    movie
        .write(&mut src, &mut out, &default_registry(), &mut diag)
        .expect("write failed");
    assert_eq!(out.into_inner(), input);
}

#[test]
fn hdlr_keeps_its_trailing_name() {
    let mut payload = Vec::new();
    payload.push(0);
    payload.extend_from_slice(&[0, 0, 0]);
    payload.extend_from_slice(&0u32.to_be_bytes());
    payload.extend_from_slice(b"mdir");
    payload.extend_from_slice(&[0u8; 12]);
    payload.extend_from_slice(b"appl");
    let input = atom(b"hdlr", &payload);

    let (movie, mut diag) = read_one(&input);
    assert!(diag.is_clean());

    let node = movie.node(movie.roots()[0]);
    assert_eq!(
        node.field("handler_type"),
        Some(&Value::FourCC(FourCC(*b"mdir")))
    );
    assert_eq!(node.field("name").and_then(Value::as_bytes), Some(&b"appl"[..]));

    let mut src = Cursor::new(input.clone());
    let mut out = Cursor::new(Vec::new());
    movie
        .write(&mut src, &mut out, &default_registry(), &mut diag)
        .expect("write failed");
    assert_eq!(out.into_inner(), input);
}

#[test]
fn hdlr_with_a_bogus_declared_size_still_yields_a_tree() {
    // Extended header claiming u64::MAX bytes over a 28-byte body. The name
    // read must be bounded by the stream, not the declared size.
    let mut input = Vec::new();
    input.extend_from_slice(&1u32.to_be_bytes());
    input.extend_from_slice(b"hdlr");
    input.extend_from_slice(&u64::MAX.to_be_bytes());
    input.push(0);
    input.extend_from_slice(&[0, 0, 0]);
    input.extend_from_slice(&0u32.to_be_bytes());
    input.extend_from_slice(b"mdir");
    input.extend_from_slice(&[0u8; 12]);
    input.extend_from_slice(b"appl");

    let (movie, diag) = read_one(&input);

    assert_eq!(movie.roots().len(), 1);
    let node = movie.node(movie.roots()[0]);
    assert_eq!(node.field("name").and_then(Value::as_bytes), Some(&b"appl"[..]));
    assert!(diag.warnings().any(|w| w.message.contains("size mismatch")));
    assert!(!diag.has_errors());
}

#[test]
fn metadata_kinds_with_high_bytes_are_containers() {
    // 0xA9 "nam" is a container kind despite not being printable ASCII.
    let inner = atom(b"data", &[0u8; 8]);
    let input = atom(b"\xa9nam", &inner);

    let (movie, diag) = read_one(&input);
    assert!(diag.is_clean());

    let node = movie.node(movie.roots()[0]);
    assert!(node.is_container());
    assert_eq!(node.children().len(), 1);
    assert_eq!(node.kind.as_str_lossy(), ".nam");
}
