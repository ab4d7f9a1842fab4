use std::io::{Read, Seek, SeekFrom};

/// Read up to `len` bytes at `offset` from a seekable source. `len` is not
/// trusted to size the buffer; the read stops at the end of the stream.
pub fn read_slice<R: Read + Seek>(r: &mut R, offset: u64, len: u64) -> std::io::Result<Vec<u8>> {
    r.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::new();
    r.take(len).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Format bytes as a classic offset / hex / ASCII dump.
pub fn hex_dump(bytes: &[u8], start_offset: u64) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let addr = start_offset + (i as u64) * 16;
        let mut hexs = String::new();
        for b in chunk {
            let _ = write!(hexs, "{b:02x} ");
        }
        let ascii: String = chunk
            .iter()
            .map(|&b| if (32..=126).contains(&b) { b as char } else { '.' })
            .collect();
        let _ = writeln!(out, "{addr:08x}  {hexs:<48}  |{ascii}|");
    }
    out
}
