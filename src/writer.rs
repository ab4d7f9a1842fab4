use crate::atoms::{AtomBody, AtomId};
use crate::diag::Diagnostics;
use crate::header::write_header;
use crate::movie::Movie;
use crate::registry::Registry;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Serializes atoms back to bytes, re-deriving every size from live content.
///
/// Write-time anomalies (an atom whose emitted length disagrees with its
/// computed size) are reported as warnings and the write keeps going; a
/// partially wrong output is more useful for debugging than none.
pub struct TreeWriter<'a> {
    registry: &'a Registry,
    diag: &'a mut Diagnostics,
}

impl<'a> TreeWriter<'a> {
    pub fn new(registry: &'a Registry, diag: &'a mut Diagnostics) -> Self {
        TreeWriter { registry, diag }
    }

    /// Write one atom. With `recursive` set, children and the terminating
    /// null follow the body and the total length is checked against the
    /// computed size. With `recursive` unset only the header and body fields
    /// are emitted; the caller writes the children by other means and must
    /// invoke [`TreeWriter::write_end`] afterwards.
    ///
    /// `src` is the stream the movie was read from; passthrough atoms copy
    /// their entire encoded form from it and ignore `recursive`.
    pub fn write_atom<R: Read + Seek, W: Write + Seek>(
        &mut self,
        movie: &Movie,
        id: AtomId,
        src: &mut R,
        w: &mut W,
        recursive: bool,
    ) -> io::Result<()> {
        let registry = self.registry;
        let node = movie.node(id);

        match &node.body {
            AtomBody::Passthrough(span) => {
                self.diag
                    .debug(span.offset, Some(node.kind), "passing through data");
                src.seek(SeekFrom::Start(span.offset))?;
                let copied = io::copy(&mut src.take(span.len), &mut *w)?;
                if copied != span.len {
                    self.diag.warning(
                        span.offset,
                        Some(node.kind),
                        format!("short passthrough copy [{} -> {}]", span.len, copied),
                    );
                }
                Ok(())
            }
            AtomBody::Parsed(p) => {
                let offset = w.stream_position()?;
                let size = movie.size_of(id);
                let extended = node.extended_header || size > u32::MAX as u64;

                self.diag.debug(
                    offset,
                    Some(node.kind),
                    if extended {
                        "writing extended size header"
                    } else {
                        "writing header"
                    },
                );
                write_header(w, size, node.kind, extended)?;

                match p.type_idx.and_then(|idx| registry.type_at(idx)) {
                    Some(ty) => ty.write_body(w, &p.fields)?,
                    None => p.fields.write_to(w)?,
                }

                if recursive {
                    for &child in &p.children {
                        self.write_atom(movie, child, src, w, true)?;
                    }
                    self.write_end(movie, id, w)?;

                    let written = w.stream_position()?.saturating_sub(offset);
                    if written != size {
                        self.diag.warning(
                            offset,
                            Some(node.kind),
                            format!(
                                "partial write [{} -> {}], output will probably be corrupt",
                                size, written
                            ),
                        );
                    }
                }
                Ok(())
            }
        }
    }

    /// Emit the 4-byte terminating null if this atom carries one. Second
    /// phase of the non-recursive write protocol.
    pub fn write_end<W: Write>(
        &mut self,
        movie: &Movie,
        id: AtomId,
        w: &mut W,
    ) -> io::Result<()> {
        let node = movie.node(id);
        if node.terminating_null() {
            self.diag.debug(0, Some(node.kind), "writing terminating null");
            w.write_all(&[0u8; 4])?;
        }
        Ok(())
    }
}
