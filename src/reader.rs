use crate::atoms::{AtomBody, AtomId, AtomNode, ParsedBody, SourceSpan};
use crate::diag::Diagnostics;
use crate::header::read_header;
use crate::movie::Movie;
use crate::registry::Registry;
use std::io::{Read, Seek, SeekFrom};

#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// Clean end of stream: no bytes left where the next header (or field)
    /// would start. Terminates a recursion level without being an error.
    #[error("end of stream")]
    Eof,
    /// Malformed header or field data, with the offset it was detected at.
    #[error("@{offset}: {message}")]
    Parse { message: String, offset: u64 },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type ReadResult<T> = std::result::Result<T, ReadError>;

/// `Read + Seek` as a single object-safe bound, for type-erased body parsers.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// Fill `buf` or explain why not: zero bytes available is [`ReadError::Eof`],
/// a short read is a parse error at the resulting position.
pub fn read_exact_or_eof<R: Read + Seek + ?Sized>(
    r: &mut R,
    buf: &mut [u8],
) -> ReadResult<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ReadError::Io(e)),
        }
    }
    if filled == buf.len() {
        return Ok(());
    }
    if filled == 0 && !buf.is_empty() {
        return Err(ReadError::Eof);
    }
    Err(ReadError::Parse {
        message: format!("expected {} bytes, got {}", buf.len(), filled),
        offset: r.stream_position().unwrap_or(0),
    })
}

/// Where a read loop stops producing atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadBound {
    /// Stop at this absolute stream offset (a container's end).
    Until(u64),
    /// Continue until the stream is exhausted.
    ToEnd,
    /// Stop after exactly one atom.
    One,
}

/// Recursive-descent atom reader.
///
/// Per atom: decode the header, resolve a type through the registry (falling
/// back to passthrough), let the type parse its body, recurse for containers,
/// then force the stream to the declared boundary so a body parser that
/// consumed the wrong number of bytes damages only its own atom. End of
/// stream ends a level silently; a structural parse error is recorded and
/// ends the level without propagating past it.
pub struct TreeReader<'a> {
    registry: &'a Registry,
    diag: &'a mut Diagnostics,
}

impl<'a> TreeReader<'a> {
    pub fn new(registry: &'a Registry, diag: &'a mut Diagnostics) -> Self {
        TreeReader { registry, diag }
    }

    /// Read atoms from `r` into the movie arena, returning their ids in
    /// source order. `start` seeks first when given; `parent` is recorded on
    /// every produced atom and consulted for the trailing-null convention.
    pub fn read<R: Read + Seek>(
        &mut self,
        r: &mut R,
        movie: &mut Movie,
        start: Option<u64>,
        bound: ReadBound,
        parent: Option<AtomId>,
    ) -> Vec<AtomId> {
        let registry = self.registry;
        let mut out = Vec::new();

        if let Some(start) = start {
            if r.stream_position().ok() != Some(start) {
                if let Err(e) = r.seek(SeekFrom::Start(start)) {
                    self.diag.error(start, None, format!("seek failed: {e}"));
                    return out;
                }
            }
        }

        loop {
            let offset = match r.stream_position() {
                Ok(p) => p,
                Err(e) => {
                    self.diag.error(0, None, format!("stream position lost: {e}"));
                    break;
                }
            };
            if let ReadBound::Until(end) = bound {
                if offset >= end {
                    break;
                }
            }

            let header = match read_header(r) {
                Ok(h) => h,
                Err(ReadError::Eof) => {
                    self.diag.debug(offset, None, "end of stream, stopped reading");
                    break;
                }
                Err(ReadError::Parse { message, offset: at }) => {
                    self.diag.error(at, None, message);
                    self.diag.error(at, None, "parse error, stopped reading");
                    break;
                }
                Err(ReadError::Io(e)) => {
                    self.diag.error(offset, None, format!("io error: {e}"));
                    break;
                }
            };

            let kind = header.kind;
            self.diag
                .debug(offset, Some(kind), format!("found header ({} bytes)", header.size));

            let Some(end_of_atom) = offset.checked_add(header.size) else {
                self.diag
                    .error(offset, Some(kind), "atom size overflows the stream range");
                break;
            };

            let id = match registry.resolve(kind) {
                Some((type_idx, ty)) => {
                    let mut body = ParsedBody::new(
                        Some(type_idx),
                        ty.is_container(),
                        ty.trailing_null(),
                    );
                    match ty.read_body(r, &mut body.fields, end_of_atom) {
                        Ok(()) => {}
                        Err(ReadError::Eof) => {
                            self.diag
                                .debug(offset, Some(kind), "end of stream, stopped reading");
                            break;
                        }
                        Err(ReadError::Parse { message, offset: at }) => {
                            self.diag.error(at, Some(kind), message);
                            self.diag
                                .error(at, Some(kind), "parse error, stopped reading");
                            break;
                        }
                        Err(ReadError::Io(e)) => {
                            self.diag
                                .error(offset, Some(kind), format!("io error: {e}"));
                            break;
                        }
                    }

                    let node = AtomNode {
                        kind,
                        declared_size: header.size,
                        extended_header: header.extended,
                        parent,
                        body: AtomBody::Parsed(body),
                    };
                    let id = movie.alloc(node);

                    if movie.node(id).is_container() {
                        let kids =
                            self.read(r, movie, None, ReadBound::Until(end_of_atom), Some(id));
                        if let AtomBody::Parsed(p) = &mut movie.node_mut(id).body {
                            p.children = kids;
                        }
                    }

                    let computed = movie.size_of(id);
                    if computed != header.size {
                        self.diag.warning(
                            offset,
                            Some(kind),
                            format!(
                                "size mismatch [{} -> {}], will not serialize correctly",
                                header.size, computed
                            ),
                        );
                    }
                    self.diag
                        .debug(offset, Some(kind), format!("instanced with {}", ty.name()));
                    id
                }
                None => {
                    // Body stays unread; the boundary seek below skips it.
                    self.diag
                        .debug(offset, Some(kind), "no handler, instanced as passthrough");
                    movie.alloc(AtomNode {
                        kind,
                        declared_size: header.size,
                        extended_header: header.extended,
                        parent,
                        body: AtomBody::Passthrough(SourceSpan {
                            offset,
                            len: header.size,
                        }),
                    })
                }
            };

            // Bound the damage of any partial or over-long body read to this
            // atom: continue from the declared boundary no matter what.
            match r.stream_position() {
                Ok(pos) if pos != end_of_atom => {
                    self.diag.debug(
                        pos,
                        Some(kind),
                        format!("partial read, seeking ahead to {end_of_atom}"),
                    );
                    if let Err(e) = r.seek(SeekFrom::Start(end_of_atom)) {
                        self.diag
                            .error(pos, Some(kind), format!("recovery seek failed: {e}"));
                        out.push(id);
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    self.diag
                        .error(offset, Some(kind), format!("stream position lost: {e}"));
                    out.push(id);
                    break;
                }
            }

            // A container kind that takes a trailing null ends in 4 pad bytes
            // rather than another child; consume them for the parent.
            if let (Some(pid), ReadBound::Until(end)) = (parent, bound) {
                if movie.node(pid).trailing_null() && end.saturating_sub(end_of_atom) == 4 {
                    let mut pad = [0u8; 4];
                    match read_exact_or_eof(r, &mut pad) {
                        Ok(()) => {
                            self.diag
                                .debug(end_of_atom, Some(kind), "terminating null found");
                            if let AtomBody::Parsed(p) = &mut movie.node_mut(pid).body {
                                p.terminating_null = true;
                            }
                        }
                        Err(e) => {
                            self.diag.error(
                                end_of_atom,
                                Some(kind),
                                format!("could not consume terminating null: {e}"),
                            );
                            out.push(id);
                            break;
                        }
                    }
                }
            }

            out.push(id);

            if matches!(bound, ReadBound::One) {
                break;
            }
        }

        out
    }
}
