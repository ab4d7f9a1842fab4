use crate::atoms::{AtomBody, AtomId, AtomNode, FourCC};
use crate::diag::Diagnostics;
use crate::header::{COMPACT_HEADER_LEN, EXTENDED_SIZE_LEN};
use crate::reader::{ReadBound, TreeReader};
use crate::registry::Registry;
use crate::writer::TreeWriter;
use std::io::{Read, Seek, Write};

/// A movie: the ordered sequence of top-level atoms, plus the arena that owns
/// every atom in the forest.
///
/// Atoms that no registered type understands are kept as passthrough records
/// pointing into the original source stream, so a movie can be read,
/// selectively edited and written back with only partial understanding of its
/// contents. The source must therefore stay open and unmodified until the
/// final [`Movie::write`] using this tree has completed.
///
/// Some atom kinds ("stco" and friends) hold absolute file offsets, so it is
/// not safe to structurally remove atoms; use [`Movie::free`], which disposes
/// of an atom in place without changing any byte position.
#[derive(Debug, Default)]
pub struct Movie {
    nodes: Vec<AtomNode>,
    roots: Vec<AtomId>,
}

impl Movie {
    pub fn new() -> Self {
        Movie::default()
    }

    /// Read a movie from the stream's current position to its end.
    ///
    /// Never fails outright: malformed input yields a usable, possibly
    /// truncated tree, with errors and warnings recorded in `diag`.
    pub fn read<R: Read + Seek>(
        r: &mut R,
        registry: &Registry,
        diag: &mut Diagnostics,
    ) -> Movie {
        let mut movie = Movie::new();
        let mut reader = TreeReader::new(registry, diag);
        movie.roots = reader.read(r, &mut movie, None, ReadBound::ToEnd, None);
        movie
    }

    /// Write the movie to `w`, recomputing every size bottom-up. `src` must
    /// be the stream the movie was read from; passthrough atoms copy their
    /// bytes from it verbatim.
    pub fn write<R: Read + Seek, W: Write + Seek>(
        &self,
        src: &mut R,
        w: &mut W,
        registry: &Registry,
        diag: &mut Diagnostics,
    ) -> std::io::Result<()> {
        let mut writer = TreeWriter::new(registry, diag);
        for &id in &self.roots {
            writer.write_atom(self, id, src, w, true)?;
        }
        Ok(())
    }

    pub(crate) fn alloc(&mut self, node: AtomNode) -> AtomId {
        let id = AtomId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: AtomId) -> &AtomNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: AtomId) -> &mut AtomNode {
        &mut self.nodes[id.index()]
    }

    pub fn roots(&self) -> &[AtomId] {
        &self.roots
    }

    pub fn atom_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Current size of an atom in bytes, recomputed from live content:
    /// header width + field widths + child sizes + 4 for a terminating null.
    /// Passthrough atoms always report their originally observed length.
    pub fn size_of(&self, id: AtomId) -> u64 {
        let node = self.node(id);
        match &node.body {
            AtomBody::Passthrough(span) => span.len,
            AtomBody::Parsed(p) => {
                let mut body = p.fields.encoded_len();
                for &child in &p.children {
                    body += self.size_of(child);
                }
                if p.terminating_null {
                    body += 4;
                }
                let plain = COMPACT_HEADER_LEN + body;
                if node.extended_header || plain > u32::MAX as u64 {
                    plain + EXTENDED_SIZE_LEN
                } else {
                    plain
                }
            }
        }
    }

    /// Depth-first pre-order collection of atoms whose kind is in `kinds`,
    /// over the whole forest (top-level atoms included). Recursion continues
    /// into children of non-matching atoms.
    pub fn find(&self, kinds: &[FourCC]) -> Vec<AtomId> {
        let mut out = Vec::new();
        for &root in &self.roots {
            self.collect_into(root, kinds, &mut out);
        }
        out
    }

    /// Like [`Movie::find`], but restricted to the descendants of `id`
    /// (direct children only when `recursive` is false).
    pub fn find_under(&self, id: AtomId, kinds: &[FourCC], recursive: bool) -> Vec<AtomId> {
        let mut out = Vec::new();
        for &child in self.node(id).children() {
            if recursive {
                self.collect_into(child, kinds, &mut out);
            } else if kinds.contains(&self.node(child).kind) {
                out.push(child);
            }
        }
        out
    }

    fn collect_into(&self, id: AtomId, kinds: &[FourCC], out: &mut Vec<AtomId>) {
        if kinds.contains(&self.node(id).kind) {
            out.push(id);
        }
        for &child in self.node(id).children() {
            self.collect_into(child, kinds, out);
        }
    }

    /// Dispose of an atom in place by overwriting its kind with `free`.
    ///
    /// The atom keeps its place in its parent's child list and its byte
    /// length; field content is retained, not zeroed. Idempotent. Note that
    /// a passthrough atom is copied from the source verbatim on write, so
    /// freeing one does not change the output bytes.
    pub fn free(&mut self, id: AtomId) {
        self.node_mut(id).kind = FourCC(*b"free");
    }
}
