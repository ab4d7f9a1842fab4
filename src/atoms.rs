use crate::value::{Fields, Value};
use std::fmt;

/// 4-byte atom kind tag. Arbitrary bytes, not guaranteed printable ASCII
/// (QuickTime metadata kinds start with 0xA9).
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub fn from_str(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else {
            None
        }
    }

    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl serde::Serialize for FourCC {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.as_str_lossy())
    }
}

/// Handle to an atom stored in a [`Movie`](crate::Movie) arena.
///
/// Ids are only meaningful for the movie that issued them. Ownership of an
/// atom flows through its parent's child list; the id itself is a plain index.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct AtomId(pub(crate) u32);

impl AtomId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Byte range of an atom's entire encoded form (header included) in the
/// original source stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    pub offset: u64,
    pub len: u64,
}

/// Parsed body: typed fields plus child atoms.
#[derive(Debug, Clone)]
pub struct ParsedBody {
    /// Index of the resolved type in the registry used for the read.
    /// `None` means no custom body logic applies and the ordered fields are
    /// serialized as-is.
    pub type_idx: Option<usize>,
    /// Type-level capability: the body is a sequence of child atoms.
    pub container: bool,
    /// Type-level capability: the container kind participates in the 4-byte
    /// trailing-null padding convention.
    pub trailing_null: bool,
    /// Per-instance fact: this atom actually carried the 4 zero pad bytes in
    /// the source, so they are reproduced on write.
    pub terminating_null: bool,
    pub fields: Fields,
    pub children: Vec<AtomId>,
}

impl ParsedBody {
    pub fn new(type_idx: Option<usize>, container: bool, trailing_null: bool) -> Self {
        ParsedBody {
            type_idx,
            container,
            trailing_null,
            terminating_null: false,
            fields: Fields::new(),
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum AtomBody {
    Parsed(ParsedBody),
    /// Unrecognized atom, deferred to a byte range of the original source.
    /// Never has fields or children; its size is fixed to the observed length.
    Passthrough(SourceSpan),
}

/// One atom in the tree.
#[derive(Debug, Clone)]
pub struct AtomNode {
    pub kind: FourCC,
    /// Size read from the header at parse time. Used to detect mismatches and
    /// to know where the body ends; the live size is always recomputed.
    pub declared_size: u64,
    /// Whether the 8-byte extended size form was used in the source. Sticky:
    /// once extended, the atom is re-serialized extended even if its content
    /// would now fit the compact form.
    pub extended_header: bool,
    /// Non-owning back edge to the enclosing atom; `None` for a root.
    pub parent: Option<AtomId>,
    pub body: AtomBody,
}

impl AtomNode {
    pub fn is_passthrough(&self) -> bool {
        matches!(self.body, AtomBody::Passthrough(_))
    }

    pub fn is_container(&self) -> bool {
        match &self.body {
            AtomBody::Parsed(p) => p.container,
            AtomBody::Passthrough(_) => false,
        }
    }

    /// Type-level trailing-null capability.
    pub fn trailing_null(&self) -> bool {
        match &self.body {
            AtomBody::Parsed(p) => p.trailing_null,
            AtomBody::Passthrough(_) => false,
        }
    }

    /// Whether this instance had (and will re-emit) the 4 zero pad bytes.
    pub fn terminating_null(&self) -> bool {
        match &self.body {
            AtomBody::Parsed(p) => p.terminating_null,
            AtomBody::Passthrough(_) => false,
        }
    }

    pub fn fields(&self) -> Option<&Fields> {
        match &self.body {
            AtomBody::Parsed(p) => Some(&p.fields),
            AtomBody::Passthrough(_) => None,
        }
    }

    pub fn fields_mut(&mut self) -> Option<&mut Fields> {
        match &mut self.body {
            AtomBody::Parsed(p) => Some(&mut p.fields),
            AtomBody::Passthrough(_) => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields().and_then(|f| f.get(name))
    }

    pub fn children(&self) -> &[AtomId] {
        match &self.body {
            AtomBody::Parsed(p) => &p.children,
            AtomBody::Passthrough(_) => &[],
        }
    }
}
