use crate::atoms::FourCC;
use crate::reader::{ReadError, ReadSeek};
use crate::value::{FieldDef, Fields, read_schema};
use std::io::Write;

/// Contract implemented by every concrete atom type.
///
/// A type supplies a kind-match predicate, its capability set (container,
/// trailing-null participation), an optional fixed field schema, and may
/// override the body read/write logic for variable-length content. The
/// default body read consumes exactly the fixed schema; the default body
/// write re-emits all fields in order. Variable-length entries appended by a
/// custom `read_body` are written back by the same ordered loop, and since
/// every [`Value`](crate::Value) knows its encoded width the size invariant
/// holds without further bookkeeping.
pub trait AtomType: Send + Sync {
    /// Human-readable type name, used in diagnostics.
    fn name(&self) -> &'static str;

    fn supports(&self, kind: FourCC) -> bool;

    /// The body is a sequence of child atoms (after the fixed fields).
    fn is_container(&self) -> bool {
        false
    }

    /// The kind participates in the 4-byte trailing-null padding convention.
    fn trailing_null(&self) -> bool {
        false
    }

    /// Whether the registry may pick this type by kind alone. Types whose
    /// real discriminator is positional context within a specific parent
    /// (e.g. metadata items reusing the kind field as an index) return false
    /// and are only constructed by their container's own logic.
    fn auto_resolve(&self) -> bool {
        true
    }

    fn field_schema(&self) -> &[FieldDef] {
        &[]
    }

    /// Parse the body up to `end` (absolute offset of the atom's end).
    fn read_body(
        &self,
        r: &mut dyn ReadSeek,
        fields: &mut Fields,
        end: u64,
    ) -> Result<(), ReadError> {
        let _ = end;
        read_schema(r, self.field_schema(), fields)
    }

    /// Serialize the body fields. Child atoms and the trailing null are the
    /// writer's business, not the type's.
    fn write_body(&self, w: &mut dyn Write, fields: &Fields) -> std::io::Result<()> {
        fields.write_to(w)
    }
}

/// Ordered list of atom type descriptors.
///
/// Resolution scans in registration order and picks the first type whose
/// predicate matches; no match means the atom is kept as a passthrough.
pub struct Registry {
    types: Vec<Box<dyn AtomType>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry { types: Vec::new() }
    }

    /// Return the registry with the given type appended.
    pub fn with_type(mut self, ty: Box<dyn AtomType>) -> Self {
        self.types.push(ty);
        self
    }

    pub fn register(&mut self, ty: Box<dyn AtomType>) {
        self.types.push(ty);
    }

    /// First registered type that supports `kind`, skipping types excluded
    /// from automatic resolution.
    pub fn resolve(&self, kind: FourCC) -> Option<(usize, &dyn AtomType)> {
        self.types
            .iter()
            .enumerate()
            .find(|(_, ty)| ty.auto_resolve() && ty.supports(kind))
            .map(|(idx, ty)| (idx, ty.as_ref()))
    }

    pub fn type_at(&self, idx: usize) -> Option<&dyn AtomType> {
        self.types.get(idx).map(|ty| ty.as_ref())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
