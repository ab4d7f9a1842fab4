//! Reading, modifying and writing QuickTime/MP4-family movies.
//!
//! A movie is a list of atoms: self-describing, length-prefixed records that
//! can contain other atoms. Atom data is specific to each kind; registering
//! [`AtomType`] implementations lets that data be decoded, edited and
//! re-serialized. When no type is registered for a kind, the atom is kept as
//! a passthrough that lazily copies the source bytes on write, so a movie can
//! be manipulated with only partial understanding of what it contains.
//!
//! ```no_run
//! use qtfile::{Diagnostics, Movie, default_registry};
//! use std::fs::File;
//!
//! let registry = default_registry();
//! let mut diag = Diagnostics::new();
//! let mut src = File::open("movie.mov")?;
//! let movie = Movie::read(&mut src, &registry, &mut diag);
//! for &id in movie.roots() {
//!     println!("[{}] {} bytes", movie.node(id).kind, movie.size_of(id));
//! }
//! # Ok::<(), std::io::Error>(())
//! ```

pub mod atoms;
pub mod diag;
pub mod header;
pub mod known_atoms;
pub mod movie;
pub mod reader;
pub mod registry;
pub mod util;
pub mod value;
pub mod writer;

pub use atoms::{AtomBody, AtomId, AtomNode, FourCC, ParsedBody, SourceSpan};
pub use diag::{Diagnostic, Diagnostics, Severity};
pub use header::{AtomHeader, read_header, write_header};
pub use known_atoms::default_registry;
pub use movie::Movie;
pub use reader::{ReadBound, ReadError, ReadSeek, TreeReader};
pub use registry::{AtomType, Registry};
pub use value::{FieldDef, Fields, Layout, Value, field, read_schema};
pub use writer::TreeWriter;
