use crate::atoms::FourCC;
use crate::reader::{ReadError, ReadSeek, read_exact_or_eof};
use byteorder::{BigEndian, WriteBytesExt};
use std::fmt;
use std::io::Write;

/// Fixed-width big-endian binary layout of a single field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    FourCC,
    Bytes(usize),
}

impl Layout {
    pub const fn width(self) -> u64 {
        match self {
            Layout::U8 | Layout::I8 => 1,
            Layout::U16 | Layout::I16 => 2,
            Layout::U32 | Layout::I32 | Layout::FourCC => 4,
            Layout::U64 | Layout::I64 => 8,
            Layout::Bytes(n) => n as u64,
        }
    }

    pub fn read(self, r: &mut dyn ReadSeek) -> Result<Value, ReadError> {
        match self {
            Layout::U8 => {
                let mut b = [0u8; 1];
                read_exact_or_eof(r, &mut b)?;
                Ok(Value::U8(b[0]))
            }
            Layout::I8 => {
                let mut b = [0u8; 1];
                read_exact_or_eof(r, &mut b)?;
                Ok(Value::I8(b[0] as i8))
            }
            Layout::U16 => {
                let mut b = [0u8; 2];
                read_exact_or_eof(r, &mut b)?;
                Ok(Value::U16(u16::from_be_bytes(b)))
            }
            Layout::I16 => {
                let mut b = [0u8; 2];
                read_exact_or_eof(r, &mut b)?;
                Ok(Value::I16(i16::from_be_bytes(b)))
            }
            Layout::U32 => {
                let mut b = [0u8; 4];
                read_exact_or_eof(r, &mut b)?;
                Ok(Value::U32(u32::from_be_bytes(b)))
            }
            Layout::I32 => {
                let mut b = [0u8; 4];
                read_exact_or_eof(r, &mut b)?;
                Ok(Value::I32(i32::from_be_bytes(b)))
            }
            Layout::U64 => {
                let mut b = [0u8; 8];
                read_exact_or_eof(r, &mut b)?;
                Ok(Value::U64(u64::from_be_bytes(b)))
            }
            Layout::I64 => {
                let mut b = [0u8; 8];
                read_exact_or_eof(r, &mut b)?;
                Ok(Value::I64(i64::from_be_bytes(b)))
            }
            Layout::FourCC => {
                let mut b = [0u8; 4];
                read_exact_or_eof(r, &mut b)?;
                Ok(Value::FourCC(FourCC(b)))
            }
            Layout::Bytes(n) => {
                let mut v = vec![0u8; n];
                read_exact_or_eof(r, &mut v)?;
                Ok(Value::Bytes(v))
            }
        }
    }
}

/// One entry of a fixed field schema: name plus binary layout.
#[derive(Clone, Copy, Debug)]
pub struct FieldDef {
    pub name: &'static str,
    pub layout: Layout,
}

pub const fn field(name: &'static str, layout: Layout) -> FieldDef {
    FieldDef { name, layout }
}

/// A decoded field value. Every variant knows its own encoded width, so the
/// size of an atom body is just the sum over its fields, fixed schema prefix
/// and variable tail alike.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    FourCC(FourCC),
    Bytes(Vec<u8>),
    List(Vec<Value>),
}

impl Value {
    pub fn encoded_len(&self) -> u64 {
        match self {
            Value::U8(_) | Value::I8(_) => 1,
            Value::U16(_) | Value::I16(_) => 2,
            Value::U32(_) | Value::I32(_) | Value::FourCC(_) => 4,
            Value::U64(_) | Value::I64(_) => 8,
            Value::Bytes(b) => b.len() as u64,
            Value::List(items) => items.iter().map(Value::encoded_len).sum(),
        }
    }

    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> std::io::Result<()> {
        match self {
            Value::U8(v) => w.write_u8(*v),
            Value::I8(v) => w.write_i8(*v),
            Value::U16(v) => w.write_u16::<BigEndian>(*v),
            Value::I16(v) => w.write_i16::<BigEndian>(*v),
            Value::U32(v) => w.write_u32::<BigEndian>(*v),
            Value::I32(v) => w.write_i32::<BigEndian>(*v),
            Value::U64(v) => w.write_u64::<BigEndian>(*v),
            Value::I64(v) => w.write_i64::<BigEndian>(*v),
            Value::FourCC(cc) => w.write_all(&cc.0),
            Value::Bytes(b) => w.write_all(b),
            Value::List(items) => {
                for v in items {
                    v.write_to(&mut *w)?;
                }
                Ok(())
            }
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U8(v) => Some(*v as u64),
            Value::U16(v) => Some(*v as u64),
            Value::U32(v) => Some(*v as u64),
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I8(v) => Some(*v as i64),
            Value::I16(v) => Some(*v as i64),
            Value::I32(v) => Some(*v as i64),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U8(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::FourCC(cc) => write!(f, "{cc}"),
            Value::Bytes(b) => {
                if b.iter().all(|c| (32..=126).contains(c)) {
                    write!(f, "'{}'", String::from_utf8_lossy(b))
                } else {
                    write!(f, "0x{}", hex::encode(b))
                }
            }
            Value::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::U8(v) => s.serialize_u8(*v),
            Value::I8(v) => s.serialize_i8(*v),
            Value::U16(v) => s.serialize_u16(*v),
            Value::I16(v) => s.serialize_i16(*v),
            Value::U32(v) => s.serialize_u32(*v),
            Value::I32(v) => s.serialize_i32(*v),
            Value::U64(v) => s.serialize_u64(*v),
            Value::I64(v) => s.serialize_i64(*v),
            Value::FourCC(cc) => s.serialize_str(&cc.as_str_lossy()),
            Value::Bytes(b) => s.serialize_str(&hex::encode(b)),
            Value::List(items) => s.collect_seq(items),
        }
    }
}

/// Ordered field mapping of a parsed atom body.
///
/// The order is the serialization order: a fixed schema prefix first, then any
/// computed or variable-length entries the type appended during its body read.
#[derive(Clone, Debug, Default)]
pub struct Fields {
    entries: Vec<(String, Value)>,
}

impl Fields {
    pub fn new() -> Self {
        Fields::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Replace an existing field's value, or append a new field.
    pub fn set(&mut self, name: &str, value: Value) {
        match self.get_mut(name) {
            Some(slot) => *slot = value,
            None => self.push(name, value),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.entries.push((name.into(), value));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn encoded_len(&self) -> u64 {
        self.entries.iter().map(|(_, v)| v.encoded_len()).sum()
    }

    /// Serialize all fields in order.
    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> std::io::Result<()> {
        for (_, v) in &self.entries {
            v.write_to(&mut *w)?;
        }
        Ok(())
    }
}

/// Read a fixed field schema into `fields`, in schema order.
pub fn read_schema(
    r: &mut dyn ReadSeek,
    schema: &[FieldDef],
    fields: &mut Fields,
) -> Result<(), ReadError> {
    for def in schema {
        let value = def.layout.read(r)?;
        fields.push(def.name, value);
    }
    Ok(())
}
