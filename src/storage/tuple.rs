//! Tuples and their schemas.
//!
//! A [`TupleDesc`] is the ordered sequence of field types (and optional
//! names) describing one table's records; every record of a table has the
//! same fixed byte width, which is what makes the slotted heap-page layout
//! possible. A [`Tuple`] is one record: typed field values plus an optional
//! [`RecordId`] naming the page slot it currently occupies on disk.

use std::fmt;

use crate::common::{Error, PageId, Result};

/// Fixed payload length of a `Text` field in bytes.
pub const TEXT_LEN: usize = 128;

/// Byte length of `s` clamped to [`TEXT_LEN`], never splitting a UTF-8
/// character. A split would make the stored bytes decode lossily and the
/// page's disk image would change on every reload.
fn clamped_text_len(s: &str) -> usize {
    if s.len() <= TEXT_LEN {
        return s.len();
    }
    let mut end = TEXT_LEN;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// The type of one tuple field.
///
/// Field widths are fixed so that a record's byte size is a function of its
/// schema alone:
/// - `Int`: 4 bytes, little-endian two's complement
/// - `Text`: 4-byte little-endian length prefix + [`TEXT_LEN`] payload bytes
///   (content zero-padded), 132 bytes total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int,
    Text,
}

impl FieldType {
    /// Serialized width of a field of this type.
    pub fn byte_size(self) -> usize {
        match self {
            FieldType::Int => 4,
            FieldType::Text => 4 + TEXT_LEN,
        }
    }

    /// Parse one field from `buf`, which must hold exactly
    /// [`byte_size`](Self::byte_size) bytes.
    pub fn parse(self, buf: &[u8]) -> Field {
        debug_assert_eq!(buf.len(), self.byte_size());
        match self {
            FieldType::Int => {
                let v = i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
                Field::Int(v)
            }
            FieldType::Text => {
                let len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
                let len = len.min(TEXT_LEN);
                // Non-UTF-8 payload bytes are replaced, not rejected.
                let s = String::from_utf8_lossy(&buf[4..4 + len]).into_owned();
                Field::Text(s)
            }
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => write!(f, "int"),
            FieldType::Text => write!(f, "text"),
        }
    }
}

/// One typed field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Int(i32),
    Text(String),
}

impl Field {
    /// The type this value serializes as.
    pub fn field_type(&self) -> FieldType {
        match self {
            Field::Int(_) => FieldType::Int,
            Field::Text(_) => FieldType::Text,
        }
    }

    /// Serialize into `buf`, which must hold exactly the type's byte size.
    ///
    /// `Text` longer than [`TEXT_LEN`] bytes is truncated at the last
    /// character boundary within the limit, so the stored bytes always
    /// decode back to the same string.
    pub fn serialize_into(&self, buf: &mut [u8]) {
        debug_assert_eq!(buf.len(), self.field_type().byte_size());
        match self {
            Field::Int(v) => buf.copy_from_slice(&v.to_le_bytes()),
            Field::Text(s) => {
                let len = clamped_text_len(s);
                buf.fill(0);
                buf[..4].copy_from_slice(&(len as u32).to_le_bytes());
                buf[4..4 + len].copy_from_slice(&s.as_bytes()[..len]);
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One field slot of a schema: a type plus an optional column name.
#[derive(Debug, Clone)]
struct TdItem {
    field_type: FieldType,
    name: Option<String>,
}

/// Schema descriptor: the ordered field types (and names) of one table.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    items: Vec<TdItem>,
}

impl TupleDesc {
    /// Schema with anonymous fields.
    pub fn new(types: &[FieldType]) -> Self {
        Self {
            items: types
                .iter()
                .map(|&field_type| TdItem {
                    field_type,
                    name: None,
                })
                .collect(),
        }
    }

    /// Schema with named fields. `types` and `names` must be equal length.
    pub fn with_names(types: &[FieldType], names: &[&str]) -> Self {
        assert_eq!(types.len(), names.len(), "one name per field");
        Self {
            items: types
                .iter()
                .zip(names)
                .map(|(&field_type, name)| TdItem {
                    field_type,
                    name: Some((*name).to_string()),
                })
                .collect(),
        }
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Type of the `i`-th field.
    ///
    /// # Panics
    /// Panics if `i` is out of range.
    pub fn field_type(&self, i: usize) -> FieldType {
        self.items[i].field_type
    }

    /// Name of the `i`-th field, if it has one.
    pub fn field_name(&self, i: usize) -> Option<&str> {
        self.items.get(i).and_then(|item| item.name.as_deref())
    }

    /// Index of the first field with the given name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.name.as_deref() == Some(name))
    }

    /// Serialized byte width of one record with this schema.
    pub fn byte_size(&self) -> usize {
        self.items
            .iter()
            .map(|item| item.field_type.byte_size())
            .sum()
    }

    /// Concatenate two schemas, fields of `a` first.
    pub fn merge(a: &TupleDesc, b: &TupleDesc) -> TupleDesc {
        let mut items = a.items.clone();
        items.extend(b.items.iter().cloned());
        TupleDesc { items }
    }
}

/// Two schemas are compatible when their field types match position by
/// position; column names carry no weight.
impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(&other.items)
                .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl Eq for TupleDesc {}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}({})", item.field_type, item.name.as_deref().unwrap_or("?"))?;
        }
        Ok(())
    }
}

/// On-disk location of a tuple: a page plus a slot index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: usize,
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.page_id, self.slot)
    }
}

/// One record: field values ordered per its schema, plus the slot it lives
/// in on disk (set by insertion, absent before insertion).
#[derive(Debug, Clone)]
pub struct Tuple {
    desc: TupleDesc,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Build a tuple, checking that every field value matches the schema.
    ///
    /// `Text` values longer than [`TEXT_LEN`] bytes are truncated here, at
    /// the last character boundary within the limit, so a constructed
    /// tuple always serializes to the same bytes it parses back from.
    pub fn new(desc: TupleDesc, fields: Vec<Field>) -> Result<Self> {
        if fields.len() != desc.len()
            || fields
                .iter()
                .enumerate()
                .any(|(i, f)| f.field_type() != desc.field_type(i))
        {
            return Err(Error::SchemaMismatch);
        }
        let fields = fields
            .into_iter()
            .map(|f| match f {
                Field::Text(mut s) if s.len() > TEXT_LEN => {
                    s.truncate(clamped_text_len(&s));
                    Field::Text(s)
                }
                other => other,
            })
            .collect();
        Ok(Self {
            desc,
            fields,
            record_id: None,
        })
    }

    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    /// The `i`-th field value.
    ///
    /// # Panics
    /// Panics if `i` is out of range.
    pub fn field(&self, i: usize) -> &Field {
        &self.fields[i]
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Where this tuple is stored, if it has been inserted.
    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub(crate) fn set_record_id(&mut self, rid: Option<RecordId>) {
        self.record_id = rid;
    }
}

/// Tuples compare by schema compatibility and field values; the record id
/// is location, not content, and is ignored.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.desc == other.desc && self.fields == other.fields
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}
