// NIBRS record schema registry
//
// One immutable schema per record type. Offsets are absolute, 0-indexed,
// half-open byte ranges inside a line with its terminator removed.

mod layouts;

use serde::Serialize;
use std::fmt;

pub use layouts::{
    ADMINISTRATIVE, ARRESTEE, BATCH_HEADER, OFFENDER, OFFENSE, PROPERTY, VICTIM,
};

/// The closed set of record layouts found in a master file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RecordType {
    /// `BH` batch header, one per reporting agency
    BatchHeader,
    /// `01` administrative segment
    Administrative,
    /// `02` offense segment
    Offense,
    /// `03` property segment
    Property,
    /// `04` victim segment
    Victim,
    /// `05` offender segment
    Offender,
    /// `06` arrestee segment
    Arrestee,
}

impl RecordType {
    pub const ALL: [RecordType; 7] = [
        RecordType::BatchHeader,
        RecordType::Administrative,
        RecordType::Offense,
        RecordType::Property,
        RecordType::Victim,
        RecordType::Offender,
        RecordType::Arrestee,
    ];

    /// Two-character tag at the start of a line
    pub fn tag(self) -> &'static str {
        match self {
            RecordType::BatchHeader => "BH",
            RecordType::Administrative => "01",
            RecordType::Offense => "02",
            RecordType::Property => "03",
            RecordType::Victim => "04",
            RecordType::Offender => "05",
            RecordType::Arrestee => "06",
        }
    }

    /// Destination table name; tables are named after their tag
    pub fn table_name(self) -> &'static str {
        self.tag()
    }

    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"BH" => Some(RecordType::BatchHeader),
            b"01" => Some(RecordType::Administrative),
            b"02" => Some(RecordType::Offense),
            b"03" => Some(RecordType::Property),
            b"04" => Some(RecordType::Victim),
            b"05" => Some(RecordType::Offender),
            b"06" => Some(RecordType::Arrestee),
            _ => None,
        }
    }

    pub fn schema(self) -> &'static Schema {
        match self {
            RecordType::BatchHeader => &BATCH_HEADER,
            RecordType::Administrative => &ADMINISTRATIVE,
            RecordType::Offense => &OFFENSE,
            RecordType::Property => &PROPERTY,
            RecordType::Victim => &VICTIM,
            RecordType::Offender => &OFFENDER,
            RecordType::Arrestee => &ARRESTEE,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// How many values a field yields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Scalar,
    /// `count` values; value `i` lives at `[start + i*stride, end + i*stride)`
    Repeated { count: usize, stride: usize },
}

/// One named field of a layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub start: usize,
    pub end: usize,
    pub cardinality: Cardinality,
    /// Strip surrounding whitespace after extraction
    pub trim: bool,
}

impl FieldSpec {
    pub const fn scalar(name: &'static str, start: usize, end: usize) -> Self {
        Self {
            name,
            start,
            end,
            cardinality: Cardinality::Scalar,
            trim: false,
        }
    }

    pub const fn repeated(
        name: &'static str,
        start: usize,
        end: usize,
        count: usize,
        stride: usize,
    ) -> Self {
        Self {
            name,
            start,
            end,
            cardinality: Cardinality::Repeated { count, stride },
            trim: false,
        }
    }

    pub const fn trimmed(mut self) -> Self {
        self.trim = true;
        self
    }

    pub fn is_repeated(&self) -> bool {
        matches!(self.cardinality, Cardinality::Repeated { .. })
    }

    /// Byte range of every value this field yields, in index order
    pub fn ranges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let (count, stride) = match self.cardinality {
            Cardinality::Scalar => (1, 0),
            Cardinality::Repeated { count, stride } => (count, stride),
        };
        (0..count).map(move |i| (self.start + i * stride, self.end + i * stride))
    }
}

/// Field layout of one record type
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    pub record_type: RecordType,
    pub fields: &'static [FieldSpec],
}

impl Schema {
    /// Column names in declaration order
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Look up the schema for a line's two-byte type tag
pub fn schema_for(tag: &[u8]) -> Option<&'static Schema> {
    RecordType::from_tag(tag).map(RecordType::schema)
}
