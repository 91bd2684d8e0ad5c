// ABOUTME: Typed property values produced by the decoder
// ABOUTME: Sized integers with phandle tagging and the property value variants

use serde::ser::{Serialize, SerializeSeq, Serializer};

/// Unresolved phandle sentinel left in place by overlay compilation
pub const PLACEHOLDER_PHANDLE: u64 = 0xffff_ffff;

/// Bit width of a decoded integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    /// Size of one element in bytes
    pub fn bytes(self) -> usize {
        match self {
            IntWidth::W8 => 1,
            IntWidth::W16 => 2,
            IntWidth::W32 => 4,
            IntWidth::W64 => 8,
        }
    }

    pub fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }

    /// Width whose single element exactly covers `len` bytes, preferring cells
    pub fn best_fit(len: usize) -> Option<Self> {
        match len {
            4 => Some(IntWidth::W32),
            2 => Some(IntWidth::W16),
            1 => Some(IntWidth::W8),
            _ => None,
        }
    }
}

/// An integer tagged with its encoded width and signedness.
///
/// The raw bit pattern is kept zero-extended; signed values are
/// sign-extended on demand by [`SizedInt::signed_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SizedInt {
    raw: u64,
    width: IntWidth,
    signed: bool,
    phandle: bool,
}

impl SizedInt {
    /// Unsigned integer of the given width
    pub fn new(raw: u64, width: IntWidth) -> Self {
        Self::with_sign(raw, width, false)
    }

    /// Integer of the given width and signedness; `raw` is truncated to the width
    pub fn with_sign(raw: u64, width: IntWidth, signed: bool) -> Self {
        let raw = match width {
            IntWidth::W64 => raw,
            _ => raw & ((1u64 << width.bits()) - 1),
        };
        Self {
            raw,
            width,
            signed,
            phandle: false,
        }
    }

    /// Decode one big-endian element; the slice length selects the width
    pub fn from_be_bytes(bytes: &[u8], signed: bool) -> Option<Self> {
        let width = match bytes.len() {
            1 => IntWidth::W8,
            2 => IntWidth::W16,
            4 => IntWidth::W32,
            8 => IntWidth::W64,
            _ => return None,
        };
        let raw = bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        Some(Self::with_sign(raw, width, signed))
    }

    /// Zero-extended bit pattern
    pub fn raw(&self) -> u64 {
        self.raw
    }

    pub fn width(&self) -> IntWidth {
        self.width
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// Value interpreted according to the signedness
    pub fn signed_value(&self) -> i64 {
        if !self.signed {
            return self.raw as i64;
        }
        let shift = 64 - self.width.bits();
        ((self.raw << shift) as i64) >> shift
    }

    /// Whether a fixup identified this integer as a node reference
    pub fn is_phandle(&self) -> bool {
        self.phandle
    }

    /// Copy of this integer marked as a node reference
    #[must_use]
    pub fn as_phandle(mut self) -> Self {
        self.phandle = true;
        self
    }

    /// Whether this is the unresolved placeholder `0xffffffff`
    pub fn is_placeholder(&self) -> bool {
        !self.signed && self.raw == PLACEHOLDER_PHANDLE
    }
}

impl PartialEq<u64> for SizedInt {
    fn eq(&self, other: &u64) -> bool {
        self.raw == *other
    }
}

impl Serialize for SizedInt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.signed {
            serializer.serialize_i64(self.signed_value())
        } else {
            serializer.serialize_u64(self.raw)
        }
    }
}

/// Decoded value of a single property
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Presence-only property; always true
    Boolean,
    /// One or more NUL-terminated strings
    StringList(Vec<String>),
    /// Numeric data; a non-matrix property is a single row
    IntRows(Vec<Vec<SizedInt>>),
    /// Undecodable data
    Raw(Vec<u8>),
}

impl PropertyValue {
    /// Integer rows, if numeric
    pub fn as_rows(&self) -> Option<&[Vec<SizedInt>]> {
        match self {
            PropertyValue::IntRows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Strings, if a string list
    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            PropertyValue::StringList(list) => Some(list),
            _ => None,
        }
    }

    /// First integer of the first row
    pub fn first_int(&self) -> Option<SizedInt> {
        self.as_rows()?.first()?.first().copied()
    }

    /// All integers with the row structure removed
    pub fn flat_cells(&self) -> Option<Vec<SizedInt>> {
        self.as_rows().map(|rows| rows.concat())
    }

    /// Row structure as raw bit patterns
    pub fn raw_rows(&self) -> Option<Vec<Vec<u64>>> {
        self.as_rows().map(|rows| {
            rows.iter()
                .map(|row| row.iter().map(SizedInt::raw).collect())
                .collect()
        })
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, PropertyValue::Boolean)
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PropertyValue::Boolean => serializer.serialize_bool(true),
            PropertyValue::StringList(list) => list.serialize(serializer),
            PropertyValue::IntRows(rows) => rows.serialize(serializer),
            PropertyValue::Raw(bytes) => {
                let mut seq = serializer.serialize_seq(Some(bytes.len()))?;
                for byte in bytes {
                    seq.serialize_element(byte)?;
                }
                seq.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sized_int_from_be_bytes() {
        let v = SizedInt::from_be_bytes(&[0x12, 0x34, 0x56, 0x78], false).unwrap();
        assert_eq!(v.raw(), 0x12345678);
        assert_eq!(v.width(), IntWidth::W32);
        assert!(!v.is_phandle());

        assert!(SizedInt::from_be_bytes(&[1, 2, 3], false).is_none());
    }

    #[test]
    fn test_signed_values_sign_extend() {
        let v = SizedInt::from_be_bytes(&[0xff], true).unwrap();
        assert_eq!(v.signed_value(), -1);
        assert_eq!(v.raw(), 0xff);

        let v = SizedInt::from_be_bytes(&[0xff, 0xfe], true).unwrap();
        assert_eq!(v.signed_value(), -2);

        let v = SizedInt::with_sign(0x1_0000_0005, IntWidth::W32, false);
        assert_eq!(v.raw(), 5);
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(SizedInt::new(PLACEHOLDER_PHANDLE, IntWidth::W32).is_placeholder());
        assert!(!SizedInt::with_sign(PLACEHOLDER_PHANDLE, IntWidth::W32, true).is_placeholder());
        assert!(!SizedInt::new(1, IntWidth::W32).is_placeholder());
    }

    #[test]
    fn test_phandle_marker_is_part_of_equality() {
        let plain = SizedInt::new(3, IntWidth::W32);
        let tagged = plain.as_phandle();
        assert!(tagged.is_phandle());
        assert_ne!(plain, tagged);
        assert_eq!(tagged, 3u64);
    }

    #[test]
    fn test_property_value_accessors() {
        let value = PropertyValue::IntRows(vec![
            vec![SizedInt::new(1, IntWidth::W32), SizedInt::new(2, IntWidth::W32)],
            vec![SizedInt::new(3, IntWidth::W32)],
        ]);
        assert_eq!(value.first_int().map(|v| v.raw()), Some(1));
        assert_eq!(value.flat_cells().unwrap().len(), 3);
        assert_eq!(value.raw_rows(), Some(vec![vec![1, 2], vec![3]]));
        assert!(value.as_strings().is_none());
        assert!(PropertyValue::Boolean.is_boolean());
    }

    #[test]
    fn test_serialize_shapes() {
        let rows = PropertyValue::IntRows(vec![vec![
            SizedInt::new(16, IntWidth::W32),
            SizedInt::from_be_bytes(&[0xff], true).unwrap(),
        ]]);
        assert_eq!(serde_json::to_string(&rows).unwrap(), "[[16,-1]]");
        assert_eq!(
            serde_json::to_string(&PropertyValue::Boolean).unwrap(),
            "true"
        );
        assert_eq!(
            serde_json::to_string(&PropertyValue::StringList(vec!["a".into(), "b".into()]))
                .unwrap(),
            r#"["a","b"]"#
        );
        assert_eq!(
            serde_json::to_string(&PropertyValue::Raw(vec![1, 2])).unwrap(),
            "[1,2]"
        );
    }
}
