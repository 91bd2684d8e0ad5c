// ABOUTME: Property value decoder turning raw bytes into typed values
// ABOUTME: Flags, string lists and integer rows reshaped by schema dimensions

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::schema::{Dim, Format, IntFormat, SchemaIndex, TypeTag, resolve};
use crate::value::{IntWidth, PropertyValue, SizedInt};

/// Nodes whose properties are always string lists
pub const STRING_NODES: [&str; 2] = ["__fixups__", "aliases"];

/// Decodes the properties of one node against a schema index
pub struct PropertyDecoder<'a> {
    schema: &'a SchemaIndex,
    node: &'a str,
}

impl<'a> PropertyDecoder<'a> {
    pub fn new(schema: &'a SchemaIndex, node: &'a str) -> Self {
        Self { schema, node }
    }

    /// Decode property `name` holding `bytes`
    pub fn decode(
        &self,
        name: &str,
        bytes: &[u8],
        diagnostics: &mut Diagnostics,
    ) -> PropertyValue {
        if bytes.is_empty() {
            return PropertyValue::Boolean;
        }
        if STRING_NODES.contains(&self.node) {
            return self.loose_strings(name, bytes, diagnostics);
        }

        let format = resolve(self.schema, name, bytes);
        self.decode_format(name, bytes, format, diagnostics)
    }

    fn decode_format(
        &self,
        name: &str,
        bytes: &[u8],
        format: Format,
        diagnostics: &mut Diagnostics,
    ) -> PropertyValue {
        match format {
            Format::Flag => {
                diagnostics.report(Diagnostic::BooleanWithValue {
                    node: self.node.to_string(),
                    property: name.to_string(),
                    len: bytes.len(),
                });
                PropertyValue::Raw(bytes.to_vec())
            }
            Format::Strings { fallback } => match strict_strings(bytes) {
                Some(list) => PropertyValue::StringList(list),
                None => match fallback {
                    Some(tag) => {
                        self.decode_format(name, bytes, Format::for_tag(tag, None), diagnostics)
                    }
                    None => {
                        diagnostics.report(Diagnostic::MalformedText {
                            node: self.node.to_string(),
                            property: name.to_string(),
                        });
                        PropertyValue::Raw(bytes.to_vec())
                    }
                },
            },
            Format::LooseStrings => self.loose_strings(name, bytes, diagnostics),
            Format::DefaultString => {
                let text = &bytes[..bytes.len() - 1];
                PropertyValue::StringList(vec![String::from_utf8_lossy(text).into_owned()])
            }
            Format::Int { format, dim } => {
                self.decode_ints(name, bytes, Some(format), dim, diagnostics)
            }
            Format::Untyped => self.decode_ints(name, bytes, None, None, diagnostics),
            Format::Unknown => {
                log::debug!("{}/{name}: no type found", self.node);
                PropertyValue::Raw(bytes.to_vec())
            }
        }
    }

    fn decode_ints(
        &self,
        name: &str,
        bytes: &[u8],
        format: Option<IntFormat>,
        dim: Option<Dim>,
        diagnostics: &mut Diagnostics,
    ) -> PropertyValue {
        let declared = format.map(|f| (f.base.width(), f.base.is_signed()));
        let (width, signed) = match declared {
            Some((width, signed)) if bytes.len() % width.bytes() == 0 => (width, signed),
            _ => {
                diagnostics.report(Diagnostic::SizeMismatch {
                    node: self.node.to_string(),
                    property: name.to_string(),
                    len: bytes.len(),
                    format: format.map_or(TypeTag::Node, TypeTag::Int).to_string(),
                });
                match IntWidth::best_fit(bytes.len()) {
                    Some(width) => (width, false),
                    None => return PropertyValue::Raw(bytes.to_vec()),
                }
            }
        };

        let flat: Vec<SizedInt> = bytes
            .chunks_exact(width.bytes())
            .filter_map(|chunk| SizedInt::from_be_bytes(chunk, signed))
            .collect();

        match dim {
            Some(dim) => PropertyValue::IntRows(reshape(flat, dim)),
            None => PropertyValue::IntRows(vec![flat]),
        }
    }

    fn loose_strings(
        &self,
        name: &str,
        bytes: &[u8],
        diagnostics: &mut Diagnostics,
    ) -> PropertyValue {
        match loose_strings(bytes) {
            Some(list) => PropertyValue::StringList(list),
            None => {
                diagnostics.report(Diagnostic::MalformedText {
                    node: self.node.to_string(),
                    property: name.to_string(),
                });
                PropertyValue::Raw(bytes.to_vec())
            }
        }
    }
}

fn is_printable(text: &[u8]) -> bool {
    text.iter().all(|b| (0x20..=0x7e).contains(b))
}

/// Strict string list: terminated, with every string non-empty and printable
fn strict_strings(bytes: &[u8]) -> Option<Vec<String>> {
    let body = bytes.strip_suffix(&[0])?;
    body.split(|&b| b == 0)
        .map(|s| {
            (!s.is_empty() && is_printable(s)).then(|| String::from_utf8_lossy(s).into_owned())
        })
        .collect()
}

/// Drop one trailing terminator and split the ASCII text on NUL
fn loose_strings(bytes: &[u8]) -> Option<Vec<String>> {
    let body = bytes.strip_suffix(&[0]).unwrap_or(bytes);
    if !body.is_ascii() {
        return None;
    }
    Some(
        body.split(|&b| b == 0)
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect(),
    )
}

/// Row length for `n` elements under dimension constraint `dim`
pub fn stride(n: usize, dim: Dim) -> usize {
    let [[outer_min, outer_max], [inner_min, inner_max]] = dim.map(|r| r.map(|v| v as usize));

    let stride = if inner_max != 0 && inner_min == inner_max {
        inner_max
    } else if outer_max != 0 && outer_min == outer_max {
        if n % outer_max == 0 { n / outer_max } else { n }
    } else if inner_min != 0 {
        let mut fits = (inner_min..=inner_max).filter(|d| n % d == 0);
        match (fits.next(), fits.next()) {
            (Some(d), None) => d,
            _ => n,
        }
    } else {
        n
    };
    stride.max(1)
}

/// Split `flat` into consecutive rows; a short final row is kept
pub fn reshape(flat: Vec<SizedInt>, dim: Dim) -> Vec<Vec<SizedInt>> {
    if flat.is_empty() {
        return vec![flat];
    }
    let stride = stride(flat.len(), dim);
    flat.chunks(stride).map(<[SizedInt]>::to_vec).collect()
}
