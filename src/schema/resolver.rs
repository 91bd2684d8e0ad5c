// ABOUTME: Resolves the decoding format of a property from the schema index
// ABOUTME: Exact match first, then ordered patterns, then a best-effort default

use super::index::SchemaIndex;
use super::types::{Dim, IntFormat, TypeTag};

/// How the decoder should interpret a property's bytes
#[derive(Debug, Clone, PartialEq)]
pub enum Format {
    /// Presence-only boolean
    Flag,
    /// Strictly validated string list, with an alternate kind for non-text data
    Strings { fallback: Option<TypeTag> },
    /// NUL-separated text taken as-is
    LooseStrings,
    /// A single printable string recognised without schema help
    DefaultString,
    /// Fixed-width integers, reshaped by `dim` when present
    Int { format: IntFormat, dim: Option<Dim> },
    /// Typed, but without a cell layout; element width is inferred
    Untyped,
    /// Nothing known; keep the raw bytes
    Unknown,
}

impl Format {
    /// Decoding format implied by a single type tag
    pub fn for_tag(tag: TypeTag, dim: Option<Dim>) -> Self {
        match tag {
            TypeTag::Flag => Format::Flag,
            TypeTag::String | TypeTag::StringArray => Format::Strings { fallback: None },
            TypeTag::Int(format) => Format::Int {
                format,
                dim: dim.filter(|_| format.is_matrix_like()),
            },
            TypeTag::Node => Format::Untyped,
        }
    }
}

/// Pick the format for property `name` whose value is `bytes`
pub fn resolve(schema: &SchemaIndex, name: &str, bytes: &[u8]) -> Format {
    if let Some(format) = resolve_exact(schema, name, bytes) {
        return format;
    }
    if let Some(format) = resolve_pattern(schema, name, bytes) {
        return format;
    }
    resolve_default(bytes)
}

fn resolve_exact(schema: &SchemaIndex, name: &str, bytes: &[u8]) -> Option<Format> {
    let descriptor = schema.exact_type(name)?;
    let first = descriptor.first()?;

    if descriptor.has_string() {
        let fallback = descriptor.types.iter().copied().find(|t| !t.is_string());
        return Some(Format::Strings { fallback });
    }

    // Boolean-or-value properties such as `ranges`
    let tag = match descriptor.types.get(1) {
        Some(&second) if first == TypeTag::Flag && !bytes.is_empty() => second,
        _ => first,
    };
    Some(Format::for_tag(tag, descriptor.dim))
}

fn resolve_pattern(schema: &SchemaIndex, name: &str, bytes: &[u8]) -> Option<Format> {
    let mut chosen: Option<TypeTag> = None;
    let mut dim = None;

    for rule in schema.pattern_types() {
        if !rule.regex.is_match(name) {
            continue;
        }
        let Some(tag) = rule.descriptor.first() else {
            continue;
        };

        if let Some(current) = chosen
            && current != tag
        {
            if bytes.len() > 4 && current.has_array_marker() {
                log::debug!(
                    "{name}: keeping {current}, skipping conflicting pattern {} ({tag})",
                    rule.regex
                );
                continue;
            }
            log::debug!(
                "{name}: pattern {} ({tag}) overrides {current}",
                rule.regex
            );
        }

        if tag.is_string() {
            return Some(Format::LooseStrings);
        }
        if let (TypeTag::Int(format), Some(d)) = (tag, rule.descriptor.dim)
            && format.is_matrix_like()
        {
            dim = Some(d);
        }
        chosen = Some(tag);
    }

    chosen.map(|tag| Format::for_tag(tag, dim))
}

fn resolve_default(bytes: &[u8]) -> Format {
    if let Some(text) = bytes.strip_suffix(&[0])
        && text.iter().all(|b| (0x20..=0x7e).contains(b))
    {
        return Format::DefaultString;
    }
    if bytes.len() % 4 == 0 {
        return Format::Int {
            format: IntFormat::UINT32_ARRAY,
            dim: None,
        };
    }
    Format::Unknown
}
