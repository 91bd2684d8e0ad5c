// ABOUTME: Non-fatal anomalies found while decoding and fixing up a tree
// ABOUTME: Collected alongside the tree and mirrored to the log facade

use core::fmt;

/// One recoverable anomaly
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A `flag`-typed property carries data
    BooleanWithValue {
        node: String,
        property: String,
        len: usize,
    },
    /// Byte length is not a multiple of the declared element width
    SizeMismatch {
        node: String,
        property: String,
        len: usize,
        format: String,
    },
    /// Bytes are not the text the schema declares
    MalformedText { node: String, property: String },
    /// A phandle does not name any node in the tree
    UnresolvedPhandle {
        path: String,
        property: String,
        phandle: u32,
    },
    /// The referenced node lacks the `#*-cells` property needed to split
    MissingCells {
        path: String,
        property: String,
        cells: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::BooleanWithValue {
                node,
                property,
                len,
            } => write!(f, "{node}/{property}: boolean property with {len} byte value"),
            Diagnostic::SizeMismatch {
                node,
                property,
                len,
                format,
            } => write!(f, "{node}/{property}: size ({len}) error for type {format}"),
            Diagnostic::MalformedText { node, property } => {
                write!(f, "{node}/{property}: value is not a valid string list")
            }
            Diagnostic::UnresolvedPhandle {
                path,
                property,
                phandle,
            } => write!(f, "{path}:{property}: no node with phandle {phandle:#x}"),
            Diagnostic::MissingCells {
                path,
                property,
                cells,
            } => write!(f, "{path}:{property}: referenced node has no {cells}"),
        }
    }
}

/// Ordered anomaly stream for one decode run
#[derive(Debug, Default)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn report(&mut self, diagnostic: Diagnostic) {
        log::warn!("{diagnostic}");
        self.0.push(diagnostic);
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_keeps_order() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.report(Diagnostic::MalformedText {
            node: "soc".into(),
            property: "status".into(),
        });
        diagnostics.report(Diagnostic::UnresolvedPhandle {
            path: "/soc/gpio".into(),
            property: "reset-gpios".into(),
            phandle: 7,
        });

        let all = diagnostics.into_vec();
        assert_eq!(all.len(), 2);
        assert_eq!(
            all[1].to_string(),
            "/soc/gpio:reset-gpios: no node with phandle 0x7"
        );
    }

    #[test]
    fn test_display_size_mismatch() {
        let d = Diagnostic::SizeMismatch {
            node: "cpu@0".into(),
            property: "clock-frequency".into(),
            len: 6,
            format: "uint32".into(),
        };
        assert_eq!(d.to_string(), "cpu@0/clock-frequency: size (6) error for type uint32");
    }
}
