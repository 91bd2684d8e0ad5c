// ABOUTME: Generic phandle+args fixup pass for schema-declared phandle-array properties
// ABOUTME: Splits one flat row into per-reference groups and tags each leading phandle

use super::child_path;
use crate::builder::{PhandleLocationSet, PhandleTable};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::schema::{SchemaIndex, TypeTag};
use crate::tree::Node;
use crate::value::{PropertyValue, SizedInt};

/// Properties whose argument count does not follow the `foos`/`#foo-cells` naming.
///
/// `None` means every cell is a lone phandle.
pub const PHANDLE_ARGS: &[(&str, Option<&str>)] = &[
    ("assigned-clocks", Some("#clock-cells")),
    ("assigned-clock-parents", Some("#clock-cells")),
    ("cooling-device", Some("#cooling-cells")),
    ("interrupts-extended", Some("#interrupt-cells")),
    ("interconnects", Some("#interconnect-cells")),
    ("mboxes", Some("#mbox-cells")),
    ("sound-dai", Some("#sound-dai-cells")),
    ("nvmem-cells", None),
    ("memory-region", None),
];

/// Entries of these properties are a source and a destination reference
const PAIRED: &[&str] = &["interconnects"];

/// Name of the `#*-cells` property sizing each group of `property`.
///
/// The flag is set when the name was only guessed from the plural suffix.
pub fn cells_property(property: &str) -> Option<(Option<String>, bool)> {
    if let Some((_, cells)) = PHANDLE_ARGS.iter().find(|(name, _)| *name == property) {
        return Some((cells.map(str::to_string), false));
    }
    let singular = property.strip_suffix('s')?;
    Some((Some(format!("#{singular}-cells")), true))
}

struct Context<'a> {
    schema: &'a SchemaIndex,
    phandles: &'a PhandleTable,
    locations: &'a PhandleLocationSet,
}

pub fn fixup(
    root: &mut Node,
    schema: &SchemaIndex,
    phandles: &PhandleTable,
    locations: &PhandleLocationSet,
    diagnostics: &mut Diagnostics,
) {
    let ctx = Context {
        schema,
        phandles,
        locations,
    };
    walk(root, "", &ctx, diagnostics);
}

fn walk(node: &mut Node, path: &str, ctx: &Context<'_>, diagnostics: &mut Diagnostics) {
    for (name, value) in node.properties.iter_mut() {
        if !ctx.schema.has_type(name, TypeTag::PHANDLE_ARRAY) {
            continue;
        }
        // Already split by the decoder or an earlier pass
        let flat = match value.as_rows() {
            Some([row]) if !row.is_empty() => row.clone(),
            _ => continue,
        };
        let Some((cells, guessed)) = cells_property(name) else {
            continue;
        };

        let prop = Property {
            path,
            name,
            cells: cells.as_deref(),
        };
        if guessed && prop.group_len(&flat, 0, ctx).is_err() {
            log::trace!("{path}:{name}: not a phandle+args list");
            continue;
        }
        *value = PropertyValue::IntRows(prop.split(&flat, ctx, diagnostics));
    }

    for child in node.children.values_mut() {
        let path = child_path(path, child);
        walk(child, &path, ctx, diagnostics);
    }
}

/// A phandle-array property being split
struct Property<'p> {
    path: &'p str,
    name: &'p str,
    cells: Option<&'p str>,
}

impl Property<'_> {
    fn split(
        &self,
        flat: &[SizedInt],
        ctx: &Context<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Vec<Vec<SizedInt>> {
        let paired = PAIRED.contains(&self.name);
        let mut rows = Vec::new();
        let mut i = 0;

        while i < flat.len() {
            let mut len = match self.group_len(flat, i, ctx) {
                Ok(len) => len,
                Err(stop) => {
                    if let Some(diagnostic) = stop {
                        diagnostics.report(diagnostic);
                    }
                    rows.push(flat[i..].to_vec());
                    break;
                }
            };
            if paired && i + len < flat.len() {
                match self.group_len(flat, i + len, ctx) {
                    Ok(second) => len += second,
                    Err(Some(diagnostic)) => diagnostics.report(diagnostic),
                    Err(None) => {}
                }
            }

            let end = (i + len).min(flat.len());
            let mut group = flat[i..end].to_vec();
            if group[0].raw() != 0 {
                group[0] = group[0].as_phandle();
            }
            rows.push(group);
            i = end;
        }
        rows
    }

    /// Cells taken by the reference starting at cell `at`.
    ///
    /// `Err` stops splitting, carrying a diagnostic when the data is at fault.
    fn group_len(
        &self,
        flat: &[SizedInt],
        at: usize,
        ctx: &Context<'_>,
    ) -> Result<usize, Option<Diagnostic>> {
        let rest = &flat[at..];
        let lead = rest[0];
        let Some(cells) = self.cells else {
            return Ok(1);
        };
        if lead.raw() == 0 {
            return Ok(1);
        }

        if lead.is_placeholder() {
            // Argument cells run until the next recorded phandle position
            if !self.is_phandle_at(at, ctx) {
                log::debug!("{}:{}: placeholder at cell {at} has no fixup", self.path, self.name);
                return Err(None);
            }
            let args = (1..rest.len())
                .take_while(|&n| !self.is_phandle_at(at + n, ctx))
                .count();
            return Ok(1 + args);
        }

        let target = ctx.phandles.get(lead.raw()).ok_or_else(|| {
            Some(Diagnostic::UnresolvedPhandle {
                path: self.path.to_string(),
                property: self.name.to_string(),
                phandle: lead.raw() as u32,
            })
        })?;
        let args = target.cells(cells).ok_or_else(|| {
            Some(Diagnostic::MissingCells {
                path: self.path.to_string(),
                property: self.name.to_string(),
                cells: cells.to_string(),
            })
        })?;
        Ok(1 + args as usize)
    }

    fn is_phandle_at(&self, cell: usize, ctx: &Context<'_>) -> bool {
        ctx.locations.contains(self.path, self.name, cell * 4)
    }
}
