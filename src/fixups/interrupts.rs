// ABOUTME: Interrupt specifier fixup pass
// ABOUTME: Splits `interrupts` and `interrupt-map` using inherited and parent #interrupt-cells

use super::{child_path, own_cells, rechunk};
use crate::builder::PhandleTable;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::tree::Node;
use crate::value::{PropertyValue, SizedInt};

const INTERRUPT_CELLS: &str = "#interrupt-cells";
const ADDRESS_CELLS: &str = "#address-cells";
const INTERRUPT_PARENT: &str = "interrupt-parent";
const INTERRUPT_MAP: &str = "interrupt-map";

/// Interrupt cells assumed above the root
pub const DEFAULT_INTERRUPT_CELLS: usize = 1;

pub fn fixup(root: &mut Node, phandles: &PhandleTable, diagnostics: &mut Diagnostics) {
    walk(root, "", DEFAULT_INTERRUPT_CELLS, phandles, diagnostics);
}

fn walk(
    node: &mut Node,
    path: &str,
    inherited: usize,
    phandles: &PhandleTable,
    diagnostics: &mut Diagnostics,
) {
    let icells = parent_cells(node, path, phandles, diagnostics).unwrap_or(inherited);

    if let Some(value) = node.properties.get_mut("interrupts") {
        rechunk(value, icells);
    }

    let map_cells = (
        own_cells(node, ADDRESS_CELLS).unwrap_or(0),
        own_cells(node, INTERRUPT_CELLS).unwrap_or(0),
    );
    if let Some(value) = node.properties.get_mut(INTERRUPT_MAP) {
        if let Some(flat) = value.flat_cells() {
            let rows = split_map(&flat, map_cells, path, phandles, diagnostics);
            *value = PropertyValue::IntRows(rows);
        }
    }

    let child_icells = own_cells(node, INTERRUPT_CELLS).unwrap_or(icells);
    for child in node.children.values_mut() {
        let path = child_path(path, child);
        walk(child, &path, child_icells, phandles, diagnostics);
    }
}

/// `#interrupt-cells` of the node named by `interrupt-parent`.
///
/// A placeholder parent is removed from the node since it can never resolve.
fn parent_cells(
    node: &mut Node,
    path: &str,
    phandles: &PhandleTable,
    diagnostics: &mut Diagnostics,
) -> Option<usize> {
    let parent = node.property(INTERRUPT_PARENT)?.first_int()?;
    if parent.is_placeholder() {
        log::debug!("{path}: dropping unresolved interrupt-parent");
        node.properties.remove(INTERRUPT_PARENT);
        return None;
    }

    let Some(target) = phandles.get(parent.raw()) else {
        diagnostics.report(Diagnostic::UnresolvedPhandle {
            path: path.to_string(),
            property: INTERRUPT_PARENT.to_string(),
            phandle: parent.raw() as u32,
        });
        return None;
    };

    let cells = target.cells(INTERRUPT_CELLS);
    if cells.is_none() {
        diagnostics.report(Diagnostic::MissingCells {
            path: path.to_string(),
            property: INTERRUPT_PARENT.to_string(),
            cells: INTERRUPT_CELLS.to_string(),
        });
    }
    cells.map(|c| c as usize)
}

/// Split an `interrupt-map` into entries.
///
/// Each entry is the child unit address, the child specifier, the parent
/// phandle and then the parent's unit address and specifier.
fn split_map(
    flat: &[SizedInt],
    (ac, ic): (usize, usize),
    path: &str,
    phandles: &PhandleTable,
    diagnostics: &mut Diagnostics,
) -> Vec<Vec<SizedInt>> {
    let parent_at = ac + ic;
    let Some(first_parent) = flat.get(parent_at) else {
        return vec![flat.to_vec()];
    };

    if first_parent.is_placeholder() {
        // Same provider throughout: entry length is the distance between parents
        return match flat[parent_at + 1..].iter().position(SizedInt::is_placeholder) {
            Some(p) => flat.chunks(p + 1).map(<[SizedInt]>::to_vec).collect(),
            None => vec![flat.to_vec()],
        };
    }

    let mut rows = Vec::new();
    let mut i = 0;
    while i < flat.len() {
        let entry = &flat[i..];
        let Some(parent) = entry.get(parent_at) else {
            rows.push(entry.to_vec());
            break;
        };
        let Some(target) = phandles.get(parent.raw()) else {
            diagnostics.report(Diagnostic::UnresolvedPhandle {
                path: path.to_string(),
                property: INTERRUPT_MAP.to_string(),
                phandle: parent.raw() as u32,
            });
            rows.push(entry.to_vec());
            break;
        };

        let parent_ac = target.cells(ADDRESS_CELLS).unwrap_or(0) as usize;
        let parent_ic = target.cells(INTERRUPT_CELLS).unwrap_or_else(|| {
            diagnostics.report(Diagnostic::MissingCells {
                path: path.to_string(),
                property: INTERRUPT_MAP.to_string(),
                cells: INTERRUPT_CELLS.to_string(),
            });
            0
        }) as usize;

        let len = (parent_at + 1 + parent_ac + parent_ic).min(entry.len());
        rows.push(entry[..len].to_vec());
        i += len;
    }
    rows
}
