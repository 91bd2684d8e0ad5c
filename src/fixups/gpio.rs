// ABOUTME: GPIO descriptor fixup pass
// ABOUTME: Splits `*-gpios` cells into per-GPIO groups sized by the controller's #gpio-cells

use super::child_path;
use crate::builder::PhandleTable;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::tree::Node;
use crate::value::{PropertyValue, SizedInt};

const GPIO_CELLS: &str = "#gpio-cells";

/// Whether `name` is a GPIO consumer property
pub fn is_gpio_property(name: &str) -> bool {
    (matches!(name, "gpio" | "gpios") || name.ends_with("-gpio") || name.ends_with("-gpios"))
        && !name.ends_with(",nr-gpios")
}

pub fn fixup(root: &mut Node, phandles: &PhandleTable, diagnostics: &mut Diagnostics) {
    walk(root, "", phandles, diagnostics);
}

fn walk(node: &mut Node, path: &str, phandles: &PhandleTable, diagnostics: &mut Diagnostics) {
    // Hogs describe the provider's own lines
    if node.has_property("gpio-hog") {
        return;
    }

    for (name, value) in node.properties.iter_mut() {
        if !is_gpio_property(name) {
            continue;
        }
        if let Some(flat) = value.flat_cells() {
            let rows = split(&flat, path, name, phandles, diagnostics);
            *value = PropertyValue::IntRows(rows);
        }
    }

    for child in node.children.values_mut() {
        let path = child_path(path, child);
        walk(child, &path, phandles, diagnostics);
    }
}

fn split(
    flat: &[SizedInt],
    path: &str,
    property: &str,
    phandles: &PhandleTable,
    diagnostics: &mut Diagnostics,
) -> Vec<Vec<SizedInt>> {
    let mut rows = Vec::new();
    let mut i = 0;

    while i < flat.len() {
        let lead = flat[i];
        let len = if lead.raw() == 0 {
            1
        } else if lead.is_placeholder() {
            // Up to the next placeholder; the final cell never starts a group
            let search_end = (flat.len() - 1).max(i + 1);
            flat[i + 1..search_end]
                .iter()
                .position(SizedInt::is_placeholder)
                .map_or(flat.len() - i, |p| p + 1)
        } else {
            match phandles.get(lead.raw()) {
                Some(target) => {
                    let cells = target.cells(GPIO_CELLS).unwrap_or_else(|| {
                        diagnostics.report(Diagnostic::MissingCells {
                            path: path.to_string(),
                            property: property.to_string(),
                            cells: GPIO_CELLS.to_string(),
                        });
                        0
                    });
                    1 + cells as usize
                }
                None => {
                    diagnostics.report(Diagnostic::UnresolvedPhandle {
                        path: path.to_string(),
                        property: property.to_string(),
                        phandle: lead.raw() as u32,
                    });
                    rows.push(flat[i..].to_vec());
                    break;
                }
            }
        };

        let end = (i + len).min(flat.len());
        rows.push(flat[i..end].to_vec());
        i = end;
    }

    rows
}
