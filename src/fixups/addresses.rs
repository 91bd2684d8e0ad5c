// ABOUTME: Address and range fixup pass
// ABOUTME: Splits `reg`, `ranges` and `dma-ranges` by inherited #address-cells/#size-cells

use super::{own_cells, rechunk};
use crate::tree::Node;

const ADDRESS_CELLS: &str = "#address-cells";
const SIZE_CELLS: &str = "#size-cells";

/// Cell counts assumed above the root
pub const DEFAULT_ADDRESS_CELLS: usize = 2;
pub const DEFAULT_SIZE_CELLS: usize = 1;

pub fn fixup(root: &mut Node) {
    walk(root, DEFAULT_ADDRESS_CELLS, DEFAULT_SIZE_CELLS);
}

fn walk(node: &mut Node, ac: usize, sc: usize) {
    let child_ac = own_cells(node, ADDRESS_CELLS);
    let child_sc = own_cells(node, SIZE_CELLS);

    if let Some(reg) = node.properties.get_mut("reg") {
        rechunk(reg, ac + sc);
    }

    // Child address, parent address, child size
    let range_len = ac + child_ac.unwrap_or(0) + child_sc.unwrap_or(0);
    for name in ["ranges", "dma-ranges"] {
        if let Some(value) = node.properties.get_mut(name) {
            rechunk(value, range_len);
        }
    }

    let (ac, sc) = (child_ac.unwrap_or(ac), child_sc.unwrap_or(sc));
    for child in node.children.values_mut() {
        walk(child, ac, sc);
    }
}
