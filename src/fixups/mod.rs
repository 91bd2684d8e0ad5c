// ABOUTME: Structural fixup passes re-splitting flat cell rows using tree context
// ABOUTME: GPIO, interrupt, address and generic phandle+args passes share these helpers

pub mod addresses;
pub mod gpio;
pub mod interrupts;
pub mod phandles;

use crate::tree::Node;
use crate::value::{PropertyValue, SizedInt};

/// Re-split a numeric property into rows of `stride` cells.
///
/// Non-numeric values and a zero stride leave the property untouched.
pub(crate) fn rechunk(value: &mut PropertyValue, stride: usize) {
    if stride == 0 {
        return;
    }
    if let Some(flat) = value.flat_cells() {
        *value = PropertyValue::IntRows(flat.chunks(stride).map(<[SizedInt]>::to_vec).collect());
    }
}

/// Own `#*-cells` value of a node, as a cell count
pub(crate) fn own_cells(node: &Node, name: &str) -> Option<usize> {
    node.prop_u32(name).map(|v| v as usize)
}

/// Path of a child given its parent's path; the root is `""`
pub(crate) fn child_path(parent: &str, child: &Node) -> String {
    format!("{parent}/{}", child.name)
}
