// ABOUTME: Tree builder walking a flat tree reader into decoded nodes
// ABOUTME: Owns the per-run phandle table, fixup locations and diagnostics

use crate::decode::PropertyDecoder;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::dtb::{DtbError, Fdt, FlatTree, NodeOffset};
use crate::fixups;
use crate::schema::SchemaIndex;
use crate::tree::Node;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Node holding external symbol fixups of an overlay
pub const FIXUPS_NODE: &str = "__fixups__";
/// Node recording where unresolved local phandles sit
pub const LOCAL_FIXUPS_NODE: &str = "__local_fixups__";

/// What the fixup passes need to know about a referenced node
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PhandleTarget {
    /// Path of the node, `""` for the root
    pub path: String,
    cells: BTreeMap<String, u32>,
}

impl PhandleTarget {
    /// Value of one of the node's `#*-cells` properties
    pub fn cells(&self, name: &str) -> Option<u32> {
        self.cells.get(name).copied()
    }
}

/// Phandle value to referenced node
#[derive(Debug, Clone, Default)]
pub struct PhandleTable(HashMap<u32, PhandleTarget>);

impl PhandleTable {
    /// Register `target`; a later node with the same phandle wins
    pub fn register(&mut self, phandle: u32, target: PhandleTarget) {
        if let Some(previous) = self.0.insert(phandle, target) {
            log::debug!("phandle {phandle:#x} of {} reassigned", previous.path);
        }
    }

    pub fn get(&self, phandle: u64) -> Option<&PhandleTarget> {
        u32::try_from(phandle).ok().and_then(|p| self.0.get(&p))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `"<path>:<property>:<byte-offset>"` positions known to hold a phandle
#[derive(Debug, Clone, Default)]
pub struct PhandleLocationSet(HashSet<String>);

impl PhandleLocationSet {
    fn key(path: &str, property: &str, offset: usize) -> String {
        format!("{path}:{property}:{offset}")
    }

    pub fn insert(&mut self, path: &str, property: &str, offset: usize) {
        self.0.insert(Self::key(path, property, offset));
    }

    pub fn contains(&self, path: &str, property: &str, offset: usize) -> bool {
        self.0.contains(&Self::key(path, property, offset))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of one decode run
#[derive(Debug)]
pub struct Decoded {
    /// Fully decoded and fixed-up root node
    pub root: Node,
    pub phandles: PhandleTable,
    pub locations: PhandleLocationSet,
    /// Symbol references listed under `__fixups__`
    pub fixups: BTreeSet<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// State of a single decode invocation
pub struct DecodeSession<'s> {
    schema: &'s SchemaIndex,
    phandles: PhandleTable,
    locations: PhandleLocationSet,
    fixups: BTreeSet<String>,
    diagnostics: Diagnostics,
}

impl<'s> DecodeSession<'s> {
    pub fn new(schema: &'s SchemaIndex) -> Self {
        Self {
            schema,
            phandles: PhandleTable::default(),
            locations: PhandleLocationSet::default(),
            fixups: BTreeSet::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// Decode the whole tree exposed by `reader` without fixups
    pub fn build<R: FlatTree>(&mut self, reader: &R) -> Node {
        reader
            .root()
            .and_then(|root| self.scan_node(reader, root, "/", ""))
            .unwrap_or_else(|| Node::new("/"))
    }

    /// Apply the structural fixup passes in their fixed order
    pub fn fix_up(&mut self, root: &mut Node) {
        fixups::gpio::fixup(root, &self.phandles, &mut self.diagnostics);
        fixups::interrupts::fixup(root, &self.phandles, &mut self.diagnostics);
        fixups::addresses::fixup(root);
        fixups::phandles::fixup(
            root,
            self.schema,
            &self.phandles,
            &self.locations,
            &mut self.diagnostics,
        );
    }

    pub fn finish(self, root: Node) -> Decoded {
        Decoded {
            root,
            phandles: self.phandles,
            locations: self.locations,
            fixups: self.fixups,
            diagnostics: self.diagnostics.into_vec(),
        }
    }

    fn scan_node<R: FlatTree>(
        &mut self,
        reader: &R,
        offset: NodeOffset,
        name: &str,
        path: &str,
    ) -> Option<Node> {
        match name {
            FIXUPS_NODE => {
                self.scan_fixups(reader, offset);
                return None;
            }
            LOCAL_FIXUPS_NODE => {
                self.scan_local_fixups(reader, offset, "");
                return None;
            }
            _ => {}
        }

        let mut node = Node::new(name);
        let decoder = PropertyDecoder::new(self.schema, name);
        for prop in reader.properties(offset) {
            let prop_name = reader.property_name(prop);
            let bytes = reader.property_bytes(prop);
            let value = decoder.decode(prop_name, bytes, &mut self.diagnostics);
            node.set_property(prop_name, value);
        }

        if let Some(phandle) = node.prop_u32("phandle").filter(|&p| p != 0) {
            log::trace!("registering phandle {phandle:#x} at {path:?}");
            self.phandles.register(phandle, target_for(&node, path));
        }

        for child in reader.children(offset) {
            let child_name = reader.node_name(child);
            let child_path = format!("{path}/{child_name}");
            if let Some(child_node) = self.scan_node(reader, child, child_name, &child_path) {
                node.add_child(child_node);
            }
        }

        Some(node)
    }

    fn scan_fixups<R: FlatTree>(&mut self, reader: &R, offset: NodeOffset) {
        let decoder = PropertyDecoder::new(self.schema, FIXUPS_NODE);
        for prop in reader.properties(offset) {
            let value = decoder.decode(
                reader.property_name(prop),
                reader.property_bytes(prop),
                &mut self.diagnostics,
            );
            if let Some(list) = value.as_strings() {
                self.fixups.extend(list.iter().cloned());
            }
        }
    }

    fn scan_local_fixups<R: FlatTree>(&mut self, reader: &R, offset: NodeOffset, path: &str) {
        for prop in reader.properties(offset) {
            let name = reader.property_name(prop);
            for cell in reader.property_bytes(prop).chunks_exact(4) {
                let at = u32::from_be_bytes([cell[0], cell[1], cell[2], cell[3]]);
                self.locations.insert(path, name, at as usize);
            }
        }

        for child in reader.children(offset) {
            let child_path = format!("{path}/{}", reader.node_name(child));
            self.scan_local_fixups(reader, child, &child_path);
        }
    }
}

/// Snapshot of a node's path and `#*-cells` values
fn target_for(node: &Node, path: &str) -> PhandleTarget {
    let cells = node
        .properties
        .keys()
        .filter(|name| name.starts_with('#'))
        .filter_map(|name| node.prop_u32(name).map(|v| (name.clone(), v)))
        .collect();
    PhandleTarget {
        path: path.to_string(),
        cells,
    }
}

/// Decode and fix up the tree exposed by `reader`
pub fn unflatten<R: FlatTree>(reader: &R, schema: &SchemaIndex) -> Decoded {
    let mut session = DecodeSession::new(schema);
    let mut root = session.build(reader);
    session.fix_up(&mut root);
    session.finish(root)
}

/// Read `blob` as a DTB, then decode and fix up its tree
pub fn unflatten_blob(blob: &[u8], schema: &SchemaIndex) -> Result<Decoded, DtbError> {
    let fdt = Fdt::new(blob)?;
    Ok(unflatten(&fdt, schema))
}
