// ABOUTME: Flattened tree reader exposing node and property enumeration over a DTB
// ABOUTME: Indexes the structure block once and hands out opaque offsets

use super::error::DtbError;
use super::header::DtbHeader;
use super::tokens::{DtbToken, read_be_u32};
use core::iter;

/// Opaque handle to a node inside a [`FlatTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeOffset(usize);

/// Opaque handle to a property inside a [`FlatTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropOffset(usize);

/// Enumeration interface over a flattened device tree.
///
/// Every traversal method returns `None` once the end of the sibling or
/// property chain is reached. Implementations must keep offsets stable for
/// the lifetime of the reader.
pub trait FlatTree {
    /// The root node, if the tree has one
    fn root(&self) -> Option<NodeOffset>;

    /// First child of `node`
    fn first_child(&self, node: NodeOffset) -> Option<NodeOffset>;

    /// Next sibling of `node`
    fn next_sibling(&self, node: NodeOffset) -> Option<NodeOffset>;

    /// Node name including any unit address (`uart@1000`)
    fn node_name(&self, node: NodeOffset) -> &str;

    /// First property of `node`
    fn first_property(&self, node: NodeOffset) -> Option<PropOffset>;

    /// Property following `prop` on the same node
    fn next_property(&self, prop: PropOffset) -> Option<PropOffset>;

    /// Property name
    fn property_name(&self, prop: PropOffset) -> &str;

    /// Raw property value
    fn property_bytes(&self, prop: PropOffset) -> &[u8];

    /// Iterate over the children of `node` in blob order
    fn children(&self, node: NodeOffset) -> impl Iterator<Item = NodeOffset> + '_
    where
        Self: Sized,
    {
        iter::successors(self.first_child(node), move |&child| self.next_sibling(child))
    }

    /// Iterate over the properties of `node` in blob order
    fn properties(&self, node: NodeOffset) -> impl Iterator<Item = PropOffset> + '_
    where
        Self: Sized,
    {
        iter::successors(self.first_property(node), move |&prop| self.next_property(prop))
    }
}

#[derive(Debug)]
struct NodeEntry<'a> {
    name: &'a str,
    first_child: Option<usize>,
    next_sibling: Option<usize>,
    first_prop: Option<usize>,
}

#[derive(Debug)]
struct PropEntry<'a> {
    name: &'a str,
    data: &'a [u8],
    next: Option<usize>,
}

/// In-memory reader over a complete DTB
#[derive(Debug)]
pub struct Fdt<'a> {
    header: DtbHeader,
    nodes: Vec<NodeEntry<'a>>,
    props: Vec<PropEntry<'a>>,
}

impl<'a> Fdt<'a> {
    /// Validate the header and index the structure block of `blob`
    pub fn new(blob: &'a [u8]) -> Result<Self, DtbError> {
        let header = DtbHeader::parse(blob)?;
        let struct_block = header.struct_block(blob)?;
        let strings_block = header.strings_block(blob)?;

        let mut fdt = Fdt {
            header,
            nodes: Vec::new(),
            props: Vec::new(),
        };
        fdt.index(struct_block, strings_block)?;
        log::trace!(
            "indexed {} nodes and {} properties",
            fdt.nodes.len(),
            fdt.props.len()
        );
        Ok(fdt)
    }

    /// The parsed blob header
    pub fn header(&self) -> &DtbHeader {
        &self.header
    }

    /// Walk the structure block with an explicit stack of open nodes
    fn index(&mut self, block: &'a [u8], strings: &'a [u8]) -> Result<(), DtbError> {
        struct Open {
            node: usize,
            last_child: Option<usize>,
            last_prop: Option<usize>,
        }

        let mut stack: Vec<Open> = Vec::new();
        let mut offset = 0;

        loop {
            let token = DtbToken::parse(block, offset)?;
            offset += 4;

            match token {
                DtbToken::BeginNode => {
                    let name = read_cstr(block, offset)?;
                    offset = DtbToken::align(offset + name.len() + 1);

                    let index = self.nodes.len();
                    self.nodes.push(NodeEntry {
                        name,
                        first_child: None,
                        next_sibling: None,
                        first_prop: None,
                    });

                    match stack.last_mut() {
                        Some(parent) => {
                            match parent.last_child {
                                Some(prev) => self.nodes[prev].next_sibling = Some(index),
                                None => self.nodes[parent.node].first_child = Some(index),
                            }
                            parent.last_child = Some(index);
                        }
                        // A second top-level node
                        None if index != 0 => return Err(DtbError::Unbalanced),
                        None => {}
                    }

                    stack.push(Open {
                        node: index,
                        last_child: None,
                        last_prop: None,
                    });
                }
                DtbToken::Property => {
                    let len = read_be_u32(block, offset)? as usize;
                    let name_offset = read_be_u32(block, offset + 4)? as usize;
                    let start = offset + 8;
                    let data = block
                        .get(start..start + len)
                        .ok_or(DtbError::Truncated(start))?;
                    offset = DtbToken::align(start + len);

                    let name = read_cstr(strings, name_offset)?;
                    let open = stack.last_mut().ok_or(DtbError::Unbalanced)?;

                    let index = self.props.len();
                    self.props.push(PropEntry {
                        name,
                        data,
                        next: None,
                    });
                    match open.last_prop {
                        Some(prev) => self.props[prev].next = Some(index),
                        None => self.nodes[open.node].first_prop = Some(index),
                    }
                    open.last_prop = Some(index);
                }
                DtbToken::Nop => {}
                DtbToken::EndNode => {
                    stack.pop().ok_or(DtbError::Unbalanced)?;
                }
                DtbToken::End => {
                    return if stack.is_empty() && !self.nodes.is_empty() {
                        Ok(())
                    } else {
                        Err(DtbError::Unbalanced)
                    };
                }
            }
        }
    }
}

impl FlatTree for Fdt<'_> {
    fn root(&self) -> Option<NodeOffset> {
        (!self.nodes.is_empty()).then_some(NodeOffset(0))
    }

    fn first_child(&self, node: NodeOffset) -> Option<NodeOffset> {
        self.nodes[node.0].first_child.map(NodeOffset)
    }

    fn next_sibling(&self, node: NodeOffset) -> Option<NodeOffset> {
        self.nodes[node.0].next_sibling.map(NodeOffset)
    }

    fn node_name(&self, node: NodeOffset) -> &str {
        self.nodes[node.0].name
    }

    fn first_property(&self, node: NodeOffset) -> Option<PropOffset> {
        self.nodes[node.0].first_prop.map(PropOffset)
    }

    fn next_property(&self, prop: PropOffset) -> Option<PropOffset> {
        self.props[prop.0].next.map(PropOffset)
    }

    fn property_name(&self, prop: PropOffset) -> &str {
        self.props[prop.0].name
    }

    fn property_bytes(&self, prop: PropOffset) -> &[u8] {
        self.props[prop.0].data
    }
}

/// Read a NUL-terminated UTF-8 string starting at `offset`
fn read_cstr(bytes: &[u8], offset: usize) -> Result<&str, DtbError> {
    let tail = bytes.get(offset..).ok_or(DtbError::BadString(offset))?;
    let len = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(DtbError::BadString(offset))?;
    core::str::from_utf8(&tail[..len]).map_err(|_| DtbError::BadString(offset))
}
