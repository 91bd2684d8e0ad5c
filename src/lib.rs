// ABOUTME: Semantic device tree blob decoder with schema-driven typing
// ABOUTME: Turns raw DTB properties into typed values and re-splits cells using tree context

//! # DTB Unflatten
//!
//! Decode a Device Tree Blob (DTB) into a tree of typed values. Property
//! types come from a schema index; flat cell lists are then re-split using
//! tree context (`#address-cells`, `#interrupt-cells`, `#gpio-cells`, ...).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # use dtb_unflatten::{SchemaIndex, unflatten_blob};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let blob = std::fs::read("board.dtb")?;
//! let schema = SchemaIndex::from_json(&std::fs::read_to_string("types.json")?)?;
//!
//! let decoded = unflatten_blob(&blob, &schema)?;
//! if let Some(uart) = decoded.root.find_node("/soc/serial") {
//!     println!("reg: {:?}", uart.property("reg"));
//! }
//! for diagnostic in &decoded.diagnostics {
//!     eprintln!("{diagnostic}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! 1. [`dtb::Fdt`] indexes the blob and exposes it through [`FlatTree`]
//! 2. [`schema::resolve`] picks a format for each property
//! 3. [`decode::PropertyDecoder`] turns bytes into a [`PropertyValue`]
//! 4. [`DecodeSession`] builds the [`Node`] tree and the phandle tables
//! 5. The [`fixups`] passes run in order: GPIO, interrupts, addresses, phandle+args
//!
//! Anomalies never abort a decode. They are logged through the `log` facade
//! and returned as [`Diagnostic`]s next to the tree.

pub mod builder;
pub mod decode;
pub mod diagnostics;
pub mod dtb;
pub mod fixups;
pub mod schema;
pub mod tree;
pub mod value;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
mod testing;

// Re-export main types
pub use builder::{
    DecodeSession, Decoded, PhandleLocationSet, PhandleTable, PhandleTarget, unflatten,
    unflatten_blob,
};
pub use decode::PropertyDecoder;
pub use diagnostics::Diagnostic;
pub use dtb::{DtbError, DtbHeader, Fdt, FlatTree, NodeOffset, PropOffset};
pub use schema::{SchemaError, SchemaIndex, TypeDescriptor, TypeTag};
pub use tree::Node;
pub use value::{IntWidth, PLACEHOLDER_PHANDLE, PropertyValue, SizedInt};
