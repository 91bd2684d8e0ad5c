// ABOUTME: Device tree blob reading module
// ABOUTME: Header validation, structure tokens and the indexed flat tree reader

pub mod error;
pub mod header;
pub mod reader;
pub mod tokens;

pub use error::DtbError;
pub use header::DtbHeader;
pub use reader::{Fdt, FlatTree, NodeOffset, PropOffset};
pub use tokens::DtbToken;
