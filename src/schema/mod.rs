// ABOUTME: Schema-derived property typing
// ABOUTME: Type tags, the property type index and format resolution

pub mod index;
pub mod resolver;
pub mod types;

pub use index::{PatternRule, SchemaError, SchemaIndex};
pub use resolver::{Format, resolve};
pub use types::{Dim, IntBase, IntFormat, Shape, TypeDescriptor, TypeTag};
