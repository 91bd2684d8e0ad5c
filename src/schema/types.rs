// ABOUTME: Closed set of schema type tags and property type descriptors
// ABOUTME: Parses dtschema type names into widths, signedness and arity

use crate::value::IntWidth;
use core::fmt;
use core::str::FromStr;

/// Element type of a numeric property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntBase {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    /// Node reference, encoded as a `uint32` cell
    Phandle,
}

impl IntBase {
    pub fn width(self) -> IntWidth {
        match self {
            IntBase::Int8 | IntBase::Uint8 => IntWidth::W8,
            IntBase::Int16 | IntBase::Uint16 => IntWidth::W16,
            IntBase::Int32 | IntBase::Uint32 | IntBase::Phandle => IntWidth::W32,
            IntBase::Int64 | IntBase::Uint64 => IntWidth::W64,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            IntBase::Int8 | IntBase::Int16 | IntBase::Int32 | IntBase::Int64
        )
    }

    fn name(self) -> &'static str {
        match self {
            IntBase::Int8 => "int8",
            IntBase::Uint8 => "uint8",
            IntBase::Int16 => "int16",
            IntBase::Uint16 => "uint16",
            IntBase::Int32 => "int32",
            IntBase::Uint32 => "uint32",
            IntBase::Int64 => "int64",
            IntBase::Uint64 => "uint64",
            IntBase::Phandle => "phandle",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "int8" => IntBase::Int8,
            "uint8" => IntBase::Uint8,
            "int16" => IntBase::Int16,
            "uint16" => IntBase::Uint16,
            "int32" => IntBase::Int32,
            "uint32" => IntBase::Uint32,
            "int64" => IntBase::Int64,
            "uint64" => IntBase::Uint64,
            "phandle" => IntBase::Phandle,
            _ => return None,
        })
    }
}

/// Arity of a numeric property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Scalar,
    Array,
    Matrix,
}

/// Numeric format: element type plus arity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntFormat {
    pub base: IntBase,
    pub shape: Shape,
}

impl IntFormat {
    pub const UINT32_ARRAY: IntFormat = IntFormat {
        base: IntBase::Uint32,
        shape: Shape::Array,
    };

    /// Whether a dimension constraint may reshape values of this format
    pub fn is_matrix_like(self) -> bool {
        self.shape == Shape::Matrix || (self.base == IntBase::Phandle && self.shape == Shape::Array)
    }
}

/// A single schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// Presence-only boolean
    Flag,
    String,
    StringArray,
    Int(IntFormat),
    /// Object-typed property (e.g. a child description); carries no cell layout
    Node,
}

impl TypeTag {
    pub const PHANDLE_ARRAY: TypeTag = TypeTag::Int(IntFormat {
        base: IntBase::Phandle,
        shape: Shape::Array,
    });

    pub fn is_string(self) -> bool {
        matches!(self, TypeTag::String | TypeTag::StringArray)
    }

    /// Whether the type name carries an array or matrix marker
    pub fn has_array_marker(self) -> bool {
        match self {
            TypeTag::StringArray => true,
            TypeTag::Int(format) => format.shape != Shape::Scalar,
            _ => false,
        }
    }

    pub fn int_format(self) -> Option<IntFormat> {
        match self {
            TypeTag::Int(format) => Some(format),
            _ => None,
        }
    }
}

impl FromStr for TypeTag {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "flag" | "boolean" => return Ok(TypeTag::Flag),
            "string" => return Ok(TypeTag::String),
            "string-array" | "non-unique-string-array" => return Ok(TypeTag::StringArray),
            "node" | "object" => return Ok(TypeTag::Node),
            _ => {}
        }

        let (base, shape) = match name.split_once('-') {
            None => (name, Shape::Scalar),
            Some((base, "array")) => (base, Shape::Array),
            Some((base, "matrix")) => (base, Shape::Matrix),
            Some(_) => return Err(name.to_string()),
        };
        IntBase::from_name(base)
            .map(|base| TypeTag::Int(IntFormat { base, shape }))
            .ok_or_else(|| name.to_string())
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Flag => write!(f, "flag"),
            TypeTag::String => write!(f, "string"),
            TypeTag::StringArray => write!(f, "string-array"),
            TypeTag::Node => write!(f, "node"),
            TypeTag::Int(IntFormat { base, shape }) => match shape {
                Shape::Scalar => write!(f, "{}", base.name()),
                Shape::Array => write!(f, "{}-array", base.name()),
                Shape::Matrix => write!(f, "{}-matrix", base.name()),
            },
        }
    }
}

/// Inclusive `[min, max]` item count range
pub type Range = [u32; 2];

/// Two-axis size constraint: `[outer, inner]`
pub type Dim = [Range; 2];

/// Declared types of a property, in schema order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeDescriptor {
    pub types: Vec<TypeTag>,
    pub dim: Option<Dim>,
}

impl TypeDescriptor {
    pub fn new(types: impl IntoIterator<Item = TypeTag>) -> Self {
        Self {
            types: types.into_iter().collect(),
            dim: None,
        }
    }

    #[must_use]
    pub fn with_dim(mut self, dim: Dim) -> Self {
        self.dim = Some(dim);
        self
    }

    pub fn first(&self) -> Option<TypeTag> {
        self.types.first().copied()
    }

    pub fn contains(&self, tag: TypeTag) -> bool {
        self.types.contains(&tag)
    }

    pub fn has_string(&self) -> bool {
        self.types.iter().any(|t| t.is_string())
    }
}
