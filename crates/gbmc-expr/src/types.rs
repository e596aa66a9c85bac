//! C types attached to every expression node.

use std::fmt;

/// A C type as seen by the checker after front-end adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// `_Bool`.
    Bool,
    /// Signed two's complement bit-vector.
    Signedbv { width: u32 },
    /// Unsigned bit-vector.
    Unsignedbv { width: u32 },
    /// Fixed-point number with `integer_bits` bits before the binary point.
    Fixedbv { width: u32, integer_bits: u32 },
    /// IEEE floating point.
    Floatbv { width: u32 },
    /// Pointer to the subtype.
    Pointer(Box<Type>),
    /// Array with an optional constant size.
    Array { elem: Box<Type>, size: Option<u64> },
    /// Struct with ordered members.
    Struct(StructType),
    /// Union with ordered members.
    Union(StructType),
    /// Function type.
    Code(CodeType),
    /// `void`.
    Empty,
    /// String literal type.
    String,
}

/// Tag and ordered members of a struct or union.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructType {
    pub tag: String,
    pub members: Vec<(String, Type)>,
}

/// Signature of a function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CodeType {
    pub arguments: Vec<Type>,
    pub return_type: Box<Type>,
}

impl Type {
    /// `signed int`.
    pub fn int() -> Self {
        Type::Signedbv { width: 32 }
    }

    /// `unsigned int`.
    pub fn uint() -> Self {
        Type::Unsignedbv { width: 32 }
    }

    /// `char` (signed on the targets we model).
    pub fn char() -> Self {
        Type::Signedbv { width: 8 }
    }

    pub fn pointer_to(subtype: Type) -> Self {
        Type::Pointer(Box::new(subtype))
    }

    pub fn array_of(elem: Type, size: Option<u64>) -> Self {
        Type::Array {
            elem: Box::new(elem),
            size,
        }
    }

    pub fn code(arguments: Vec<Type>, return_type: Type) -> Self {
        Type::Code(CodeType {
            arguments,
            return_type: Box::new(return_type),
        })
    }

    pub fn struct_of(tag: &str, members: Vec<(String, Type)>) -> Self {
        Type::Struct(StructType {
            tag: tag.to_string(),
            members,
        })
    }

    pub fn union_of(tag: &str, members: Vec<(String, Type)>) -> Self {
        Type::Union(StructType {
            tag: tag.to_string(),
            members,
        })
    }

    /// Stable textual type id, as reported in GUI trace records.
    pub fn type_id(&self) -> &'static str {
        match self {
            Type::Bool => "bool",
            Type::Signedbv { .. } => "signedbv",
            Type::Unsignedbv { .. } => "unsignedbv",
            Type::Fixedbv { .. } => "fixedbv",
            Type::Floatbv { .. } => "floatbv",
            Type::Pointer(_) => "pointer",
            Type::Array { .. } => "array",
            Type::Struct(_) => "struct",
            Type::Union(_) => "union",
            Type::Code(_) => "code",
            Type::Empty => "empty",
            Type::String => "string",
        }
    }

    /// Signed or unsigned bit-vector.
    pub fn is_bv(&self) -> bool {
        matches!(self, Type::Signedbv { .. } | Type::Unsignedbv { .. })
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Type::Signedbv { .. })
    }

    pub fn is_fixedbv(&self) -> bool {
        matches!(self, Type::Fixedbv { .. })
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Type::Code(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Type::Struct(_))
    }

    pub fn is_union(&self) -> bool {
        matches!(self, Type::Union(_))
    }

    /// Bit width for scalar types, `None` for aggregates and code.
    pub fn width(&self) -> Option<u32> {
        match self {
            Type::Bool => Some(1),
            Type::Signedbv { width }
            | Type::Unsignedbv { width }
            | Type::Fixedbv { width, .. }
            | Type::Floatbv { width } => Some(*width),
            Type::Pointer(_) => Some(64),
            _ => None,
        }
    }

    /// Type of a named struct/union member.
    pub fn member_type(&self, name: &str) -> Option<&Type> {
        match self {
            Type::Struct(s) | Type::Union(s) => {
                s.members.iter().find(|(n, _)| n == name).map(|(_, t)| t)
            }
            _ => None,
        }
    }

    /// Subtype of a pointer or element type of an array.
    pub fn subtype(&self) -> Option<&Type> {
        match self {
            Type::Pointer(t) => Some(t),
            Type::Array { elem, .. } => Some(elem),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "_Bool"),
            Type::Signedbv { width } => match width {
                8 => write!(f, "signed char"),
                16 => write!(f, "signed short int"),
                32 => write!(f, "signed int"),
                64 => write!(f, "signed long int"),
                w => write!(f, "__signedbv<{}>", w),
            },
            Type::Unsignedbv { width } => match width {
                8 => write!(f, "unsigned char"),
                16 => write!(f, "unsigned short int"),
                32 => write!(f, "unsigned int"),
                64 => write!(f, "unsigned long int"),
                w => write!(f, "__unsignedbv<{}>", w),
            },
            Type::Fixedbv {
                width,
                integer_bits,
            } => write!(f, "__fixedbv<{}, {}>", width, integer_bits),
            Type::Floatbv { width } => match width {
                32 => write!(f, "float"),
                64 => write!(f, "double"),
                w => write!(f, "__floatbv<{}>", w),
            },
            Type::Pointer(t) => write!(f, "{} *", t),
            Type::Array { elem, size } => match size {
                Some(n) => write!(f, "{} [{}]", elem, n),
                None => write!(f, "{} []", elem),
            },
            Type::Struct(s) => write!(f, "struct {}", s.tag),
            Type::Union(s) => write!(f, "union {}", s.tag),
            Type::Code(c) => {
                write!(f, "{} (", c.return_type)?;
                for (i, arg) in c.arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Type::Empty => write!(f, "void"),
            Type::String => write!(f, "string"),
        }
    }
}
