//! Typed expression layer consumed by the GOTO program core.
//!
//! Front ends lower C into these types; the program model, the loop
//! extractor and the trace renderers only ever read them.

pub mod expr;
pub mod location;
pub mod printer;
pub mod symbol;
pub mod types;

pub use expr::{fixedbv_to_decimal, BinOp, Constant, Expr, ExprKind, UnaryOp};
pub use location::Location;
pub use printer::{from_expr, ExprPrinter};
pub use symbol::{Symbol, SymbolError, SymbolResult, SymbolTable};
pub use types::{CodeType, StructType, Type};

/// Prefix reserved for symbols the checker itself introduces.
pub const INTERNAL_PREFIX: &str = "__GBMC";

/// Marker contained in the qualified name of front-end temporaries.
pub const TEMPORARY_MARKER: &str = "::$tmp::";

/// Suffix of the placeholder symbol that receives a function's return value.
pub const RETURN_VALUE_SUFFIX: &str = "#return_value";
