//! Typed expression trees.
//!
//! Every node carries its type explicitly. Expressions are immutable
//! values; passes build new trees instead of mutating shared ones.

use crate::types::Type;

/// A typed expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
}

/// Expression shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprKind {
    /// Reference to a symbol by qualified name.
    Symbol(String),
    /// Literal constant.
    Constant(Constant),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    AddressOf(Box<Expr>),
    Dereference(Box<Expr>),
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Member {
        base: Box<Expr>,
        member: String,
    },
    /// Conversion to `ty`.
    Typecast(Box<Expr>),
    If {
        cond: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },
    /// Struct value, one operand per member in declaration order.
    StructLit(Vec<Expr>),
    ArrayLit(Vec<Expr>),
    /// Unconstrained value of the node's type.
    Nondet,
}

/// Literal constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Bool(bool),
    /// Bit-vector value, already interpreted according to signedness.
    Int(i128),
    /// Raw two's complement bits of a fixed-point value.
    Fixedbv(i128),
    String(String),
    /// The null pointer.
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    /// Operator text in C syntax.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        }
    }

    /// C precedence level (higher binds tighter).
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Mul | BinOp::Div | BinOp::Mod => 13,
            BinOp::Add | BinOp::Sub => 12,
            BinOp::Shl | BinOp::Shr => 11,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 10,
            BinOp::Eq | BinOp::Ne => 9,
            BinOp::BitAnd => 8,
            BinOp::BitXor => 7,
            BinOp::BitOr => 6,
            BinOp::And => 5,
            BinOp::Or => 4,
        }
    }

    /// Whether the result is a truth value rather than an operand-typed value.
    pub fn is_predicate(self) -> bool {
        matches!(
            self,
            BinOp::And
                | BinOp::Or
                | BinOp::Eq
                | BinOp::Ne
                | BinOp::Lt
                | BinOp::Le
                | BinOp::Gt
                | BinOp::Ge
        )
    }
}

impl Expr {
    pub fn new(kind: ExprKind, ty: Type) -> Self {
        Self { kind, ty }
    }

    pub fn symbol(name: &str, ty: Type) -> Self {
        Self::new(ExprKind::Symbol(name.to_string()), ty)
    }

    pub fn bool_const(value: bool) -> Self {
        Self::new(ExprKind::Constant(Constant::Bool(value)), Type::Bool)
    }

    pub fn true_expr() -> Self {
        Self::bool_const(true)
    }

    pub fn false_expr() -> Self {
        Self::bool_const(false)
    }

    pub fn int(value: i128, ty: Type) -> Self {
        Self::new(ExprKind::Constant(Constant::Int(value)), ty)
    }

    /// Fixed-point constant from its raw bits.
    pub fn fixedbv(bits: i128, ty: Type) -> Self {
        Self::new(ExprKind::Constant(Constant::Fixedbv(bits)), ty)
    }

    pub fn string(value: &str) -> Self {
        Self::new(
            ExprKind::Constant(Constant::String(value.to_string())),
            Type::String,
        )
    }

    pub fn null(ty: Type) -> Self {
        Self::new(ExprKind::Constant(Constant::Null), ty)
    }

    pub fn nondet(ty: Type) -> Self {
        Self::new(ExprKind::Nondet, ty)
    }

    /// Binary operation; predicates are typed `_Bool`, arithmetic takes the left type.
    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        let ty = if op.is_predicate() {
            Type::Bool
        } else {
            left.ty.clone()
        };
        Self::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
        )
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        let ty = match op {
            UnaryOp::Not => Type::Bool,
            UnaryOp::Neg | UnaryOp::BitNot => operand.ty.clone(),
        };
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
        )
    }

    pub fn logical_not(operand: Expr) -> Self {
        Self::unary(UnaryOp::Not, operand)
    }

    pub fn address_of(operand: Expr) -> Self {
        let ty = Type::pointer_to(operand.ty.clone());
        Self::new(ExprKind::AddressOf(Box::new(operand)), ty)
    }

    pub fn dereference(pointer: Expr) -> Self {
        let ty = pointer.ty.subtype().cloned().unwrap_or(Type::Empty);
        Self::new(ExprKind::Dereference(Box::new(pointer)), ty)
    }

    pub fn index(base: Expr, index: Expr) -> Self {
        let ty = base.ty.subtype().cloned().unwrap_or(Type::Empty);
        Self::new(
            ExprKind::Index {
                base: Box::new(base),
                index: Box::new(index),
            },
            ty,
        )
    }

    pub fn member(base: Expr, member: &str) -> Self {
        let ty = base.ty.member_type(member).cloned().unwrap_or(Type::Empty);
        Self::new(
            ExprKind::Member {
                base: Box::new(base),
                member: member.to_string(),
            },
            ty,
        )
    }

    pub fn typecast(operand: Expr, ty: Type) -> Self {
        Self::new(ExprKind::Typecast(Box::new(operand)), ty)
    }

    pub fn if_then_else(cond: Expr, then_value: Expr, else_value: Expr) -> Self {
        let ty = then_value.ty.clone();
        Self::new(
            ExprKind::If {
                cond: Box::new(cond),
                then_value: Box::new(then_value),
                else_value: Box::new(else_value),
            },
            ty,
        )
    }

    /// Literal `TRUE`.
    pub fn is_true(&self) -> bool {
        matches!(self.kind, ExprKind::Constant(Constant::Bool(true)))
    }

    /// Literal `FALSE`.
    pub fn is_false(&self) -> bool {
        matches!(self.kind, ExprKind::Constant(Constant::Bool(false)))
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self.kind, ExprKind::Symbol(_))
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, ExprKind::Constant(_))
    }

    pub fn is_dereference(&self) -> bool {
        matches!(self.kind, ExprKind::Dereference(_))
    }

    /// Qualified name when this is a symbol reference.
    pub fn symbol_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// Direct sub-expressions in evaluation order.
    pub fn operands(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Symbol(_) | ExprKind::Constant(_) | ExprKind::Nondet => Vec::new(),
            ExprKind::Unary { operand, .. } => vec![operand.as_ref()],
            ExprKind::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            ExprKind::AddressOf(e) | ExprKind::Dereference(e) | ExprKind::Typecast(e) => {
                vec![e.as_ref()]
            }
            ExprKind::Index { base, index } => vec![base.as_ref(), index.as_ref()],
            ExprKind::Member { base, .. } => vec![base.as_ref()],
            ExprKind::If {
                cond,
                then_value,
                else_value,
            } => vec![cond.as_ref(), then_value.as_ref(), else_value.as_ref()],
            ExprKind::StructLit(ops) | ExprKind::ArrayLit(ops) => ops.iter().collect(),
        }
    }

    /// Integer value of a bit-vector constant.
    pub fn as_int(&self) -> Option<i128> {
        match &self.kind {
            ExprKind::Constant(Constant::Int(v)) => Some(*v),
            ExprKind::Constant(Constant::Bool(b)) => Some(i128::from(*b)),
            _ => None,
        }
    }

    /// Numeric value of an integer or fixed-point constant.
    pub fn as_f64(&self) -> Option<f64> {
        match (&self.kind, &self.ty) {
            (
                ExprKind::Constant(Constant::Fixedbv(bits)),
                Type::Fixedbv {
                    width,
                    integer_bits,
                },
            ) => {
                let frac = width.saturating_sub(*integer_bits);
                Some(*bits as f64 / 2f64.powi(frac as i32))
            }
            (ExprKind::Constant(Constant::Int(v)), _) => Some(*v as f64),
            _ => None,
        }
    }
}

/// Exact decimal rendering of a fixed-point value given its raw bits.
pub fn fixedbv_to_decimal(bits: i128, width: u32, integer_bits: u32) -> String {
    let frac = width.saturating_sub(integer_bits).min(120);
    let negative = bits < 0;
    let magnitude = bits.unsigned_abs();
    let int_part = magnitude >> frac;
    let mask = if frac == 0 { 0 } else { (1u128 << frac) - 1 };
    let mut rem = magnitude & mask;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&int_part.to_string());
    out.push('.');
    if rem == 0 {
        out.push('0');
        return out;
    }
    while rem != 0 {
        rem *= 10;
        let digit = rem >> frac;
        out.push(char::from(b'0' + digit as u8));
        rem &= mask;
    }
    out
}
