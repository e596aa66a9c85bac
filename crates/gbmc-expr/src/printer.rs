//! C-like rendering of expressions for reports and program listings.

use crate::expr::{fixedbv_to_decimal, Constant, Expr, ExprKind, UnaryOp};
use crate::symbol::SymbolTable;
use crate::types::Type;

const PREC_TERNARY: u8 = 3;
const PREC_PREFIX: u8 = 14;
const PREC_POSTFIX: u8 = 15;
const PREC_ATOM: u8 = 16;

/// Render an expression with names resolved through `ns`.
pub fn from_expr(ns: &SymbolTable, expr: &Expr) -> String {
    ExprPrinter::new(ns).print(expr)
}

/// Deterministic expression printer.
pub struct ExprPrinter<'a> {
    ns: &'a SymbolTable,
    output: String,
}

impl<'a> ExprPrinter<'a> {
    pub fn new(ns: &'a SymbolTable) -> Self {
        Self {
            ns,
            output: String::new(),
        }
    }

    /// Render one expression; the printer can be reused afterwards.
    pub fn print(&mut self, expr: &Expr) -> String {
        self.output.clear();
        self.print_expr(expr, 0);
        std::mem::take(&mut self.output)
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn print_expr(&mut self, expr: &Expr, parent_prec: u8) {
        let prec = precedence(expr);
        let parens = prec < parent_prec;
        if parens {
            self.write("(");
        }
        self.print_inner(expr, prec);
        if parens {
            self.write(")");
        }
    }

    fn print_inner(&mut self, expr: &Expr, prec: u8) {
        match &expr.kind {
            ExprKind::Symbol(name) => {
                let ns = self.ns;
                self.write(ns.display_name(name));
            }
            ExprKind::Constant(c) => self.print_constant(c, &expr.ty),
            ExprKind::Unary { op, operand } => {
                self.write(match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Neg => "-",
                    UnaryOp::BitNot => "~",
                });
                self.print_expr(operand, PREC_PREFIX);
            }
            ExprKind::Binary { op, left, right } => {
                self.print_expr(left, prec);
                self.write(" ");
                self.write(op.symbol());
                self.write(" ");
                // left associative: an equal-precedence right operand needs parens
                self.print_expr(right, prec + 1);
            }
            ExprKind::AddressOf(e) => {
                self.write("&");
                self.print_expr(e, PREC_PREFIX);
            }
            ExprKind::Dereference(e) => {
                self.write("*");
                self.print_expr(e, PREC_PREFIX);
            }
            ExprKind::Index { base, index } => {
                self.print_expr(base, PREC_POSTFIX);
                self.write("[");
                self.print_expr(index, 0);
                self.write("]");
            }
            ExprKind::Member { base, member } => {
                if let ExprKind::Dereference(pointer) = &base.kind {
                    self.print_expr(pointer, PREC_POSTFIX);
                    self.write("->");
                } else {
                    self.print_expr(base, PREC_POSTFIX);
                    self.write(".");
                }
                self.write(member);
            }
            ExprKind::Typecast(e) => {
                self.write(&format!("({})", expr.ty));
                self.print_expr(e, PREC_PREFIX);
            }
            ExprKind::If {
                cond,
                then_value,
                else_value,
            } => {
                self.print_expr(cond, PREC_TERNARY + 1);
                self.write(" ? ");
                self.print_expr(then_value, PREC_TERNARY + 1);
                self.write(" : ");
                self.print_expr(else_value, PREC_TERNARY);
            }
            ExprKind::StructLit(values) => {
                let names: Vec<String> = match &expr.ty {
                    Type::Struct(s) | Type::Union(s) => {
                        s.members.iter().map(|(n, _)| n.clone()).collect()
                    }
                    _ => Vec::new(),
                };
                self.write("{ ");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    if let Some(name) = names.get(i) {
                        self.write(".");
                        self.write(name);
                        self.write("=");
                    }
                    self.print_expr(value, PREC_TERNARY);
                }
                self.write(" }");
            }
            ExprKind::ArrayLit(values) => {
                self.write("{ ");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.print_expr(value, PREC_TERNARY);
                }
                self.write(" }");
            }
            ExprKind::Nondet => {
                self.write(&format!("NONDET({})", expr.ty));
            }
        }
    }

    fn print_constant(&mut self, constant: &Constant, ty: &Type) {
        match constant {
            Constant::Bool(true) => self.write("TRUE"),
            Constant::Bool(false) => self.write("FALSE"),
            Constant::Int(v) => self.write(&v.to_string()),
            Constant::Fixedbv(bits) => {
                let text = match ty {
                    Type::Fixedbv {
                        width,
                        integer_bits,
                    } => fixedbv_to_decimal(*bits, *width, *integer_bits),
                    _ => bits.to_string(),
                };
                self.write(&text);
            }
            Constant::String(s) => {
                self.write("\"");
                for c in s.chars() {
                    match c {
                        '"' => self.write("\\\""),
                        '\\' => self.write("\\\\"),
                        '\n' => self.write("\\n"),
                        '\t' => self.write("\\t"),
                        c => self.output.push(c),
                    }
                }
                self.write("\"");
            }
            Constant::Null => self.write("NULL"),
        }
    }
}

fn precedence(expr: &Expr) -> u8 {
    match &expr.kind {
        ExprKind::Symbol(_) | ExprKind::Nondet | ExprKind::StructLit(_) | ExprKind::ArrayLit(_) => {
            PREC_ATOM
        }
        // negative literals print with a leading minus
        ExprKind::Constant(Constant::Int(v)) if *v < 0 => PREC_PREFIX,
        ExprKind::Constant(Constant::Fixedbv(v)) if *v < 0 => PREC_PREFIX,
        ExprKind::Constant(_) => PREC_ATOM,
        ExprKind::Index { .. } | ExprKind::Member { .. } => PREC_POSTFIX,
        ExprKind::Unary { .. }
        | ExprKind::AddressOf(_)
        | ExprKind::Dereference(_)
        | ExprKind::Typecast(_) => PREC_PREFIX,
        ExprKind::Binary { op, .. } => op.precedence(),
        ExprKind::If { .. } => PREC_TERNARY,
    }
}
