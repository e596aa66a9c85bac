//! Text rendering of programs, one fixed template per instruction kind.

use crate::instruction::{InstrId, Instruction, InstructionKind};
use crate::program::GotoProgram;
use gbmc_expr::{ExprPrinter, SymbolTable};
use std::fmt::{self, Write};

/// What the instruction renderer prints besides the instruction itself.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    /// Print a `// <location number> <location>` line above each instruction.
    pub show_location: bool,
    /// Print the variables in scope when there are any.
    pub show_variables: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            show_location: true,
            show_variables: false,
        }
    }
}

const INDENT: &str = "        ";

impl GotoProgram {
    /// Render the whole program with default options.
    pub fn output<W: Write>(&self, ns: &SymbolTable, out: &mut W) -> fmt::Result {
        self.output_with(ns, out, &OutputOptions::default())
    }

    pub fn output_with<W: Write>(
        &self,
        ns: &SymbolTable,
        out: &mut W,
        options: &OutputOptions,
    ) -> fmt::Result {
        for (_, instr) in self.iter() {
            self.output_instruction(ns, instr, out, options)?;
        }
        Ok(())
    }

    /// The program as a string, default options.
    pub fn to_text(&self, ns: &SymbolTable) -> String {
        let mut text = String::new();
        // writing into a String cannot fail
        let _ = self.output(ns, &mut text);
        text
    }

    /// Render one instruction. Targets print as their target numbers, so
    /// numbers must be current.
    pub fn output_instruction<W: Write>(
        &self,
        ns: &SymbolTable,
        instr: &Instruction,
        out: &mut W,
        options: &OutputOptions,
    ) -> fmt::Result {
        let mut printer = ExprPrinter::new(ns);

        if options.show_location {
            write!(out, "{INDENT}// {} ", instr.location_number)?;
            if instr.location.is_nil() {
                writeln!(out, "no location")?;
            } else {
                writeln!(out, "{}", instr.location)?;
            }
        }

        if options.show_variables && !instr.local_variables.is_empty() {
            write!(out, "{INDENT}// Variables:")?;
            for var in &instr.local_variables {
                write!(out, " {var}")?;
            }
            writeln!(out)?;
        }

        if !instr.labels.is_empty() {
            write!(out, "{INDENT}// Labels:")?;
            for label in &instr.labels {
                write!(out, " {label}")?;
            }
            writeln!(out)?;
        }

        if instr.is_target() {
            write!(out, "{:>6}: ", instr.target_number)?;
        } else {
            write!(out, "{INDENT}")?;
        }

        match &instr.kind {
            InstructionKind::NoInstructionType => writeln!(out, "NO INSTRUCTION TYPE SET"),
            InstructionKind::Goto => {
                if !instr.guard.is_true() {
                    write!(out, "IF {} THEN ", printer.print(&instr.guard))?;
                }
                write!(out, "GOTO ")?;
                for (i, &target) in instr.targets.iter().enumerate() {
                    if i > 0 {
                        write!(out, ", ")?;
                    }
                    self.write_target_number(target, out)?;
                }
                writeln!(out)
            }
            InstructionKind::FunctionCall {
                ret,
                function,
                arguments,
            } => {
                write!(out, "FUNCTION_CALL:  ")?;
                if let Some(ret) = ret {
                    write!(out, "{} = ", printer.print(ret))?;
                }
                let args: Vec<String> = arguments.iter().map(|a| printer.print(a)).collect();
                writeln!(out, "{}({})", printer.print(function), args.join(", "))
            }
            InstructionKind::Return { operand } => {
                let arg = operand
                    .as_ref()
                    .map(|e| printer.print(e))
                    .unwrap_or_default();
                writeln!(out, "RETURN: {arg}")
            }
            InstructionKind::Assign { target, source } => {
                writeln!(out, "{} = {};", printer.print(target), printer.print(source))
            }
            InstructionKind::Decl { symbol } => {
                writeln!(out, "{} {};", symbol.ty, printer.print(symbol))
            }
            InstructionKind::Dead { symbol } => writeln!(out, "dead {};", printer.print(symbol)),
            InstructionKind::Other { code } => writeln!(out, "{};", printer.print(code)),
            InstructionKind::Assume | InstructionKind::Assert => {
                let keyword = if instr.is_assume() { "ASSUME" } else { "ASSERT" };
                write!(out, "{keyword} {}", printer.print(&instr.guard))?;
                if !instr.location.comment.is_empty() {
                    write!(out, " // {}", instr.location.comment)?;
                }
                writeln!(out)
            }
            InstructionKind::Skip => writeln!(out, "SKIP"),
            InstructionKind::EndFunction => writeln!(out, "END_FUNCTION"),
            InstructionKind::Location => writeln!(out, "LOCATION"),
            InstructionKind::Throw {
                exceptions,
                operand,
            } => {
                write!(out, "THROW")?;
                for (i, name) in exceptions.iter().enumerate() {
                    if i > 0 {
                        write!(out, ",")?;
                    }
                    write!(out, " {name}")?;
                }
                if let Some(operand) = operand {
                    write!(out, ": {}", printer.print(operand))?;
                }
                writeln!(out)
            }
            InstructionKind::Catch { exceptions } => {
                write!(out, "CATCH ")?;
                for (i, (name, &target)) in exceptions.iter().zip(&instr.targets).enumerate() {
                    if i > 0 {
                        write!(out, ", ")?;
                    }
                    write!(out, "{name}->")?;
                    self.write_target_number(target, out)?;
                }
                writeln!(out)
            }
            InstructionKind::AtomicBegin => writeln!(out, "ATOMIC_BEGIN"),
            InstructionKind::AtomicEnd => writeln!(out, "ATOMIC_END"),
            InstructionKind::ThrowDecl { exceptions } => {
                writeln!(out, "THROW_DECL ({})", exceptions.join(", "))
            }
            InstructionKind::ThrowDeclEnd { exceptions } => {
                writeln!(out, "THROW_DECL_END ({})", exceptions.join(", "))
            }
        }
    }

    fn write_target_number<W: Write>(&self, target: InstrId, out: &mut W) -> fmt::Result {
        match self.get(target) {
            Some(t) if t.is_target() => write!(out, "{}", t.target_number),
            _ => write!(out, "?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbmc_expr::{BinOp, Expr, Location, Symbol, Type};

    fn ns() -> SymbolTable {
        let mut ns = SymbolTable::new();
        ns.insert(Symbol::variable("c::main::x", "x", Type::int()))
            .unwrap();
        ns.insert(Symbol::function(
            "c::f",
            "f",
            Type::code(vec![Type::int()], Type::int()),
        ))
        .unwrap();
        ns
    }

    fn x() -> Expr {
        Expr::symbol("c::main::x", Type::int())
    }

    #[test]
    fn test_program_snapshot() {
        let mut p = GotoProgram::new();
        p.add(Instruction::decl(x()).with_location(Location::new("main.c", 3).with_function("main")));
        p.add(Instruction::assign(x(), Expr::int(0, Type::int())));
        let head = p.add(
            Instruction::assert(Expr::binary(BinOp::Le, x(), Expr::int(10, Type::int())))
                .with_location(Location::new("main.c", 5).with_comment("bound")),
        );
        p.add(Instruction::function_call(
            Some(x()),
            Expr::symbol("c::f", Type::code(vec![Type::int()], Type::int())),
            vec![x()],
        ));
        let back = p.add(Instruction::goto(
            Expr::binary(BinOp::Lt, x(), Expr::int(10, Type::int())),
            head,
        ));
        p.add(Instruction::return_value(Some(x())));
        p.add(Instruction::end_function().with_label("out"));
        p.update().unwrap();
        assert!(p.is_backwards_goto(back));

        let expected = [
            "        // 0 file main.c line 3 function main",
            "        signed int x;",
            "        // 1 no location",
            "        x = 0;",
            "        // 2 file main.c line 5",
            "     1: ASSERT x <= 10 // bound",
            "        // 3 no location",
            "        FUNCTION_CALL:  x = f(x)",
            "        // 4 no location",
            "        IF x < 10 THEN GOTO 1",
            "        // 5 no location",
            "        RETURN: x",
            "        // 6 no location",
            "        // Labels: out",
            "        END_FUNCTION",
            "",
        ]
        .join("\n");
        assert_eq!(p.to_text(&ns()), expected);
    }

    #[test]
    fn test_exception_kinds() {
        let ns = ns();
        let mut p = GotoProgram::new();
        let handler = p.add_instruction();
        p.add(Instruction::new(InstructionKind::Throw {
            exceptions: vec!["int".to_string(), "char".to_string()],
            operand: Some(x()),
        }));
        p.add(
            Instruction::new(InstructionKind::Catch {
                exceptions: vec!["int".to_string()],
            })
            .with_targets(vec![handler]),
        );
        p.add(Instruction::new(InstructionKind::ThrowDecl {
            exceptions: vec!["a".to_string(), "b".to_string()],
        }));
        p.add(Instruction::new(InstructionKind::ThrowDeclEnd {
            exceptions: Vec::new(),
        }));
        p.update().unwrap();

        let options = OutputOptions {
            show_location: false,
            show_variables: false,
        };
        let mut text = String::new();
        p.output_with(&ns, &mut text, &options).unwrap();
        assert_eq!(
            text,
            "     1: NO INSTRUCTION TYPE SET\n\
             \x20       THROW int, char: x\n\
             \x20       CATCH int->1\n\
             \x20       THROW_DECL (a, b)\n\
             \x20       THROW_DECL_END ()\n"
        );
    }

    #[test]
    fn test_variables_line() {
        let ns = ns();
        let mut p = GotoProgram::new();
        let mut skip = Instruction::skip();
        skip.local_variables = vec!["c::main::x".to_string(), "c::main::y".to_string()];
        p.add(skip);
        let options = OutputOptions {
            show_location: false,
            show_variables: true,
        };
        let mut text = String::new();
        p.output_with(&ns, &mut text, &options).unwrap();
        assert_eq!(
            text,
            "        // Variables: c::main::x c::main::y\n        SKIP\n"
        );
    }
}
