use gbmc_expr::{BinOp, Expr, Location, Symbol, SymbolTable, Type};
use gbmc_goto::{GotoError, GotoFunction, GotoFunctions, GotoProgram, InstrId, Instruction};

pub const MAIN: &str = "c::main";
pub const HELPER: &str = "c::f";

pub fn int_var(name: &str) -> Expr {
    Expr::symbol(name, Type::int())
}

pub fn int(value: i128) -> Expr {
    Expr::int(value, Type::int())
}

pub fn callee(name: &str) -> Expr {
    Expr::symbol(name, Type::code(vec![], Type::Empty))
}

pub fn symbols() -> SymbolTable {
    let mut ns = SymbolTable::new();
    let entries = [
        ("c::main::x", "x"),
        ("c::y", "y"),
        ("c::z", "z"),
        ("c::main::p", "p"),
    ];
    for (name, base) in entries {
        // names are distinct
        let _ = ns.insert(Symbol::variable(name, base, Type::int()));
    }
    for name in [MAIN, HELPER, "c::g", "c::h"] {
        let base = name.trim_start_matches("c::");
        let _ = ns.insert(Symbol::function(name, base, Type::code(vec![], Type::Empty)));
    }
    ns
}

/// `for (x = 0; x < 10; x++) call();` in `c::main`, followed by an
/// assertion on `x`. Returns the body with the loop head and back-edge.
pub fn counter_loop(call: &str) -> Result<(GotoProgram, InstrId, InstrId), GotoError> {
    let x = int_var("c::main::x");
    let at = |line| Location::new("main.c", line).with_function("main");

    let mut p = GotoProgram::new();
    p.add(Instruction::assign(x.clone(), int(0)).with_location(at(3)));
    let head = p.add_instruction();
    p.add(
        Instruction::assign(x.clone(), Expr::binary(BinOp::Add, x.clone(), int(1)))
            .with_location(at(4)),
    );
    p.add(Instruction::function_call(None, callee(call), vec![]).with_location(at(5)));
    let back_edge = p.add(Instruction::goto(Expr::true_expr(), head).with_location(at(3)));
    let exit = p.add(
        Instruction::assert(Expr::binary(BinOp::Eq, x.clone(), int(10)))
            .with_location(at(7).with_comment("x reaches 10")),
    );
    p.add(Instruction::end_function());

    let guard = Expr::logical_not(Expr::binary(BinOp::Lt, x, int(10)));
    p.set_instruction(head, Instruction::goto(guard, exit).with_location(at(3)))?;
    Ok((p, head, back_edge))
}

/// A body that writes `var` and then optionally calls `calls`.
pub fn helper_body(var: &str, calls: Option<&str>) -> GotoProgram {
    let mut p = GotoProgram::new();
    p.add(Instruction::assign(int_var(var), int(1)));
    if let Some(name) = calls {
        p.add(Instruction::function_call(None, callee(name), vec![]));
    }
    p.add(Instruction::end_function());
    p
}

/// `main` loops calling `f`, which writes the global `y`.
pub fn loop_with_helper() -> Result<GotoFunctions, GotoError> {
    let (main, _, _) = counter_loop(HELPER)?;
    let mut functions = GotoFunctions::new();
    functions.insert(MAIN, GotoFunction::new(main));
    functions.insert(HELPER, GotoFunction::new(helper_body("c::y", None)));
    functions.update()?;
    Ok(functions)
}

/// `main` loops calling itself.
pub fn directly_recursive_loop() -> Result<GotoFunctions, GotoError> {
    let (main, _, _) = counter_loop(MAIN)?;
    let mut functions = GotoFunctions::new();
    functions.insert(MAIN, GotoFunction::new(main));
    functions.update()?;
    Ok(functions)
}

/// `main` loops calling `g`; `g` and `h` call each other and write `y`
/// and `z`.
pub fn mutually_recursive_loop() -> Result<GotoFunctions, GotoError> {
    let (main, _, _) = counter_loop("c::g")?;
    let mut functions = GotoFunctions::new();
    functions.insert(MAIN, GotoFunction::new(main));
    functions.insert("c::g", GotoFunction::new(helper_body("c::y", Some("c::h"))));
    functions.insert("c::h", GotoFunction::new(helper_body("c::z", Some("c::g"))));
    functions.update()?;
    Ok(functions)
}

/// Shape of one generated instruction.
#[derive(Debug, Clone, Copy)]
pub enum Shape {
    Assign,
    Skip,
    /// Conditional jump to the instruction at this index, modulo the length.
    Goto(usize),
    /// Unconditional jump.
    Jump(usize),
    Assume(bool),
}

/// Build a program from shapes; an end-of-function marker is appended.
pub fn build_program(shapes: &[Shape]) -> Result<GotoProgram, GotoError> {
    let mut p = GotoProgram::new();
    let ids: Vec<InstrId> = shapes.iter().map(|_| p.add_instruction()).collect();
    p.add(Instruction::end_function());
    let len = ids.len();

    for (i, (&id, shape)) in ids.iter().zip(shapes).enumerate() {
        let instr = match *shape {
            Shape::Assign => Instruction::assign(int_var("c::main::x"), int(i as i128)),
            Shape::Skip => Instruction::skip(),
            Shape::Goto(t) => Instruction::goto(
                Expr::binary(BinOp::Lt, int_var("c::main::x"), int(5)),
                ids[t % len],
            ),
            Shape::Jump(t) => Instruction::goto(Expr::true_expr(), ids[t % len]),
            Shape::Assume(holds) => Instruction::assume(Expr::bool_const(holds)),
        };
        p.set_instruction(id, instr)?;
    }
    p.update()?;
    Ok(p)
}
