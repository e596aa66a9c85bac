//! Counterexample renderings agree with the trace they were made from.

use gbmc_expr::{Expr, Location, Type};
use gbmc_goto::Instruction;
use gbmc_soundness::{int, int_var, symbols};
use gbmc_trace::{
    generate_goto_trace_in_graphml_format, parse_gui_trace, show_goto_trace, show_goto_trace_gui,
    GotoTrace, GuiRecord, TraceStep, WitnessConfig,
};
use std::fs;

fn at(file: &str, line: u32) -> Location {
    Location::new(file, line).with_function("main")
}

#[test]
fn state_zero_groups_initial_assignments() {
    let x = int_var("c::main::x");
    let y = int_var("c::y");
    let set_x = Instruction::assign(x.clone(), int(1)).with_location(at("main.c", 3));
    let set_y = Instruction::assign(y.clone(), int(2)).with_location(at("main.c", 3));
    let check = Instruction::assert(Expr::false_expr())
        .with_location(at("main.c", 4).with_comment("unreachable"));
    let after = Instruction::assign(x.clone(), int(3)).with_location(at("main.c", 5));

    let mut trace = GotoTrace::new();
    trace.push(TraceStep::assignment(&set_x, 0, x.clone(), int(1))).unwrap();
    trace.push(TraceStep::assignment(&set_y, 0, y, int(2))).unwrap();
    trace.push(TraceStep::assertion(&check, 1, false)).unwrap();
    trace.push(TraceStep::assignment(&after, 2, x, int(3))).unwrap();

    let mut text = String::new();
    show_goto_trace(&mut text, &symbols(), &trace).unwrap();

    assert_eq!(text.matches("State 0 ").count(), 1, "got:\n{text}");
    assert!(text.contains("  x=1 (1)\n  y=2 (2)\n"), "got:\n{text}");
    assert!(text.contains("Violated property:\n  file main.c line 4 function main\n  unreachable\n"));
    assert!(text.ends_with("  FALSE\n\n"), "nothing follows the violation:\n{text}");
    assert!(!text.contains("x=3"));
}

#[test]
fn gui_records_parse_back() {
    let x = int_var("c::main::x");
    let p = Expr::symbol("c::main::p", Type::pointer_to(Type::int()));
    let set_x = Instruction::assign(x.clone(), int(5)).with_location(at("main.c", 3));
    let set_p = Instruction::assign(p.clone(), Expr::address_of(x.clone()))
        .with_location(at("main.c", 4).with_column(7));
    let check = Instruction::assert(Expr::false_expr())
        .with_location(at("main.c", 6).with_comment("p is null"));

    let mut trace = GotoTrace::new();
    trace.push(TraceStep::assignment(&set_x, 1, x.clone(), int(5))).unwrap();
    trace
        .push(TraceStep::assignment(&set_p, 2, p, Expr::address_of(x)))
        .unwrap();
    trace.push(TraceStep::assertion(&check, 3, false)).unwrap();

    let mut text = String::new();
    show_goto_trace_gui(&mut text, &symbols(), &trace).unwrap();
    let records = parse_gui_trace(&text).expect("emitted records should parse");

    assert_eq!(
        records,
        vec![
            GuiRecord::Trace {
                identifier: "c::main::x".to_string(),
                base_name: "x".to_string(),
                type_id: "signedbv".to_string(),
                value: "5".to_string(),
                step_nr: 1,
                file: "main.c".to_string(),
                line: 3,
                column: 0,
            },
            GuiRecord::Trace {
                identifier: "c::main::p".to_string(),
                base_name: "p".to_string(),
                type_id: "pointer".to_string(),
                value: "&x".to_string(),
                step_nr: 2,
                file: "main.c".to_string(),
                line: 4,
                column: 7,
            },
            GuiRecord::Failed {
                comment: "p is null".to_string(),
                file: "main.c".to_string(),
                line: 6,
                column: 0,
            },
        ]
    );
}

#[test]
fn witness_follows_the_trace() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("main.c");
    fs::write(
        &source,
        "int y;\nvoid f() { y = 2; }\nint main() {\n  int x = 1;\n  f();\n  assert(x == 2);\n}\n",
    )
    .unwrap();
    let file = source.to_string_lossy().to_string();

    let x = int_var("c::main::x");
    let y = int_var("c::y");
    let in_main = Instruction::assign(x.clone(), int(1))
        .with_location(Location::new(&file, 4).with_function("main"))
        .with_function("c::main");
    let in_f = Instruction::assign(y.clone(), int(2))
        .with_location(Location::new(&file, 2).with_function("f"))
        .with_function("c::f");
    let temporary = Instruction::assign(int_var("c::main::$tmp::return_value_f"), int(0))
        .with_location(Location::new(&file, 5).with_function("main"))
        .with_function("c::main");
    let check = Instruction::assert(Expr::false_expr())
        .with_location(Location::new(&file, 6).with_function("main"))
        .with_function("c::main");

    let mut trace = GotoTrace::new();
    trace.push(TraceStep::assignment(&in_main, 1, x, int(1))).unwrap();
    trace.push(TraceStep::assignment(&in_f, 2, y, int(2))).unwrap();
    trace
        .push(TraceStep::assignment(
            &temporary,
            3,
            int_var("c::main::$tmp::return_value_f"),
            int(0),
        ))
        .unwrap();
    trace.push(TraceStep::assertion(&check, 4, false)).unwrap();

    let out = dir.path().join("witness.graphml");
    let witness = generate_goto_trace_in_graphml_format(
        &symbols(),
        &trace,
        WitnessConfig::default(),
        &out,
    )
    .expect("witness should be written");

    // entry, one node per user assignment, violation
    let nodes: Vec<_> = witness.nodes().collect();
    assert_eq!(nodes.len(), 4);
    assert!(nodes[0].entry);
    assert!(nodes[3].violation);

    let edges: Vec<_> = witness.edges().collect();
    assert_eq!(edges.len(), 3);
    assert_eq!(edges[0].enter_function.as_deref(), Some("main"));
    assert_eq!(edges[0].assumption.as_deref(), Some("x = 1;"));
    assert_eq!(edges[0].sourcecode.as_deref(), Some("int x = 1 ;"));
    assert_eq!(edges[1].enter_function.as_deref(), Some("f"));
    assert_eq!(edges[1].startline, Some(2));
    assert_eq!(edges[2].target, nodes[3].id);

    let written = fs::read_to_string(&out).unwrap();
    assert!(written.contains("<graph edgedefault=\"directed\">"));
    assert!(written.contains("<data key=\"violation\">true</data>"));
    assert!(!written.contains("$tmp"));
}
