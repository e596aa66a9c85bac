//! Structural properties of generated GOTO programs.
//!
//! Programs are built from random instruction shapes with jumps to
//! arbitrary positions, including self-loops, so copying, numbering and
//! loop extraction see every kind of control flow.

use gbmc_goto::{GotoFunction, GotoFunctions, GotoLoops, GotoProgram, InstructionType};
use gbmc_soundness::{build_program, Shape, MAIN};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn shape() -> impl Strategy<Value = Shape> {
    prop_oneof![
        Just(Shape::Assign),
        Just(Shape::Skip),
        any::<usize>().prop_map(Shape::Goto),
        any::<usize>().prop_map(Shape::Jump),
        any::<bool>().prop_map(Shape::Assume),
    ]
}

fn kinds(program: &GotoProgram) -> Vec<InstructionType> {
    program.iter().map(|(_, i)| i.instruction_type()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn copied_targets_stay_inside_the_copy(shapes in prop::collection::vec(shape(), 1..24)) {
        let src = build_program(&shapes).expect("generated program should be well formed");
        let mut copy = GotoProgram::new();
        copy.copy_from(&src).expect("copy should remap every target");

        prop_assert_eq!(kinds(&copy), kinds(&src));
        for (_, instr) in copy.iter() {
            for &target in &instr.targets {
                prop_assert!(copy.contains(target));
                prop_assert!(!src.contains(target));
            }
        }
        let numbers = |p: &GotoProgram| -> Vec<u32> {
            p.iter().map(|(_, i)| i.target_number).collect()
        };
        prop_assert_eq!(numbers(&copy), numbers(&src));
    }

    #[test]
    fn target_numbers_are_dense(shapes in prop::collection::vec(shape(), 1..24)) {
        let program = build_program(&shapes).expect("generated program should be well formed");

        let referenced: BTreeSet<_> = program
            .iter()
            .flat_map(|(_, i)| i.targets.iter().copied())
            .collect();
        let numbers: Vec<u32> = program
            .iter()
            .filter(|(_, i)| i.is_target())
            .map(|(_, i)| i.target_number)
            .collect();

        prop_assert_eq!(numbers.len(), referenced.len());
        let expected: Vec<u32> = (1..=numbers.len() as u32).collect();
        prop_assert_eq!(numbers, expected);
        for (id, instr) in program.iter() {
            prop_assert_eq!(instr.is_target(), referenced.contains(&id));
        }
    }

    #[test]
    fn successors_belong_to_the_program(shapes in prop::collection::vec(shape(), 1..24)) {
        let program = build_program(&shapes).expect("generated program should be well formed");
        for &id in program.ids() {
            for succ in program.get_successors(id) {
                prop_assert!(program.contains(succ));
            }
        }
        let last = program.last().expect("program is never empty");
        prop_assert!(program.get_successors(last).is_empty());
    }

    #[test]
    fn extracted_loops_are_closed(shapes in prop::collection::vec(shape(), 1..24)) {
        let body = build_program(&shapes).expect("generated program should be well formed");
        let mut functions = GotoFunctions::new();
        functions.insert(MAIN, GotoFunction::new(body));
        functions.update().expect("numbering should succeed");

        let mut loops = GotoLoops::new(MAIN, &functions);
        loops.find_function_loops().expect("loop extraction should succeed");

        let body = &functions.get(MAIN).expect("main was inserted").body;
        for lp in loops.loops() {
            let head = body.position(lp.original_loop_head()).expect("head is in main");
            let exit = body.position(lp.original_loop_exit()).expect("exit is in main");
            prop_assert!(head < exit, "self-loops are not loops");
            let end_marker = usize::from(!lp.exit_edges().is_empty());
            prop_assert_eq!(lp.program().len(), exit - head + 1 + end_marker);

            for (_, instr) in lp.program().iter() {
                for &target in &instr.targets {
                    prop_assert!(lp.program().contains(target));
                }
            }
            for &(from, to) in lp.exit_edges() {
                prop_assert!(body.contains(to));
                let end = lp.program().last().expect("loop is not empty");
                let copied = lp.program().instruction(from).expect("source was copied");
                prop_assert!(copied.targets.contains(&end));
            }
        }
    }
}

#[test]
fn self_loop_is_not_extracted() {
    let body = build_program(&[Shape::Assign, Shape::Jump(1), Shape::Skip])
        .expect("program should be well formed");
    let mut functions = GotoFunctions::new();
    functions.insert(MAIN, GotoFunction::new(body));
    functions.update().expect("numbering should succeed");

    let mut loops = GotoLoops::new(MAIN, &functions);
    loops.find_function_loops().expect("loop extraction should succeed");
    assert!(loops.is_empty());
}

#[test]
fn loop_numbers_pair_head_and_back_edge() {
    let body = build_program(&[Shape::Assign, Shape::Skip, Shape::Goto(0), Shape::Jump(1)])
        .expect("program should be well formed");
    let mut functions = GotoFunctions::new();
    functions.insert(MAIN, GotoFunction::new(body));
    functions.update().expect("numbering should succeed");
    functions.compute_loop_numbers();

    let body = &functions.get(MAIN).expect("main was inserted").body;
    let numbers: Vec<u32> = body.iter().map(|(_, i)| i.loop_number).collect();
    // the goto at index 3 jumps back to index 1, the one at index 2 to index 0
    assert_eq!(numbers[0], numbers[2]);
    assert_eq!(numbers[1], numbers[3]);
    assert_ne!(numbers[0], numbers[1]);
}
