//! Ordered instruction container with stable handles.
//!
//! Instructions live in an arena indexed by [`InstrId`]; a separate order
//! vector holds the program sequence, and each slot records its index in
//! that vector. Targets are handles, so inserting or
//! removing an instruction never invalidates the targets of others. Only a
//! copy between programs needs the old-to-new map.

use crate::error::{GotoError, GotoResult};
use crate::instruction::{InstrId, Instruction, InstructionKind, NO_TARGET_NUMBER};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_PROGRAM: AtomicU32 = AtomicU32::new(0);

fn fresh_program_tag() -> u32 {
    NEXT_PROGRAM.fetch_add(1, Ordering::Relaxed)
}

/// A GOTO program: the body of one function or an extracted loop.
#[derive(Debug)]
pub struct GotoProgram {
    tag: u32,
    slots: Vec<Option<Instruction>>,
    order: Vec<InstrId>,
    /// Index into `order` per slot; `None` once removed.
    positions: Vec<Option<usize>>,
}

impl Default for GotoProgram {
    fn default() -> Self {
        Self::new()
    }
}

impl GotoProgram {
    pub fn new() -> Self {
        Self {
            tag: fresh_program_tag(),
            slots: Vec::new(),
            order: Vec::new(),
            positions: Vec::new(),
        }
    }

    fn alloc(&mut self, instr: Instruction) -> InstrId {
        let id = InstrId {
            program: self.tag,
            index: self.slots.len() as u32,
        };
        self.slots.push(Some(instr));
        self.positions.push(None);
        id
    }

    /// Refresh recorded positions from `at` to the end of the order.
    fn reindex_from(&mut self, at: usize) {
        for (pos, id) in self.order.iter().enumerate().skip(at) {
            self.positions[id.index as usize] = Some(pos);
        }
    }

    /// Append an empty instruction and return its handle.
    pub fn add_instruction(&mut self) -> InstrId {
        self.add(Instruction::default())
    }

    /// Append `instr` and return its handle.
    pub fn add(&mut self, instr: Instruction) -> InstrId {
        let id = self.alloc(instr);
        self.positions[id.index as usize] = Some(self.order.len());
        self.order.push(id);
        id
    }

    pub fn insert_before(&mut self, pos: InstrId, instr: Instruction) -> GotoResult<InstrId> {
        let at = self.position(pos).ok_or(GotoError::NotInProgram(pos))?;
        let id = self.alloc(instr);
        self.order.insert(at, id);
        self.reindex_from(at);
        Ok(id)
    }

    pub fn insert_after(&mut self, pos: InstrId, instr: Instruction) -> GotoResult<InstrId> {
        let at = self.position(pos).ok_or(GotoError::NotInProgram(pos))?;
        let id = self.alloc(instr);
        self.order.insert(at + 1, id);
        self.reindex_from(at + 1);
        Ok(id)
    }

    /// Remove an instruction. Targets elsewhere that still point at it are
    /// reported by the next `compute_target_numbers`.
    pub fn remove(&mut self, id: InstrId) -> GotoResult<Instruction> {
        let at = self.position(id).ok_or(GotoError::NotInProgram(id))?;
        self.order.remove(at);
        self.positions[id.index as usize] = None;
        self.reindex_from(at);
        self.slots[id.index as usize]
            .take()
            .ok_or(GotoError::NotInProgram(id))
    }

    /// Replace the contents of an existing instruction, keeping its handle.
    pub fn set_instruction(&mut self, id: InstrId, instr: Instruction) -> GotoResult<()> {
        let slot = self.get_mut(id).ok_or(GotoError::NotInProgram(id))?;
        *slot = instr;
        Ok(())
    }

    /// Drop every instruction. Handles issued before the clear stay invalid.
    pub fn clear(&mut self) {
        self.tag = fresh_program_tag();
        self.slots.clear();
        self.order.clear();
        self.positions.clear();
    }

    /// Move every instruction of `other` to the end of this program,
    /// leaving `other` empty. Targets inside `other` are carried over.
    pub fn destructive_append(&mut self, other: &mut GotoProgram) -> GotoResult<()> {
        let mut map = HashMap::new();
        let mut moved = Vec::with_capacity(other.order.len());
        for id in std::mem::take(&mut other.order) {
            if let Some(instr) = other.slots[id.index as usize].take() {
                let new_id = self.add(instr);
                map.insert(id, new_id);
                moved.push(new_id);
            }
        }
        other.clear();
        for id in moved {
            if let Some(instr) = self.get_mut(id) {
                instr.remap(&map)?;
            }
        }
        Ok(())
    }

    pub fn contains(&self, id: InstrId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: InstrId) -> Option<&Instruction> {
        if id.program != self.tag {
            return None;
        }
        self.slots.get(id.index as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, id: InstrId) -> Option<&mut Instruction> {
        if id.program != self.tag {
            return None;
        }
        self.slots.get_mut(id.index as usize)?.as_mut()
    }

    /// Like [`get`](Self::get), for callers that need an error.
    pub fn instruction(&self, id: InstrId) -> GotoResult<&Instruction> {
        self.get(id).ok_or(GotoError::NotInProgram(id))
    }

    /// Instructions in program order.
    pub fn iter(&self) -> impl Iterator<Item = (InstrId, &Instruction)> + '_ {
        self.order
            .iter()
            .filter_map(move |&id| self.get(id).map(|instr| (id, instr)))
    }

    /// Handles in program order.
    pub fn ids(&self) -> &[InstrId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn first(&self) -> Option<InstrId> {
        self.order.first().copied()
    }

    pub fn last(&self) -> Option<InstrId> {
        self.order.last().copied()
    }

    /// Index of `id` in program order.
    pub fn position(&self, id: InstrId) -> Option<usize> {
        if id.program != self.tag {
            return None;
        }
        *self.positions.get(id.index as usize)?
    }

    /// The instruction after `id`, `None` past the end.
    pub fn next(&self, id: InstrId) -> Option<InstrId> {
        let at = self.position(id)?;
        self.order.get(at + 1).copied()
    }

    /// Static successors of one instruction.
    ///
    /// Falling through past the last instruction yields nothing, as does a
    /// handle that is not part of this program.
    pub fn get_successors(&self, id: InstrId) -> Vec<InstrId> {
        let Some(instr) = self.get(id) else {
            return Vec::new();
        };
        let next = self.next(id);

        match &instr.kind {
            InstructionKind::Goto => {
                let mut successors = instr.targets.clone();
                if !instr.guard.is_true() {
                    successors.extend(next);
                }
                successors
            }
            // resolved by exception handling, not modeled here
            InstructionKind::Throw { .. } => Vec::new(),
            InstructionKind::Return { .. } => self.last().into_iter().collect(),
            InstructionKind::Assume => {
                if instr.guard.is_false() {
                    Vec::new()
                } else {
                    next.into_iter().collect()
                }
            }
            _ => next.into_iter().collect(),
        }
    }

    /// Number jump targets densely from 1 in program order.
    pub fn compute_target_numbers(&mut self) -> GotoResult<()> {
        for i in 0..self.order.len() {
            let id = self.order[i];
            if let Some(instr) = self.get_mut(id) {
                instr.target_number = NO_TARGET_NUMBER;
            }
        }

        let referenced: Vec<InstrId> = self
            .iter()
            .flat_map(|(_, instr)| instr.targets.iter().copied())
            .collect();
        for target in referenced {
            if let Some(instr) = self.get_mut(target) {
                instr.target_number = 0;
            }
        }

        let mut count = 0;
        for i in 0..self.order.len() {
            let id = self.order[i];
            if let Some(instr) = self.get_mut(id) {
                if instr.is_target() {
                    count += 1;
                    instr.target_number = count;
                }
            }
        }

        for (id, instr) in self.iter() {
            for &target in &instr.targets {
                let numbered = self
                    .get(target)
                    .is_some_and(|t| t.is_target() && t.target_number != 0);
                if !numbered {
                    return Err(GotoError::UnnumberedTarget {
                        instruction: id,
                        target,
                    });
                }
            }
        }
        Ok(())
    }

    /// Assign consecutive location numbers starting at `*counter`.
    pub fn compute_location_numbers(&mut self, counter: &mut u32) {
        for i in 0..self.order.len() {
            let id = self.order[i];
            if let Some(instr) = self.get_mut(id) {
                instr.location_number = *counter;
                *counter += 1;
            }
        }
    }

    /// A goto with some target at or before itself.
    pub fn is_backwards_goto(&self, id: InstrId) -> bool {
        let Some(instr) = self.get(id) else {
            return false;
        };
        instr.is_goto()
            && instr.targets.iter().any(|&t| {
                self.get(t)
                    .is_some_and(|target| target.location_number <= instr.location_number)
            })
    }

    /// Give each back-edge and its head a shared fresh loop number.
    pub fn compute_loop_numbers(&mut self, counter: &mut u32) {
        for i in 0..self.order.len() {
            let id = self.order[i];
            if !self.is_backwards_goto(id) {
                continue;
            }
            let head = self.get(id).and_then(|instr| instr.targets.first().copied());
            if let Some(head) = head.and_then(|h| self.get_mut(h)) {
                head.loop_number = *counter;
            }
            if let Some(instr) = self.get_mut(id) {
                instr.loop_number = *counter;
            }
            *counter += 1;
        }
    }

    /// Renumber targets, then locations from zero.
    pub fn update(&mut self) -> GotoResult<()> {
        self.compute_target_numbers()?;
        let mut counter = 0;
        self.compute_location_numbers(&mut counter);
        Ok(())
    }

    /// Replace this program by a deep copy of `src` whose targets point
    /// into the copy.
    pub fn copy_from(&mut self, src: &GotoProgram) -> GotoResult<()> {
        self.clear();

        let mut map = HashMap::with_capacity(src.len());
        for (old_id, instr) in src.iter() {
            let new_id = self.add(instr.clone());
            map.insert(old_id, new_id);
        }

        for i in 0..self.order.len() {
            let id = self.order[i];
            if let Some(instr) = self.get_mut(id) {
                instr.remap(&map)?;
            }
        }

        self.compute_target_numbers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::InstructionType;
    use gbmc_expr::{BinOp, Expr, Type};

    fn x() -> Expr {
        Expr::symbol("c::main::x", Type::int())
    }

    fn cond() -> Expr {
        Expr::binary(BinOp::Lt, x(), Expr::int(10, Type::int()))
    }

    /// head: x = 0; loop: IF !(x < 10) GOTO exit; x = x + 1; GOTO loop; exit: END_FUNCTION
    fn counting_loop() -> (GotoProgram, InstrId, InstrId, InstrId) {
        let mut p = GotoProgram::new();
        p.add(Instruction::assign(x(), Expr::int(0, Type::int())));
        let test = p.add_instruction();
        p.add(Instruction::assign(
            x(),
            Expr::binary(BinOp::Add, x(), Expr::int(1, Type::int())),
        ));
        let back = p.add(Instruction::goto(Expr::true_expr(), test));
        let exit = p.add(Instruction::end_function());
        p.set_instruction(test, Instruction::goto(Expr::logical_not(cond()), exit))
            .unwrap();
        p.update().unwrap();
        (p, test, back, exit)
    }

    #[test]
    fn test_add_and_order() {
        let mut p = GotoProgram::new();
        let a = p.add_instruction();
        let c = p.add(Instruction::skip());
        let b = p.insert_before(c, Instruction::skip()).unwrap();
        let d = p.insert_after(c, Instruction::end_function()).unwrap();
        assert_eq!(p.ids(), &[a, b, c, d]);
        assert_eq!(p.next(b), Some(c));
        assert_eq!(p.next(d), None);
        assert_eq!(
            p.get(a).unwrap().instruction_type(),
            InstructionType::NoInstructionType
        );

        p.remove(b).unwrap();
        assert_eq!(p.ids(), &[a, c, d]);
        assert!(!p.contains(b));
        assert_eq!(p.remove(b), Err(GotoError::NotInProgram(b)));
    }

    #[test]
    fn test_positions_follow_edits() {
        let mut p = GotoProgram::new();
        let ids: Vec<InstrId> = (0..6).map(|_| p.add(Instruction::skip())).collect();
        let front = p.insert_before(ids[0], Instruction::skip()).unwrap();
        let middle = p.insert_after(ids[2], Instruction::skip()).unwrap();
        p.remove(ids[4]).unwrap();
        p.remove(front).unwrap();

        for (at, &id) in p.ids().iter().enumerate() {
            assert_eq!(p.position(id), Some(at));
        }
        assert_eq!(p.position(middle), Some(3));
        assert_eq!(p.position(ids[4]), None);
        assert_eq!(p.next(ids[3]), Some(ids[5]));
        assert_eq!(p.next(ids[5]), None);

        p.clear();
        assert_eq!(p.position(ids[0]), None);
    }

    #[test]
    fn test_successors() {
        let (p, test, back, exit) = counting_loop();
        let body = p.next(test).unwrap();

        assert_eq!(p.get_successors(test), vec![exit, body]);
        // unconditional goto has no fall-through
        assert_eq!(p.get_successors(back), vec![test]);
        assert_eq!(p.get_successors(body), vec![back]);
        assert!(p.get_successors(exit).is_empty());
    }

    #[test]
    fn test_successors_return_assume_throw() {
        let mut p = GotoProgram::new();
        let ret = p.add(Instruction::return_value(None));
        let assume_false = p.add(Instruction::assume(Expr::false_expr()));
        let assume = p.add(Instruction::assume(cond()));
        let throw = p.add(Instruction::new(InstructionKind::Throw {
            exceptions: vec!["int".to_string()],
            operand: None,
        }));
        let end = p.add(Instruction::end_function());

        assert_eq!(p.get_successors(ret), vec![end]);
        assert!(p.get_successors(assume_false).is_empty());
        assert_eq!(p.get_successors(assume), vec![throw]);
        assert!(p.get_successors(throw).is_empty());

        let other = GotoProgram::new();
        assert!(other.get_successors(ret).is_empty());
    }

    #[test]
    fn test_target_numbers() {
        let (p, test, _, exit) = counting_loop();
        let numbered: Vec<_> = p.iter().filter(|(_, i)| i.is_target()).collect();
        assert_eq!(numbered.len(), 2);
        assert_eq!(p.get(test).unwrap().target_number, 1);
        assert_eq!(p.get(exit).unwrap().target_number, 2);
        assert!(!p.get(p.first().unwrap()).unwrap().is_target());
    }

    #[test]
    fn test_dangling_target_after_remove() {
        let (mut p, test, back, _) = counting_loop();
        p.remove(test).unwrap();
        assert_eq!(
            p.compute_target_numbers(),
            Err(GotoError::UnnumberedTarget {
                instruction: back,
                target: test
            })
        );
    }

    #[test]
    fn test_loop_numbers() {
        let (mut p, test, back, exit) = counting_loop();
        assert!(p.is_backwards_goto(back));
        assert!(!p.is_backwards_goto(test));

        let mut counter = 5;
        p.compute_loop_numbers(&mut counter);
        assert_eq!(counter, 6);
        assert_eq!(p.get(test).unwrap().loop_number, 5);
        assert_eq!(p.get(back).unwrap().loop_number, 5);
        assert_eq!(p.get(exit).unwrap().loop_number, 0);
    }

    #[test]
    fn test_copy_from_remaps() {
        let (p, test, back, _) = counting_loop();
        let mut copy = GotoProgram::new();
        copy.copy_from(&p).unwrap();

        assert_eq!(copy.len(), p.len());
        for ((_, a), (_, b)) in p.iter().zip(copy.iter()) {
            assert_eq!(a.instruction_type(), b.instruction_type());
            assert_eq!(a.target_number, b.target_number);
        }
        for (_, instr) in copy.iter() {
            for &t in &instr.targets {
                assert!(copy.contains(t));
                assert!(!p.contains(t));
            }
        }
        let copied_back = copy.ids()[p.position(back).unwrap()];
        let copied_test = copy.ids()[p.position(test).unwrap()];
        assert_eq!(copy.get(copied_back).unwrap().targets, vec![copied_test]);
    }

    #[test]
    fn test_copy_from_foreign_target() {
        let (p, test, _, _) = counting_loop();
        let mut src = GotoProgram::new();
        src.add(Instruction::goto(Expr::true_expr(), test));
        assert!(p.contains(test));

        let mut copy = GotoProgram::new();
        assert_eq!(
            copy.copy_from(&src),
            Err(GotoError::DanglingTarget { target: test })
        );
    }

    #[test]
    fn test_destructive_append() {
        let (mut tail, _, _, _) = counting_loop();
        let mut p = GotoProgram::new();
        p.add(Instruction::skip());
        p.destructive_append(&mut tail).unwrap();
        assert!(tail.is_empty());
        assert_eq!(p.len(), 6);
        p.update().unwrap();
        for (_, instr) in p.iter() {
            for &t in &instr.targets {
                assert!(p.contains(t));
            }
        }
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut p = GotoProgram::new();
        let a = p.add_instruction();
        p.clear();
        let b = p.add_instruction();
        assert!(!p.contains(a));
        assert!(p.contains(b));
    }
}
