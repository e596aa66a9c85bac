//! Instructions of a GOTO program.

use crate::error::{GotoError, GotoResult};
use gbmc_expr::{Expr, Location};
use std::collections::HashMap;
use std::fmt;

/// Target number of an instruction nobody jumps to.
pub const NO_TARGET_NUMBER: u32 = u32::MAX;

/// Stable handle to an instruction inside one [`GotoProgram`](crate::GotoProgram).
///
/// Handles survive insertion and removal of other instructions. Each program
/// has its own `program` tag, so a handle into a different program is never
/// mistaken for a local one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrId {
    pub(crate) program: u32,
    pub(crate) index: u32,
}

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.program, self.index)
    }
}

/// Tag of an instruction kind, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionType {
    NoInstructionType,
    Goto,
    Assume,
    Assert,
    Other,
    Skip,
    Location,
    EndFunction,
    AtomicBegin,
    AtomicEnd,
    Return,
    Assign,
    Decl,
    Dead,
    FunctionCall,
    Throw,
    Catch,
    ThrowDecl,
    ThrowDeclEnd,
}

impl fmt::Display for InstructionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstructionType::NoInstructionType => "NO_INSTRUCTION_TYPE",
            InstructionType::Goto => "GOTO",
            InstructionType::Assume => "ASSUME",
            InstructionType::Assert => "ASSERT",
            InstructionType::Other => "OTHER",
            InstructionType::Skip => "SKIP",
            InstructionType::Location => "LOCATION",
            InstructionType::EndFunction => "END_FUNCTION",
            InstructionType::AtomicBegin => "ATOMIC_BEGIN",
            InstructionType::AtomicEnd => "ATOMIC_END",
            InstructionType::Return => "RETURN",
            InstructionType::Assign => "ASSIGN",
            InstructionType::Decl => "DECL",
            InstructionType::Dead => "DEAD",
            InstructionType::FunctionCall => "FUNCTION_CALL",
            InstructionType::Throw => "THROW",
            InstructionType::Catch => "CATCH",
            InstructionType::ThrowDecl => "THROW_DECL",
            InstructionType::ThrowDeclEnd => "THROW_DECL_END",
        };
        f.write_str(name)
    }
}

/// Instruction kind together with the code it carries.
#[derive(Debug, Clone, PartialEq)]
pub enum InstructionKind {
    /// Fresh instruction from `add_instruction`.
    NoInstructionType,
    /// Branch to `targets` when the guard holds.
    Goto,
    Assume,
    Assert,
    Other {
        code: Expr,
    },
    Skip,
    Location,
    EndFunction,
    AtomicBegin,
    AtomicEnd,
    Return {
        operand: Option<Expr>,
    },
    Assign {
        target: Expr,
        source: Expr,
    },
    Decl {
        symbol: Expr,
    },
    Dead {
        symbol: Expr,
    },
    FunctionCall {
        ret: Option<Expr>,
        function: Expr,
        arguments: Vec<Expr>,
    },
    Throw {
        exceptions: Vec<String>,
        operand: Option<Expr>,
    },
    /// Exception handlers; `targets[i]` handles `exceptions[i]`.
    Catch {
        exceptions: Vec<String>,
    },
    ThrowDecl {
        exceptions: Vec<String>,
    },
    ThrowDeclEnd {
        exceptions: Vec<String>,
    },
}

impl InstructionKind {
    pub fn instruction_type(&self) -> InstructionType {
        match self {
            InstructionKind::NoInstructionType => InstructionType::NoInstructionType,
            InstructionKind::Goto => InstructionType::Goto,
            InstructionKind::Assume => InstructionType::Assume,
            InstructionKind::Assert => InstructionType::Assert,
            InstructionKind::Other { .. } => InstructionType::Other,
            InstructionKind::Skip => InstructionType::Skip,
            InstructionKind::Location => InstructionType::Location,
            InstructionKind::EndFunction => InstructionType::EndFunction,
            InstructionKind::AtomicBegin => InstructionType::AtomicBegin,
            InstructionKind::AtomicEnd => InstructionType::AtomicEnd,
            InstructionKind::Return { .. } => InstructionType::Return,
            InstructionKind::Assign { .. } => InstructionType::Assign,
            InstructionKind::Decl { .. } => InstructionType::Decl,
            InstructionKind::Dead { .. } => InstructionType::Dead,
            InstructionKind::FunctionCall { .. } => InstructionType::FunctionCall,
            InstructionKind::Throw { .. } => InstructionType::Throw,
            InstructionKind::Catch { .. } => InstructionType::Catch,
            InstructionKind::ThrowDecl { .. } => InstructionType::ThrowDecl,
            InstructionKind::ThrowDeclEnd { .. } => InstructionType::ThrowDeclEnd,
        }
    }
}

/// One step of control flow.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub kind: InstructionKind,
    /// Condition for goto, assume and assert; `TRUE` otherwise.
    pub guard: Expr,
    /// Jump targets of a goto, handlers of a catch.
    pub targets: Vec<InstrId>,
    pub location: Location,
    /// Name of the enclosing function.
    pub function: String,
    pub labels: Vec<String>,
    /// Variables in scope, for display only.
    pub local_variables: Vec<String>,
    /// Dense 1-based number if this instruction is a jump target, otherwise
    /// [`NO_TARGET_NUMBER`].
    pub target_number: u32,
    pub location_number: u32,
    pub loop_number: u32,
}

impl Default for Instruction {
    fn default() -> Self {
        Self::new(InstructionKind::NoInstructionType)
    }
}

impl Instruction {
    pub fn new(kind: InstructionKind) -> Self {
        Self {
            kind,
            guard: Expr::true_expr(),
            targets: Vec::new(),
            location: Location::default(),
            function: String::new(),
            labels: Vec::new(),
            local_variables: Vec::new(),
            target_number: NO_TARGET_NUMBER,
            location_number: 0,
            loop_number: 0,
        }
    }

    /// `IF guard THEN GOTO target`.
    pub fn goto(guard: Expr, target: InstrId) -> Self {
        Self::new(InstructionKind::Goto)
            .with_guard(guard)
            .with_targets(vec![target])
    }

    pub fn assume(guard: Expr) -> Self {
        Self::new(InstructionKind::Assume).with_guard(guard)
    }

    pub fn assert(guard: Expr) -> Self {
        Self::new(InstructionKind::Assert).with_guard(guard)
    }

    pub fn assign(target: Expr, source: Expr) -> Self {
        Self::new(InstructionKind::Assign { target, source })
    }

    pub fn decl(symbol: Expr) -> Self {
        Self::new(InstructionKind::Decl { symbol })
    }

    pub fn function_call(ret: Option<Expr>, function: Expr, arguments: Vec<Expr>) -> Self {
        Self::new(InstructionKind::FunctionCall {
            ret,
            function,
            arguments,
        })
    }

    pub fn return_value(operand: Option<Expr>) -> Self {
        Self::new(InstructionKind::Return { operand })
    }

    pub fn skip() -> Self {
        Self::new(InstructionKind::Skip)
    }

    pub fn end_function() -> Self {
        Self::new(InstructionKind::EndFunction)
    }

    pub fn with_guard(mut self, guard: Expr) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_targets(mut self, targets: Vec<InstrId>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn with_function(mut self, function: &str) -> Self {
        self.function = function.to_string();
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.labels.push(label.to_string());
        self
    }

    pub fn instruction_type(&self) -> InstructionType {
        self.kind.instruction_type()
    }

    /// Whether some instruction jumps here (valid after target numbering).
    pub fn is_target(&self) -> bool {
        self.target_number != NO_TARGET_NUMBER
    }

    pub fn is_goto(&self) -> bool {
        matches!(self.kind, InstructionKind::Goto)
    }

    pub fn is_assume(&self) -> bool {
        matches!(self.kind, InstructionKind::Assume)
    }

    pub fn is_assert(&self) -> bool {
        matches!(self.kind, InstructionKind::Assert)
    }

    pub fn is_assign(&self) -> bool {
        matches!(self.kind, InstructionKind::Assign { .. })
    }

    pub fn is_function_call(&self) -> bool {
        matches!(self.kind, InstructionKind::FunctionCall { .. })
    }

    pub fn is_return(&self) -> bool {
        matches!(self.kind, InstructionKind::Return { .. })
    }

    pub fn is_throw(&self) -> bool {
        matches!(self.kind, InstructionKind::Throw { .. })
    }

    pub fn is_catch(&self) -> bool {
        matches!(self.kind, InstructionKind::Catch { .. })
    }

    pub fn is_skip(&self) -> bool {
        matches!(self.kind, InstructionKind::Skip)
    }

    pub fn is_end_function(&self) -> bool {
        matches!(self.kind, InstructionKind::EndFunction)
    }

    /// Rewrite every target through `map`. A target missing from the map is
    /// a dangling reference, and the targets are then left as they were.
    pub fn remap(&mut self, map: &HashMap<InstrId, InstrId>) -> GotoResult<()> {
        let targets = self
            .targets
            .iter()
            .map(|&target| {
                map.get(&target)
                    .copied()
                    .ok_or(GotoError::DanglingTarget { target })
            })
            .collect::<GotoResult<Vec<_>>>()?;
        self.targets = targets;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: u32) -> InstrId {
        InstrId { program: 7, index }
    }

    #[test]
    fn test_fresh_instruction() {
        let instr = Instruction::default();
        assert_eq!(instr.instruction_type(), InstructionType::NoInstructionType);
        assert!(!instr.is_target());
        assert!(instr.guard.is_true());
        assert!(instr.targets.is_empty());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(InstructionType::Goto.to_string(), "GOTO");
        assert_eq!(InstructionType::FunctionCall.to_string(), "FUNCTION_CALL");
        assert_eq!(InstructionType::ThrowDeclEnd.to_string(), "THROW_DECL_END");
        assert_eq!(
            InstructionType::NoInstructionType.to_string(),
            "NO_INSTRUCTION_TYPE"
        );
    }

    #[test]
    fn test_remap() {
        let mut instr = Instruction::goto(Expr::true_expr(), id(1));
        let map: HashMap<_, _> = [(id(1), id(10))].into_iter().collect();
        instr.remap(&map).unwrap();
        assert_eq!(instr.targets, vec![id(10)]);

        let err = instr.remap(&HashMap::new()).unwrap_err();
        assert_eq!(err, GotoError::DanglingTarget { target: id(10) });
    }

    #[test]
    fn test_failed_remap_keeps_targets() {
        let mut instr =
            Instruction::goto(Expr::true_expr(), id(1)).with_targets(vec![id(1), id(2)]);
        let map: HashMap<_, _> = [(id(1), id(10))].into_iter().collect();
        let err = instr.remap(&map).unwrap_err();
        assert_eq!(err, GotoError::DanglingTarget { target: id(2) });
        assert_eq!(instr.targets, vec![id(1), id(2)]);
    }
}
