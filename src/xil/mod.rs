/*!
XIL layer: the abstract instruction set and the registry-driven binding of
instructions to functional units.

Flow:
- An instruction selector asks a mapper to `try_map` an instruction onto an
  already-allocated site, or to `try_allocate` a fresh unit for it. Both
  decline by returning nothing; that is the normal "not my instruction"
  protocol, not an error.
- The chosen `XilMapping` is later realized with concrete operand sources
  and result sinks, yielding the transaction verbs that drive the unit
  cycle by cycle.

Layout:
    mod.rs         - instructions, labels, type lowering, mapping traits,
                     the allocation project
    bcu_mapper.rs  - Goto / BranchIfTrue / BranchIfFalse on a bound BCU
    mux2_mapper.rs - Select on freshly allocated 2-to-1 multiplexers
*/

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::ModelError;
use crate::kernel::Component;
use crate::signal::VecSignal;
use crate::transact::{TAVerb, TransactionSite};

mod bcu_mapper;
mod mux2_mapper;

pub use bcu_mapper::BcuMapper;
pub use mux2_mapper::Mux2Mapper;

#[cfg(test)]
mod tests;

/// A reference to an instruction address, identified by its control step.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BranchLabel {
    c_step: u64,
}

impl BranchLabel {
    pub fn new(c_step: u64) -> BranchLabel {
        BranchLabel { c_step }
    }

    /// The instruction address this label resolves to.
    pub fn c_step(&self) -> u64 {
        self.c_step
    }
}

/// Opcodes recognized by this layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum XilOpcode {
    Goto,
    BranchIfTrue,
    BranchIfFalse,
    Select,
}

impl fmt::Display for XilOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            XilOpcode::Goto => "goto",
            XilOpcode::BranchIfTrue => "brtrue",
            XilOpcode::BranchIfFalse => "brfalse",
            XilOpcode::Select => "select",
        };
        write!(f, "{s}")
    }
}

/// An abstract instruction: opcode plus, for branches, the target label.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct XilInstr {
    pub opcode: XilOpcode,
    pub target: Option<BranchLabel>,
}

impl fmt::Display for XilInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            Some(t) => write!(f, "{} @{}", self.opcode, t.c_step()),
            None => write!(f, "{}", self.opcode),
        }
    }
}

/// Factory for the canonical instruction forms.
#[derive(Default)]
pub struct DefaultInstructionSet;

impl DefaultInstructionSet {
    pub fn goto(&self, target: BranchLabel) -> XilInstr {
        XilInstr {
            opcode: XilOpcode::Goto,
            target: Some(target),
        }
    }

    pub fn branch_if_true(&self, target: BranchLabel) -> XilInstr {
        XilInstr {
            opcode: XilOpcode::BranchIfTrue,
            target: Some(target),
        }
    }

    pub fn branch_if_false(&self, target: BranchLabel) -> XilInstr {
        XilInstr {
            opcode: XilOpcode::BranchIfFalse,
            target: Some(target),
        }
    }

    pub fn select(&self) -> XilInstr {
        XilInstr {
            opcode: XilOpcode::Select,
            target: None,
        }
    }
}

/// Abstract operand/result type as seen by the instruction selector.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeDescriptor {
    /// A single logic cell.
    Bit,
    /// A raw logic vector of the given width.
    Vector(usize),
    /// An unsigned integer of the given width.
    Unsigned(usize),
}

/// Lowers abstract types to wire widths.
#[derive(Default)]
pub struct TypeLowering;

impl TypeLowering {
    pub fn wire_width(&self, t: &TypeDescriptor) -> usize {
        match t {
            TypeDescriptor::Bit => 1,
            TypeDescriptor::Vector(w) | TypeDescriptor::Unsigned(w) => *w,
        }
    }
}

/// How a mapped functional unit may be shared.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    /// One client at a time; the scheduler serializes access.
    Exclusive,
    /// Cheap enough to share or replicate freely.
    Lightweight,
}

/// One way of realizing an instruction on a concrete functional unit.
pub trait XilMapping {
    /// The transaction site this mapping drives.
    fn site(&self) -> Rc<dyn TransactionSite>;

    fn resource_kind(&self) -> ResourceKind;

    /// Cycles before the unit accepts the next operation. At least 1.
    fn initiation_interval(&self) -> u64;

    /// Cycles from operand application to result validity.
    fn latency(&self) -> u64;

    /// Human-readable description for reports and diagnostics.
    fn description(&self) -> String;

    /// Produce the verb sequence that drives the unit, given the operand
    /// source signals and result sink signals in instruction order.
    fn realize(
        &self,
        operands: &[VecSignal],
        results: &[VecSignal],
    ) -> Result<Vec<TAVerb>, ModelError>;
}

/// Binds instruction opcodes to functional units.
pub trait XilMapper {
    /// The opcodes this mapper can realize, in canonical form.
    fn supported_instructions(&self) -> Vec<XilInstr>;

    /// Ways to realize `instr` on an already-allocated site. An empty
    /// vector means "not applicable here"; callers try other mappers.
    fn try_map(
        &self,
        site: &dyn TransactionSite,
        instr: &XilInstr,
        operand_types: &[TypeDescriptor],
        result_types: &[TypeDescriptor],
    ) -> Result<Vec<Box<dyn XilMapping>>, ModelError>;

    /// Allocate a functional unit for `instr` if necessary and return a
    /// mapping onto it, or `None` when this mapper does not handle the
    /// instruction. Freshly created units are recorded in `project`.
    fn try_allocate(
        &mut self,
        instr: &XilInstr,
        operand_types: &[TypeDescriptor],
        result_types: &[TypeDescriptor],
        project: &mut Project,
    ) -> Result<Option<Box<dyn XilMapping>>, ModelError>;
}

/// Opaque container for units allocated during mapping. The core appends;
/// downstream phases (establish/attach, netlist emission) consume.
#[derive(Default)]
pub struct Project {
    units: Vec<Rc<RefCell<dyn Component>>>,
}

impl Project {
    pub fn new() -> Project {
        Project::default()
    }

    pub fn add_unit(&mut self, unit: Rc<RefCell<dyn Component>>) {
        self.units.push(unit);
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn units(&self) -> &[Rc<RefCell<dyn Component>>] {
        &self.units
    }
}
