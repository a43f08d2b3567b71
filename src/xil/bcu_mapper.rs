/*!
Maps the control-flow opcodes onto one bound Branch Control Unit.

A design has a single program counter, so this mapper never allocates: it
is constructed around its BCU and only ever yields mappings whose site
hosts that exact unit. Every control-flow mapping is `Exclusive` with the
BCU's own latency; a branch owns the unit until the counter is stable.
*/

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ModelError;
use crate::fu::{Bcu, BcuTransactionSite};
use crate::signal::VecSignal;
use crate::transact::{TAVerb, TransactionSite};
use crate::xil::{
    BranchLabel, DefaultInstructionSet, Project, ResourceKind, TypeDescriptor, XilInstr,
    XilMapper, XilMapping, XilOpcode,
};

/// The closed set of control-flow realizations.
#[derive(Copy, Clone, Debug)]
enum BcuMappingKind {
    Goto { target: BranchLabel },
    BranchIf { target: BranchLabel },
    BranchIfNot { target: BranchLabel },
}

/// A control-flow instruction realized on a BCU transaction site.
pub struct BcuMapping {
    site: Rc<BcuTransactionSite>,
    kind: BcuMappingKind,
}

impl XilMapping for BcuMapping {
    fn site(&self) -> Rc<dyn TransactionSite> {
        self.site.clone()
    }

    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::Exclusive
    }

    fn initiation_interval(&self) -> u64 {
        1
    }

    fn latency(&self) -> u64 {
        self.site.host().borrow().latency() as u64
    }

    fn description(&self) -> String {
        let host = self.site.host_name();
        match self.kind {
            BcuMappingKind::Goto { target } => {
                format!("{host}: goto c-step {}", target.c_step())
            }
            BcuMappingKind::BranchIf { target } => {
                format!("{host}: branch if true to c-step {}", target.c_step())
            }
            BcuMappingKind::BranchIfNot { target } => {
                format!("{host}: branch if false to c-step {}", target.c_step())
            }
        }
    }

    fn realize(
        &self,
        operands: &[VecSignal],
        _results: &[VecSignal],
    ) -> Result<Vec<TAVerb>, ModelError> {
        match self.kind {
            BcuMappingKind::Goto { target } => self.site.branch(&target),
            BcuMappingKind::BranchIf { target } => {
                let cond = condition_operand(operands)?;
                self.site.branch_if(cond, &target)
            }
            BcuMappingKind::BranchIfNot { target } => {
                let cond = condition_operand(operands)?;
                self.site.branch_if_not(cond, &target)
            }
        }
    }
}

fn condition_operand(operands: &[VecSignal]) -> Result<VecSignal, ModelError> {
    operands.first().cloned().ok_or(ModelError::OutOfRange {
        what: "conditional branch operand count",
        value: 0,
        limit: 1,
    })
}

/// Mapper for `Goto`, `BranchIfTrue`, and `BranchIfFalse` on one BCU.
pub struct BcuMapper {
    host: Rc<RefCell<Bcu>>,
    site: Rc<BcuTransactionSite>,
}

impl BcuMapper {
    pub fn new(host: Rc<RefCell<Bcu>>) -> BcuMapper {
        let site = Rc::new(BcuTransactionSite::new(host.clone()));
        BcuMapper { host, site }
    }

    /// The site every mapping from this mapper drives.
    pub fn site(&self) -> &Rc<BcuTransactionSite> {
        &self.site
    }

    fn is_control_flow(opcode: XilOpcode) -> bool {
        matches!(
            opcode,
            XilOpcode::Goto | XilOpcode::BranchIfTrue | XilOpcode::BranchIfFalse
        )
    }

    /// Build the mapping for a control-flow instruction. Reaching the
    /// fallback arm means the family check and the dispatch disagree,
    /// which is a bug in this mapper, surfaced as `NotImplemented`.
    fn mapping_for(&self, instr: &XilInstr) -> Result<BcuMapping, ModelError> {
        let target = instr.target.ok_or_else(|| ModelError::InvalidConfiguration {
            component: self.site.host_name(),
            reason: format!("control-flow instruction {instr} carries no target label"),
        })?;
        let kind = match instr.opcode {
            XilOpcode::Goto => BcuMappingKind::Goto { target },
            XilOpcode::BranchIfTrue => BcuMappingKind::BranchIf { target },
            XilOpcode::BranchIfFalse => BcuMappingKind::BranchIfNot { target },
            opcode => {
                return Err(ModelError::NotImplemented {
                    mapper: "BcuMapper",
                    opcode: opcode.to_string(),
                });
            }
        };
        Ok(BcuMapping {
            site: self.site.clone(),
            kind,
        })
    }
}

impl XilMapper for BcuMapper {
    fn supported_instructions(&self) -> Vec<XilInstr> {
        let iset = DefaultInstructionSet;
        let origin = BranchLabel::new(0);
        vec![
            iset.goto(origin),
            iset.branch_if_true(origin),
            iset.branch_if_false(origin),
        ]
    }

    fn try_map(
        &self,
        site: &dyn TransactionSite,
        instr: &XilInstr,
        _operand_types: &[TypeDescriptor],
        _result_types: &[TypeDescriptor],
    ) -> Result<Vec<Box<dyn XilMapping>>, ModelError> {
        if !Self::is_control_flow(instr.opcode) {
            return Ok(Vec::new());
        }
        // Only sites hosting the bound BCU are eligible.
        let Some(bcu_site) = site.as_any().downcast_ref::<BcuTransactionSite>() else {
            return Ok(Vec::new());
        };
        if !Rc::ptr_eq(bcu_site.host(), &self.host) {
            return Ok(Vec::new());
        }
        Ok(vec![Box::new(self.mapping_for(instr)?)])
    }

    fn try_allocate(
        &mut self,
        instr: &XilInstr,
        _operand_types: &[TypeDescriptor],
        _result_types: &[TypeDescriptor],
        _project: &mut Project,
    ) -> Result<Option<Box<dyn XilMapping>>, ModelError> {
        // Never creates a BCU; the bound host is the only program counter.
        if !Self::is_control_flow(instr.opcode) {
            return Ok(None);
        }
        Ok(Some(Box::new(self.mapping_for(instr)?)))
    }
}
