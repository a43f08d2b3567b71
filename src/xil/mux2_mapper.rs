/*!
Maps `Select` onto 2-to-1 multiplexers.

The XIL `Select` convention is `select(cond, then, else)`: the condition is
operand 0 and the data operands are 1 and 2, so the wire width comes from
the SECOND operand's type. Note how that routes onto the mux hardware,
whose own convention is `sel = '0'` picks `a`:

```text
site.select(a = operands[1], b = operands[0], sel = operands[2], r = results[0])
```

This argument order, including the placement of the condition and the
else-value, is a frozen contract: the downstream netlist emitter and the
instruction selector were built against it. Do not "fix" it to the
intuitive routing.

Muxes are `Lightweight`: `try_allocate` freely instantiates a new one of
the required width, and `try_map` accepts any mux site whose width
matches, which is what lets equal-width selects share hardware.
*/

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::error::ModelError;
use crate::fu::{Mux2, Mux2TransactionSite};
use crate::logic::MAX_VECTOR_WIDTH;
use crate::signal::VecSignal;
use crate::transact::{TAVerb, TransactionSite};
use crate::xil::{
    DefaultInstructionSet, Project, ResourceKind, TypeDescriptor, TypeLowering, XilInstr,
    XilMapper, XilMapping, XilOpcode,
};

/// A `Select` realized on a mux transaction site.
pub struct Mux2Mapping {
    site: Rc<Mux2TransactionSite>,
}

impl XilMapping for Mux2Mapping {
    fn site(&self) -> Rc<dyn TransactionSite> {
        self.site.clone()
    }

    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::Lightweight
    }

    fn initiation_interval(&self) -> u64 {
        1
    }

    fn latency(&self) -> u64 {
        0
    }

    fn description(&self) -> String {
        format!(
            "{}: {}-bit select",
            self.site.host_name(),
            self.site.host().borrow().width()
        )
    }

    fn realize(
        &self,
        operands: &[VecSignal],
        results: &[VecSignal],
    ) -> Result<Vec<TAVerb>, ModelError> {
        if operands.len() != 3 {
            return Err(ModelError::OutOfRange {
                what: "select operand count",
                value: operands.len() as u128,
                limit: 3,
            });
        }
        if results.len() != 1 {
            return Err(ModelError::OutOfRange {
                what: "select result count",
                value: results.len() as u128,
                limit: 1,
            });
        }
        // Preserved operand routing; see the module header before touching.
        let verb = self.site.select(
            operands[1].clone(),
            operands[0].clone(),
            operands[2].clone(),
            results[0].clone(),
        )?;
        Ok(vec![verb])
    }
}

/// Mapper for `Select`, allocating muxes on demand.
#[derive(Default)]
pub struct Mux2Mapper {
    lowering: TypeLowering,
    allocated: usize,
}

impl Mux2Mapper {
    pub fn new() -> Mux2Mapper {
        Mux2Mapper::default()
    }

    /// Width of the select's data path, taken from the second operand
    /// (operand 0 of `select(cond, then, else)` is the condition). Bounded
    /// by the numeric vector width so allocated muxes stay lowerable.
    fn data_width(&self, operand_types: &[TypeDescriptor]) -> Result<usize, ModelError> {
        if operand_types.len() != 3 {
            return Err(ModelError::OutOfRange {
                what: "select operand count",
                value: operand_types.len() as u128,
                limit: 3,
            });
        }
        let width = self.lowering.wire_width(&operand_types[1]);
        if width > MAX_VECTOR_WIDTH {
            return Err(ModelError::OutOfRange {
                what: "select data width",
                value: width as u128,
                limit: MAX_VECTOR_WIDTH as u128,
            });
        }
        Ok(width)
    }
}

impl XilMapper for Mux2Mapper {
    fn supported_instructions(&self) -> Vec<XilInstr> {
        vec![DefaultInstructionSet.select()]
    }

    fn try_map(
        &self,
        site: &dyn TransactionSite,
        instr: &XilInstr,
        operand_types: &[TypeDescriptor],
        _result_types: &[TypeDescriptor],
    ) -> Result<Vec<Box<dyn XilMapping>>, ModelError> {
        if instr.opcode != XilOpcode::Select {
            return Ok(Vec::new());
        }
        let Some(mux_site) = site.as_any().downcast_ref::<Mux2TransactionSite>() else {
            return Ok(Vec::new());
        };
        let width = self.data_width(operand_types)?;
        if mux_site.host().borrow().width() != width {
            return Ok(Vec::new());
        }
        let mapping = Mux2Mapping {
            site: Rc::new(Mux2TransactionSite::new(mux_site.host().clone())),
        };
        Ok(vec![Box::new(mapping)])
    }

    fn try_allocate(
        &mut self,
        instr: &XilInstr,
        operand_types: &[TypeDescriptor],
        _result_types: &[TypeDescriptor],
        project: &mut Project,
    ) -> Result<Option<Box<dyn XilMapping>>, ModelError> {
        if instr.opcode != XilOpcode::Select {
            return Ok(None);
        }
        let width = self.data_width(operand_types)?;
        let name = format!("mux{}", self.allocated);
        self.allocated += 1;
        debug!(width, unit = %name, "allocated 2-to-1 multiplexer");
        let mux = Rc::new(RefCell::new(Mux2::new(name, width)));
        project.add_unit(mux.clone());
        Ok(Some(Box::new(Mux2Mapping {
            site: Rc::new(Mux2TransactionSite::new(mux)),
        })))
    }
}
