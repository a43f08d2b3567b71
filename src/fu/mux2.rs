/*!
2-to-1 multiplexer: a stateless combinational selector.

`r` follows `a` while `sel` reads `'0'` and `b` otherwise. Latency 0,
initiation interval 1. Two instances are behaviorally equivalent exactly
when their widths agree, which is what lets the mapping layer share one
mux between clients.
*/

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::binder::{AutoBinder, PortUsage};
use crate::error::ModelError;
use crate::kernel::Component;
use crate::logic::{Logic, LogicVector};
use crate::signal::{In, Out, VecSignal};
use crate::transact::{SignalDrive, TAVerb, TransactionSite};

struct Mux2Ports {
    a: In<LogicVector>,
    b: In<LogicVector>,
    sel: In<LogicVector>,
    r: Out<LogicVector>,
}

pub struct Mux2 {
    name: String,
    width: usize,
    ports: Option<Mux2Ports>,
}

impl Mux2 {
    pub fn new(name: impl Into<String>, width: usize) -> Mux2 {
        Mux2 {
            name: name.into(),
            width,
            ports: None,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Behavioral equivalence is width equality.
    pub fn is_equivalent(&self, other: &Mux2) -> bool {
        self.width == other.width
    }

    /// Hash of the behavior; equal for equivalent instances.
    pub fn behavior_hash(&self) -> u64 {
        self.width as u64
    }

    pub fn pre_initialize(&mut self, binder: &mut dyn AutoBinder) -> Result<(), ModelError> {
        let w = self.width;
        self.ports = Some(Mux2Ports {
            a: In::new(binder.bind_vec(PortUsage::Operand, "a", LogicVector::dont_cares(w))),
            b: In::new(binder.bind_vec(PortUsage::Operand, "b", LogicVector::dont_cares(w))),
            sel: In::new(binder.bind_vec(PortUsage::Operand, "sel", LogicVector::dont_cares(1))),
            r: Out::new(binder.bind_vec(PortUsage::Result, "r", LogicVector::dont_cares(w))),
        });
        Ok(())
    }

    pub fn a(&self) -> Option<VecSignal> {
        self.ports.as_ref().map(|p| p.a.cell().clone())
    }

    pub fn b(&self) -> Option<VecSignal> {
        self.ports.as_ref().map(|p| p.b.cell().clone())
    }

    pub fn sel(&self) -> Option<VecSignal> {
        self.ports.as_ref().map(|p| p.sel.cell().clone())
    }

    pub fn r(&self) -> Option<VecSignal> {
        self.ports.as_ref().map(|p| p.r.cell().clone())
    }
}

impl Component for Mux2 {
    fn name(&self) -> &str {
        &self.name
    }

    fn eval(&mut self) {
        let Some(p) = &self.ports else { return };
        let sel = p.sel.get();
        let picked = if sel.width() > 0 && sel.bit(0) == Logic::Zero {
            p.a.get()
        } else {
            p.b.get()
        };
        p.r.set(picked);
    }
}

/// Verb factory for one MUX2.
pub struct Mux2TransactionSite {
    host: Rc<RefCell<Mux2>>,
}

impl Mux2TransactionSite {
    pub fn new(host: Rc<RefCell<Mux2>>) -> Mux2TransactionSite {
        Mux2TransactionSite { host }
    }

    pub fn host(&self) -> &Rc<RefCell<Mux2>> {
        &self.host
    }

    fn port_cells(&self) -> Result<(VecSignal, VecSignal, VecSignal, VecSignal), ModelError> {
        let host = self.host.borrow();
        match (host.a(), host.b(), host.sel(), host.r()) {
            (Some(a), Some(b), Some(sel), Some(r)) => Ok((a, b, sel, r)),
            _ => Err(ModelError::InvalidConfiguration {
                component: host.name().to_string(),
                reason: "transaction site used before establish".to_string(),
            }),
        }
    }

    /// One cycle of selecting: inputs wired from their sources, the result
    /// sink wired from the component's `r` port.
    pub fn select(
        &self,
        a: VecSignal,
        b: VecSignal,
        sel: VecSignal,
        r: VecSignal,
    ) -> Result<TAVerb, ModelError> {
        let (pa, pb, psel, pr) = self.port_cells()?;
        Ok(TAVerb::locked(vec![
            SignalDrive::wire(pa, a),
            SignalDrive::wire(pb, b),
            SignalDrive::wire(psel, sel),
            SignalDrive::wire(r, pr),
        ]))
    }
}

impl TransactionSite for Mux2TransactionSite {
    fn host_name(&self) -> String {
        self.host.borrow().name().to_string()
    }

    fn establish(&self, binder: &mut dyn AutoBinder) -> Result<(), ModelError> {
        self.host.borrow_mut().pre_initialize(binder)
    }

    fn do_nothing(&self) -> Result<TAVerb, ModelError> {
        let (pa, pb, psel, _) = self.port_cells()?;
        let w = self.host.borrow().width();
        Ok(TAVerb::locked(vec![
            SignalDrive::stick(pa, LogicVector::dont_cares(w)),
            SignalDrive::stick(pb, LogicVector::dont_cares(w)),
            SignalDrive::stick(psel, LogicVector::dont_cares(1)),
        ]))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
