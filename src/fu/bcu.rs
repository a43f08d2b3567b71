/*!
Branch Control Unit: computes the next program-memory address for a
micro-sequenced datapath.

Behavior
- Conditional branches pick between the linear successor (`last_addr + 1`,
  modulo the address space) and an alternative address, gated by two flags
  in dual polarity: `brP` branches when it reads `'1'`, `brN` branches when
  it reads `'0'`. Driving `brP = '0'`, `brN = '1'` is the NOP encoding.
- Reset is synchronous and dominant: while `rst` is high the unit emits the
  configured startup address every cycle.
- With a latency above one, a shift register (`rstq`) masks branch inputs
  for `latency - 1` cycles after reset deasserts: it is loaded with all
  ones on reset and shifts toward the LSB with a `'0'` injected at the high
  end, so the mask expires exactly when the pipeline has refilled.

Input lowering
- Branch flags carrying metavalues never take a branch: `brP` counts as
  asserted only when the cell is literally `'1'`, and `brN` only when it is
  literally `'0'`. A `'-'` or `'X'` on either flag therefore falls through
  to the linear successor.

Transaction verbs
- A branch occupies the site for exactly `latency` cycles (one driving verb
  plus `latency - 1` no-ops), so a scheduler cannot dispatch another branch
  before the program counter is stable.
*/

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::binder::{AutoBinder, PortUsage};
use crate::error::ModelError;
use crate::kernel::Component;
use crate::logic::{Logic, LogicVector, MAX_VECTOR_WIDTH};
use crate::signal::{BitSignal, In, Out, VecSignal};
use crate::transact::{SignalDrive, TAVerb, TransactionSite};
use crate::unsigned::Unsigned;
use crate::xil::BranchLabel;

/// Construction-time configuration; immutable once the unit initializes.
#[derive(Clone, Debug)]
pub struct BcuConfig {
    pub addr_width: usize,
    pub startup_addr: LogicVector,
    pub latency: usize,
}

struct BcuPorts {
    clk: In<Logic>,
    rst: In<Logic>,
    brp: In<LogicVector>,
    brn: In<LogicVector>,
    alt_addr: In<LogicVector>,
    out_addr: Out<LogicVector>,
    last_addr: VecSignal,
    /// Post-reset branch mask, width `latency - 1`; absent at latency 1.
    rstq: Option<VecSignal>,
}

pub struct Bcu {
    name: String,
    addr_width: usize,
    startup_addr: LogicVector,
    latency: usize,
    ports: Option<BcuPorts>,
}

impl Bcu {
    /// Fails with `OutOfRange` when `latency < 1` or when `addr_width`
    /// exceeds the numeric vector bound (addresses are lowered through
    /// `Unsigned` every cycle).
    pub fn new(name: impl Into<String>, cfg: BcuConfig) -> Result<Bcu, ModelError> {
        if cfg.latency < 1 {
            return Err(ModelError::OutOfRange {
                what: "BCU latency",
                value: cfg.latency as u128,
                limit: 1,
            });
        }
        if cfg.addr_width > MAX_VECTOR_WIDTH {
            return Err(ModelError::OutOfRange {
                what: "BCU address width",
                value: cfg.addr_width as u128,
                limit: MAX_VECTOR_WIDTH as u128,
            });
        }
        Ok(Bcu {
            name: name.into(),
            addr_width: cfg.addr_width,
            startup_addr: cfg.startup_addr,
            latency: cfg.latency,
            ports: None,
        })
    }

    pub fn addr_width(&self) -> usize {
        self.addr_width
    }

    pub fn latency(&self) -> usize {
        self.latency
    }

    pub fn startup_addr(&self) -> &LogicVector {
        &self.startup_addr
    }

    /// Allocate ports and internal registers through the binder. Fails with
    /// `InvalidConfiguration` when the startup address does not match the
    /// configured address width.
    pub fn pre_initialize(&mut self, binder: &mut dyn AutoBinder) -> Result<(), ModelError> {
        if self.startup_addr.width() != self.addr_width {
            return Err(ModelError::InvalidConfiguration {
                component: self.name.clone(),
                reason: format!(
                    "startup address is {} bits, address width is {}",
                    self.startup_addr.width(),
                    self.addr_width
                ),
            });
        }
        let w = self.addr_width;
        let rstq = (self.latency > 1).then(|| {
            binder.bind_vec(PortUsage::State, "rstq", LogicVector::ones(self.latency - 1))
        });
        self.ports = Some(BcuPorts {
            clk: In::new(binder.bind_bit(PortUsage::Clock, "clk", Logic::Zero)),
            rst: In::new(binder.bind_bit(PortUsage::Reset, "rst", Logic::Zero)),
            brp: In::new(binder.bind_vec(PortUsage::Operand, "brP", LogicVector::zeros(1))),
            brn: In::new(binder.bind_vec(PortUsage::Operand, "brN", LogicVector::ones(1))),
            alt_addr: In::new(binder.bind_vec(PortUsage::Operand, "altAddr", LogicVector::zeros(w))),
            out_addr: Out::new(binder.bind_vec(
                PortUsage::Result,
                "outAddr",
                self.startup_addr.clone(),
            )),
            last_addr: binder.bind_vec(PortUsage::State, "lastAddr", self.startup_addr.clone()),
            rstq,
        });
        Ok(())
    }

    fn port(&self) -> Option<&BcuPorts> {
        self.ports.as_ref()
    }

    pub fn brp(&self) -> Option<VecSignal> {
        self.port().map(|p| p.brp.cell().clone())
    }

    pub fn brn(&self) -> Option<VecSignal> {
        self.port().map(|p| p.brn.cell().clone())
    }

    pub fn alt_addr(&self) -> Option<VecSignal> {
        self.port().map(|p| p.alt_addr.cell().clone())
    }

    pub fn out_addr(&self) -> Option<VecSignal> {
        self.port().map(|p| p.out_addr.cell().clone())
    }

    pub fn clk(&self) -> Option<BitSignal> {
        self.port().map(|p| p.clk.cell().clone())
    }

    pub fn rst(&self) -> Option<BitSignal> {
        self.port().map(|p| p.rst.cell().clone())
    }

    /// Deterministic flag lowering: only a literal `'1'` asserts `brP`,
    /// only a literal `'0'` asserts `brN`.
    fn branch_taken(brp: &LogicVector, brn: &LogicVector) -> bool {
        let positive = brp.width() > 0 && brp.bit(0) == Logic::One;
        let negative = brn.width() > 0 && brn.bit(0) == Logic::Zero;
        positive || negative
    }

    /// `addr + 1` modulo the address space; metavalued addresses have no
    /// successor and collapse to all don't-cares.
    fn linear_successor(&self, addr: &LogicVector) -> LogicVector {
        match Unsigned::from_vector(addr) {
            Some(u) => u.wrapping_add(1).to_vector(),
            None => LogicVector::dont_cares(self.addr_width),
        }
    }

    /// `rstq` shift: drop the low bit, inject `'0'` at the high end. At
    /// width 1 this degenerates to loading `'0'`.
    fn shift_in_zero(q: &LogicVector) -> LogicVector {
        let w = q.width();
        let mut bits = Vec::with_capacity(w);
        for i in 1..w {
            bits.push(q.bit(i));
        }
        bits.push(Logic::Zero);
        LogicVector::from_bits(bits)
    }
}

impl Component for Bcu {
    fn name(&self) -> &str {
        &self.name
    }

    fn eval(&mut self) {
        let Some(p) = &self.ports else { return };
        if !p.clk.rising_edge() {
            return;
        }

        if p.rst.get() == Logic::One {
            p.out_addr.set(self.startup_addr.clone());
            p.last_addr.borrow_mut().drive(self.startup_addr.clone());
            if let Some(q) = &p.rstq {
                q.borrow_mut().drive(LogicVector::ones(self.latency - 1));
            }
            trace!(bcu = %self.name, "reset: startup address loaded");
            return;
        }

        let masked = p
            .rstq
            .as_ref()
            .is_some_and(|q| q.borrow().cur().bit(0) == Logic::One);
        let take = !masked && Self::branch_taken(&p.brp.get(), &p.brn.get());
        let addr = if take {
            trace!(bcu = %self.name, target = %p.alt_addr.get(), "branch taken");
            p.alt_addr.get()
        } else {
            self.linear_successor(p.last_addr.borrow().cur())
        };
        p.out_addr.set(addr.clone());
        p.last_addr.borrow_mut().drive(addr);
        if let Some(q) = &p.rstq {
            let shifted = Self::shift_in_zero(q.borrow().cur());
            q.borrow_mut().drive(shifted);
        }
    }
}

/// Verb factory for one BCU.
pub struct BcuTransactionSite {
    host: Rc<RefCell<Bcu>>,
}

impl BcuTransactionSite {
    pub fn new(host: Rc<RefCell<Bcu>>) -> BcuTransactionSite {
        BcuTransactionSite { host }
    }

    pub fn host(&self) -> &Rc<RefCell<Bcu>> {
        &self.host
    }

    /// Branch-flag and alternative-address handles, or an
    /// `InvalidConfiguration` error before `establish`.
    fn branch_ports(&self) -> Result<(VecSignal, VecSignal, VecSignal, usize), ModelError> {
        let host = self.host.borrow();
        match (host.brp(), host.brn(), host.alt_addr()) {
            (Some(brp), Some(brn), Some(alt)) => Ok((brp, brn, alt, host.addr_width())),
            _ => Err(ModelError::InvalidConfiguration {
                component: host.name().to_string(),
                reason: "transaction site used before establish".to_string(),
            }),
        }
    }

    fn idle_verb(&self) -> Result<TAVerb, ModelError> {
        let (brp, brn, alt, w) = self.branch_ports()?;
        Ok(TAVerb::locked(vec![
            SignalDrive::stick(brp, LogicVector::zeros(1)),
            SignalDrive::stick(brn, LogicVector::ones(1)),
            SignalDrive::stick(alt, LogicVector::zeros(w)),
        ]))
    }

    fn target_vector(&self, target: &BranchLabel, width: usize) -> Result<LogicVector, ModelError> {
        LogicVector::from_uint(target.c_step() as u128, width)
    }

    /// Pad a branch window: the driving verb plus `latency - 1` no-ops, so
    /// the site is claimed until the program counter is stable.
    fn padded(&self, first: TAVerb) -> Result<Vec<TAVerb>, ModelError> {
        let latency = self.host.borrow().latency();
        let mut verbs = Vec::with_capacity(latency);
        verbs.push(first);
        for _ in 1..latency {
            verbs.push(self.idle_verb()?);
        }
        Ok(verbs)
    }

    /// Unconditional branch to `target`.
    pub fn branch(&self, target: &BranchLabel) -> Result<Vec<TAVerb>, ModelError> {
        let (brp, brn, alt, w) = self.branch_ports()?;
        let first = TAVerb::locked(vec![
            SignalDrive::stick(brp, LogicVector::ones(1)),
            SignalDrive::stick(brn, LogicVector::zeros(1)),
            SignalDrive::stick(alt, self.target_vector(target, w)?),
        ]);
        self.padded(first)
    }

    /// Branch to `target` when `cond` carries `'1'`.
    pub fn branch_if(&self, cond: VecSignal, target: &BranchLabel) -> Result<Vec<TAVerb>, ModelError> {
        let (brp, brn, alt, w) = self.branch_ports()?;
        let first = TAVerb::locked(vec![
            SignalDrive::wire(brp, cond),
            SignalDrive::stick(brn, LogicVector::ones(1)),
            SignalDrive::stick(alt, self.target_vector(target, w)?),
        ]);
        self.padded(first)
    }

    /// Branch to `target` when `cond` carries `'0'`.
    pub fn branch_if_not(
        &self,
        cond: VecSignal,
        target: &BranchLabel,
    ) -> Result<Vec<TAVerb>, ModelError> {
        let (brp, brn, alt, w) = self.branch_ports()?;
        let first = TAVerb::locked(vec![
            SignalDrive::stick(brp, LogicVector::zeros(1)),
            SignalDrive::wire(brn, cond),
            SignalDrive::stick(alt, self.target_vector(target, w)?),
        ]);
        self.padded(first)
    }
}

impl TransactionSite for BcuTransactionSite {
    fn host_name(&self) -> String {
        self.host.borrow().name().to_string()
    }

    fn establish(&self, binder: &mut dyn AutoBinder) -> Result<(), ModelError> {
        self.host.borrow_mut().pre_initialize(binder)
    }

    fn do_nothing(&self) -> Result<TAVerb, ModelError> {
        self.idle_verb()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
