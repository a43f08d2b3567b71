/*!
Transaction verbs: one clock cycle of signal drives, grouped.

A transaction site is the per-functional-unit facade that manufactures
verbs. Each verb claims its site for exactly one cycle; a `Locked` verb
additionally forbids any other verb on the same site in that cycle, which
is how multi-cycle operations (a branch occupying its full latency window)
keep the unit to themselves.

Within one verb the drives are unordered: they take effect simultaneously
at the next delta boundary. A `Wire` source denotes a cycle-long connection
from another signal; `apply` samples the source's current value at
application time, which is exact for operand sources held stable across the
cycle (the scheduling contract) and which a netlist emitter consumes as a
plain wire.
*/

use std::any::Any;

use crate::binder::AutoBinder;
use crate::error::ModelError;
use crate::logic::LogicVector;
use crate::signal::VecSignal;

/// Exclusivity of a verb on its site for the cycle it covers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VerbMode {
    /// No other verb may occupy the same site in the same cycle.
    Locked,
    /// Other clients may drive the same site in the same cycle.
    Shared,
}

/// Where a driven value comes from.
#[derive(Clone, Debug)]
pub enum DriveSource {
    /// Stick a literal for the cycle.
    Const(LogicVector),
    /// Follow another signal for the cycle.
    Wire(VecSignal),
}

/// One signal bound for one cycle.
#[derive(Clone, Debug)]
pub struct SignalDrive {
    target: VecSignal,
    source: DriveSource,
}

impl SignalDrive {
    pub fn stick(target: VecSignal, value: LogicVector) -> SignalDrive {
        SignalDrive {
            target,
            source: DriveSource::Const(value),
        }
    }

    pub fn wire(target: VecSignal, source: VecSignal) -> SignalDrive {
        SignalDrive {
            target,
            source: DriveSource::Wire(source),
        }
    }

    pub fn target(&self) -> &VecSignal {
        &self.target
    }

    pub fn source(&self) -> &DriveSource {
        &self.source
    }
}

/// One cycle's worth of signal drives on a single transaction site.
#[derive(Clone, Debug)]
pub struct TAVerb {
    mode: VerbMode,
    drives: Vec<SignalDrive>,
}

impl TAVerb {
    pub fn locked(drives: Vec<SignalDrive>) -> TAVerb {
        TAVerb {
            mode: VerbMode::Locked,
            drives,
        }
    }

    pub fn shared(drives: Vec<SignalDrive>) -> TAVerb {
        TAVerb {
            mode: VerbMode::Shared,
            drives,
        }
    }

    pub fn mode(&self) -> VerbMode {
        self.mode
    }

    pub fn drives(&self) -> &[SignalDrive] {
        &self.drives
    }

    /// Perform every drive for the coming cycle. Drives land on the
    /// targets' `next` values and become observable at the next latch.
    pub fn apply(&self) {
        for d in &self.drives {
            let value = match &d.source {
                DriveSource::Const(v) => v.clone(),
                DriveSource::Wire(s) => s.borrow().cur().clone(),
            };
            d.target.borrow_mut().drive(value);
        }
    }
}

/// Per-functional-unit verb factory.
///
/// `establish` is the point where the unit's ports come into existence: the
/// site walks its host's port list and asks the binder for each signal.
/// Component-specific verbs (`branch`, `select`, ...) live on the concrete
/// site types; every site can at least idle its unit for a cycle.
pub trait TransactionSite {
    /// Identity of the hosted functional unit.
    fn host_name(&self) -> String;

    /// Allocate and bind the host's ports.
    fn establish(&self, binder: &mut dyn AutoBinder) -> Result<(), ModelError>;

    /// A verb that parks the unit for one cycle.
    fn do_nothing(&self) -> Result<TAVerb, ModelError>;

    /// Concrete-type escape hatch for mappers that must recognize their
    /// own site kind.
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::vec_signal;

    #[test]
    fn apply_sticks_constants() {
        let t = vec_signal("t", LogicVector::zeros(2));
        let verb = TAVerb::locked(vec![SignalDrive::stick(t.clone(), LogicVector::ones(2))]);
        assert_eq!(verb.mode(), VerbMode::Locked);
        verb.apply();
        // Not observable before the latch.
        assert_eq!(*t.borrow().cur(), LogicVector::zeros(2));
        t.borrow_mut().latch();
        assert_eq!(*t.borrow().cur(), LogicVector::ones(2));
    }

    #[test]
    fn apply_samples_wire_sources() {
        let src = vec_signal("src", LogicVector::ones(3));
        let dst = vec_signal("dst", LogicVector::zeros(3));
        TAVerb::shared(vec![SignalDrive::wire(dst.clone(), src)]).apply();
        dst.borrow_mut().latch();
        assert_eq!(*dst.borrow().cur(), LogicVector::ones(3));
    }
}
