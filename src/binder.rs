/*!
Port allocation: how a transaction site obtains the signals behind a
functional unit's ports.

Components never construct their own clock or reset; the binder decides
what a named port binds to. The default [`KernelBinder`] allocates fresh
cells through a [`Kernel`] (so they participate in latching) and resolves
`Clock`/`Reset` usages to the kernel's own lines.
*/

use crate::kernel::Kernel;
use crate::logic::{Logic, LogicVector};
use crate::signal::{BitSignal, VecSignal};

/// What a bound port is used for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PortUsage {
    Clock,
    Reset,
    Operand,
    Result,
    State,
}

/// Supplies a signal for each named port of a functional unit.
pub trait AutoBinder {
    fn bind_bit(&mut self, usage: PortUsage, name: &str, init: Logic) -> BitSignal;
    fn bind_vec(&mut self, usage: PortUsage, name: &str, init: LogicVector) -> VecSignal;
}

/// Default binder: fresh kernel-registered cells, with `Clock` and `Reset`
/// resolved to the kernel's shared lines (their `init` argument is ignored;
/// the kernel owns their initial state).
pub struct KernelBinder<'a> {
    kernel: &'a mut Kernel,
}

impl<'a> KernelBinder<'a> {
    pub fn new(kernel: &'a mut Kernel) -> KernelBinder<'a> {
        KernelBinder { kernel }
    }
}

impl AutoBinder for KernelBinder<'_> {
    fn bind_bit(&mut self, usage: PortUsage, name: &str, init: Logic) -> BitSignal {
        match usage {
            PortUsage::Clock => self.kernel.clk(),
            PortUsage::Reset => self.kernel.rst(),
            _ => self.kernel.register_bit(name, init),
        }
    }

    fn bind_vec(&mut self, _usage: PortUsage, name: &str, init: LogicVector) -> VecSignal {
        self.kernel.register_vec(name, init)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn clock_and_reset_bind_to_kernel_lines() {
        let mut kernel = Kernel::new();
        let mut binder = KernelBinder::new(&mut kernel);
        let clk = binder.bind_bit(PortUsage::Clock, "clk", Logic::Zero);
        let rst = binder.bind_bit(PortUsage::Reset, "rst", Logic::Zero);
        assert!(Rc::ptr_eq(&clk, &kernel.clk()));
        assert!(Rc::ptr_eq(&rst, &kernel.rst()));
    }

    #[test]
    fn operands_get_fresh_cells() {
        let mut kernel = Kernel::new();
        let mut binder = KernelBinder::new(&mut kernel);
        let a = binder.bind_vec(PortUsage::Operand, "a", LogicVector::zeros(4));
        let b = binder.bind_vec(PortUsage::Operand, "b", LogicVector::zeros(4));
        assert!(!Rc::ptr_eq(&a, &b));
        assert_eq!(a.borrow().cur().width(), 4);
    }
}
