//! Shared test benches for the functional-unit and mapping suites.
//!
//! These helpers de-duplicate the kernel/binder/establish boilerplate across
//! the BCU, MUX2, and mapper tests. A bench owns the kernel plus one unit,
//! exposes the unit's ports as plain drive/sample calls, and advances whole
//! clock cycles. They intentionally support just what the test suite needs.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use crate::binder::KernelBinder;
use crate::fu::{Bcu, BcuConfig, BcuTransactionSite, Mux2, Mux2TransactionSite};
use crate::kernel::Kernel;
use crate::logic::{Logic, LogicVector};
use crate::transact::{TAVerb, TransactionSite};

/// Kernel + BCU + transaction site, established and attached.
pub struct BcuBench {
    pub kernel: Kernel,
    pub bcu: Rc<RefCell<Bcu>>,
    pub site: Rc<BcuTransactionSite>,
}

impl BcuBench {
    pub fn new(addr_width: usize, startup: u128, latency: usize) -> BcuBench {
        let startup_addr = LogicVector::from_uint(startup, addr_width).expect("startup fits");
        let bcu = Rc::new(RefCell::new(
            Bcu::new(
                "bcu0",
                BcuConfig {
                    addr_width,
                    startup_addr,
                    latency,
                },
            )
            .expect("valid latency"),
        ));
        let site = Rc::new(BcuTransactionSite::new(bcu.clone()));
        let mut kernel = Kernel::new();
        {
            let mut binder = KernelBinder::new(&mut kernel);
            site.establish(&mut binder).expect("establish");
        }
        kernel.attach(bcu.clone());
        BcuBench { kernel, bcu, site }
    }

    pub fn set_reset(&self, on: bool) {
        self.kernel
            .set_reset(if on { Logic::One } else { Logic::Zero });
    }

    /// Drive the branch flags from literal characters (`'1'`, `'0'`, `'-'`).
    pub fn drive_flags(&self, brp: char, brn: char) {
        let bcu = self.bcu.borrow();
        let p = Logic::from_char(brp).expect("logic literal");
        let n = Logic::from_char(brn).expect("logic literal");
        bcu.brp()
            .expect("established")
            .borrow_mut()
            .drive(LogicVector::from_bits(vec![p]));
        bcu.brn()
            .expect("established")
            .borrow_mut()
            .drive(LogicVector::from_bits(vec![n]));
    }

    pub fn drive_alt(&self, value: u128) {
        let bcu = self.bcu.borrow();
        let w = bcu.addr_width();
        bcu.alt_addr()
            .expect("established")
            .borrow_mut()
            .drive(LogicVector::from_uint(value, w).expect("alt fits"));
    }

    /// The NOP encoding on the branch flags.
    pub fn drive_nop(&self) {
        self.drive_flags('0', '1');
    }

    /// Advance one clock cycle and sample the output address.
    pub fn tick(&mut self) -> LogicVector {
        self.kernel.tick().expect("settles");
        self.out()
    }

    /// Advance one clock cycle and sample the output numerically.
    pub fn tick_uint(&mut self) -> u128 {
        self.tick().to_uint().expect("numeric address")
    }

    /// Apply one verb's drives, then advance a cycle.
    pub fn apply_and_tick(&mut self, verb: &TAVerb) -> LogicVector {
        verb.apply();
        self.tick()
    }

    pub fn out(&self) -> LogicVector {
        self.bcu
            .borrow()
            .out_addr()
            .expect("established")
            .borrow()
            .cur()
            .clone()
    }

    pub fn out_uint(&self) -> u128 {
        self.out().to_uint().expect("numeric address")
    }
}

/// Kernel + MUX2 + transaction site, established and attached.
pub struct MuxBench {
    pub kernel: Kernel,
    pub mux: Rc<RefCell<Mux2>>,
    pub site: Rc<Mux2TransactionSite>,
}

impl MuxBench {
    pub fn new(width: usize) -> MuxBench {
        let mux = Rc::new(RefCell::new(Mux2::new("mux0", width)));
        let site = Rc::new(Mux2TransactionSite::new(mux.clone()));
        let mut kernel = Kernel::new();
        {
            let mut binder = KernelBinder::new(&mut kernel);
            site.establish(&mut binder).expect("establish");
        }
        kernel.attach(mux.clone());
        MuxBench { kernel, mux, site }
    }

    pub fn drive(&self, a: u128, b: u128, sel: char) {
        let mux = self.mux.borrow();
        let w = mux.width();
        mux.a()
            .expect("established")
            .borrow_mut()
            .drive(LogicVector::from_uint(a, w).expect("a fits"));
        mux.b()
            .expect("established")
            .borrow_mut()
            .drive(LogicVector::from_uint(b, w).expect("b fits"));
        let s = Logic::from_char(sel).expect("logic literal");
        mux.sel()
            .expect("established")
            .borrow_mut()
            .drive(LogicVector::from_bits(vec![s]));
    }

    pub fn tick(&mut self) -> u128 {
        self.kernel.tick().expect("settles");
        self.r()
    }

    pub fn r(&self) -> u128 {
        self.mux
            .borrow()
            .r()
            .expect("established")
            .borrow()
            .cur()
            .to_uint()
            .expect("numeric result")
    }
}
