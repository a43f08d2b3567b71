/*!
Delta-cycle kernel: clock/reset ownership and the per-cycle order of
operations.

Purpose
- Centralize the sequencing of a single clock cycle:
  * raise `clk` and latch, so clocked processes observe a rising edge
  * evaluate attached components to a fixed point, latching between deltas
  * lower `clk` and settle again
- Own the registry of every signal allocated through the kernel, so one
  latch pass commits the whole design.

Model
- A single logical thread advances time in discrete deltas. Component
  processes are non-suspending: each `eval` runs to completion against the
  pre-delta signal state, and its drives become observable at the next
  latch. Clocked processes guard on `clk.rising_edge()` themselves; purely
  combinational components just recompute on every delta.
- A fixed delta allowance bounds the settle loop. Exceeding it means the
  design contains a combinational loop, and the tick aborts with
  `ModelError::Unsettled`; no partial cycle is reported as success.
*/

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::error::ModelError;
use crate::logic::{Logic, LogicVector};
use crate::signal::{AnyCell, BitSignal, VecSignal, bit_signal, vec_signal};

/// Deltas allowed per settle phase before the kernel declares a loop.
const MAX_DELTAS: u32 = 64;

/// A hardware component the kernel can evaluate.
///
/// Attachment to a kernel completes the `initialize` phase of the component
/// lifecycle: after it, configuration is immutable and only the kernel
/// drives the component's signals.
pub trait Component {
    /// Identity used in diagnostics and analysis reports.
    fn name(&self) -> &str;

    /// Run the component's processes once against current signal values.
    fn eval(&mut self);

    /// Visit hook for the design-wide analysis pass.
    fn accept_analysis(&mut self, ctx: &mut DesignContext) {
        let name = self.name().to_string();
        ctx.record(name);
    }
}

/// Context threaded through the explicit analysis pass. Components report
/// themselves here; aggregate containers would also register children.
#[derive(Default)]
pub struct DesignContext {
    analyzed: Vec<String>,
}

impl DesignContext {
    pub fn new() -> DesignContext {
        DesignContext::default()
    }

    pub fn record(&mut self, name: impl Into<String>) {
        self.analyzed.push(name.into());
    }

    /// Component names seen during the pass, in visit order.
    pub fn analyzed(&self) -> &[String] {
        &self.analyzed
    }
}

pub struct Kernel {
    clk: BitSignal,
    rst: BitSignal,
    cells: Vec<Rc<dyn AnyCell>>,
    components: Vec<Rc<RefCell<dyn Component>>>,
    cycle: u64,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel {
    pub fn new() -> Kernel {
        let clk = bit_signal("clk", Logic::Zero);
        let rst = bit_signal("rst", Logic::Zero);
        let cells: Vec<Rc<dyn AnyCell>> = vec![clk.clone(), rst.clone()];
        Kernel {
            clk,
            rst,
            cells,
            components: Vec::new(),
            cycle: 0,
        }
    }

    /// The design-wide clock cell.
    pub fn clk(&self) -> BitSignal {
        self.clk.clone()
    }

    /// The design-wide synchronous reset cell. The testbench is its writer.
    pub fn rst(&self) -> BitSignal {
        self.rst.clone()
    }

    /// Allocate a scalar cell that participates in kernel latching.
    pub fn register_bit(&mut self, name: impl Into<String>, init: Logic) -> BitSignal {
        let cell = bit_signal(name, init);
        self.cells.push(cell.clone());
        cell
    }

    /// Allocate a vector cell that participates in kernel latching.
    pub fn register_vec(&mut self, name: impl Into<String>, init: LogicVector) -> VecSignal {
        let cell = vec_signal(name, init);
        self.cells.push(cell.clone());
        cell
    }

    /// Attach a component, completing its `initialize` lifecycle step.
    pub fn attach(&mut self, component: Rc<RefCell<dyn Component>>) {
        self.components.push(component);
    }

    /// Drive the reset line for the coming cycles.
    pub fn set_reset(&self, level: Logic) {
        self.rst.borrow_mut().drive(level);
    }

    /// Completed clock cycles.
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Run the explicit analysis pass over every attached component.
    pub fn run_analysis(&self, ctx: &mut DesignContext) {
        for c in &self.components {
            c.borrow_mut().accept_analysis(ctx);
        }
    }

    /// Advance one full clock cycle (rising edge, settle, falling edge).
    pub fn tick(&mut self) -> Result<(), ModelError> {
        let rise = self.half_cycle(Logic::One)?;
        let fall = self.half_cycle(Logic::Zero)?;
        self.cycle += 1;
        trace!(cycle = self.cycle, rise_deltas = rise, fall_deltas = fall, "tick");
        Ok(())
    }

    /// Drive the clock to `level`, latch pending input drives together with
    /// the edge, then settle to a fixed point. Returns the delta count.
    fn half_cycle(&mut self, level: Logic) -> Result<u32, ModelError> {
        self.clk.borrow_mut().drive(level);
        self.latch_all();
        self.settle()
    }

    fn latch_all(&mut self) -> bool {
        for cell in &self.cells {
            cell.latch_cell();
        }
        self.cells.iter().any(|c| c.cell_changed())
    }

    fn settle(&mut self) -> Result<u32, ModelError> {
        for delta in 0..MAX_DELTAS {
            for c in &self.components {
                c.borrow_mut().eval();
            }
            if !self.latch_all() {
                return Ok(delta);
            }
        }
        Err(ModelError::Unsettled { deltas: MAX_DELTAS })
    }
}
