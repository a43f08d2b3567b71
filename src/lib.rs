#![doc = r#"
Silica library crate.

Hardware intermediate representation and mapping layer for a high-level
synthesis flow: the part that sits between a behavioral description and
device-specific netlist emission.

Modules:
- logic: four-valued logic scalars and fixed-width logic vectors
- unsigned: width-annotated unsigned integers with explicit resize
- signal: current/next signal cells with rising-edge detection
- kernel: delta-cycle simulation kernel and the Component trait
- binder: port allocation through an AutoBinder
- transact: per-cycle transaction verbs and transaction sites
- dsets: union-find over dense integer IDs (resource equivalence classes)
- fu: functional units (the Branch Control Unit and the 2-to-1 mux)
- xil: the abstract instruction set and the instruction-to-unit mappers
- error: the shared error taxonomy

In tests, shared bench builders are available under `crate::test_utils`.
"#]

pub mod binder;
pub mod dsets;
pub mod error;
pub mod fu;
pub mod kernel;
pub mod logic;
pub mod signal;
pub mod transact;
pub mod unsigned;
pub mod xil;

// Re-export commonly used types at the crate root for convenience.
pub use dsets::DisjointSets;
pub use error::ModelError;
pub use fu::{Bcu, BcuConfig, BcuTransactionSite, Mux2, Mux2TransactionSite};
pub use kernel::{Component, DesignContext, Kernel};
pub use logic::{Logic, LogicVector};
pub use transact::{TAVerb, TransactionSite, VerbMode};
pub use unsigned::Unsigned;
pub use xil::{
    BcuMapper, BranchLabel, DefaultInstructionSet, Mux2Mapper, Project, ResourceKind,
    TypeDescriptor, TypeLowering, XilInstr, XilMapper, XilMapping, XilOpcode,
};

// Shared test utilities (only compiled for tests)
#[cfg(test)]
pub mod test_utils;
