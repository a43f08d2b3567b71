/*!
Functional units: the concrete hardware resources the mapping layer
instantiates to realize instructions.

```text
bcu.rs  - Branch Control Unit (program-counter sequencing, reset
          masking) and its transaction site.
mux2.rs - combinational 2-to-1 multiplexer and its transaction site.
```

Cycle-level scenario tests for both units live in `tests.rs`.
*/

mod bcu;
mod mux2;

pub use bcu::{Bcu, BcuConfig, BcuTransactionSite};
pub use mux2::{Mux2, Mux2TransactionSite};
