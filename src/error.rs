/*!
Error taxonomy shared across the hardware model.

Three of the variants are programming errors: they indicate a caller violated
a documented precondition, and they propagate to the caller immediately. The
core never catches them. "This mapper does not handle that instruction" is
NOT an error: mappers decline by returning an empty mapping list (or `None`
from an allocation attempt), and callers move on to the next mapper.

`Unsettled` is the delta-cycle kernel's guard against combinational loops;
see `kernel::Kernel::tick`.
*/

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// A numeric argument fell outside its declared domain (an element ID
    /// beyond the population, a latency below one, a value too wide for its
    /// vector).
    #[error("{what} out of range: got {value}, limit {limit}")]
    OutOfRange {
        what: &'static str,
        value: u128,
        limit: u128,
    },

    /// A width or lifecycle precondition was violated during component
    /// set-up. Fatal to simulation start-up.
    #[error("invalid configuration for {component}: {reason}")]
    InvalidConfiguration { component: String, reason: String },

    /// An instruction matched a mapper's coarse opcode family but none of
    /// its specific arms. Indicates a bug in the mapper itself.
    #[error("{mapper} has no arm for instruction {opcode}")]
    NotImplemented { mapper: &'static str, opcode: String },

    /// A character that is not a logic literal was fed to a vector parser.
    #[error("invalid logic literal {literal:?}")]
    BadLiteral { literal: String },

    /// The kernel ran out of delta cycles before signal values stabilized,
    /// which means the design contains a combinational loop.
    #[error("signals failed to settle after {deltas} delta cycles")]
    Unsettled { deltas: u32 },
}
