//! Response side of the protocol: parsing and classification.

mod outcome;
pub mod parser;

pub use outcome::{CONFIG_APPLIED, FailureKind, Outcome, UNKNOWN_ERROR, classify};
pub use parser::{ParsePolicy, ParsedResponse, parse, parse_with};
