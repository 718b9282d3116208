//! Domain layer: value types and business rules.

mod call_result;
mod felt;
mod ids;
mod literal;
mod short_string;

pub use call_result::{CallResult, Mismatch, render_literals};
pub use felt::{Felt, FeltParseError};
pub use ids::{ArtifactPath, ContractAddress, RuntimeId};
pub use literal::{Literal, LiteralError};
pub use short_string::{
    MAX_SHORT_STRING_LEN, ShortStringError, decode_short_string, encode_short_string,
};
