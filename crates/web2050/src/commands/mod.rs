//! CLI command implementations.

pub(crate) mod reset;
pub(crate) mod serve;

pub(crate) use reset::ResetArgs;
pub(crate) use serve::ServeArgs;
