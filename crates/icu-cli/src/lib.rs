//! Library components of the `icu-features` command.

pub mod logging;
pub mod pipeline;
