//! Library side of the `isaric-omop` command.

pub mod logging;
pub mod pipeline;
pub mod summary;
