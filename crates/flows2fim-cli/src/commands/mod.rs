//! One module per subcommand.

pub mod controls;
pub mod domain;
pub mod fim;
pub mod validate;
