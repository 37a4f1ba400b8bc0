//! Command implementations.

pub mod fields;
pub mod init;
pub mod run;

pub use self::fields::execute_fields;
pub use self::init::execute_init;
pub use self::run::execute_run;
