pub mod args;
pub mod commands;
pub mod credentials;

pub use args::Cli;
pub use commands::run;
pub use credentials::ServiceAccount;
