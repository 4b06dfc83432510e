#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod rules;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
#[cfg(feature = "lambda")]
pub use lambda::LambdaConfig;
pub use rules::{load_masking_rules, load_schema};
