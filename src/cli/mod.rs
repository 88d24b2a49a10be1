pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{
    CliArgs, Commands, ConfigArgs, EphemeralBundleArgs, EphemeralRawArgs, OutputFormatArg,
    RegionsArgs, RegisterArgs,
};
pub use output::{OutputFormat, OutputFormatter};
