use cloud_importer::cli::commands::{CliArgs, Commands};
use cloud_importer::cli::handlers::{
    handle_config, handle_ephemeral_bundle, handle_ephemeral_raw, handle_regions, handle_register,
};
use cloud_importer::util::logging::{self, LoggingConfig};
use cloud_importer::{ImporterConfig, VERSION};

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    logging::init_logging(logging_config_from_args(&args));

    debug!("cloud-importer v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::EphemeralRaw(raw_args) => handle_ephemeral_raw(raw_args).await,
        Commands::EphemeralBundle(bundle_args) => handle_ephemeral_bundle(bundle_args).await,
        Commands::Register(register_args) => handle_register(register_args).await,
        Commands::Regions(regions_args) => handle_regions(regions_args).await,
        Commands::Config(config_args) => handle_config(config_args).await,
    };

    std::process::exit(exit_code);
}

fn logging_config_from_args(args: &CliArgs) -> LoggingConfig {
    let mut config = LoggingConfig::from_config(&ImporterConfig::default());
    if let Some(level_str) = &args.log_level {
        config.level = logging::parse_level(level_str);
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }
    config
}
