//! Subcommand handlers
//!
//! Each handler returns the process exit code. Failures are logged with
//! their full cause chain and reported as exit code 1. A run that fails
//! after creating resources also prints their state to stdout, in the
//! requested format, for teardown.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::commands::{
    ConfigArgs, EphemeralBundleArgs, EphemeralRawArgs, OutputFormatArg, RegionsArgs, RegisterArgs,
};
use super::output::OutputFormatter;
use crate::azure::{
    ArmClient, ArmGallerySharing, ArmProvider, ArmRegionLookup, CredentialResolver, RegionLookup,
};
use crate::config::ImporterConfig;
use crate::importer::{
    ArtifactSource, BundleSource, EphemeralBuild, FileNameDescriber, GalleryPublisher,
    ImportError, RawImageSource, RegisterRequest,
};
use crate::pipeline::{Engine, Program, ShellCommandRunner, Stack, StackOutputs, UpResult};
use crate::progress::LoggingHandler;

pub async fn handle_ephemeral_raw(args: &EphemeralRawArgs) -> i32 {
    let result: Result<String> = async {
        let config = load_config()?;
        let vhd_path = absolute_vhd_path(&args.vhd_path)?;
        let source = RawImageSource::new(vhd_path.display().to_string(), &args.image_name)
            .with_arch(&args.arch);
        run_ephemeral(&config, "ephemeral-raw", source, args.outputs.as_deref(), args.format).await
    }
    .await;
    report(result)
}

pub async fn handle_ephemeral_bundle(args: &EphemeralBundleArgs) -> i32 {
    let result: Result<String> = async {
        let config = load_config()?;
        let extraction = config.bundle_extraction();
        std::fs::create_dir_all(extraction.output_dir()).with_context(|| {
            format!(
                "Failed to create extraction directory {}",
                extraction.output_dir().display()
            )
        })?;

        let source = BundleSource::new(
            &args.bundle_uri,
            &args.shasum_uri,
            &args.arch,
            Arc::new(FileNameDescriber),
            extraction,
        );
        run_ephemeral(&config, "ephemeral-bundle", source, args.outputs.as_deref(), args.format)
            .await
    }
    .await;
    report(result)
}

pub async fn handle_register(args: &RegisterArgs) -> i32 {
    report(run_register(args).await)
}

pub async fn handle_regions(args: &RegionsArgs) -> i32 {
    let result: Result<String> = async {
        let config = load_config()?;
        let lookup =
            ArmRegionLookup::new(config.arm_settings(), Arc::new(config.credential_resolver()));
        let regions = lookup
            .target_regions()
            .await
            .context("Failed to list subscription locations")?;
        formatter(args.format).format_regions(&regions)
    }
    .await;
    report(result)
}

pub async fn handle_config(args: &ConfigArgs) -> i32 {
    let config = ImporterConfig::default();
    if let Err(e) = config.validate() {
        error!("Configuration is invalid: {}", e);
    }
    report(formatter(args.format).format_config(&config))
}

async fn run_ephemeral<A: ArtifactSource>(
    config: &ImporterConfig,
    stack_name: &str,
    source: A,
    outputs_path: Option<&Path>,
    format: OutputFormatArg,
) -> Result<String> {
    std::fs::create_dir_all(&config.work_dir).with_context(|| {
        format!(
            "Failed to create work directory {}",
            config.work_dir.display()
        )
    })?;

    let engine = arm_engine(config).await?;
    let stack = Stack::new(stack_name, &config.location);
    let result = up(&engine, stack, &EphemeralBuild::new(source), format).await?;

    save_outputs(&result.outputs, outputs_path)?;
    formatter(format).format_up_result(&result)
}

/// Commands run inside the work directory, so the VHD is addressed absolutely
fn absolute_vhd_path(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path)
        .with_context(|| format!("VHD file {} not found", path.display()))
}

async fn run_register(args: &RegisterArgs) -> Result<String> {
    let config = load_config()?;
    let outputs = StackOutputs::load(&args.outputs)?;
    let request =
        RegisterRequest::from_outputs(&outputs, args.replicate, args.org_tenant_id.clone())
            .with_context(|| {
                format!(
                    "Outputs file {} is not a complete ephemeral result",
                    args.outputs.display()
                )
            })?;

    info!(
        image = request.name(),
        arch = request.arch(),
        replicate = request.replicate(),
        shared = request.org_tenant_id().is_some(),
        "Registering image"
    );

    let credentials: Arc<dyn CredentialResolver> = Arc::new(config.credential_resolver());
    let publisher = GalleryPublisher::new(
        request,
        Arc::new(ArmRegionLookup::new(
            config.arm_settings(),
            Arc::clone(&credentials),
        )),
        Arc::new(ArmGallerySharing::new(config.arm_settings(), credentials)),
    );

    let engine = arm_engine(&config).await?;
    let stack = Stack::new("register", &config.location);
    let result = up(&engine, stack, &publisher, args.format).await?;

    formatter(args.format).format_up_result(&result)
}

fn load_config() -> Result<ImporterConfig> {
    let config = ImporterConfig::default();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn arm_engine(config: &ImporterConfig) -> Result<Engine> {
    let credential = config
        .credential_resolver()
        .resolve()
        .await
        .context("Failed to resolve Azure credentials")?;
    let client = ArmClient::new(config.arm_settings(), credential)?;
    let commands = Arc::new(ShellCommandRunner::in_dir(config.work_dir.clone()));

    Ok(Engine::new(Arc::new(ArmProvider::new(client, commands)))
        .with_progress(Arc::new(LoggingHandler)))
}

/// Applies `program`; on failure prints whatever was already created so it
/// can be cleaned up
async fn up<P>(
    engine: &Engine,
    stack: Stack,
    program: &P,
    format: OutputFormatArg,
) -> Result<UpResult>
where
    P: Program<Error = ImportError>,
{
    let name = stack.name().to_string();
    match engine.up(stack, program).await {
        Ok(result) => Ok(result),
        Err(e) => {
            if let ImportError::Engine(engine_error) = &e {
                let applied = engine_error.applied();
                if !applied.is_empty() {
                    warn!(
                        stack = %name,
                        resources = applied.len(),
                        "Run failed after creating resources"
                    );
                    println!("{}", formatter(format).format_applied(&name, applied)?);
                }
            }
            Err(e).with_context(|| format!("Stack {} failed", name))
        }
    }
}

fn save_outputs(outputs: &StackOutputs, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        outputs.save(path)?;
        info!(path = %path.display(), keys = outputs.len(), "Outputs saved");
    }
    Ok(())
}

fn formatter(format: OutputFormatArg) -> OutputFormatter {
    OutputFormatter::new(format.into())
}

fn report(result: Result<String>) -> i32 {
    match result {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            eprintln!();
            eprintln!("Help:");
            eprintln!("  - Set ARM_SUBSCRIPTION_ID and sign in with `az login` or AZURE_ACCESS_TOKEN");
            eprintln!("  - Run `cloud-importer config` to inspect the effective configuration");
            1
        }
    }
}
