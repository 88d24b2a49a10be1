use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Publish disk images as Azure compute gallery images
#[derive(Parser, Debug)]
#[command(
    name = "cloud-importer",
    about = "Publish disk images as Azure compute gallery images",
    version,
    long_about = "cloud-importer stages a VHD in Azure blob storage (from a local image or an \
                  OpenShift Local bundle) and registers it as a replicated, optionally shared, \
                  gallery image version. Staging and registration are separate runs connected \
                  by an outputs file."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Stage a local VHD in blob storage",
        long_about = "Uploads a local VHD into a new storage account and exports the output \
                      contract needed by `register`.\n\n\
                      Examples:\n  \
                      cloud-importer ephemeral-raw --vhd-path disk.vhd --image-name rhelai-1.2\n  \
                      cloud-importer ephemeral-raw --vhd-path disk.vhd --image-name rhelai-1.2 --arch aarch64 --outputs out.json"
    )]
    EphemeralRaw(EphemeralRawArgs),

    #[command(
        about = "Extract an OpenShift Local bundle and stage its VHD",
        long_about = "Extracts the VHD from a bundle, uploads it into a new storage account and \
                      exports the output contract needed by `register`.\n\n\
                      Examples:\n  \
                      cloud-importer ephemeral-bundle --bundle-uri https://.../crc_libvirt_4.15.0_amd64.crcbundle \\\n    \
                      --shasum-uri https://.../sha256sum.txt --arch x86_64 --outputs out.json"
    )]
    EphemeralBundle(EphemeralBundleArgs),

    #[command(
        about = "Register a staged VHD as a gallery image version",
        long_about = "Reads the outputs of an ephemeral run and publishes the image into a new \
                      compute gallery.\n\n\
                      Examples:\n  \
                      cloud-importer register --outputs out.json\n  \
                      cloud-importer register --outputs out.json --replicate --org-tenant-id <TENANT>"
    )]
    Register(RegisterArgs),

    #[command(about = "List the replication targets of the subscription")]
    Regions(RegionsArgs),

    #[command(about = "Show the effective configuration")]
    Config(ConfigArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct EphemeralRawArgs {
    #[arg(long, value_name = "FILE", help = "Path of the VHD to upload")]
    pub vhd_path: PathBuf,

    #[arg(long, value_name = "NAME", help = "Name of the image")]
    pub image_name: String,

    #[arg(long, default_value = "x86_64", help = "Image architecture")]
    pub arch: String,

    #[arg(long, value_name = "FILE", help = "Write the exported outputs to this file")]
    pub outputs: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct EphemeralBundleArgs {
    #[arg(long, value_name = "URI", help = "Location of the bundle")]
    pub bundle_uri: String,

    #[arg(long, value_name = "URI", help = "Location of the bundle checksum file")]
    pub shasum_uri: String,

    #[arg(long, help = "Image architecture")]
    pub arch: String,

    #[arg(long, value_name = "FILE", help = "Write the exported outputs to this file")]
    pub outputs: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct RegisterArgs {
    #[arg(long, value_name = "FILE", help = "Outputs file written by an ephemeral run")]
    pub outputs: PathBuf,

    #[arg(long, help = "Replicate the image version to every region")]
    pub replicate: bool,

    #[arg(long, value_name = "TENANT", help = "Share the gallery with this Azure AD tenant")]
    pub org_tenant_id: Option<String>,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct RegionsArgs {
    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
