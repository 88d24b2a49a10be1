//! Resource declarations
//!
//! Every resource kind has a typed argument struct, generic over the value
//! type: `Args<Input>` is what programs declare, `Args<String>` is what the
//! provider receives once the engine has resolved every input.

use super::input::{Input, ResolvedOutputs};
use super::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical name of a declared resource, unique within a stack
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    ResourceGroup,
    StorageAccount,
    BlobContainer,
    AccountSas,
    Gallery,
    GalleryImage,
    GalleryImageVersion,
    Command,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::ResourceGroup => "ResourceGroup",
            ResourceKind::StorageAccount => "StorageAccount",
            ResourceKind::BlobContainer => "BlobContainer",
            ResourceKind::AccountSas => "AccountSas",
            ResourceKind::Gallery => "Gallery",
            ResourceKind::GalleryImage => "GalleryImage",
            ResourceKind::GalleryImageVersion => "GalleryImageVersion",
            ResourceKind::Command => "Command",
        };
        f.write_str(name)
    }
}

impl ResourceKind {
    /// Output properties that carry credentials and never leave the engine
    pub fn secret_outputs(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::AccountSas => &["accountSasToken"],
            _ => &[],
        }
    }
}

/// Per-resource engine options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceOptions {
    pub depends_on: Vec<ResourceId>,
    /// Keep the resource when the stack is torn down
    pub retain_on_delete: bool,
}

impl ResourceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depends_on<'a>(mut self, resources: impl IntoIterator<Item = &'a ResourceId>) -> Self {
        for id in resources {
            if !self.depends_on.contains(id) {
                self.depends_on.push(id.clone());
            }
        }
        self
    }

    pub fn retain_on_delete(mut self, retain: bool) -> Self {
        self.retain_on_delete = retain;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessTier {
    Hot,
    Cool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageKind {
    StorageV2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageSku {
    #[serde(rename = "Premium_LRS")]
    PremiumLrs,
    #[serde(rename = "Standard_LRS")]
    StandardLrs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Architecture {
    #[serde(rename = "x64")]
    X64,
    #[serde(rename = "Arm64")]
    Arm64,
}

impl Architecture {
    /// `x86_64` maps to x64, every other value maps to Arm64
    pub fn from_arch(arch: &str) -> Self {
        if arch == "x86_64" {
            Architecture::X64
        } else {
            Architecture::Arm64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HyperVGeneration {
    V1,
    V2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OsType {
    Linux,
    Windows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OsState {
    Generalized,
    Specialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicationMode {
    Full,
    Shallow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SharingPermission {
    Private,
    Groups,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRegion {
    pub name: String,
    pub regional_replica_count: u32,
    pub exclude_from_latest: bool,
}

impl TargetRegion {
    /// One replica, included in `latest`
    pub fn single_replica(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            regional_replica_count: 1,
            exclude_from_latest: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageIdentifier {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGroupArgs<S = Input> {
    pub name: S,
    pub location: S,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAccountArgs<S = Input> {
    pub name: S,
    pub resource_group_name: S,
    pub location: S,
    pub access_tier: AccessTier,
    pub kind: StorageKind,
    pub sku: StorageSku,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobContainerArgs<S = Input> {
    pub name: S,
    pub account_name: S,
    pub resource_group_name: S,
}

/// Account SAS listing; an invoke rather than a managed resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSasArgs<S = Input> {
    pub account_name: S,
    pub resource_group_name: S,
    pub permissions: String,
    pub services: String,
    pub resource_types: String,
    pub protocol: String,
    pub expiry: S,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryArgs<S = Input> {
    pub name: S,
    pub description: S,
    pub resource_group_name: S,
    pub location: S,
    pub sharing: Option<SharingPermission>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryImageArgs<S = Input> {
    pub name: S,
    pub description: S,
    pub gallery_name: S,
    pub resource_group_name: S,
    pub location: S,
    pub architecture: Architecture,
    pub hyper_v_generation: HyperVGeneration,
    pub os_type: OsType,
    pub os_state: OsState,
    pub identifier: ImageIdentifier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryImageVersionArgs<S = Input> {
    pub name: S,
    pub gallery_name: S,
    pub image_name: S,
    pub resource_group_name: S,
    pub location: S,
    pub storage_account_type: StorageSku,
    pub replication_mode: ReplicationMode,
    pub target_regions: Vec<TargetRegion>,
    pub source_storage_account_id: S,
    pub source_uri: S,
}

/// Local command run on creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArgs<S = Input> {
    pub create: S,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceArgs<S = Input> {
    ResourceGroup(ResourceGroupArgs<S>),
    StorageAccount(StorageAccountArgs<S>),
    BlobContainer(BlobContainerArgs<S>),
    AccountSas(AccountSasArgs<S>),
    Gallery(GalleryArgs<S>),
    GalleryImage(GalleryImageArgs<S>),
    GalleryImageVersion(GalleryImageVersionArgs<S>),
    Command(CommandArgs<S>),
}

impl<S> ResourceArgs<S> {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceArgs::ResourceGroup(_) => ResourceKind::ResourceGroup,
            ResourceArgs::StorageAccount(_) => ResourceKind::StorageAccount,
            ResourceArgs::BlobContainer(_) => ResourceKind::BlobContainer,
            ResourceArgs::AccountSas(_) => ResourceKind::AccountSas,
            ResourceArgs::Gallery(_) => ResourceKind::Gallery,
            ResourceArgs::GalleryImage(_) => ResourceKind::GalleryImage,
            ResourceArgs::GalleryImageVersion(_) => ResourceKind::GalleryImageVersion,
            ResourceArgs::Command(_) => ResourceKind::Command,
        }
    }

    /// Rebuilds the arguments with every value passed through `f`
    pub fn try_map<T, E>(&self, f: &mut impl FnMut(&S) -> Result<T, E>) -> Result<ResourceArgs<T>, E> {
        Ok(match self {
            ResourceArgs::ResourceGroup(a) => ResourceArgs::ResourceGroup(ResourceGroupArgs {
                name: f(&a.name)?,
                location: f(&a.location)?,
            }),
            ResourceArgs::StorageAccount(a) => ResourceArgs::StorageAccount(StorageAccountArgs {
                name: f(&a.name)?,
                resource_group_name: f(&a.resource_group_name)?,
                location: f(&a.location)?,
                access_tier: a.access_tier,
                kind: a.kind,
                sku: a.sku,
            }),
            ResourceArgs::BlobContainer(a) => ResourceArgs::BlobContainer(BlobContainerArgs {
                name: f(&a.name)?,
                account_name: f(&a.account_name)?,
                resource_group_name: f(&a.resource_group_name)?,
            }),
            ResourceArgs::AccountSas(a) => ResourceArgs::AccountSas(AccountSasArgs {
                account_name: f(&a.account_name)?,
                resource_group_name: f(&a.resource_group_name)?,
                permissions: a.permissions.clone(),
                services: a.services.clone(),
                resource_types: a.resource_types.clone(),
                protocol: a.protocol.clone(),
                expiry: f(&a.expiry)?,
            }),
            ResourceArgs::Gallery(a) => ResourceArgs::Gallery(GalleryArgs {
                name: f(&a.name)?,
                description: f(&a.description)?,
                resource_group_name: f(&a.resource_group_name)?,
                location: f(&a.location)?,
                sharing: a.sharing,
            }),
            ResourceArgs::GalleryImage(a) => ResourceArgs::GalleryImage(GalleryImageArgs {
                name: f(&a.name)?,
                description: f(&a.description)?,
                gallery_name: f(&a.gallery_name)?,
                resource_group_name: f(&a.resource_group_name)?,
                location: f(&a.location)?,
                architecture: a.architecture,
                hyper_v_generation: a.hyper_v_generation,
                os_type: a.os_type,
                os_state: a.os_state,
                identifier: a.identifier.clone(),
            }),
            ResourceArgs::GalleryImageVersion(a) => {
                ResourceArgs::GalleryImageVersion(GalleryImageVersionArgs {
                    name: f(&a.name)?,
                    gallery_name: f(&a.gallery_name)?,
                    image_name: f(&a.image_name)?,
                    resource_group_name: f(&a.resource_group_name)?,
                    location: f(&a.location)?,
                    storage_account_type: a.storage_account_type,
                    replication_mode: a.replication_mode,
                    target_regions: a.target_regions.clone(),
                    source_storage_account_id: f(&a.source_storage_account_id)?,
                    source_uri: f(&a.source_uri)?,
                })
            }
            ResourceArgs::Command(a) => ResourceArgs::Command(CommandArgs {
                create: f(&a.create)?,
            }),
        })
    }
}

impl ResourceArgs<Input> {
    /// Resources read by any input of these arguments
    pub fn references(&self) -> Vec<ResourceId> {
        let mut refs: Vec<ResourceId> = Vec::new();
        let _ = self.try_map(&mut |input: &Input| -> Result<(), ()> {
            for id in input.references() {
                if !refs.contains(&id) {
                    refs.push(id);
                }
            }
            Ok(())
        });
        refs
    }

    pub fn resolve(&self, outputs: &ResolvedOutputs) -> Result<ResourceArgs<String>, EngineError> {
        self.try_map(&mut |input: &Input| input.resolve(outputs))
    }
}

/// A resource as declared in a stack
#[derive(Debug, Clone)]
pub struct ResourceDeclaration {
    pub id: ResourceId,
    pub args: ResourceArgs<Input>,
    pub options: ResourceOptions,
}

impl ResourceDeclaration {
    pub fn kind(&self) -> ResourceKind {
        self.args.kind()
    }

    /// Explicit `depends_on` edges plus the resources referenced by inputs
    pub fn dependencies(&self) -> Vec<ResourceId> {
        let mut deps = self.options.depends_on.clone();
        for id in self.args.references() {
            if !deps.contains(&id) {
                deps.push(id);
            }
        }
        deps
    }
}

/// Handle to a declared resource for wiring its outputs into other inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    id: ResourceId,
    kind: ResourceKind,
}

impl ResourceRef {
    pub(crate) fn new(id: ResourceId, kind: ResourceKind) -> Self {
        Self { id, kind }
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn output(&self, property: &str) -> Input {
        Input::output(self.id.clone(), property)
    }

    /// Provider-assigned name
    pub fn name(&self) -> Input {
        self.output("name")
    }

    /// Fully-qualified ARM resource id
    pub fn arm_id(&self) -> Input {
        self.output("id")
    }

    pub fn location(&self) -> Input {
        self.output("location")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        x86_64 = { "x86_64", Architecture::X64 },
        aarch64 = { "aarch64", Architecture::Arm64 },
        arm64 = { "arm64", Architecture::Arm64 },
        amd64 = { "amd64", Architecture::Arm64 },
        upper_case = { "X86_64", Architecture::Arm64 },
        empty = { "", Architecture::Arm64 },
    )]
    fn test_architecture_mapping(arch: &str, expected: Architecture) {
        assert_eq!(Architecture::from_arch(arch), expected);
    }

    #[test]
    fn test_arm_enum_names() {
        assert_eq!(serde_json::to_value(StorageSku::PremiumLrs).unwrap(), "Premium_LRS");
        assert_eq!(serde_json::to_value(Architecture::X64).unwrap(), "x64");
        assert_eq!(serde_json::to_value(Architecture::Arm64).unwrap(), "Arm64");
        assert_eq!(serde_json::to_value(SharingPermission::Groups).unwrap(), "Groups");
    }

    #[test]
    fn test_target_region_serializes_camel_case() {
        let region = TargetRegion::single_replica("westeurope");
        let value = serde_json::to_value(&region).unwrap();
        assert_eq!(value["name"], "westeurope");
        assert_eq!(value["regionalReplicaCount"], 1);
        assert_eq!(value["excludeFromLatest"], false);
    }

    #[test]
    fn test_dependencies_merge_explicit_and_implicit() {
        let rg = ResourceRef::new(ResourceId::new("rg"), ResourceKind::ResourceGroup);
        let sa = ResourceRef::new(ResourceId::new("sa"), ResourceKind::StorageAccount);
        let declaration = ResourceDeclaration {
            id: ResourceId::new("container"),
            args: ResourceArgs::BlobContainer(BlobContainerArgs {
                name: Input::known("blobbox-1"),
                account_name: sa.name(),
                resource_group_name: rg.name(),
            }),
            options: ResourceOptions::new().depends_on([rg.id(), sa.id()]),
        };

        assert_eq!(
            declaration.dependencies(),
            vec![ResourceId::new("rg"), ResourceId::new("sa")]
        );
    }

    #[test]
    fn test_options_builder() {
        let rg = ResourceId::new("rg");
        let options = ResourceOptions::new()
            .depends_on([&rg, &rg])
            .retain_on_delete(true);
        assert_eq!(options.depends_on, vec![rg]);
        assert!(options.retain_on_delete);
    }
}
