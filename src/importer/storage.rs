//! Storage for uploaded disk images
//!
//! Declares a resource group, a Premium storage account and a blob
//! container, plus the account SAS used to sign the upload URL. Names carry
//! a random 32-bit suffix; nothing checks for an existing resource first, so
//! two runs collide only if they draw the same suffix.

use crate::pipeline::error::EngineError;
use crate::pipeline::input::Input;
use crate::pipeline::resource::{
    AccessTier, AccountSasArgs, BlobContainerArgs, ResourceArgs, ResourceGroupArgs, ResourceId,
    ResourceOptions, ResourceRef, StorageAccountArgs, StorageKind, StorageSku,
};
use crate::pipeline::stack::Stack;
use chrono::{DateTime, Duration, SecondsFormat, Utc};

pub const STORAGE_ACCOUNT_RESOURCE: &str = "storageAccount";
pub const BLOB_CONTAINER_RESOURCE: &str = "blobContainer";
pub const ACCOUNT_SAS_RESOURCE: &str = "storageAccountSas";

pub const SAS_PERMISSIONS: &str = "rw";
pub const SAS_SERVICES: &str = "b";
pub const SAS_RESOURCE_TYPES: &str = "o";
pub const SAS_PROTOCOL: &str = "https";
pub const SAS_VALIDITY_HOURS: i64 = 2;

/// `https://{account}.blob.core.windows.net/{container}/{blob}?{sas}`
pub const SAS_URL_TEMPLATE: &str = "https://{}.blob.core.windows.net/{}/{}?{}";
/// `https://{account}.blob.core.windows.net/{container}/{blob}`
pub const BLOB_URL_TEMPLATE: &str = "https://{}.blob.core.windows.net/{}/{}";

fn random_suffix() -> String {
    hex::encode(rand::random::<[u8; 4]>())
}

/// `{base}-{8 hex digits}`
pub fn randomize(base: &str) -> String {
    format!("{}-{}", base, random_suffix())
}

/// `{base}{8 hex digits}`, for names that only allow lowercase alphanumerics
pub fn randomize_compact(base: &str) -> String {
    format!("{}{}", base, random_suffix())
}

/// `cloud-importer-blobVhd{8 hex digits}.vhd`
pub fn blob_name() -> String {
    format!("cloud-importer-blobVhd{}.vhd", random_suffix())
}

/// SAS expiry two hours after `now`, RFC 3339 with nanoseconds in UTC
pub fn sas_expiry(now: DateTime<Utc>) -> String {
    (now + Duration::hours(SAS_VALIDITY_HOURS)).to_rfc3339_opts(SecondsFormat::Nanos, true)
}

#[derive(Debug, Clone)]
pub struct StorageResources {
    pub resource_group: ResourceRef,
    pub account: ResourceRef,
    pub container: ResourceRef,
}

impl StorageResources {
    pub fn ids(&self) -> [&ResourceId; 3] {
        [
            self.resource_group.id(),
            self.account.id(),
            self.container.id(),
        ]
    }

    /// Upload URL carrying the SAS token as its query string
    pub fn signed_url(&self, blob: &str, sas: &ResourceRef) -> Input {
        Input::format(
            SAS_URL_TEMPLATE,
            vec![
                self.account.name(),
                self.container.name(),
                Input::known(blob),
                sas.output("accountSasToken"),
            ],
        )
    }

    pub fn blob_uri(&self, blob: &str) -> Input {
        Input::format(
            BLOB_URL_TEMPLATE,
            vec![
                self.account.name(),
                self.container.name(),
                Input::known(blob),
            ],
        )
    }
}

/// Declares group → account → container with explicit ordering
///
/// The resource group is kept when the stack is torn down.
pub fn declare_storage(stack: &mut Stack) -> Result<StorageResources, EngineError> {
    let location = stack.location().to_string();

    let resource_group = stack.declare(
        randomize("resourceGroupSA"),
        ResourceArgs::ResourceGroup(ResourceGroupArgs {
            name: Input::known(randomize("resourceGroup")),
            location: Input::known(location),
        }),
        ResourceOptions::new().retain_on_delete(true),
    )?;

    let account = stack.declare(
        STORAGE_ACCOUNT_RESOURCE,
        ResourceArgs::StorageAccount(StorageAccountArgs {
            name: Input::known(randomize_compact("cloudimportersa")),
            resource_group_name: resource_group.name(),
            location: resource_group.location(),
            access_tier: AccessTier::Hot,
            kind: StorageKind::StorageV2,
            sku: StorageSku::PremiumLrs,
        }),
        ResourceOptions::new().depends_on([resource_group.id()]),
    )?;

    let container = stack.declare(
        BLOB_CONTAINER_RESOURCE,
        ResourceArgs::BlobContainer(BlobContainerArgs {
            name: Input::known(randomize("blobbox")),
            account_name: account.name(),
            resource_group_name: resource_group.name(),
        }),
        ResourceOptions::new().depends_on([resource_group.id(), account.id()]),
    )?;

    Ok(StorageResources {
        resource_group,
        account,
        container,
    })
}

/// Declares a write/read blob-object account SAS over HTTPS
pub fn declare_sas(
    stack: &mut Stack,
    storage: &StorageResources,
    now: DateTime<Utc>,
) -> Result<ResourceRef, EngineError> {
    stack.declare(
        ACCOUNT_SAS_RESOURCE,
        ResourceArgs::AccountSas(AccountSasArgs {
            account_name: storage.account.name(),
            resource_group_name: storage.resource_group.name(),
            permissions: SAS_PERMISSIONS.to_string(),
            services: SAS_SERVICES.to_string(),
            resource_types: SAS_RESOURCE_TYPES.to_string(),
            protocol: SAS_PROTOCOL.to_string(),
            expiry: Input::known(sas_expiry(now)),
        }),
        ResourceOptions::new(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn is_lower_hex(s: &str) -> bool {
        s.len() == 8 && s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    }

    #[test]
    fn test_randomize_appends_hex_suffix() {
        let name = randomize("blobbox");
        let suffix = name.strip_prefix("blobbox-").unwrap();
        assert!(is_lower_hex(suffix), "bad suffix in {}", name);
    }

    #[test]
    fn test_randomize_same_base_differs_only_in_suffix() {
        let first = randomize("resourceGroup");
        let second = randomize("resourceGroup");

        assert_ne!(first, second);
        for name in [&first, &second] {
            let suffix = name.strip_prefix("resourceGroup-").unwrap();
            assert!(is_lower_hex(suffix), "bad suffix in {}", name);
        }
    }

    #[test]
    fn test_randomize_compact_is_valid_account_name() {
        let name = randomize_compact("cloudimportersa");
        assert!(name.len() <= 24);
        assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert!(is_lower_hex(name.strip_prefix("cloudimportersa").unwrap()));
    }

    #[test]
    fn test_blob_name_shape() {
        let name = blob_name();
        let middle = name
            .strip_prefix("cloud-importer-blobVhd")
            .and_then(|rest| rest.strip_suffix(".vhd"))
            .unwrap();
        assert!(is_lower_hex(middle));
    }

    #[test]
    fn test_sas_expiry_is_two_hours_later() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 22, 30, 0).unwrap()
            + Duration::nanoseconds(123_456_789);
        let expiry = sas_expiry(now);

        assert_eq!(expiry, "2024-03-02T00:30:00.123456789Z");
        let parsed = DateTime::parse_from_rfc3339(&expiry).unwrap();
        assert_eq!(parsed.with_timezone(&Utc) - now, Duration::hours(2));
    }

    #[test]
    fn test_storage_declarations() {
        let mut stack = Stack::new("ephemeral", "westeurope");
        let storage = declare_storage(&mut stack).unwrap();

        assert!(storage.resource_group.id().as_str().starts_with("resourceGroupSA-"));
        assert_eq!(storage.account.id().as_str(), "storageAccount");
        assert_eq!(storage.container.id().as_str(), "blobContainer");

        let rg = stack.resource(storage.resource_group.id()).unwrap();
        assert!(rg.options.retain_on_delete);
        let container = stack.resource(storage.container.id()).unwrap();
        assert!(!container.options.retain_on_delete);
        assert_eq!(
            container.options.depends_on,
            vec![storage.resource_group.id().clone(), storage.account.id().clone()]
        );
    }

    #[test]
    fn test_urls_reference_storage_outputs() {
        let mut stack = Stack::new("ephemeral", "westeurope");
        let storage = declare_storage(&mut stack).unwrap();
        let sas = declare_sas(&mut stack, &storage, Utc::now()).unwrap();

        let signed = storage.signed_url("disk.vhd", &sas);
        assert_eq!(
            signed.to_string(),
            "https://${storageAccount.name}.blob.core.windows.net/${blobContainer.name}/disk.vhd?${storageAccountSas.accountSasToken}"
        );
        assert_eq!(
            storage.blob_uri("disk.vhd").to_string(),
            "https://${storageAccount.name}.blob.core.windows.net/${blobContainer.name}/disk.vhd"
        );
    }
}
