//! ARM resource paths and API versions

pub const RESOURCES_API_VERSION: &str = "2021-04-01";
pub const STORAGE_API_VERSION: &str = "2023-01-01";
pub const COMPUTE_GALLERY_API_VERSION: &str = "2022-03-03";
pub const SUBSCRIPTIONS_API_VERSION: &str = "2022-12-01";

pub fn resource_group(subscription: &str, name: &str) -> String {
    format!("/subscriptions/{}/resourceGroups/{}", subscription, name)
}

pub fn storage_account(subscription: &str, group: &str, name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Storage/storageAccounts/{}",
        subscription, group, name
    )
}

pub fn blob_container(subscription: &str, group: &str, account: &str, name: &str) -> String {
    format!(
        "{}/blobServices/default/containers/{}",
        storage_account(subscription, group, account),
        name
    )
}

pub fn account_sas(subscription: &str, group: &str, account: &str) -> String {
    format!("{}/ListAccountSas", storage_account(subscription, group, account))
}

pub fn gallery(subscription: &str, group: &str, name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/galleries/{}",
        subscription, group, name
    )
}

pub fn gallery_image(subscription: &str, group: &str, gallery_name: &str, name: &str) -> String {
    format!("{}/images/{}", gallery(subscription, group, gallery_name), name)
}

pub fn gallery_image_version(
    subscription: &str,
    group: &str,
    gallery_name: &str,
    image: &str,
    name: &str,
) -> String {
    format!(
        "{}/versions/{}",
        gallery_image(subscription, group, gallery_name, image),
        name
    )
}

pub fn locations(subscription: &str) -> String {
    format!("/subscriptions/{}/locations", subscription)
}
