//! Output formatting for multiple formats
//!
//! Results go to stdout as JSON, YAML or human-readable text. Logs go to
//! stderr, so the machine formats can be piped straight into other tools.
//!
//! # Example
//!
//! ```ignore
//! use cloud_importer::cli::output::{OutputFormat, OutputFormatter};
//!
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! let output = formatter.format_up_result(&result)?;
//! println!("{}", output);
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::ImporterConfig;
use crate::pipeline::resource::TargetRegion;
use crate::pipeline::{ResourceState, StackOutputs, UpResult};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the result of an applied stack
    pub fn format_up_result(&self, result: &UpResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result)
                .context("Failed to serialize stack result to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(result).context("Failed to serialize stack result to YAML")
            }
            OutputFormat::Human => Ok(self.format_up_result_human(result)),
        }
    }

    /// Formats the resources a failed run created and left in place
    pub fn format_applied(&self, stack: &str, applied: &[ResourceState]) -> Result<String> {
        let report = AppliedReport { stack, applied };
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&report)
                .context("Failed to serialize applied resources to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(&report)
                .context("Failed to serialize applied resources to YAML"),
            OutputFormat::Human => {
                let mut output = format!("\u{2717} Stack {} failed\n", stack);
                output.push_str(RULE);
                output.push_str("\n\n");
                output.push_str(&format!("Left in place ({}):\n", applied.len()));
                push_tree(&mut output, resource_lines(applied));
                Ok(output)
            }
        }
    }

    /// Formats the replication targets of the subscription
    pub fn format_regions(&self, regions: &[TargetRegion]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(regions).context("Failed to serialize regions to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(regions).context("Failed to serialize regions to YAML")
            }
            OutputFormat::Human => {
                let mut output = format!("Replication Targets ({})\n", regions.len());
                output.push_str(RULE);
                output.push_str("\n\n");
                let lines = regions
                    .iter()
                    .map(|r| {
                        format!(
                            "{:<24} replicas: {}",
                            r.name, r.regional_replica_count
                        )
                    })
                    .collect();
                push_tree(&mut output, lines);
                Ok(output)
            }
        }
    }

    /// Formats configuration display
    pub fn format_config(&self, config: &ImporterConfig) -> Result<String> {
        let config_map = config.to_display_map();
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&config_map)
                .context("Failed to serialize config to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&config_map).context("Failed to serialize config to YAML")
            }
            OutputFormat::Human => Ok(self.format_config_human(&config_map)),
        }
    }

    fn format_up_result_human(&self, result: &UpResult) -> String {
        let mut output = format!("\u{2713} Stack {} applied\n", result.stack);
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Resources ({}):\n", result.resources.len()));
        let resources = resource_lines(&result.resources);
        push_tree(&mut output, resources);

        output.push_str(&format!("\nOutputs ({}):\n", result.outputs.len()));
        push_tree(&mut output, outputs_lines(&result.outputs));

        output
    }

    fn format_config_human(&self, config_map: &HashMap<String, String>) -> String {
        let mut output = String::from("cloud-importer Configuration\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        let value = |key: &str| config_map.get(key).map(String::as_str).unwrap_or("-");

        output.push_str("Azure:\n");
        output.push_str(&format!("  Subscription: {}\n", value("subscription_id")));
        output.push_str(&format!("  Location: {}\n", value("location")));
        output.push_str(&format!("  ARM Endpoint: {}\n", value("arm_endpoint")));
        output.push_str(&format!("  Request Timeout: {}s\n", value("request_timeout_secs")));
        output.push_str(&format!("  Poll Interval: {}s\n", value("poll_interval_secs")));

        output.push_str("\nBundles:\n");
        output.push_str(&format!("  Work Dir: {}\n", value("work_dir")));
        output.push_str(&format!("  Extract Command: {}\n", value("bundle_extract_cmd")));

        output.push_str("\nLogging:\n");
        output.push_str(&format!("  Level: {}\n", value("log_level")));
        output.push_str(&format!("  JSON: {}\n", value("log_json")));

        output
    }
}

#[derive(Serialize)]
struct AppliedReport<'a> {
    stack: &'a str,
    applied: &'a [ResourceState],
}

fn resource_lines(resources: &[ResourceState]) -> Vec<String> {
    resources
        .iter()
        .map(|r| {
            let name = r.outputs.get("name").map(String::as_str).unwrap_or("-");
            let retained = if r.retain_on_delete { "  (retained)" } else { "" };
            format!(
                "{:<22} {:<22} {}{}",
                r.id.to_string(),
                r.kind.to_string(),
                name,
                retained
            )
        })
        .collect()
}

fn outputs_lines(outputs: &StackOutputs) -> Vec<String> {
    outputs
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{:<20} {}", key, rendered)
        })
        .collect()
}

fn push_tree(output: &mut String, lines: Vec<String>) {
    if lines.is_empty() {
        output.push_str("\u{2514}\u{2500} (none)\n");
        return;
    }
    let last = lines.len() - 1;
    for (i, line) in lines.into_iter().enumerate() {
        let branch = if i == last { "\u{2514}" } else { "\u{251C}" };
        output.push_str(&format!("{}\u{2500} {}\n", branch, line));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::{EphemeralBuild, RawImageSource};
    use crate::pipeline::{Engine, MockProvider, ResourceId, ResourceKind, Stack, REDACTED};
    use std::sync::Arc;
    use std::collections::BTreeMap;

    fn create_test_result() -> UpResult {
        let mut outputs = StackOutputs::new();
        outputs.insert("name", "rhelai-1.2");
        outputs.insert("arch", "x86_64");

        let mut properties = BTreeMap::new();
        properties.insert("name".to_string(), "resourceGroupSA1a2b3c4d".to_string());

        UpResult {
            stack: "ephemeral".to_string(),
            outputs,
            resources: vec![ResourceState {
                id: ResourceId::new("resourceGroup"),
                kind: ResourceKind::ResourceGroup,
                outputs: properties,
                retain_on_delete: true,
            }],
        }
    }

    #[test]
    fn test_json_format() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let output = formatter.format_up_result(&create_test_result()).unwrap();

        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["stack"], "ephemeral");
        assert_eq!(parsed["outputs"]["name"], "rhelai-1.2");
        assert_eq!(parsed["resources"][0]["id"], "resourceGroup");
    }

    #[test]
    fn test_yaml_format() {
        let formatter = OutputFormatter::new(OutputFormat::Yaml);
        let output = formatter.format_up_result(&create_test_result()).unwrap();

        assert!(output.contains("stack: ephemeral"));
        assert!(output.contains("rhelai-1.2"));
    }

    #[test]
    fn test_human_format() {
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let output = formatter.format_up_result(&create_test_result()).unwrap();

        assert!(output.contains("Stack ephemeral applied"));
        assert!(output.contains("resourceGroupSA1a2b3c4d"));
        assert!(output.contains("(retained)"));
        assert!(output.contains("\u{2514}\u{2500} name"));
    }

    #[tokio::test]
    async fn test_result_never_shows_sas_signature() {
        let result = Engine::new(Arc::new(MockProvider::new()))
            .up(
                Stack::new("ephemeral-raw", "westeurope"),
                &EphemeralBuild::new(RawImageSource::new("/images/rhelai.vhd", "rhelai-1.2")),
            )
            .await
            .unwrap();

        for format in [OutputFormat::Json, OutputFormat::Yaml, OutputFormat::Human] {
            let output = OutputFormatter::new(format).format_up_result(&result).unwrap();
            assert!(!output.contains("sig="), "{:?} output leaks a signature", format);
        }

        let output = OutputFormatter::new(OutputFormat::Json)
            .format_up_result(&result)
            .unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        let sas = parsed["resources"]
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["kind"] == "AccountSas")
            .unwrap();
        assert_eq!(sas["outputs"]["accountSasToken"], REDACTED);
    }

    #[test]
    fn test_applied_json_lists_resources() {
        let applied = create_test_result().resources;
        let output = OutputFormatter::new(OutputFormat::Json)
            .format_applied("ephemeral", &applied)
            .unwrap();

        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["stack"], "ephemeral");
        assert_eq!(parsed["applied"][0]["id"], "resourceGroup");
        assert_eq!(parsed["applied"][0]["retain_on_delete"], true);
    }

    #[test]
    fn test_applied_human() {
        let applied = create_test_result().resources;
        let output = OutputFormatter::new(OutputFormat::Human)
            .format_applied("ephemeral", &applied)
            .unwrap();

        assert!(output.contains("Stack ephemeral failed"));
        assert!(output.contains("Left in place (1)"));
        assert!(output.contains("(retained)"));
    }

    #[test]
    fn test_regions_human() {
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let regions = vec![
            TargetRegion::single_replica("eastus"),
            TargetRegion::single_replica("westus"),
        ];
        let output = formatter.format_regions(&regions).unwrap();

        assert!(output.starts_with("Replication Targets (2)"));
        assert!(output.contains("\u{251C}\u{2500} eastus"));
        assert!(output.contains("\u{2514}\u{2500} westus"));
    }

    #[test]
    fn test_empty_regions_human() {
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let output = formatter.format_regions(&[]).unwrap();
        assert!(output.contains("(none)"));
    }

    #[test]
    fn test_config_json_has_display_keys() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let config = ImporterConfig {
            location: "westeurope".to_string(),
            ..ImporterConfig::default()
        };
        let output = formatter.format_config(&config).unwrap();

        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["location"], "westeurope");
        assert!(parsed.get("arm_endpoint").is_some());
    }
}
