//! The provisioning run: create a group, plan and site, inspect the site,
//! then tear everything down once the user confirms.
//!
//! Steps run strictly in order and the first failure ends the run. Nothing
//! created before the failure is cleaned up.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use azsite_arm::ManagementApi;
use azsite_core::{ResourceGroup, SampleConfig, ServerFarm, Site, print_item};
use tracing::info;

/// Execute the full provisioning run once.
///
/// `input` gates the teardown on one line read from it; `None` skips the gate.
pub async fn run_example<A, R, W>(
    api: &A,
    config: &SampleConfig,
    input: Option<&mut R>,
    out: &mut W,
) -> Result<()>
where
    A: ManagementApi,
    R: BufRead,
    W: Write,
{
    let group_name = config.group_name.as_str();
    let site_name = config.site_name.as_str();

    writeln!(out, "Create Resource Group")?;
    info!(group = group_name, location = %config.location, "creating resource group");
    let group = api
        .create_or_update_resource_group(group_name, &ResourceGroup::new(&config.location))
        .await
        .with_context(|| format!("failed to create resource group {group_name}"))?;
    print_item(out, &group)?;

    writeln!(out, "Create a Server Farm for your WebApp")?;
    info!(farm = %config.server_farm_name, sku = %config.sku.name, "creating server farm");
    let farm = api
        .create_or_update_server_farm(
            group_name,
            &config.server_farm_name,
            &ServerFarm::new(&config.location, config.sku.clone()),
        )
        .await
        .with_context(|| format!("failed to create server farm {}", config.server_farm_name))?;
    print_item(out, &farm)?;

    writeln!(out, "Create a Site to be hosted in the Server Farm")?;
    info!(site = site_name, "creating site");
    let site = api
        .create_or_update_site(
            group_name,
            site_name,
            &Site::hosted_on(&config.location, farm.id.clone()),
        )
        .await
        .with_context(|| format!("failed to create site {site_name}"))?;
    print_item(out, &site)?;

    writeln!(out, "List Sites by Resource Group")?;
    let sites = api
        .list_sites(group_name)
        .await
        .with_context(|| format!("failed to list sites in {group_name}"))?;
    info!(count = sites.len(), "listed sites");
    for site in &sites {
        print_item(out, site)?;
    }

    writeln!(out, "Get a single Site")?;
    let site = api
        .get_site(group_name, site_name)
        .await
        .with_context(|| format!("failed to get site {site_name}"))?;
    print_item(out, &site)?;

    let host = site.default_host_name().unwrap_or_default();
    writeln!(
        out,
        "Your site and server farm have been created. You can now go and visit at http://{host}."
    )?;
    writeln!(out, "Press enter to delete the site and server farm.")?;
    out.flush()?;

    if let Some(input) = input {
        let mut line = String::new();
        input.read_line(&mut line).context("failed to read confirmation")?;
    }

    writeln!(out, "Deleting the Site")?;
    info!(site = site_name, "deleting site");
    api.delete_site(group_name, site_name)
        .await
        .with_context(|| format!("failed to delete site {site_name}"))?;

    writeln!(out, "Deleting the resource group")?;
    info!(group = group_name, "deleting resource group");
    api.delete_resource_group(group_name)
        .await
        .with_context(|| format!("failed to delete resource group {group_name}"))?;

    info!("teardown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Mutex;

    use azsite_arm::{ArmError, ArmResult};
    use azsite_core::{ResourceGroupProperties, ServerFarmProperties, SiteProperties};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        CreateGroup(String),
        CreateFarm(String, String),
        CreateSite(String, String, Option<String>),
        ListSites(String),
        GetSite(String, String),
        DeleteSite(String, String),
        DeleteGroup(String),
    }

    impl Call {
        fn site_name(&self) -> Option<&str> {
            match self {
                Call::CreateSite(_, name, _) | Call::GetSite(_, name) | Call::DeleteSite(_, name) => {
                    Some(name.as_str())
                }
                _ => None,
            }
        }
    }

    /// Records every call and fabricates ARM-shaped answers.
    #[derive(Debug, Default)]
    struct RecordingApi {
        calls: Mutex<Vec<Call>>,
        fail_group_create: bool,
        without_host_name: bool,
    }

    impl RecordingApi {
        fn failing_group_create() -> Self {
            Self {
                fail_group_create: true,
                ..Default::default()
            }
        }

        fn missing_host_name() -> Self {
            Self {
                without_host_name: true,
                ..Default::default()
            }
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn site(group: &str, name: &str, server_farm_id: Option<String>) -> Site {
            Site {
                id: Some(format!(
                    "/subscriptions/sub/resourceGroups/{group}/providers/Microsoft.Web/sites/{name}"
                )),
                name: Some(name.to_string()),
                location: "West US".to_string(),
                tags: None,
                properties: Some(SiteProperties {
                    server_farm_id,
                    default_host_name: Some(format!("{name}.azurewebsites.net")),
                    state: Some("Running".to_string()),
                }),
            }
        }
    }

    impl ManagementApi for RecordingApi {
        async fn create_or_update_resource_group(
            &self,
            group: &str,
            params: &ResourceGroup,
        ) -> ArmResult<ResourceGroup> {
            self.record(Call::CreateGroup(group.to_string()));
            if self.fail_group_create {
                return Err(ArmError::Api {
                    status: 403,
                    code: "AuthorizationFailed".to_string(),
                    message: "client does not have authorization".to_string(),
                });
            }
            Ok(ResourceGroup {
                id: Some(format!("/subscriptions/sub/resourceGroups/{group}")),
                name: Some(group.to_string()),
                location: params.location.clone(),
                tags: None,
                properties: Some(ResourceGroupProperties {
                    provisioning_state: Some("Succeeded".to_string()),
                }),
            })
        }

        async fn delete_resource_group(&self, group: &str) -> ArmResult<()> {
            self.record(Call::DeleteGroup(group.to_string()));
            Ok(())
        }

        async fn create_or_update_server_farm(
            &self,
            group: &str,
            name: &str,
            params: &ServerFarm,
        ) -> ArmResult<ServerFarm> {
            self.record(Call::CreateFarm(group.to_string(), name.to_string()));
            Ok(ServerFarm {
                id: Some(format!(
                    "/subscriptions/sub/resourceGroups/{group}/providers/Microsoft.Web/serverfarms/{name}"
                )),
                name: Some(name.to_string()),
                properties: Some(ServerFarmProperties {
                    provisioning_state: Some("Succeeded".to_string()),
                    ..Default::default()
                }),
                ..params.clone()
            })
        }

        async fn create_or_update_site(
            &self,
            group: &str,
            name: &str,
            params: &Site,
        ) -> ArmResult<Site> {
            let farm_id = params.server_farm_id().map(str::to_string);
            self.record(Call::CreateSite(group.to_string(), name.to_string(), farm_id.clone()));
            Ok(Self::site(group, name, farm_id))
        }

        async fn list_sites(&self, group: &str) -> ArmResult<Vec<Site>> {
            self.record(Call::ListSites(group.to_string()));
            let created = self.calls().into_iter().filter_map(|call| match call {
                Call::CreateSite(g, name, farm) if g == group => Some(Self::site(&g, &name, farm)),
                _ => None,
            });
            Ok(created.collect())
        }

        async fn get_site(&self, group: &str, name: &str) -> ArmResult<Site> {
            self.record(Call::GetSite(group.to_string(), name.to_string()));
            let mut site = Self::site(group, name, None);
            if self.without_host_name {
                if let Some(props) = site.properties.as_mut() {
                    props.default_host_name = None;
                }
            }
            Ok(site)
        }

        async fn delete_site(&self, group: &str, name: &str) -> ArmResult<()> {
            self.record(Call::DeleteSite(group.to_string(), name.to_string()));
            Ok(())
        }
    }

    async fn run(api: &RecordingApi, config: &SampleConfig) -> (Result<()>, String) {
        let mut input = Cursor::new(b"\n".to_vec());
        let mut out = Vec::new();
        let result = run_example(api, config, Some(&mut input), &mut out).await;
        (result, String::from_utf8(out).unwrap())
    }

    const FARM_ID: &str =
        "/subscriptions/sub/resourceGroups/azure-sample-group/providers/Microsoft.Web/serverfarms/sample-server-farm";

    #[tokio::test]
    async fn test_full_run_call_sequence() {
        let api = RecordingApi::default();
        let config = SampleConfig::new("X");

        let (result, _) = run(&api, &config).await;
        result.unwrap();

        let group = "azure-sample-group".to_string();
        assert_eq!(
            api.calls(),
            vec![
                Call::CreateGroup(group.clone()),
                Call::CreateFarm(group.clone(), "sample-server-farm".to_string()),
                Call::CreateSite(group.clone(), "X".to_string(), Some(FARM_ID.to_string())),
                Call::ListSites(group.clone()),
                Call::GetSite(group.clone(), "X".to_string()),
                Call::DeleteSite(group.clone(), "X".to_string()),
                Call::DeleteGroup(group),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_site_prints_created_site() {
        let api = RecordingApi::default();
        let (result, out) = run(&api, &SampleConfig::new("X")).await;
        result.unwrap();

        let (_, after_get) = out.split_once("Get a single Site\n").unwrap();
        assert!(after_get.starts_with("\tName: X\n"));
    }

    #[tokio::test]
    async fn test_teardown_is_two_deletes_after_get() {
        let api = RecordingApi::default();
        let (result, _) = run(&api, &SampleConfig::new("X")).await;
        result.unwrap();

        let calls = api.calls();
        let get = calls
            .iter()
            .position(|c| matches!(c, Call::GetSite(..)))
            .unwrap();
        let tail = &calls[get + 1..];
        assert_eq!(tail.len(), 2);
        assert!(matches!(tail[0], Call::DeleteSite(..)));
        assert!(matches!(tail[1], Call::DeleteGroup(..)));
    }

    #[tokio::test]
    async fn test_group_failure_stops_run() {
        let api = RecordingApi::failing_group_create();
        let (result, out) = run(&api, &SampleConfig::new("X")).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to create resource group azure-sample-group"));
        assert!(format!("{err:#}").contains("AuthorizationFailed"));
        assert_eq!(api.calls(), vec![Call::CreateGroup("azure-sample-group".to_string())]);
        assert!(!out.contains("Server Farm for your WebApp"));
    }

    #[tokio::test]
    async fn test_generated_site_name_reused() {
        let api = RecordingApi::default();
        let config = SampleConfig::generate();
        let (result, _) = run(&api, &config).await;
        result.unwrap();

        let names: Vec<String> = api
            .calls()
            .iter()
            .filter_map(|c| c.site_name().map(str::to_string))
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names.iter().all(|n| *n == config.site_name));
    }

    #[tokio::test]
    async fn test_listing_prints_each_site() {
        let api = RecordingApi::default();
        let (result, out) = run(&api, &SampleConfig::new("X")).await;
        result.unwrap();

        let listing = out
            .split_once("List Sites by Resource Group\n")
            .and_then(|(_, rest)| rest.split_once("Get a single Site\n"))
            .map(|(listing, _)| listing)
            .unwrap();
        assert_eq!(listing.matches("\tName: ").count(), 1);
        assert!(listing.contains("\tName: X\n"));
    }

    #[tokio::test]
    async fn test_prompt_precedes_teardown() {
        let api = RecordingApi::default();
        let (result, out) = run(&api, &SampleConfig::new("X")).await;
        result.unwrap();

        let prompt = out
            .find("You can now go and visit at http://X.azurewebsites.net.\n")
            .unwrap();
        let deleting = out.find("Deleting the Site\n").unwrap();
        assert!(prompt < deleting);
        assert!(out.ends_with("Deleting the Site\nDeleting the resource group\n"));
    }

    #[tokio::test]
    async fn test_prompt_leaves_host_blank_when_arm_reports_none() {
        let api = RecordingApi::missing_host_name();
        let (result, out) = run(&api, &SampleConfig::new("X")).await;
        result.unwrap();

        assert!(out.contains("You can now go and visit at http://.\n"));
        assert!(!out.contains("azurewebsites.net."));
    }

    #[tokio::test]
    async fn test_group_and_farm_print_provisioning_state() {
        let api = RecordingApi::default();
        let (result, out) = run(&api, &SampleConfig::new("X")).await;
        result.unwrap();

        assert_eq!(out.matches("\t\tProvisioning State: Succeeded\n").count(), 2);
    }

    #[tokio::test]
    async fn test_without_gate_runs_to_completion() {
        let api = RecordingApi::default();
        let mut out = Vec::new();
        run_example::<_, Cursor<Vec<u8>>, _>(&api, &SampleConfig::new("X"), None, &mut out)
            .await
            .unwrap();
        assert_eq!(api.calls().len(), 7);
    }

    #[tokio::test]
    async fn test_closed_input_still_tears_down() {
        let api = RecordingApi::default();
        let mut input = Cursor::new(Vec::new());
        let mut out = Vec::new();
        run_example(&api, &SampleConfig::new("X"), Some(&mut input), &mut out)
            .await
            .unwrap();
        assert!(matches!(api.calls().last(), Some(Call::DeleteGroup(_))));
    }
}
