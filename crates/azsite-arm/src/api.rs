//! The management operations the provisioning run needs.

use std::future::Future;

use azsite_core::{ResourceGroup, ServerFarm, Site};

use crate::error::ArmResult;

/// Resource-group and web-site management operations.
///
/// Implemented by [`crate::ArmClient`] against the live API, and by test
/// doubles that record calls.
pub trait ManagementApi {
    fn create_or_update_resource_group(
        &self,
        group: &str,
        params: &ResourceGroup,
    ) -> impl Future<Output = ArmResult<ResourceGroup>> + Send;

    /// Delete a resource group and everything in it, waiting for completion.
    fn delete_resource_group(&self, group: &str) -> impl Future<Output = ArmResult<()>> + Send;

    fn create_or_update_server_farm(
        &self,
        group: &str,
        name: &str,
        params: &ServerFarm,
    ) -> impl Future<Output = ArmResult<ServerFarm>> + Send;

    fn create_or_update_site(
        &self,
        group: &str,
        name: &str,
        params: &Site,
    ) -> impl Future<Output = ArmResult<Site>> + Send;

    /// All sites in a group, in provider order.
    fn list_sites(&self, group: &str) -> impl Future<Output = ArmResult<Vec<Site>>> + Send;

    fn get_site(&self, group: &str, name: &str) -> impl Future<Output = ArmResult<Site>> + Send;

    fn delete_site(&self, group: &str, name: &str) -> impl Future<Output = ArmResult<()>> + Send;
}
