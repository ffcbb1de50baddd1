//! azsite-arm — Azure Resource Manager client for azsite.
//!
//! Talks to the ARM REST API with `reqwest`, authenticating as a service
//! principal through the OAuth2 client-credentials grant.
//!
//! # Operations
//!
//! | Method | Path (under `/subscriptions/{sub}`) | Operation |
//! |---|---|---|
//! | PUT | `/resourcegroups/{group}` | create or update a resource group |
//! | DELETE | `/resourcegroups/{group}` | delete a resource group (long-running) |
//! | PUT | `/resourceGroups/{group}/providers/Microsoft.Web/serverfarms/{name}` | create or update an App Service plan |
//! | PUT | `/resourceGroups/{group}/providers/Microsoft.Web/sites/{name}` | create or update a site |
//! | GET | `/resourceGroups/{group}/providers/Microsoft.Web/sites` | list sites (paged) |
//! | GET | `/resourceGroups/{group}/providers/Microsoft.Web/sites/{name}` | get a site |
//! | DELETE | `/resourceGroups/{group}/providers/Microsoft.Web/sites/{name}` | delete a site |
//!
//! Orchestration code depends on the [`ManagementApi`] trait rather than on
//! [`ArmClient`] so it can run against an in-memory double.

/// Convert any `Display` error into an `ArmError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| $crate::error::ArmError::$variant(e.to_string())
    };
}

pub mod api;
pub mod client;
pub mod error;
pub mod token;

pub use api::ManagementApi;
pub use client::{ArmClient, ArmClientBuilder};
pub use error::{ArmError, ArmResult};
pub use token::TokenProvider;
