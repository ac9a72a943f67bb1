//! Dashboard core for dockman
//!
//! This crate provides:
//! - The reconciler that turns container listings into project groups
//! - Lifecycle actions on single containers and whole Compose projects
//! - Live log and shell sessions fed by background pumps

mod actions;
mod error;
mod reconcile;
mod record;
pub mod session;

pub use actions::*;
pub use error::*;
pub use reconcile::*;
pub use record::*;

use dockman_provider::ProviderError;
use std::future::Future;
use std::time::Duration;

/// Bound a runtime call; running out of time becomes [`ProviderError::Timeout`]
pub async fn bounded<T, F>(limit: Duration, call: F) -> std::result::Result<T, ProviderError>
where
    F: Future<Output = std::result::Result<T, ProviderError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout),
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
