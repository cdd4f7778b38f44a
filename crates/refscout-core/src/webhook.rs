//! Idempotent webhook registration.
//!
//! A consuming system registers one callback hook per repository so the
//! host pushes ref changes instead of being polled. Registration is driven
//! by a diff between the desired and existing configurations: calling
//! [`ensure_hook`] twice with the same desired configuration never creates
//! a duplicate, and a hook that already subscribes to every desired event
//! is left untouched. The transport itself is behind the [`HookRegistry`]
//! collaborator trait.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::HostError;

/// The hook configuration a consumer wants present on the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredHook {
    /// Callback URL the host should deliver events to.
    pub url: String,
    /// Event names to subscribe to.
    pub events: BTreeSet<String>,
    /// Human-readable description shown in the host UI.
    pub description: String,
}

/// A hook as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingHook {
    /// Host-assigned hook identifier.
    pub id: u64,
    /// Configured callback URL.
    pub url: String,
    /// Subscribed event names.
    pub events: BTreeSet<String>,
}

/// Hook CRUD capability of the hosting service.
pub trait HookRegistry {
    /// Lists the hooks configured on the repository.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] on transport failure or denied access.
    fn list_hooks(&self) -> Result<Vec<ExistingHook>, HostError>;

    /// Creates a hook and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] on transport failure or denied access.
    fn create_hook(&self, desired: &DesiredHook) -> Result<u64, HostError>;

    /// Replaces the configuration of hook `id`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] on transport failure or denied access.
    fn update_hook(&self, id: u64, desired: &DesiredHook) -> Result<(), HostError>;
}

/// What [`ensure_hook`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookChange {
    /// No hook existed for the callback URL; one was created.
    Created {
        /// Identifier of the new hook.
        id: u64,
    },
    /// A hook existed but was missing desired events; it was updated.
    Updated {
        /// Identifier of the updated hook.
        id: u64,
    },
    /// A hook already subscribed to every desired event.
    Unchanged {
        /// Identifier of the matching hook.
        id: u64,
    },
}

/// Reconciles the desired hook configuration against the registry.
///
/// Hooks are matched by callback URL. A matching hook that already covers
/// every desired event is left alone; one missing events is updated with
/// the union of existing and desired events, so subscriptions added out of
/// band survive.
///
/// # Errors
///
/// Propagates [`HostError`] from the registry calls.
pub fn ensure_hook(
    registry: &dyn HookRegistry,
    desired: &DesiredHook,
) -> Result<HookChange, HostError> {
    let existing = registry.list_hooks()?;
    let Some(found) = existing.iter().find(|hook| hook.url == desired.url) else {
        let id = registry.create_hook(desired)?;
        tracing::info!(url = %desired.url, id, "registered webhook");
        return Ok(HookChange::Created { id });
    };

    if desired.events.is_subset(&found.events) {
        tracing::debug!(url = %desired.url, id = found.id, "webhook already up to date");
        return Ok(HookChange::Unchanged { id: found.id });
    }

    let merged = DesiredHook {
        url: desired.url.clone(),
        events: desired.events.union(&found.events).cloned().collect(),
        description: desired.description.clone(),
    };
    registry.update_hook(found.id, &merged)?;
    tracing::info!(url = %desired.url, id = found.id, "updated webhook event set");
    Ok(HookChange::Updated { id: found.id })
}
