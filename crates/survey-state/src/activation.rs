//! Single-active-dataset activation.
//!
//! The server owns the invariant that at most one dataset is Active. The
//! client asks for the transition and then re-reads the whole dataset
//! collection; it never flips sibling statuses locally.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use survey_model::{Dataset, DatasetId};

use crate::backend::Backend;
use crate::error::{Result, StateError};

/// Result of an activation request.
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// The dataset is active; carries the re-fetched collection.
    Activated(Vec<Dataset>),
    /// The server activated the dataset but the collection could not be
    /// re-fetched. Local dataset statuses are stale until the next refresh.
    Unrefreshed(StateError),
    /// A request for the same dataset was already in flight.
    Suppressed,
}

/// Tracks in-flight activations so repeated requests for one dataset are
/// not sent twice.
#[derive(Debug, Default)]
pub struct ActivationManager {
    in_flight: Mutex<HashSet<DatasetId>>,
}

/// Removes a dataset from the in-flight set when dropped.
struct InFlight<'a> {
    manager: &'a ActivationManager,
    dataset: DatasetId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.manager
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.dataset);
    }
}

impl ActivationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an activation for `dataset` is pending.
    pub fn is_in_flight(&self, dataset: DatasetId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&dataset)
    }

    fn try_begin(&self, dataset: DatasetId) -> Option<InFlight<'_>> {
        let inserted = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(dataset);
        inserted.then_some(InFlight {
            manager: self,
            dataset,
        })
    }

    /// Activates `dataset` and re-fetches the dataset collection.
    ///
    /// If the activation request fails the error is returned and nothing is
    /// re-fetched, so callers keep their previous collection. A failed
    /// re-fetch after a successful activation is [`Activation::Unrefreshed`].
    pub async fn activate<B: Backend + ?Sized>(
        &self,
        backend: &B,
        dataset: DatasetId,
    ) -> Result<Activation> {
        self.activate_with(backend, dataset, || ()).await
    }

    /// Like [`activate`](Self::activate), calling `on_begin` once the request
    /// is claimed and before anything is sent. Suppressed requests never call
    /// it.
    pub async fn activate_with<B, F>(
        &self,
        backend: &B,
        dataset: DatasetId,
        on_begin: F,
    ) -> Result<Activation>
    where
        B: Backend + ?Sized,
        F: FnOnce() + Send,
    {
        let Some(_guard) = self.try_begin(dataset) else {
            tracing::debug!(%dataset, "activation already in flight");
            return Ok(Activation::Suppressed);
        };
        on_begin();

        if let Err(err) = backend.activate(dataset).await {
            tracing::warn!(%dataset, error = %err, "activation failed");
            return Err(err);
        }
        tracing::info!(%dataset, "dataset activated");
        match backend.datasets().await {
            Ok(datasets) => Ok(Activation::Activated(datasets)),
            Err(err) => {
                tracing::warn!(%dataset, error = %err, "dataset collection not re-fetched");
                Ok(Activation::Unrefreshed(err))
            }
        }
    }
}
