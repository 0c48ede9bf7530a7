//! Per-specification merge-and-persist.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::harvest::fetch::SpecificationFetcher;
use crate::model::{HarvestStatus, Registration};
use crate::traits::{RegistrationNotifier, RegistrationStore, SourceFetcher};

/// Finds or creates the registration for one specification URI, refreshes
/// it from the source and persists the outcome.
pub struct RegistrationBuilder<F: SourceFetcher> {
    specifications: SpecificationFetcher<F>,
    registrations: Arc<dyn RegistrationStore>,
    notifiers: Vec<Arc<dyn RegistrationNotifier>>,
}

impl<F: SourceFetcher> RegistrationBuilder<F> {
    pub fn new(
        specifications: SpecificationFetcher<F>,
        registrations: Arc<dyn RegistrationStore>,
    ) -> Self {
        Self {
            specifications,
            registrations,
            notifiers: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.specifications = self.specifications.with_timeout(fetch_timeout);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn RegistrationNotifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Harvests `spec_uri` into the registration owned by `owner_id`.
    ///
    /// Never fails: fetch, format and parse errors end up as
    /// [`HarvestStatus::Error`] on the returned registration, with the
    /// previous specification content left in place. A failed save is
    /// logged and the unsaved registration is returned and still notified.
    /// A failed lookup returns an unsaved `Error` registration without
    /// notifying, since no persisted id exists.
    pub async fn process_one(&self, owner_id: &str, spec_uri: &str) -> Registration {
        let existing = match self
            .registrations
            .find_by_owner_and_spec_uri(owner_id, spec_uri)
            .await
        {
            Ok(found) => found,
            Err(e) => {
                // Without a lookup we cannot tell update from insert, so
                // nothing is persisted and there is no id to announce.
                error!(owner_id, spec_uri, error = %e, "Registration lookup failed");
                if !self.notifiers.is_empty() {
                    warn!(
                        owner_id,
                        spec_uri,
                        notifiers = self.notifiers.len(),
                        "Skipping downstream notification for unsaved registration"
                    );
                }
                let mut registration = Registration::new(owner_id, spec_uri);
                registration.harvest_status = HarvestStatus::error(format!(
                    "Failed while trying to look up API registration {} {}",
                    spec_uri, e
                ));
                return registration;
            }
        };
        debug!(owner_id, spec_uri, found = existing.is_some(), "Registration lookup");

        let mut registration =
            existing.unwrap_or_else(|| Registration::new(owner_id, spec_uri));

        match self.specifications.fetch(spec_uri).await {
            Ok(specification) => {
                registration.formats = specification.formats.clone();
                registration.specification = Some(specification);
                registration.from_catalog = true;
                registration.harvest_status = HarvestStatus::Success;
            }
            Err(e) => {
                debug!(spec_uri, error = %e, "Failed while trying to harvest API");
                registration.harvest_status = HarvestStatus::error(format!(
                    "Failed while trying to fetch and parse API spec {} {}",
                    spec_uri, e
                ));
            }
        }

        let registration = match self.registrations.save(registration.clone()).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!(registration_id = %registration.id, error = %e, "Failed to save registration");
                registration
            }
        };

        debug!(registration_id = %registration.id, spec_uri, "Saved registration");
        for notifier in &self.notifiers {
            notifier.notify(&registration.id);
        }

        registration
    }
}
