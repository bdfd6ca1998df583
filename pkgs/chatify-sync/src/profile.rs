//! Profile editor for the signed-in user's own `users/{id}` record

use std::sync::Arc;

use chatify_store::{put, Backend, Contact, StoreLayout};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::SyncError;
use crate::identity::Identity;

/// Individually editable profile fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Name,
    Status,
    ProfileImage,
    Phone,
}

impl ProfileField {
    /// Key of the field inside the profile record
    pub fn key(&self) -> &'static str {
        match self {
            ProfileField::Name => "name",
            ProfileField::Status => "status",
            ProfileField::ProfileImage => "profileImage",
            ProfileField::Phone => "phoneNo",
        }
    }
}

pub struct ProfileEditor {
    backend: Arc<dyn Backend>,
    identity: Identity,
    layout: StoreLayout,
}

impl ProfileEditor {
    pub fn new(backend: Arc<dyn Backend>, identity: Identity, layout: StoreLayout) -> Self {
        Self {
            backend,
            identity,
            layout,
        }
    }

    /// Write the initial profile after sign-up
    pub async fn register(&self, name: &str) {
        let contact = Contact::new(&self.identity.user_id, name, &self.identity.phone_number);

        let path = self.layout.user(&self.identity.user_id);
        match put(&*self.backend, &path, &contact).await {
            Ok(()) => info!("Registered profile for {}", self.identity.user_id),
            Err(e) => debug!("Profile registration for {} failed: {}", self.identity.user_id, e),
        }
    }

    /// Overwrite a single field; other fields are untouched
    pub async fn update(&self, field: ProfileField, value: &str) {
        if let Err(e) = self.try_update(field, value).await {
            debug!("Profile update of {} failed: {}", field.key(), e);
        }
    }

    async fn try_update(&self, field: ProfileField, value: &str) -> Result<(), SyncError> {
        let path = self.layout.user(&self.identity.user_id).child(field.key());
        self.backend
            .set(&path, Value::String(value.to_string()))
            .await?;
        debug!("Updated profile field {}", field.key());
        Ok(())
    }
}
