//! OpenAPI/Utoipa configuration.

use crate::api::{
    admin::ADMIN_TAG, events::EVENTS_TAG, health::MISC_TAG, monitor::MONITOR_TAG,
    trackings::TRACKINGS_TAG, users::USERS_TAG,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

/// Security addon for OpenAPI documentation.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    #[tracing::instrument(skip(self, openapi))]
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "AdminKey",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "x-admin-key",
                    "Shared admin secret for the /admin endpoints.",
                ))),
            );
        }
    }
}

/// OpenAPI documentation configuration.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Parcel Guardian API",
        version = "1.0.0",
        description = "Package-tracking alert service: register parcels, monitor carrier status and alert owners on delivery exceptions."
    ),
    tags(
        (name = MISC_TAG, description = "Miscellaneous endpoints"),
        (name = USERS_TAG, description = "User signup and tracking listings"),
        (name = TRACKINGS_TAG, description = "Tracking registration"),
        (name = MONITOR_TAG, description = "Monitoring job control"),
        (name = EVENTS_TAG, description = "Application events"),
        (name = ADMIN_TAG, description = "Admin panel endpoints")
    )
)]
pub struct ApiDoc;
