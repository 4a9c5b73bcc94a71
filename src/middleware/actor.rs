use crate::error::AppError;
use crate::AppState;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};

/// Identity stamped onto writes (`createdBy`, `updatedBy`, `deletedBy`).
///
/// Taken from the configured identity header, falling back to the configured
/// default identity when the header is missing or blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub String);

impl Actor {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_request_parts(req: &HttpRequest, header: &str, default_actor: &str) -> Self {
        let name = req
            .headers()
            .get(header)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(default_actor);

        Actor(name.to_string())
    }
}

impl std::ops::Deref for Actor {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for Actor {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = req
            .app_data::<web::Data<AppState>>()
            .map(|state| {
                Actor::from_request_parts(req, &state.config.actor_header, &state.config.default_actor)
            })
            .ok_or_else(|| AppError::Internal("Application state not configured".to_string()));

        ready(result)
    }
}
