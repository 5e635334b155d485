//! Caller identity extraction
//!
//! Identity is delegated to an external provider that forwards a stable
//! user identifier and profile fields as headers. The extractor upserts the
//! local user row on every authenticated request, so first-seen and
//! returning users take the same path.

use actix_web::{
    dev::Payload, error::ErrorInternalServerError, error::ErrorUnauthorized, web, FromRequest,
    HttpRequest,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use medbook_core::{config::AppConfig, models::User, traits::UserRepository, AppError};
use medbook_db::PgUserRepository;
use tracing::{debug, warn};

/// Header carrying the identity provider's stable user identifier
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the user's email
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Header carrying the user's first name
pub const USER_FIRST_NAME_HEADER: &str = "x-user-first-name";

/// Header carrying the user's last name
pub const USER_LAST_NAME_HEADER: &str = "x-user-last-name";

/// Authenticated caller with the upserted user row
///
/// # Examples
///
/// ```no_run
/// use actix_web::HttpResponse;
/// use medbook_api::identity::CallerIdentity;
///
/// async fn protected_handler(identity: CallerIdentity) -> HttpResponse {
///     HttpResponse::Ok().json(serde_json::json!({
///         "email": identity.user.email,
///     }))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    /// The authenticated user
    pub user: User,

    /// Network origin, when a proxy forwarded one
    pub origin: Option<String>,
}

impl CallerIdentity {
    /// Whether this caller is the configured admin
    pub fn is_admin(&self, config: &AppConfig) -> bool {
        config.mailer.admin_email.as_deref() == Some(self.user.email.as_str())
    }

    /// Counter identity for the rate limiter
    pub fn client_id(&self) -> String {
        self.user.id.to_string()
    }
}

fn header_value(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// First address from a forwarded-for header value
fn first_forwarded(value: &str) -> Option<String> {
    value
        .split(',')
        .next()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Resolve the caller's network origin from proxy headers
pub fn request_origin(req: &HttpRequest) -> Option<String> {
    if let Some(forwarded) = header_value(req, "x-forwarded-for") {
        if let Some(addr) = first_forwarded(&forwarded) {
            return Some(addr);
        }
    }
    header_value(req, "x-real-ip")
}

impl FromRequest for CallerIdentity {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let external_id = match header_value(&req, USER_ID_HEADER) {
                Some(id) => id,
                None => {
                    debug!("No identity header found in request");
                    return Err(ErrorUnauthorized(AppError::Unauthorized(
                        "No authentication token provided".to_string(),
                    )));
                }
            };

            let users = match req.app_data::<web::Data<PgUserRepository>>() {
                Some(repo) => repo.clone(),
                None => {
                    warn!("User repository not found in app data");
                    return Err(ErrorInternalServerError(AppError::Internal(
                        "Identity service not configured".to_string(),
                    )));
                }
            };

            let email = header_value(&req, USER_EMAIL_HEADER)
                .unwrap_or_else(|| format!("user-{}@identity.local", external_id));
            let first_name = header_value(&req, USER_FIRST_NAME_HEADER);
            let last_name = header_value(&req, USER_LAST_NAME_HEADER);

            let user = users
                .upsert_by_external_id(
                    &external_id,
                    &email,
                    first_name.as_deref(),
                    last_name.as_deref(),
                )
                .await
                .map_err(actix_web::Error::from)?;

            debug!(user_id = %user.id, email = %user.email, "User authenticated successfully");

            Ok(CallerIdentity {
                user,
                origin: request_origin(&req),
            })
        })
    }
}

/// Network origin extractor for pre-authentication routes
///
/// Always succeeds; the origin is `None` when no proxy header is present,
/// which lands the caller in the shared `unknown` rate-limit bucket.
#[derive(Debug, Clone)]
pub struct RequestOrigin(pub Option<String>);

impl FromRequest for RequestOrigin {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(RequestOrigin(request_origin(req))))
    }
}
