use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use tracing::{debug, error};

use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::error::AppError;
use crate::state::AppState;

fn reject(req: ServiceRequest, message: &str) -> ServiceResponse<BoxBody> {
    let resp = HttpResponse::Unauthorized().json(json!({ "message": message }));
    req.into_response(resp.map_into_boxed_body())
}

/// Resolves the bearer token to a live account and stores it as [`AuthUser`].
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let state = req
        .app_data::<Data<AppState>>()
        .cloned()
        .ok_or_else(|| AppError::Internal("app state missing".into()))?;

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => v.to_string(),
            Err(_) => return Ok(reject(req, "Invalid Authorization header encoding")),
        },
        None => return Ok(reject(req, "Not authorized, no token")),
    };

    let Some(token) = header_value.strip_prefix("Bearer ") else {
        return Ok(reject(req, "Authorization header must start with Bearer"));
    };

    let claims = match verify_token(token, &state.config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "Rejected token");
            return Ok(reject(req, "Not authorized, token failed"));
        }
    };

    // The account may have been removed after the token was issued.
    let profile = match state
        .user_cache
        .get_or_load(claims.user_id, state.users.as_ref())
        .await
    {
        Ok(Some(profile)) => profile,
        Ok(None) => return Ok(reject(req, "User not found")),
        Err(e) => {
            error!(error = %e, user_id = claims.user_id, "Failed to load user");
            return Err(AppError::from(e).into());
        }
    };

    req.extensions_mut().insert(AuthUser::from(&profile));

    next.call(req).await
}
