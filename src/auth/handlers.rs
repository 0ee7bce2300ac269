use actix_web::{HttpResponse, web};
use tracing::{debug, info, instrument, warn};

use crate::auth::auth::AuthUser;
use crate::auth::jwt::generate_token;
use crate::auth::password::{hash_password, verify_password};
use crate::error::AppError;
use crate::model::user::{NewUser, ProfileChanges, User, UserProfile, employee_code};
use crate::models::{AuthResponse, LoginReq, ProfileUpdateReq, RegisterReq};
use crate::state::AppState;
use crate::store::{StoreError, UserStore};

const CODE_ATTEMPTS: u64 = 2;

fn issue_token(state: &AppState, user: &User) -> Result<AuthResponse, AppError> {
    let token = generate_token(
        user.id,
        &user.email,
        user.role,
        &state.config.jwt_secret,
        state.config.access_token_ttl,
    )
    .map_err(|e| AppError::Internal(format!("token encoding failed: {e}")))?;

    Ok(AuthResponse {
        token,
        user: UserProfile::from(user),
    })
}

/// Inserts `user` under the next free employee code. A code taken by a
/// concurrent registration moves on to the following one; a taken email is
/// reported as a duplicate account.
async fn insert_with_next_code(
    users: &dyn UserStore,
    mut user: NewUser,
) -> Result<User, AppError> {
    for attempt in 0..CODE_ATTEMPTS {
        user.employee_id = employee_code(users.count_users().await? + attempt);
        match users.insert_user(user.clone()).await {
            Ok(created) => return Ok(created),
            Err(StoreError::Conflict) => {
                if users.find_user_by_email(&user.email).await?.is_some() {
                    return Err(AppError::Conflict("User already exists".into()));
                }
                warn!(employee_id = %user.employee_id, "Employee code taken, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::Conflict(
        "Could not assign an employee code, please try again".into(),
    ))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid payload", body = Object, example = json!({
            "message": "Password must be at least 6 characters"
        })),
        (status = 409, description = "Email already registered", body = Object, example = json!({
            "message": "User already exists"
        })),
        (status = 429, description = "Too many requests")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(req, state), fields(email = %req.email))]
pub async fn register(
    req: web::Json<RegisterReq>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let role = req.validate()?;
    let req = req.into_inner();
    let email = req.email.trim().to_lowercase();

    if state.users.find_user_by_email(&email).await?.is_some() {
        info!("Registration rejected: email taken");
        return Err(AppError::Conflict("User already exists".into()));
    }

    let password_hash = hash_password(&req.password)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;

    let user = insert_with_next_code(
        state.users.as_ref(),
        NewUser {
            name: req.name.trim().to_string(),
            email,
            password_hash,
            role,
            employee_id: String::new(),
            department: req.department.filter(|d| !d.trim().is_empty()),
        },
    )
    .await?;

    info!(user_id = user.id, employee_id = %user.employee_id, "User registered");
    Ok(HttpResponse::Created().json(issue_token(&state, &user)?))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = Object, example = json!({
            "message": "Invalid email or password"
        })),
        (status = 429, description = "Too many requests")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(req, state), fields(email = %req.email))]
pub async fn login(
    req: web::Json<LoginReq>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");
    let invalid = || AppError::Unauthorized("Invalid email or password".into());

    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(invalid());
    }

    let Some(user) = state.users.find_user_by_email(&email).await? else {
        info!("Invalid credentials: user not found");
        return Err(invalid());
    };

    debug!(user_id = user.id, "Verifying password");
    if let Err(e) = verify_password(&req.password, &user.password) {
        warn!(error = %e, "Invalid credentials: password mismatch");
        return Err(invalid());
    }

    info!(user_id = user.id, "Login successful");
    Ok(HttpResponse::Ok().json(issue_token(&state, &user)?))
}

/// Current user's profile
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Profile of the caller", body = UserProfile),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let profile = state
        .user_cache
        .get_or_load(auth.user_id, state.users.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Update the caller's profile
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    request_body = ProfileUpdateReq,
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
#[instrument(skip(auth, req, state), fields(user_id = auth.user_id))]
pub async fn update_profile(
    auth: AuthUser,
    req: web::Json<ProfileUpdateReq>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let changes = ProfileChanges::try_from(req.into_inner())?;

    let user = state
        .users
        .update_profile(auth.user_id, &changes)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    state.user_cache.invalidate(auth.user_id).await;

    info!("Profile updated");
    Ok(HttpResponse::Ok().json(UserProfile::from(&user)))
}
