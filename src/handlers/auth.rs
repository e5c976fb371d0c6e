use actix_web::{web, HttpResponse, Result};
use validator::Validate;

use crate::config::AppConfig;
use crate::database::Repository;
use crate::models::auth::{
    ApiResponse, AuthResponse, LoginRequest, NewUser, RegisterRequest, Role, UpdateProfileRequest,
    UserChanges, UserResponse,
};
use crate::utils::auth::{hash_password, issue_token, AuthUser};
use crate::utils::errors::ServiceError;

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Validation error", body = crate::models::auth::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn register(
    db: web::Data<dyn Repository>,
    config: web::Data<AppConfig>,
    register_req: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/auth/register - Registering: {}", register_req.email);
    register_req.validate()?;
    let register_req = register_req.into_inner();

    let role = match (&config.admin_invite_token, &register_req.admin_invite_token) {
        (Some(expected), Some(given)) if expected == given => Role::Admin,
        _ => Role::Member,
    };

    let password_hash = hash_password(&register_req.password, &config)?;
    let user = db
        .create_user(NewUser {
            name: register_req.name.trim().to_string(),
            email: register_req.email,
            password_hash,
            profile_image_url: register_req.profile_image_url,
            role,
        })
        .await?;

    let token = issue_token(&user, &config)?;
    log::info!("User registered: {} ({})", user.email, user.role);
    Ok(HttpResponse::Created().json(AuthResponse::new(user, token)))
}

/// User login endpoint
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn login(
    db: web::Data<dyn Repository>,
    config: web::Data<AppConfig>,
    login_req: web::Json<LoginRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/auth/login - Login attempt for: {}", login_req.email);
    login_req.validate()?;

    let user = match db.find_user_by_email(&login_req.email).await? {
        Some(user) => user,
        None => {
            log::warn!("Login failed: User not found - {}", login_req.email);
            return Err(ServiceError::Unauthorized("Invalid email or password".to_string()));
        }
    };

    let password_valid = bcrypt::verify(&login_req.password, &user.password_hash).map_err(|e| {
        log::error!("Password verification error: {}", e);
        ServiceError::AuthenticationError("Password verification failed".to_string())
    })?;

    if !password_valid {
        log::warn!("Login failed: Invalid password for user - {}", login_req.email);
        return Err(ServiceError::Unauthorized("Invalid email or password".to_string()));
    }

    let token = issue_token(&user, &config)?;
    log::info!("Login successful for user: {}", user.email);
    Ok(HttpResponse::Ok().json(AuthResponse::new(user, token)))
}

/// Get current user information
#[utoipa::path(
    get,
    path = "/api/auth/profile",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "User information retrieved", body = ApiResponse<UserResponse>),
        (status = 401, description = "Unauthorized", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn get_profile(auth: AuthUser) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/auth/profile - {}", auth.id);
    let user = UserResponse::from(auth.user);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Successfully retrieved user data", user)))
}

/// Update the current user's profile
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated, fresh token issued", body = AuthResponse),
        (status = 400, description = "Validation error", body = crate::models::auth::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::models::auth::ErrorResponse),
        (status = 409, description = "Email already in use", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn update_profile(
    auth: AuthUser,
    db: web::Data<dyn Repository>,
    config: web::Data<AppConfig>,
    update_req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("PUT /api/auth/profile - {}", auth.id);
    update_req.validate()?;
    let update_req = update_req.into_inner();

    let password_hash = match &update_req.password {
        Some(password) => Some(hash_password(password, &config)?),
        None => None,
    };

    let user = db
        .update_user(
            auth.id,
            UserChanges {
                name: update_req.name.map(|name| name.trim().to_string()),
                email: update_req.email,
                password_hash,
                profile_image_url: update_req.profile_image_url,
            },
        )
        .await?;

    let token = issue_token(&user, &config)?;
    log::info!("Profile updated for user: {}", user.email);
    Ok(HttpResponse::Ok().json(AuthResponse::new(user, token)))
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/profile", web::get().to(get_profile))
            .route("/profile", web::put().to(update_profile))
            .route("/upload-image", web::post().to(super::file::upload_image)),
    );
}
