use std::sync::Arc;

use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpResponse, middleware::from_fn, web};
use serde_json::json;

use crate::{
    api::{attendance, dashboard},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};

/// Per-peer limiter allowing `requests_per_min` with the same burst.
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond((60_000 / u64::from(requests_per_min)).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.route("/health", web::get().to(health));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter)
                    .route(web::post().to(handlers::register)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/auth")
                    .route("/me", web::get().to(handlers::me))
                    .route("/profile", web::put().to(handlers::update_profile)),
            )
            .service(
                web::scope("/attendance")
                    .route("/checkin", web::post().to(attendance::check_in))
                    .route("/checkout", web::post().to(attendance::check_out))
                    .route("/today", web::get().to(attendance::today))
                    .route("/my-history", web::get().to(attendance::my_history))
                    .route("/my-summary", web::get().to(attendance::my_summary))
                    .route("/all", web::get().to(attendance::all_records))
                    .route("/employee/{id}", web::get().to(attendance::employee_records))
                    .route("/summary", web::get().to(attendance::team_summary))
                    .route("/mark-absent", web::post().to(attendance::mark_absent))
                    .route("/export", web::get().to(attendance::export))
                    .route("/today-status", web::get().to(attendance::today_status)),
            )
            .service(
                web::scope("/dashboard")
                    .route("/employee", web::get().to(dashboard::employee))
                    .route("/manager", web::get().to(dashboard::manager)),
            ),
    );
}
