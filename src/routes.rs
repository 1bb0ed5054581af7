use crate::{
    api::{self, faculty, salary},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    store::RecordStore,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_multipart::form::MultipartFormConfig;
use actix_web::{
    middleware::from_fn,
    web::{self, Data},
};
use std::sync::Arc;

/// Shared state plus every route. The outer middleware stack (CORS, access
/// log, path normalization) is added by `main`.
pub fn configure_app(cfg: &mut web::ServiceConfig, store: Arc<dyn RecordStore>, config: Config) {
    cfg.app_data(Data::from(store))
        .app_data(Data::new(config.clone()))
        .app_data(
            MultipartFormConfig::default()
                .total_limit(config.max_upload_bytes)
                .memory_limit(config.max_upload_bytes),
        )
        .service(api::index)
        .route("/client-config", web::get().to(api::client_config));

    configure(cfg, config);
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let per_ms = (60_000 / requests_per_min as u64).max(1);
        let cfg = GovernorConfigBuilder::default()
            .milliseconds_per_request(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap_or_else(GovernorConfig::default);
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes. Login is also served under the API prefix, where the
    // dashboard's `apiBaseUrl` points; it is registered ahead of the
    // protected scope so the auth middleware never sees it.
    cfg.service(
        web::resource("/auth/login")
            .wrap(login_limiter.clone())
            .route(web::post().to(handlers::login)),
    )
    .service(
        web::resource(format!("{}/auth/login", config.api_prefix))
            .wrap(login_limiter)
            .route(web::post().to(handlers::login)),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/faculty")
                    // /faculty
                    .service(
                        web::resource("")
                            .route(web::get().to(faculty::list_faculty))
                            .route(web::post().to(faculty::create_faculty)),
                    )
                    // /faculty/upload, ahead of /{id}
                    .service(
                        web::resource("/upload").route(web::post().to(faculty::upload_faculty)),
                    )
                    // /faculty/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(faculty::get_faculty))
                            .route(web::put().to(faculty::update_faculty))
                            .route(web::delete().to(faculty::delete_faculty)),
                    ),
            )
            .service(
                web::scope("/salary")
                    .service(
                        web::resource("/upload-monthly")
                            .route(web::post().to(salary::upload_monthly)),
                    )
                    .service(web::resource("/history").route(web::get().to(salary::history)))
                    // /salary/history/{year}/{month}
                    .service(
                        web::resource("/history/{year}/{month}")
                            .route(web::delete().to(salary::delete_period)),
                    )
                    .service(
                        web::resource("/download/{year}")
                            .route(web::get().to(salary::download_year)),
                    )
                    .service(
                        web::resource("/download/{year}/{month}")
                            .route(web::get().to(salary::download_month)),
                    )
                    .service(
                        web::resource("/report/{months}")
                            .route(web::get().to(salary::rolling_report)),
                    ),
            ),
    );
}

// LOGIN
//  └─ token (ACCESS_TOKEN_TTL seconds), role admin | faculty

// API REQUEST
//  └─ Authorization: Bearer token
//       ├─ admin: every operation, all faculty
//       └─ faculty: history and reports, own records only
