use crate::{
    auth::{jwt::generate_access_token, password::verify_password},
    config::Config,
    error::AppError,
    models::{LoginReqDto, LoginResponse, LoginUser},
    store::RecordStore,
};
use actix_web::{HttpResponse, web};
use tracing::{debug, error, info, instrument};

/// Role-gated login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Role given and does not match the account")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(store, config, user),
    fields(username = %user.username, role = ?user.role)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    store: web::Data<dyn RecordStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(AppError::Validation("Username or password required".into()));
    }

    debug!("Fetching account");

    let account = match store.find_account(user.username.trim()).await? {
        Some(account) => account,
        None => {
            info!("Invalid credentials: user not found");
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        }
    };

    if let Err(e) = verify_password(&user.password, &account.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    if let Some(portal) = user.role {
        if account.role != portal {
            info!(account_role = %account.role, "Role does not match portal");
            return Err(AppError::Forbidden(format!(
                "Access denied. The user role does not match the {portal} portal."
            )));
        }
    }

    let token = generate_access_token(
        account.id,
        account.username.clone(),
        account.role,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign access token");
        AppError::Internal(e.to_string())
    })?;

    info!("Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        user: LoginUser {
            id: account.id,
            username: account.username,
            name: account.name,
            role: account.role,
        },
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{TestPortal, from_peer};
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    fn login_request(username: &str, password: &str, role: &str) -> test::TestRequest {
        from_peer(test::TestRequest::post().uri("/auth/login")).set_json(json!({
            "username": username,
            "password": password,
            "role": role
        }))
    }

    #[actix_web::test]
    async fn faculty_logs_in_and_token_opens_own_history() {
        let portal = TestPortal::new();
        portal.seed_faculty("jdoe", "Jane Doe", "pw").await;
        let app = test::init_service(portal.app()).await;

        let body: Value =
            test::call_and_read_body_json(&app, login_request("jdoe", "pw", "faculty").to_request())
                .await;
        assert_eq!(body["user"]["role"], "faculty");
        assert_eq!(body["user"]["name"], "Jane Doe");
        let token = body["token"].as_str().unwrap();

        let req = from_peer(test::TestRequest::get().uri("/api/salary/history"))
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn seeded_admin_logs_into_admin_portal() {
        let portal = TestPortal::new();
        portal.seed_admin("root", "hunter2").await;
        let app = test::init_service(portal.app()).await;

        let resp =
            test::call_service(&app, login_request("root", "hunter2", "admin").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn bad_credentials_are_unauthorized() {
        let portal = TestPortal::new();
        portal.seed_faculty("jdoe", "Jane Doe", "pw").await;
        let app = test::init_service(portal.app()).await;

        for (username, password) in [("jdoe", "wrong"), ("nobody", "pw")] {
            let req = login_request(username, password, "faculty").to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{username}");
        }
    }

    #[actix_web::test]
    async fn role_mismatch_is_forbidden() {
        let portal = TestPortal::new();
        portal.seed_faculty("jdoe", "Jane Doe", "pw").await;
        let app = test::init_service(portal.app()).await;

        let resp =
            test::call_service(&app, login_request("jdoe", "pw", "admin").to_request()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body["message"],
            "Access denied. The user role does not match the admin portal."
        );
    }

    #[actix_web::test]
    async fn login_without_role_is_served_under_the_api_prefix() {
        let portal = TestPortal::new();
        portal.seed_faculty("jdoe", "Jane Doe", "pw").await;
        let app = test::init_service(portal.app()).await;

        for uri in ["/api/auth/login", "/auth/login"] {
            let req = from_peer(test::TestRequest::post().uri(uri))
                .set_json(json!({ "username": "jdoe", "password": "pw" }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");
            let body: Value = test::read_body_json(resp).await;
            // the dashboard checks the role itself
            assert_eq!(body["user"]["role"], "faculty");
        }

        let req = from_peer(test::TestRequest::post().uri("/api/auth/login"))
            .set_json(json!({ "username": "jdoe", "password": "nope" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn empty_credentials_are_a_bad_request() {
        let portal = TestPortal::new();
        let app = test::init_service(portal.app()).await;
        let resp = test::call_service(&app, login_request(" ", "", "admin").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
