use actix_web::{HttpResponse, Responder, get, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::Config;

pub mod faculty;
pub mod salary;

#[cfg(test)]
pub(crate) mod testing;

#[get("/")]
pub async fn index() -> impl Responder {
    "College portal API is running"
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    #[schema(example = "https://portal.example.edu/api")]
    pub api_base_url: String,
}

/// Runtime settings for the dashboard, so the browser bundle carries no
/// deployment-specific URLs.
#[utoipa::path(
    get,
    path = "/client-config",
    responses((status = 200, description = "Dashboard configuration", body = ClientConfig)),
    tag = "Portal"
)]
pub async fn client_config(config: web::Data<Config>) -> HttpResponse {
    HttpResponse::Ok().json(ClientConfig {
        api_base_url: config.api_base_url.clone(),
    })
}
