//! Shared fixtures for HTTP-level tests.

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::{
    App, Error,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    test::TestRequest,
};

use crate::auth::{jwt::generate_access_token, password::hash_password};
use crate::config::Config;
use crate::model::{faculty::NewFaculty, role::Role};
use crate::routes;
use crate::store::{MemoryStore, RecordStore};

pub const BOUNDARY: &str = "portal-test-boundary";

pub struct TestPortal {
    pub store: Arc<MemoryStore>,
    pub config: Config,
}

impl TestPortal {
    pub fn new() -> Self {
        let config = Config::from_lookup(|key| {
            let value = match key {
                "SERVER_ADDR" => "127.0.0.1:0",
                "JWT_SECRET" => "test-secret",
                "STORE_BACKEND" => "memory",
                _ => return None,
            };
            Some(value.to_string())
        })
        .unwrap();
        Self {
            store: Arc::new(MemoryStore::new()),
            config,
        }
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse,
            Error = Error,
            InitError = (),
        > + use<>,
    > {
        let store: Arc<dyn RecordStore> = self.store.clone();
        let config = self.config.clone();
        App::new().configure(move |cfg| routes::configure_app(cfg, store, config))
    }

    fn token(&self, id: u64, username: &str, role: Role) -> String {
        generate_access_token(id, username.into(), role, &self.config.jwt_secret, 300).unwrap()
    }

    pub fn admin_token(&self) -> String {
        self.token(1, "admin", Role::Admin)
    }

    pub fn faculty_token(&self, username: &str) -> String {
        self.token(100, username, Role::Faculty)
    }

    pub async fn seed_admin(&self, username: &str, password: &str) {
        let hash = hash_password(password).unwrap();
        self.store.ensure_admin(username, &hash).await.unwrap();
    }

    pub async fn seed_faculty(&self, username: &str, name: &str, password: &str) -> u64 {
        self.store
            .insert_faculty(&NewFaculty {
                name: name.into(),
                username: username.into(),
                password_hash: hash_password(password).unwrap(),
                department: Some("Mathematics".into()),
                designation: Some("Lecturer".into()),
                base_salary: 40000.0,
            })
            .await
            .unwrap()
    }
}

pub fn peer() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 40000))
}

/// Request from a fixed peer, so rate limiting can key it.
pub fn from_peer(req: TestRequest) -> TestRequest {
    req.peer_addr(peer())
}

pub fn bearer(req: TestRequest, token: &str) -> TestRequest {
    from_peer(req).insert_header(("Authorization", format!("Bearer {token}")))
}

/// A `multipart/form-data` body with one CSV file part and plain text parts.
pub fn multipart(file_name: &str, csv: &str, texts: &[(&str, &str)]) -> (String, Vec<u8>) {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {csv}\r\n"
    );
    for (name, value) in texts {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    (
        format!("multipart/form-data; boundary={BOUNDARY}"),
        body.into_bytes(),
    )
}
