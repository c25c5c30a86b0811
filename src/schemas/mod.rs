use std::collections::HashMap;

use serde::Serialize;

pub(crate) mod auth;
pub(crate) mod avatar;
pub(crate) mod course;
pub(crate) mod enrollment;
pub(crate) mod learning;
pub(crate) mod notification;
pub(crate) mod promo;
pub(crate) mod social;
pub(crate) mod user;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) docs_url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    pub(crate) message: String,
}

impl MessageResponse {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
