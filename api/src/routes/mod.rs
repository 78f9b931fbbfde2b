//! HTTP route handlers, one module per resource
//!
//! Paths keep their trailing slash. List filters are read leniently from the
//! raw query string: values that do not parse are ignored.

pub mod auth;
pub mod bookings;
pub mod furniture;
pub mod health;
pub mod reviews;
pub mod services;
pub mod token;
pub mod users;

use std::collections::HashMap;

use actix_web::web;

use cm_shared::Pagination;

/// Raw query string parameters
pub type QueryParams = web::Query<HashMap<String, String>>;

pub(crate) fn param<'a>(query: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    query.get(key).map(String::as_str)
}

pub(crate) fn pagination(query: &HashMap<String, String>) -> Pagination {
    Pagination::from_query(param(query, "page"), param(query, "page_size"))
}

/// Register every route of the API
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::configure)
        .configure(auth::configure)
        .configure(token::configure)
        .configure(services::configure)
        .configure(bookings::configure)
        .configure(reviews::configure)
        .configure(users::configure)
        .configure(furniture::configure);
}
