//! OpenAPI router wiring and route registration.
//!
//! Routes are registered in three groups so the HTTP layer can wrap the
//! protected and admin groups in the session/role middleware while the
//! OpenAPI document still covers everything. Routes added outside (like `/`)
//! are intentionally not documented.

use super::handlers::{account, health};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated spec.
    let (_router, mut openapi) = public_router().split_for_parts();
    let (_router, protected) = protected_router().split_for_parts();
    let (_router, admin) = admin_router().split_for_parts();
    openapi.merge(protected);
    openapi.merge(admin);

    let mut account_tag = Tag::new("account");
    account_tag.description = Some("Authentication and session lifecycle".to_string());
    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Service health".to_string());
    openapi.tags = Some(vec![account_tag, health_tag]);

    openapi
}

/// Routes reachable without a bearer token.
///
/// Add new endpoints via `.routes(routes!(...))` so they are both served and
/// included in the generated spec.
pub(crate) fn public_router() -> OpenApiRouter {
    OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(account::login::authenticate))
        .routes(routes!(account::login::authorize))
        .routes(routes!(account::login::refresh_token))
        .routes(routes!(account::reset::forgot_password))
        .routes(routes!(account::reset::set_password))
}

/// Routes behind the session middleware.
pub(crate) fn protected_router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(account::login::logout))
        .routes(routes!(account::profile::me))
        .routes(routes!(account::profile::change_password))
}

/// Routes behind the session middleware plus the admin role gate.
pub(crate) fn admin_router() -> OpenApiRouter {
    OpenApiRouter::new().routes(routes!(account::profile::activate_user))
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match (author.find('<'), author.rfind('>')) {
        (Some(start), Some(end)) if start < end => {
            let name = author[..start].trim();
            let email = author[start + 1..end].trim();
            (
                (!name.is_empty()).then_some(name),
                (!email.is_empty()).then_some(email),
            )
        }
        _ => ((!author.is_empty()).then_some(author), None),
    }
}
