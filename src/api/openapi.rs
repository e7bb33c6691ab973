use super::handlers::{admin, auth, health, notes};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Same wiring as the served router; only the generated document is kept.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Register new endpoints here via `.routes(routes!(...))` so they are both
/// served and documented. Handlers sharing a path go in one `routes!` call.
pub(crate) fn api_router() -> OpenApiRouter {
    // `routes!` reads #[utoipa::path] to bind HTTP method + path and add the route to OpenAPI.
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(auth::verification::send_code))
        .routes(routes!(auth::verification::confirm))
        .routes(routes!(auth::register::register))
        .routes(routes!(auth::login::login))
        .routes(routes!(auth::session::session))
        .routes(routes!(auth::session::logout))
        .routes(routes!(auth::reset::reset_password))
        .routes(routes!(auth::deactivate::deactivate))
        .routes(routes!(notes::notes::list_notes, notes::notes::create_note))
        .routes(routes!(
            notes::notes::get_note,
            notes::notes::update_note,
            notes::notes::delete_note
        ))
        .routes(routes!(notes::password::verify_note_password))
        .routes(routes!(notes::short::resolve_short))
        .routes(routes!(admin::lookup_account, admin::set_audit_flag));

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Accounts, sessions, and email verification".to_string());

    let mut notes_tag = Tag::new("notes");
    notes_tag.description = Some("Note CRUD, password gates, and short links".to_string());

    let mut admin_tag = Tag::new("admin");
    admin_tag.description = Some("Operator-only moderation controls".to_string());

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Liveness and build metadata".to_string());

    router.get_openapi_mut().tags = Some(vec![auth_tag, notes_tag, admin_tag, health_tag]);

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Seed the document from Cargo.toml metadata instead of crate defaults.
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
    // Cargo authors are `;` separated and may be "Name <email>".
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

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    if let Some(start) = author.find('<') {
        let name = author[..start].trim();
        let email = author[start + 1..].trim_end_matches('>').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        let email = if email.is_empty() { None } else { Some(email) };
        (name, email)
    } else {
        let name = author.trim();
        (if name.is_empty() { None } else { Some(name) }, None)
    }
}
