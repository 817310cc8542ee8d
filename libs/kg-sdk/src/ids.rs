//! Absolute instance identifiers.
//!
//! The KG identifies instances by `<id-namespace><uuid>`, e.g.
//! `https://kg.ebrains.eu/api/instances/3e0f3b5e-6d3c-4a55-9d4a-0b7c4d4c1c2a`.

use uuid::Uuid;

/// Extract the UUID from an absolute identifier.
///
/// Accepts identifiers with or without the namespace prefix. Anything that
/// is not a UUID once the prefix is stripped yields `None`.
#[must_use]
pub fn uuid_from_absolute_id(id: &str, id_namespace: &str) -> Option<Uuid> {
    let bare = id.strip_prefix(id_namespace).unwrap_or(id);
    Uuid::parse_str(bare).ok()
}

/// Absolute identifier of `uuid` in `id_namespace`.
#[must_use]
pub fn absolute_id(uuid: Uuid, id_namespace: &str) -> String {
    format!("{id_namespace}{uuid}")
}
