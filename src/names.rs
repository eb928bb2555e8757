// 🔤 Name Reconciler - normalized-name policy shared by every dedup path
//
// "ACME  Corp", " ACME Corp" and "ACME\tCorp" are the same name; "acme corp"
// is not (comparison stays case-sensitive). Single-entity creates and the
// bulk importer both go through these functions so they dedupe identically.

use crate::error::{Error, Result};

/// Anything that can take part in normalized-name lookup
pub trait Named {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

/// Trim both ends and collapse every inner whitespace run to one space
pub fn normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Linear scan of an owner's entities for one whose normalized name matches
pub fn find_by_normalized_name<'a, T: Named>(candidates: &'a [T], normalized: &str) -> Option<&'a T> {
    candidates
        .iter()
        .find(|candidate| normalize(candidate.name()) == normalized)
}

/// Fail with `Conflict` when a different entity already owns `normalized`.
///
/// `exclude_id` is the entity being updated, if any.
pub fn ensure_name_available<T: Named>(
    candidates: &[T],
    normalized: &str,
    exclude_id: Option<&str>,
    entity: &str,
) -> Result<()> {
    let clash = candidates
        .iter()
        .filter(|candidate| Some(candidate.id()) != exclude_id)
        .find(|candidate| normalize(candidate.name()) == normalized);

    match clash {
        Some(existing) => Err(Error::Conflict(format!(
            "{} named \"{}\" already exists ({})",
            entity,
            normalized,
            existing.id()
        ))),
        None => Ok(()),
    }
}

/// Normalize a user-supplied name and enforce non-empty + length cap
pub fn validated_name(raw: &str, field: &str, max_len: usize) -> Result<String> {
    let name = normalize(raw);
    if name.is_empty() {
        return Err(Error::validation(field, "must not be empty"));
    }
    check_length(&name, field, max_len)?;
    Ok(name)
}

/// Normalize optional free text; blank input becomes None
pub fn validated_optional_text(raw: Option<&str>, field: &str, max_len: usize) -> Result<Option<String>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => {
            check_length(text, field, max_len)?;
            Ok(Some(text.to_string()))
        }
        None => Ok(None),
    }
}

pub fn check_length(value: &str, field: &str, max_len: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max_len {
        return Err(Error::validation(
            field,
            format!("exceeds {} characters (got {})", max_len, len),
        ));
    }
    Ok(())
}
