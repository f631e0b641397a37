//! Provider selection through `acr_values`.

use crate::error::{FederationError, FederationResult};

const IDP_PREFIX: &str = "idp";

/// Extracts the provider domain from `idp:<domain>` in `acr_values`.
///
/// The first `idp` value wins.
///
/// # Errors
///
/// Returns [`FederationError::InvalidParameter`] if no value names a
/// provider, or the `idp` value has no domain.
pub fn domain_from_acr<'a, I>(acr_values: I) -> FederationResult<String>
where
    I: IntoIterator<Item = &'a str>,
{
    for value in acr_values {
        let mut parts = value.splitn(2, ':');
        if parts.next() == Some(IDP_PREFIX) {
            return match parts.next() {
                Some(domain) if !domain.is_empty() => Ok(domain.to_string()),
                _ => Err(FederationError::InvalidParameter(
                    "Invalid acr parameter".to_string(),
                )),
            };
        }
    }

    Err(FederationError::InvalidParameter(
        "Domain is not set in acr parameter".to_string(),
    ))
}
