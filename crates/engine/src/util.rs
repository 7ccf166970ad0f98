use uuid::Uuid;

use crate::{LedgerError, LedgerResult};

/// Parses a stored id back into a [`Uuid`].
///
/// Rows are written from `Uuid` values, so a malformed id means the row was
/// tampered with or the store is corrupt.
pub(crate) fn parse_uuid(value: &str, label: &str) -> LedgerResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|err| LedgerError::Storage(format!("malformed {label} id {value:?}: {err}")))
}
