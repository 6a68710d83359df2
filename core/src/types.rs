//! Shared primitive types used across the scoring engine.

/// A stable, unique identifier for one transaction, taken from the input
/// record (or the row ordinal when the record carries none).
pub type TransactionId = String;

/// The normalized identity velocity state is scoped by —
/// a trimmed, lower-cased email address.
pub type UserKey = String;
