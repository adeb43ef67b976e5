use sqlx::PgPool;

/// Pool-scoped command runner. One-shot queries implement
/// `kanau::processor::Processor` against this; transaction-scoped work
/// goes through the entities' `*_tx` methods instead.
#[derive(Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

/// Whether an error is a UNIQUE constraint violation.
///
/// Unique violations are normal control flow here: the idempotency row
/// and the settlement log both use them as serialization points and
/// recover instead of failing.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}
