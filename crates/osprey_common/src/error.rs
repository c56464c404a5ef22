use thiserror::Error;

/// Convenience alias for `Result<T, OspreyError>`.
pub type OspreyResult<T> = Result<T, OspreyError>;

/// Error classification for surfacing decisions.
///
/// - `UserError`: bad input or an illegal statement shape; reported to
///   the client as a semantic error, never retried by the server.
/// - `InternalBug`: should never happen given catalog invariants; treated
///   as a server-side fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UserError,
    InternalBug,
}

/// Top-level error type that all crate-specific errors convert into.
#[derive(Error, Debug)]
pub enum OspreyError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Catalog lookup errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}

/// Insert-planning errors. One variant per failure mode of the plan
/// construction pipeline; all but `RetryExhausted` are user-facing
/// semantic errors.
#[derive(Error, Debug)]
pub enum PlanError {
    /// A generated column only partially depends on resolvable target
    /// columns in a partial update.
    #[error("Generated column {column} depends on columns missing from the target column list")]
    SchemaDependency { column: String },

    /// An explicit NULL literal was supplied for an AUTO_INCREMENT column.
    #[error(
        "`NULL` value is not supported for an AUTO_INCREMENT column: {column}. \
         You can use `default` for an AUTO_INCREMENT column"
    )]
    NullInAutoIncrement { column: String },

    /// A default expression the scalar translator cannot represent.
    #[error("Column {column} has unsupported default value: {expr}")]
    UnsupportedDefault { column: String, expr: String },

    /// A schema-change / materialized-view shadow column with no defining
    /// expression and no matching synchronized index.
    #[error(
        "The define expr of shadow column {column} is null, please check the \
         associated materialized view {index} of target table: {table}"
    )]
    MissingShadowDefinition {
        column: String,
        index: String,
        table: String,
    },

    /// Static partition insert into a lake table whose partition spec uses
    /// non-identity transforms.
    #[error("Static partition insert into table {table} requires identity partition transforms")]
    NonIdentityPartitionTransform { table: String },

    /// Optimistic retry budget exhausted: pathological DDL contention or
    /// a planner bug. Fatal, server-side.
    #[error("failed to generate plan for the statement after {elapsed_ms}ms ({attempts} attempts)")]
    RetryExhausted { elapsed_ms: u64, attempts: u32 },
}

impl OspreyError {
    /// Classify this error for surfacing decisions.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OspreyError::Catalog(_) => ErrorKind::UserError,
            OspreyError::Plan(PlanError::RetryExhausted { .. }) => ErrorKind::InternalBug,
            OspreyError::Plan(_) => ErrorKind::UserError,
            OspreyError::Internal(_) => ErrorKind::InternalBug,
        }
    }

    /// Returns true if this is a user/input error.
    pub fn is_user_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::UserError)
    }

    /// Returns true if this indicates a server-side fault.
    pub fn is_internal_bug(&self) -> bool {
        matches!(self.kind(), ErrorKind::InternalBug)
    }

    /// Emit a structured log entry for server-side faults. Called before
    /// surfacing an internal error to the client.
    pub fn log_if_internal(&self) {
        if self.is_internal_bug() {
            tracing::error!(error = %self, "internal planner fault");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_errors_are_user_errors() {
        let e = OspreyError::Plan(PlanError::SchemaDependency { column: "g".into() });
        assert_eq!(e.kind(), ErrorKind::UserError);
        assert!(e.is_user_error());
    }

    #[test]
    fn test_retry_exhausted_is_internal() {
        let e = OspreyError::Plan(PlanError::RetryExhausted {
            elapsed_ms: 120,
            attempts: 3,
        });
        assert_eq!(e.kind(), ErrorKind::InternalBug);
        assert!(e.to_string().contains("120ms"));
    }

    #[test]
    fn test_null_in_auto_increment_names_column() {
        let e = PlanError::NullInAutoIncrement { column: "id".into() };
        assert!(e.to_string().contains("id"));
        assert!(e.to_string().contains("AUTO_INCREMENT"));
    }

    #[test]
    fn test_missing_shadow_definition_names_index() {
        let e = PlanError::MissingShadowDefinition {
            column: "__mv_sum_v".into(),
            index: "agg_mv".into(),
            table: "metrics".into(),
        };
        assert!(e.to_string().contains("agg_mv"));
        assert!(e.to_string().contains("metrics"));
    }
}
