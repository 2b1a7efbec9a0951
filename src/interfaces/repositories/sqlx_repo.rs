use sqlx::PgPool;

use crate::errors::AppError;

macro_rules! sqlx_repo {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Clone)]
            pub struct $name {
                pub pool: PgPool,
            }

            impl $name {
                pub fn new(pool: PgPool) -> Self {
                    $name { pool }
                }
            }
        )+
    };
}

sqlx_repo!(
    SqlxUserRepo,
    SqlxBlogRepo,
    SqlxEngagementRepo,
    SqlxPortfolioRepo,
    SqlxResumeRepo,
    SqlxContactRepo,
    SqlxSecurityEventRepo,
    SqlxMediaRepo,
);

/// Maps a unique-constraint violation on `constraint` to a 409 with `message`.
pub(crate) fn conflict_on(constraint: &'static str, message: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.constraint() == Some(constraint) {
                return AppError::Conflict(message.into());
            }
        }
        AppError::from(e)
    }
}

/// `%term%` with LIKE wildcards in the term escaped.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Errors with 404 when a write touched no row.
pub(crate) fn ensure_affected(result: sqlx::postgres::PgQueryResult, what: &str) -> Result<(), AppError> {
    if result.rows_affected() == 0 {
        Err(AppError::NotFound(format!("{what} not found")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(like_pattern("nmap"), "%nmap%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
    }
}
