use crate::{
    db::error::{DbError, DbResult},
    models::Gender,
};

/// Parse a gender column, returning a DbError on unknown values
pub fn parse_gender(s: &str) -> DbResult<Gender> {
    s.parse()
        .map_err(|e: String| DbError::Internal(format!("Invalid gender in database: {}", e)))
}
