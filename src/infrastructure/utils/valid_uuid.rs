use uuid::Uuid;

use crate::errors::AppError;

/// Parses a path id, answering 400 instead of a routing 404 for malformed values.
pub fn valid_uuid(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id.trim()).map_err(|_| AppError::InvalidInput("Invalid UUID format".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_ids() {
        assert!(valid_uuid("not-a-uuid").is_err());
        assert!(valid_uuid(" 67e55044-10b1-426f-9247-bb680e5fe0c8 ").is_ok());
    }
}
