use super::ApiError;

pub const MAX_LIMIT: u64 = 100;

pub fn validate_id(raw: &str, resource: &str) -> Result<i32, ApiError> {
    match raw.trim().parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::validation(format!("Invalid {resource} ID"))),
    }
}

pub fn validate_limit(limit: u64) -> Result<u64, ApiError> {
    const MIN_LIMIT: u64 = 1;

    if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::validation(format!(
            "Invalid limit: {limit}. Limit must be between {MIN_LIMIT} and {MAX_LIMIT}"
        )));
    }
    Ok(limit)
}

pub fn validate_search_query(query: &str) -> Result<&str, ApiError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Search query is required"));
    }
    Ok(trimmed)
}

pub fn validate_external_id(id: &str) -> Result<&str, ApiError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("IMDb ID is required"));
    }
    if trimmed.len() > 32 || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::validation("Invalid IMDb ID"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert_eq!(validate_id("5", "film").unwrap(), 5);
        assert!(validate_id("0", "film").is_err());
        assert!(validate_id("-3", "film").is_err());
        assert!(validate_id("abc", "film").is_err());
    }

    #[test]
    fn test_validate_limit() {
        assert!(validate_limit(1).is_ok());
        assert!(validate_limit(100).is_ok());
        assert!(validate_limit(0).is_err());
        assert!(validate_limit(101).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  heat ").unwrap(), "heat");
        assert!(validate_search_query("   ").is_err());
    }

    #[test]
    fn test_validate_external_id() {
        assert_eq!(validate_external_id("tt0113277").unwrap(), "tt0113277");
        assert!(validate_external_id("").is_err());
        assert!(validate_external_id("tt01/../x").is_err());
    }
}
