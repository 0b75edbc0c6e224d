use super::ApiError;

const MAX_TOKEN_LEN: usize = 64;

pub fn validate_id(kind: &str, id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {kind} ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(id)
}

pub fn validate_token(token: &str) -> Result<&str, ApiError> {
    let trimmed = token.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_TOKEN_LEN {
        return Err(ApiError::validation("Invalid share token"));
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::validation(
            "Share token can only contain letters and digits",
        ));
    }
    Ok(trimmed)
}

pub fn validate_credentials<'a>(email: &'a str, password: &str) -> Result<&'a str, ApiError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }
    Ok(email)
}
