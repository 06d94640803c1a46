use crate::error::ApiError;

fn invalid(msg: &str) -> ApiError {
    ApiError::InvalidInput(msg.to_string())
}

pub fn agent_input(name: &str, description: &str) -> Result<(), ApiError> {
    if name.is_empty() {
        return Err(invalid("name is required"));
    }
    if name.len() > 50 {
        return Err(invalid("name must be 50 characters or less"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(invalid("name cannot contain whitespace"));
    }
    if description.len() > 500 {
        return Err(invalid("description must be 500 characters or less"));
    }
    Ok(())
}

pub fn listing_input(name: &str, url: &str, description: &str) -> Result<(), ApiError> {
    if name.is_empty() {
        return Err(invalid("name is required"));
    }
    if name.len() > 100 {
        return Err(invalid("name must be 100 characters or less"));
    }
    if url.is_empty() {
        return Err(invalid("url is required"));
    }
    if url.len() > 500 {
        return Err(invalid("url must be 500 characters or less"));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(invalid("url must start with http:// or https://"));
    }
    if description.len() > 2000 {
        return Err(invalid("description must be 2000 characters or less"));
    }
    Ok(())
}

pub fn comment_body(body: &str) -> Result<(), ApiError> {
    if body.is_empty() {
        return Err(invalid("body is required"));
    }
    if body.len() > 1000 {
        return Err(invalid("comment must be 1000 characters or less"));
    }
    Ok(())
}

pub fn search_query(q: &str) -> Result<(), ApiError> {
    if q.is_empty() {
        return Err(invalid("q parameter is required"));
    }
    if q.len() > 200 {
        return Err(invalid("search query too long"));
    }
    Ok(())
}
