use crate::ApiError;

pub fn join_base_path(base: &str, path: &str) -> Result<String, ApiError> {
    let base = base.trim();
    if base.is_empty() {
        return Err(ApiError::InvalidUrl("base_url is empty".to_string()));
    }
    if !base.starts_with("http://") && !base.starts_with("https://") {
        return Err(ApiError::InvalidUrl(format!(
            "base_url must start with http:// or https://: {base}"
        )));
    }
    let normalized_base = base.trim_end_matches('/');
    let normalized_path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    Ok(format!("{normalized_base}{normalized_path}"))
}
