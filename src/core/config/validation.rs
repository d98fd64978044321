use serde_json::{Map, Value};
use crate::core::errors::ApiError;

const KNOWN_PROVIDERS: [&str; 2] = ["gemini", "lmstudio"];

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    for section_name in ["llm", "embedding"] {
        if let Some(section) = expect_optional_object(root, section_name)? {
            validate_provider_field(section, &format!("{}.provider", section_name))?;
            validate_optional_string_field(
                section,
                &format!("{}.model", section_name),
                "model",
            )?;
            validate_optional_string_field(
                section,
                &format!("{}.base_url", section_name),
                "base_url",
            )?;
            validate_optional_string_field(
                section,
                &format!("{}.api_key_env", section_name),
                "api_key_env",
            )?;
            validate_u64_field(
                section,
                &format!("{}.timeout_secs", section_name),
                "timeout_secs",
                1,
                3_600,
            )?;
        }
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(llm, "llm.max_tokens", "max_tokens", 1, 1_000_000)?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_u64_field(embedding, "embedding.batch_size", "batch_size", 1, 100)?;
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(
            retrieval,
            "retrieval.candidate_k",
            "candidate_k",
            1,
            1_000,
        )?;
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 100)?;

        let candidate_k = retrieval
            .get("candidate_k")
            .and_then(Value::as_u64)
            .unwrap_or(10);
        let top_k = retrieval.get("top_k").and_then(Value::as_u64).unwrap_or(3);
        if top_k > candidate_k {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at 'retrieval.top_k': must not exceed candidate_k ({})",
                candidate_k
            )));
        }
    }

    if let Some(ingest) = expect_optional_object(root, "ingest")? {
        validate_optional_string_field(ingest, "ingest.manual_path", "manual_path")?;
        validate_bool_field(ingest, "ingest.strip_headers", "strip_headers")?;
    }

    if let Some(store) = expect_optional_object(root, "store")? {
        validate_optional_string_field(store, "store.path", "path")?;
    }

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65_535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
        validate_optional_string_field(server, "server.api_token", "api_token")?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_provider_field(section: &Map<String, Value>, path: &str) -> Result<(), ApiError> {
    let Some(value) = section.get("provider") else {
        return Ok(());
    };
    let Some(name) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if KNOWN_PROVIDERS.contains(&name.trim().to_lowercase().as_str()) {
        return Ok(());
    }
    Err(ApiError::BadRequest(format!(
        "Invalid config at '{}': unknown provider '{}' (expected one of {})",
        path,
        name,
        KNOWN_PROVIDERS.join(", ")
    )))
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
