//! Upload validation and object key layout.
//!
//! Keys are namespaced per uploading user: `uploads/{user_id}/{uuid}.{ext}`.

use uuid::Uuid;

use super::error::StorageError;

/// Prefix every uploaded key starts with.
pub const UPLOAD_PREFIX: &str = "uploads";

/// Validate the declared size and content type of an upload.
pub fn validate_upload(size: u64, content_type: &str, max_size: u64) -> Result<(), StorageError> {
    if size == 0 {
        return Err(StorageError::Rejected("El archivo está vacío".into()));
    }
    if size >= max_size {
        return Err(StorageError::Rejected(format!(
            "El archivo debe pesar menos de {} MB",
            max_size / (1024 * 1024)
        )));
    }
    if !content_type.starts_with("image/") || content_type.len() <= "image/".len() {
        return Err(StorageError::Rejected(
            "Solo se permiten archivos de imagen".into(),
        ));
    }
    Ok(())
}

/// Pick a file extension for the upload.
///
/// The extension comes from the original filename when it matches the
/// content type, otherwise from the content type itself.
pub fn extension_for(filename: &str, content_type: &str) -> String {
    let known = mime_guess::get_mime_extensions_str(content_type).unwrap_or(&[]);

    let from_name = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| known.contains(&ext.as_str()));

    from_name
        .or_else(|| known.first().map(|ext| ext.to_string()))
        .unwrap_or_else(|| "bin".to_string())
}

/// Generate a fresh random key in the user's namespace.
pub fn generate_upload_key(user_id: i32, filename: &str, content_type: &str) -> String {
    format!(
        "{UPLOAD_PREFIX}/{user_id}/{}.{}",
        Uuid::now_v7(),
        extension_for(filename, content_type)
    )
}

/// Check that `key` was generated for `user_id` and contains no traversal.
pub fn ensure_owned_key(key: &str, user_id: i32) -> Result<(), StorageError> {
    let prefix = format!("{UPLOAD_PREFIX}/{user_id}/");
    let Some(name) = key.strip_prefix(&prefix) else {
        return Err(StorageError::InvalidKey(key.to_string()));
    };
    if name.is_empty() || name.contains('/') || name.contains("..") {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
