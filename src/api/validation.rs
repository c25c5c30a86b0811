use crate::api::errors::ApiError;
use std::path::Path;
use validator::Validate;

/// Runs the `validator` rules of a request body and reports failures as 400.
pub(crate) fn validate_payload<T: Validate>(payload: &T) -> Result<(), ApiError> {
    payload.validate().map_err(|errors| ApiError::BadRequest(errors.to_string()))
}

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn validate_password_len(password: &str) -> Result<(), ApiError> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )))
    }
}

/// Lowercased extension of an uploaded file name.
pub(crate) fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub(crate) fn validate_upload(
    filename: &str,
    content_type: &str,
    is_allowed_extension: impl Fn(&str) -> bool,
) -> Result<(), ApiError> {
    let extension = file_extension(filename)
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))?;

    if !is_allowed_extension(&extension) {
        return Err(ApiError::BadRequest(format!("File extension '{extension}' is not allowed")));
    }

    let mime = content_type.trim().to_ascii_lowercase();
    if mime_allowed_for_extension(&mime, &extension) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "MIME type '{mime}' does not match extension '.{extension}'"
        )))
    }
}

fn mime_allowed_for_extension(mime: &str, extension: &str) -> bool {
    match extension {
        "jpg" | "jpeg" => matches!(mime, "image/jpeg" | "image/jpg"),
        "png" => mime == "image/png",
        "webp" => mime == "image/webp",
        "gif" => mime == "image/gif",
        "pdf" => mime == "application/pdf",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Settings;
    use crate::test_support;

    fn allowed(extension: &str) -> bool {
        ["jpg", "jpeg", "png", "webp", "pdf"].contains(&extension)
    }

    #[derive(Validate)]
    struct Titled {
        #[validate(length(min = 1, message = "title must not be empty"))]
        title: String,
    }

    #[test]
    fn payload_rules_become_bad_request() {
        assert!(validate_payload(&Titled { title: "Intro".to_string() }).is_ok());
        match validate_payload(&Titled { title: String::new() }) {
            Err(ApiError::BadRequest(message)) => {
                assert!(message.contains("title must not be empty"), "message: {message}")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn password_length_counts_chars() {
        assert!(validate_password_len("short").is_err());
        assert!(validate_password_len("long-enough").is_ok());
    }

    #[test]
    fn upload_accepts_matching_mime() {
        assert!(validate_upload("receipt.PNG", "image/png", allowed).is_ok());
        assert!(validate_upload("receipt.pdf", "application/pdf", allowed).is_ok());
    }

    #[test]
    fn upload_rejects_mismatch_and_unknown() {
        assert!(validate_upload("receipt.png", "image/jpeg", allowed).is_err());
        assert!(validate_upload("receipt.exe", "application/octet-stream", allowed).is_err());
        assert!(validate_upload("receipt", "image/png", allowed).is_err());
    }

    #[tokio::test]
    async fn receipt_extensions_follow_storage_settings() {
        let _guard = test_support::env_lock().await;
        std::env::set_var("SECRET_KEY", "test-secret");
        std::env::set_var("ALLOWED_RECEIPT_EXTENSIONS", "png,pdf");
        let settings = Settings::load().expect("settings");
        std::env::remove_var("ALLOWED_RECEIPT_EXTENSIONS");

        let is_allowed = |ext: &str| settings.storage().is_allowed_receipt_extension(ext);

        assert!(validate_upload("receipt.PDF", "application/pdf", is_allowed).is_ok());
        let err = validate_upload("receipt.jpg", "image/jpeg", is_allowed).unwrap_err();
        match err {
            ApiError::BadRequest(message) => assert_eq!(message, "File extension 'jpg' is not allowed"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
