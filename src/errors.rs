//! Error utilities

/// Describes error reason
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Conflict,
    AlreadyExists,
    Forbidden,
    Unauthorized,
    /// Request never got a response from the apiserver
    Unreachable,
    /// Catch-all variant. Since this enum is non-exhaustive,
    /// it should be handled with `_` pattern
    Unknown,
}

/// Tries to classify k8s error
pub fn classify(error_reason: &str) -> ErrorClass {
    match error_reason {
        "NotFound" => ErrorClass::NotFound,
        "Conflict" => ErrorClass::Conflict,
        "AlreadyExists" => ErrorClass::AlreadyExists,
        "Forbidden" => ErrorClass::Forbidden,
        "Unauthorized" => ErrorClass::Unauthorized,
        _ => ErrorClass::Unknown,
    }
}

/// Same as `classify`, but falls back to the HTTP status code
/// when the apiserver left `reason` empty.
fn classify_response(reason: &str, code: u16) -> ErrorClass {
    match (classify(reason), code) {
        (ErrorClass::Unknown, 401) => ErrorClass::Unauthorized,
        (ErrorClass::Unknown, 403) => ErrorClass::Forbidden,
        (ErrorClass::Unknown, 404) => ErrorClass::NotFound,
        (ErrorClass::Unknown, 409) => ErrorClass::Conflict,
        (class, _) => class,
    }
}

/// Tries to classify k8s error, wrapped in kube Error
pub fn classify_kube(error: &kube::Error) -> ErrorClass {
    match error {
        kube::Error::Api(api) => classify_response(&api.reason, api.code),
        kube::Error::HyperError(_) | kube::Error::Service(_) => ErrorClass::Unreachable,
        _ => ErrorClass::Unknown,
    }
}

#[cfg(test)]
pub(crate) fn api_error(reason: &str, code: u16) -> kube::Error {
    kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("synthetic {} error", reason),
        reason: reason.to_string(),
        code,
    })
}

/// Error of a request that never reached the apiserver
#[cfg(test)]
pub(crate) fn transport_error() -> kube::Error {
    kube::Error::Service(Box::new(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "connection refused",
    )))
}
