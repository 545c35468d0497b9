//! Classify curl errors and pipeline errors into retry policy error kinds.

use crate::error::Error;
use crate::retry::policy::ErrorKind;

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify a pipeline error. Only fetch failures carry a retryable kind;
/// everything else is final for the current attempt.
pub fn classify(e: &Error) -> ErrorKind {
    match e {
        Error::Transfer { kind, .. } => *kind,
        _ => ErrorKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curl_timeout_and_connect() {
        // CURLE_OPERATION_TIMEDOUT = 28, CURLE_COULDNT_CONNECT = 7
        assert_eq!(classify_curl_error(&curl::Error::new(28)), ErrorKind::Timeout);
        assert_eq!(classify_curl_error(&curl::Error::new(7)), ErrorKind::Connection);
    }

    #[test]
    fn curl_login_denied_is_other() {
        // CURLE_LOGIN_DENIED = 67
        assert_eq!(classify_curl_error(&curl::Error::new(67)), ErrorKind::Other);
    }

    #[test]
    fn only_transfer_errors_keep_their_kind() {
        let t = Error::Transfer {
            entry: "a".into(),
            kind: ErrorKind::Timeout,
            reason: "stalled".into(),
        };
        assert_eq!(classify(&t), ErrorKind::Timeout);
        let s = Error::SizeQuery {
            entry: "a".into(),
            reason: "550".into(),
        };
        assert_eq!(classify(&s), ErrorKind::Other);
    }
}
