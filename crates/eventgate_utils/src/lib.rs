pub mod error;
pub mod logging;

pub use error::ServeError;

#[cfg(test)]
mod tests {
    use super::logging;
    use super::ServeError;

    #[test]
    fn logging_init_accepts_levels() {
        // Should not panic
        logging::init("info");
        logging::init("debug");
        logging::init("warn");
        logging::init("nonsense");
    }

    #[test]
    fn normalize_level_falls_back_to_info() {
        assert_eq!(logging::normalize_level("WARNING"), "warn");
        assert_eq!(logging::normalize_level(" debug "), "debug");
        assert_eq!(logging::normalize_level("loud"), "info");
    }

    #[test]
    fn bind_error_names_address() {
        let err = ServeError::Bind {
            addr: "0.0.0.0:80".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().contains("0.0.0.0:80"));
    }
}
