#[cfg(test)]
mod config_tests {
    use crate::config::{
        default_database_url, default_host, default_jwt_issuer, default_log_level,
        default_max_request_size, default_port, default_service_name, default_timeout, Config,
        ConfigError, ServerConfig,
    };
    use std::time::Duration;

    fn settings(overrides: &[(&str, &str)]) -> config::Config {
        let mut builder = config::Config::builder();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_settings(&settings(&[])).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.request_timeout_seconds, 30);
        assert_eq!(config.server.max_request_size, 1024 * 1024);
        assert_eq!(config.database.database_url, "sqlite://data/restaurant.db");
        assert_eq!(config.database.max_connections, 5);
        assert!(config.database.seed_on_startup);
        assert!(!config.database.recreate_on_startup);
        assert_eq!(config.auth.token_ttl_minutes, 1440);
        assert_eq!(config.observability.service_name, "restaurant-rs");
        assert!(config.observability.otlp_endpoint.is_none());

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_settings(&settings(&[
            ("port", "9000"),
            ("database_url", "sqlite::memory:"),
            ("recreate_on_startup", "true"),
            ("jwt_secret", "an-overridden-secret-value"),
            ("otlp_endpoint", "http://collector:4317"),
            ("log_level", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.database_url, "sqlite::memory:");
        assert!(config.database.recreate_on_startup);
        assert_eq!(config.auth.jwt_secret, "an-overridden-secret-value");
        assert_eq!(
            config.observability.otlp_endpoint.as_deref(),
            Some("http://collector:4317")
        );
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let base = Config::from_settings(&settings(&[])).unwrap();

        let mut config = base.clone();
        config.server.port = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { .. })
        ));

        let mut config = base.clone();
        config.server.request_timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.database.database_url = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.auth.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());

        let mut config = base;
        config.auth.token_ttl_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_auth_config_debug_redacts_secret() {
        let config = Config::from_settings(&settings(&[("jwt_secret", "super-secret-value-123")]))
            .unwrap();
        let debug = format!("{:?}", config.auth);

        assert!(!debug.contains("super-secret-value-123"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_server_config_request_timeout() {
        let config = ServerConfig {
            host: "localhost".to_string(),
            port: 8080,
            request_timeout_seconds: 45,
            max_request_size: 1024,
        };

        assert_eq!(config.request_timeout(), Duration::from_secs(45));
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_host(), "0.0.0.0");
        assert_eq!(default_port(), 8080);
        assert_eq!(default_timeout(), 30);
        assert_eq!(default_max_request_size(), 1024 * 1024);
        assert_eq!(default_database_url(), "sqlite://data/restaurant.db");
        assert_eq!(default_jwt_issuer(), "restaurant-rs");
        assert_eq!(default_service_name(), "restaurant-rs");
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn test_config_error_display() {
        let error = ConfigError::MissingEnvironmentVariable {
            name: "RESTAURANT_JWT_SECRET".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Environment variable missing: RESTAURANT_JWT_SECRET"
        );
    }
}
