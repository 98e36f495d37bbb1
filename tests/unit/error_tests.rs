//! Unit tests for `AppError` display formatting.

use command_relay::AppError;

#[test]
fn every_variant_is_prefixed_with_its_category() {
    let cases = [
        (AppError::Config("x".into()), "config: x"),
        (AppError::Bind("x".into()), "bind: x"),
        (AppError::Io("x".into()), "io: x"),
        (AppError::Protocol("x".into()), "protocol: x"),
        (AppError::QueueClosed("x".into()), "queue closed: x"),
    ];

    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn error_message_no_trailing_period() {
    let err = AppError::Bind("cannot listen on 0.0.0.0:6666".into());
    let s = err.to_string();
    assert!(
        !s.ends_with('.'),
        "error message must not end with a period: {s}"
    );
}

#[test]
fn toml_errors_map_to_config() {
    let parse_err = toml::from_str::<toml::Value>("port = ").expect_err("invalid toml");
    let err = AppError::from(parse_err);
    assert!(matches!(err, AppError::Config(_)));
    assert!(err.to_string().starts_with("config: invalid config:"));
}

#[test]
fn app_error_is_std_error() {
    fn assert_error<E: std::error::Error>(_: &E) {}
    assert_error(&AppError::Io("reset".into()));
}

#[test]
fn io_errors_map_to_io() {
    let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset");
    let err = AppError::from(io);
    assert!(matches!(err, AppError::Io(_)));
    assert_eq!(err.to_string(), "io: peer reset");
}
