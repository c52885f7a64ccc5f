use mcp_gateway::AppError;

#[test]
fn display_prefixes_category() {
    let cases = [
        (AppError::Config("bad".into()), "config: bad"),
        (AppError::NotFound("x".into()), "not found: x"),
        (AppError::Launch("spawn".into()), "launch: spawn"),
        (AppError::Handshake("eof".into()), "handshake: eof"),
        (AppError::HandshakeTimeout("slow".into()), "handshake timeout: slow"),
        (AppError::Timeout("slow".into()), "timeout: slow"),
        (AppError::Transport("pipe".into()), "transport: pipe"),
        (AppError::Validation("neg".into()), "validation: neg"),
        (AppError::Io("disk".into()), "io: disk"),
        (AppError::Mcp("serve".into()), "mcp: serve"),
    ];

    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn io_error_converts() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: AppError = io.into();
    assert!(matches!(err, AppError::Io(ref msg) if msg == "gone"));
}

#[test]
fn json_error_converts_to_config() {
    let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: AppError = parse.into();
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn app_error_is_std_error() {
    fn assert_error<E: std::error::Error>(_: &E) {}
    assert_error(&AppError::Mcp("x".into()));
}
