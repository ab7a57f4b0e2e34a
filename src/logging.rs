use env_logger::Env;

/// Logger for the CLI and daemon; `RUST_LOG` overrides the default `info`.
pub fn init() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}
