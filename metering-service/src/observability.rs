use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber on stderr, keeping stdout free for the binaries' output.
///
/// `RUST_LOG` overrides the default `metering_service=info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("metering_service=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
