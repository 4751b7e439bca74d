use env_logger::{Builder, Env};

/// Initialise logging: `info` by default, `debug` when verbose.
/// `RUST_LOG` takes precedence over both.
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default))
        .format_timestamp(None)
        .format_target(false)
        .init();
}
