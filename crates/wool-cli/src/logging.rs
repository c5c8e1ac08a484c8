use log::LevelFilter;

pub(crate) fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Logs go to stderr so the line protocol on stdout stays clean. `RUST_LOG`
/// refines the level picked by `-v`.
pub(crate) fn init_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level_for_verbosity(verbosity))
        .target(env_logger::Target::Stderr)
        .format_timestamp(None);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    // a second init (tests) keeps the first logger
    let _ = builder.try_init();
}
