use env_logger::{Builder, Env};

/// Set up diagnostic logging on stderr.
///
/// std looks up the stderr handle on every write, so this can be done before
/// the console is attached and still follow it afterwards.
pub fn init(filter: Option<&str>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    if let Some(filter) = filter {
        builder.parse_filters(filter);
    }

    if let Err(e) = builder.try_init() {
        eprintln!("Logging already initialised: {}", e);
    }
}
