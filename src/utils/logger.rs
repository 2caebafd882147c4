//! Programmatic `log4rs` configuration for the index engine.
//!
//! The engine never initializes logging on its own; callers decide whether
//! and where to route log output. A process embedding this crate is free to
//! install its own `log` backend instead.

/// Initializes logging to `{base}/{db_name}_logs/{db_name}.log`, a rolling
/// file appender with a 10 MiB trigger and 7-file retention.
///
/// # Errors
/// Returns an error if the directory cannot be created or the logger fails
/// to initialize.
pub fn init_for_db_in(
    base_dir: &std::path::Path,
    db_name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    use log::LevelFilter;
    use log4rs::append::rolling_file::RollingFileAppender;
    use log4rs::append::rolling_file::policy::compound::{
        CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
    };
    use log4rs::config::{Appender, Config, Root};
    use log4rs::encode::pattern::PatternEncoder;
    use std::fs;
    use std::path::PathBuf;

    let mut dir = PathBuf::from(base_dir);
    dir.push(format!("{db_name}_logs"));
    fs::create_dir_all(&dir)?;

    let log_path = dir.join(format!("{db_name}.log"));
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}", dir.join(format!("{db_name}.{{}}.log")).display()), 7)?;
    let policy =
        CompoundPolicy::new(Box::new(SizeTrigger::new(10 * 1024 * 1024)), Box::new(roller));
    let appender = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}")))
        .build(log_path, Box::new(policy))?;

    let config = Config::builder()
        .appender(Appender::builder().build("app", Box::new(appender)))
        .build(Root::builder().appender("app").build(LevelFilter::Info))?;
    log4rs::init_config(config)?;
    Ok(())
}

/// Configures logging globally for the process from an explicit level.
/// `dir` defaults to the current directory; `level` defaults to `info`.
pub fn configure_logging(dir: Option<&std::path::Path>, level: Option<&str>, retention: Option<usize>) {
    use log::LevelFilter;
    use log4rs::append::rolling_file::RollingFileAppender;
    use log4rs::append::rolling_file::policy::compound::{
        CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
    };
    use log4rs::config::{Appender, Config, Root};
    use log4rs::encode::pattern::PatternEncoder;
    use std::path::PathBuf;

    let base = dir
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let keep = retention.unwrap_or(7) as u32;
    let lvl = match level.unwrap_or("info").to_ascii_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };
    let Ok(roller) = FixedWindowRoller::builder()
        .build(&format!("{}", base.join("app.{}.log").display()), keep)
    else {
        return;
    };
    let policy =
        CompoundPolicy::new(Box::new(SizeTrigger::new(10 * 1024 * 1024)), Box::new(roller));
    let Ok(appender) = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}")))
        .build(base.join("app.log"), Box::new(policy))
    else {
        return;
    };
    if let Ok(config) = Config::builder()
        .appender(Appender::builder().build("app", Box::new(appender)))
        .build(Root::builder().appender("app").build(lvl))
    {
        let _ = log4rs::init_config(config);
    }
}

/// Configures logging from environment variables if present:
/// `RTREE_LOG_DIR`, `RTREE_LOG_LEVEL`, `RTREE_LOG_RETENTION`.
pub fn configure_from_env() {
    let dir = std::env::var("RTREE_LOG_DIR").ok().map(std::path::PathBuf::from);
    let level = std::env::var("RTREE_LOG_LEVEL").ok();
    let retention =
        std::env::var("RTREE_LOG_RETENTION").ok().and_then(|s| s.parse::<usize>().ok());
    configure_logging(dir.as_deref(), level.as_deref(), retention);
}
