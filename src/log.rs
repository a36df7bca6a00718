use std::io::Write;

use env_logger::Builder;

/// Install the global logger, level is controlled by `RUST_LOG`.
///
/// Safe to call more than once, only the first call takes effect.
pub fn init_log() {
    let mut builder = Builder::from_default_env();
    let _ = builder
        .format_timestamp_secs()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}:{}] {}",
                record.level(),
                record.file().unwrap_or("?"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .try_init();
}
