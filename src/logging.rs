use std::path::Path;

use flexi_logger::{
    colored_default_format, opt_format, Cleanup, Criterion, Duplicate, FileSpec, Logger,
    LoggerHandle, Naming,
};

/// Starts the global logger. The level comes from `RUST_LOG`, or `default_level`.
///
/// Logs go to stderr; with a `log_dir` they also go to size-rotated files
/// there. Keep the returned handle alive for as long as logging is needed.
pub fn setup_logging(default_level: &str, log_dir: Option<&Path>) -> crate::Result<LoggerHandle> {
    let logger = Logger::try_with_env_or_str(default_level)?;

    let logger = match log_dir {
        Some(dir) => logger
            .log_to_file(FileSpec::default().directory(dir).basename("oddest_one_out"))
            .format_for_files(opt_format)
            .format_for_stderr(colored_default_format)
            .duplicate_to_stderr(Duplicate::All)
            .rotate(
                Criterion::Size(10 * 1024 * 1024),
                Naming::Numbers,
                Cleanup::KeepLogFiles(7),
            ),
        None => logger.log_to_stderr().format(colored_default_format),
    };

    Ok(logger.start()?)
}
