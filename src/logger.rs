//=========================================================================
// Console Logger
//=========================================================================
//
// `env_logger` backend for the `log` macros used across the crate.
//
// Output:
//   [2026/10/18 14:03:11] DEBUG stagehand::game: Launching fade ...
//
// `RUST_LOG` overrides the level passed to `init`.
//
//=========================================================================

use std::io::Write;

use log::LevelFilter;

/// Installs the console logger at `level` unless a logger is already set.
///
/// Returns false if another logger was installed first.
pub fn init(level: LevelFilter) -> bool {
    env_logger::Builder::new()
        .format(|buf, record| {
            let style = buf.default_level_style(record.level());
            let time = chrono::Local::now().format("%Y/%m/%d %H:%M:%S");

            writeln!(
                buf,
                "[{time}] {style}{:<5}{style:#} {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter(None, level)
        .parse_default_env()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        init(LevelFilter::Debug);
        assert!(!init(LevelFilter::Info));
    }
}
