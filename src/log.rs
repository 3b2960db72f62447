//! Console logging setup over the `log` facade. All modules log through
//! the standard macros; this only installs the backend.

use std::sync::OnceLock;

use log::LevelFilter;
use log4rs::Handle;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

static HANDLE: OnceLock<Handle> = OnceLock::new();

fn console_config(level: LevelFilter) -> Config {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {h({l})} {t} - {m}{n}")))
        .build();
    Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .expect("static logging configuration is well-formed")
}

/// Installs a console logger at the given level, or reconfigures the level
/// if one is already installed.
pub fn enable_logging(level: LevelFilter) {
    match HANDLE.get() {
        Some(handle) => handle.set_config(console_config(level)),
        None => {
            let handle = log4rs::init_config(console_config(level))
                .expect("a logger was already installed");
            let _ = HANDLE.set(handle);
        }
    }
}
