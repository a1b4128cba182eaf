/// Default locations stored in `~/.serimidi`
///
/// .
/// └── log
///    └── bridge.log
///
use std::path::PathBuf;

pub fn serimidi() -> Option<PathBuf> {
    Some(dirs::home_dir()?.join(".serimidi"))
}

pub fn log() -> Option<PathBuf> {
    Some(serimidi()?.join("log"))
}

pub fn log_file(name: &str) -> Option<PathBuf> {
    Some(log()?.join(format!("{name}.log")))
}
