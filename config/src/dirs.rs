//! Platform-specific application paths.

use std::{env, path::PathBuf};

const CONFIG_FILE: &str = "gxsrep.toml";

/// Find a configuration from standard paths.
///
/// In GNU/Linux:
///     current directory | $XDG_CONFIG_HOME/gxsrep | /etc/gxsrep/gxsrep.toml
///
/// In MacOS:
///     current directory | $HOME/Library/Preferences/io.gxs.gxsrep/gxsrep.toml | /etc/gxsrep/gxsrep.toml
///
/// In Windows:
///     current directory | C:\Users\Alice\AppData\Roaming\gxs\gxsrep\gxsrep.toml
pub fn find_config() -> Option<PathBuf> {
    let mut config_dirs = Vec::with_capacity(3);

    if let Ok(dir) = env::current_dir() {
        config_dirs.push(dir);
    }

    if let Some(dir) = directories_next::ProjectDirs::from("io", "gxs", "gxsrep") {
        config_dirs.push(dir.config_dir().into());
    }

    if cfg!(unix) {
        config_dirs.push("/etc/gxsrep".into());
    }

    config_dirs
        .into_iter()
        .map(|path| path.join(CONFIG_FILE))
        .find(|path| path.exists())
}

/// Returns a platform-specific path for storing application data.
///
/// In GNU/Linux:
///     $XDG_DATA_HOME/gxsrep
///
/// In MacOS:
///     $HOME/Library/Application Support/io.gxs.gxsrep
///
/// In Windows:
///     C:\Users\Alice\AppData\Local\gxs\gxsrep\data
///
/// Defaults to the current directory.
pub fn data_dir() -> PathBuf {
    directories_next::ProjectDirs::from("io", "gxs", "gxsrep")
        .map(|dir| dir.data_local_dir().into())
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}
