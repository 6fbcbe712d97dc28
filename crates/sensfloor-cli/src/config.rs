//! Configuration vault – reads/writes `~/.sensfloor/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use sensfloor_types::{Endpoint, FloorConfig, FloorError};

/// Return the path to `~/.sensfloor/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".sensfloor").join("config.toml")
}

/// Load the config at `path` with environment overrides applied.  Returns
/// `None` if the file does not exist.
pub fn load(path: &Path) -> Result<Option<FloorConfig>, FloorError> {
    let mut cfg = load_from(path)?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

/// Parse the file at `path` as-is.  Returns `None` if it does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<FloorConfig>, FloorError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| FloorError::Config(format!("failed to read {}: {e}", path.display())))?;
    toml::from_str(&raw)
        .map(Some)
        .map_err(|e| FloorError::Config(format!("failed to parse {}: {e}", path.display())))
}

/// Apply `SENSFLOOR_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `SENSFLOOR_PORT` | `port` (a bare number selects by index) |
/// | `SENSFLOOR_BAUD_RATE` | `baud_rate` |
/// | `SENSFLOOR_THRESHOLD` | `threshold` |
/// | `SENSFLOOR_ROOM` | `room`, written `"a,b"` |
///
/// Unparsable values are ignored.
pub fn apply_env_overrides(cfg: &mut FloorConfig) {
    if let Ok(v) = std::env::var("SENSFLOOR_PORT") {
        cfg.port = parse_endpoint(&v);
    }
    if let Ok(v) = std::env::var("SENSFLOOR_BAUD_RATE")
        && let Ok(baud) = v.trim().parse::<u32>()
    {
        cfg.baud_rate = baud;
    }
    if let Ok(v) = std::env::var("SENSFLOOR_THRESHOLD")
        && let Ok(t) = v.trim().parse::<f32>()
        && t.is_finite()
    {
        cfg.threshold = t;
    }
    if let Ok(v) = std::env::var("SENSFLOOR_ROOM")
        && let Some(room) = parse_room(&v)
    {
        cfg.room = room;
    }
}

/// `"3"` selects endpoint #3; anything else is a device name.
pub fn parse_endpoint(s: &str) -> Endpoint {
    match s.trim().parse::<usize>() {
        Ok(i) => Endpoint::Index(i),
        Err(_) => Endpoint::Name(s.trim().to_string()),
    }
}

/// Parse `"a,b"` into a room address; both halves must fit in a byte.
pub fn parse_room(s: &str) -> Option<[u8; 2]> {
    let (a, b) = s.split_once(',')?;
    Some([a.trim().parse().ok()?, b.trim().parse().ok()?])
}

/// Save the config to a specific path, creating its directory if necessary.
pub fn save_to(cfg: &FloorConfig, path: &Path) -> Result<(), FloorError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| FloorError::Config(format!("failed to create config directory: {e}")))?;
        // Owner only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                FloorError::Config(format!("failed to set config directory permissions: {e}"))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| FloorError::Config(format!("failed to serialize config: {e}")))?;
    let write_err =
        |e: std::io::Error| FloorError::Config(format!("failed to write {}: {e}", path.display()));
    // Owner read/write (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(write_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensfloor_types::{FramingMode, LayoutConfig};

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&FloorConfig::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).expect("file metadata").permissions().mode();
        assert_eq!(file_mode & 0o777, 0o600);
        let dir_mode = std::fs::metadata(path.parent().unwrap())
            .expect("dir metadata")
            .permissions()
            .mode();
        assert_eq!(dir_mode & 0o777, 0o700);
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let mut cfg = FloorConfig::grid([2, 7], 3, 4);
        cfg.framing = FramingMode::Resync;
        cfg.port = Endpoint::Index(1);
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.room, [2, 7]);
        assert_eq!(loaded.framing, FramingMode::Resync);
        assert!(matches!(loaded.layout, LayoutConfig::Grid { rows: 3, cols: 4, .. }));
    }

    #[test]
    fn config_path_points_to_sensfloor_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".sensfloor"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "room = \"not an array\"").unwrap();
        assert!(matches!(load_from(&path), Err(FloorError::Config(_))));
    }

    #[test]
    fn endpoint_and_room_parsing() {
        assert_eq!(parse_endpoint("2"), Endpoint::Index(2));
        assert_eq!(parse_endpoint(" /dev/ttyUSB1 "), Endpoint::Name("/dev/ttyUSB1".into()));
        assert_eq!(parse_room("1, 2"), Some([1, 2]));
        assert_eq!(parse_room("1;2"), None);
        assert_eq!(parse_room("1,300"), None);
    }

    // All override variables are exercised in one test so no other test
    // races on the process environment.
    #[test]
    fn env_overrides_apply_and_ignore_garbage() {
        // SAFETY: the only test in this crate that touches these variables.
        unsafe {
            std::env::set_var("SENSFLOOR_PORT", "COM4");
            std::env::set_var("SENSFLOOR_BAUD_RATE", "57600");
            std::env::set_var("SENSFLOOR_THRESHOLD", "not-a-number");
            std::env::set_var("SENSFLOOR_ROOM", "3,9");
        }
        let mut cfg = FloorConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.port, Endpoint::Name("COM4".into()));
        assert_eq!(cfg.baud_rate, 57_600);
        assert_eq!(cfg.threshold, FloorConfig::default().threshold);
        assert_eq!(cfg.room, [3, 9]);

        unsafe {
            std::env::set_var("SENSFLOOR_THRESHOLD", "0.2");
        }
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.threshold, 0.2);

        unsafe {
            std::env::remove_var("SENSFLOOR_PORT");
            std::env::remove_var("SENSFLOOR_BAUD_RATE");
            std::env::remove_var("SENSFLOOR_THRESHOLD");
            std::env::remove_var("SENSFLOOR_ROOM");
        }
    }
}
