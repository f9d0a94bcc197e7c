use std::{io, path::Path, time::Duration};

use chrono::{DateTime, Datelike, Local, Timelike};

/// `<base><YYYY><M><D><H><Min><S>-<seq>.log`, no zero padding.
pub fn rolled_file_name(base: &str, time: &DateTime<Local>, seq: u64) -> String {
    format!(
        "{}{}{}{}{}{}{}-{}.log",
        base,
        time.year(),
        time.month(),
        time.day(),
        time.hour(),
        time.minute(),
        time.second(),
        seq
    )
}

pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

/// Id of the calling thread, unique for the life of the process.
pub fn thread_label() -> String {
    format!("{:?}", std::thread::current().id())
}

/// serde adapter for durations written as "3s", "250ms", "1m 30s".
pub mod human_duration {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_duration(&raw).map_err(D::Error::custom)
    }
}

pub fn parse_duration(raw: &str) -> eyre::Result<Duration> {
    let raw = raw.trim();
    if raw == "0" {
        return Ok(Duration::ZERO);
    }

    Ok(humantime::parse_duration(raw)?)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn rolled_name_is_not_padded() {
        let time = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap();
        assert_eq!(
            rolled_file_name("logs/app_", &time, 12),
            "logs/app_202439752-12.log"
        );
    }

    #[test]
    fn durations_accept_human_units() {
        assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn threads_sharing_a_name_get_distinct_labels() {
        let spawn_named = || {
            std::thread::Builder::new()
                .name("w".to_string())
                .spawn(thread_label)
                .unwrap()
                .join()
                .unwrap()
        };

        let first = spawn_named();
        let second = spawn_named();
        assert_ne!(first, second);
        assert_ne!(first, thread_label());
        assert!(first.starts_with("ThreadId("));
    }

    #[test]
    fn parent_dir_of_bare_file_is_fine() {
        assert!(ensure_parent_dir(Path::new("plain.log")).is_ok());
    }
}
