use std::path::PathBuf;

pub const RAW_PATH_ENV: &str = "ARCHIVE_RAW_PATH";
pub const DB_PATH_ENV: &str = "ARCHIVE_DB_PATH";
pub const DEFAULT_RAW_PATH: &str = "data/raw.json";
pub const DEFAULT_DB_PATH: &str = "data/archive.sqlite";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub raw_path: PathBuf,
    pub db_path: PathBuf,
}

impl Config {
    /// Flags first, then the environment (a `.env` file is honoured), then defaults.
    pub fn from_env_and_args() -> Self {
        dotenvy::dotenv().ok();
        let args = std::env::args().skip(1).collect::<Vec<_>>();
        Self::resolve(&args, |key| std::env::var(key).ok())
    }

    pub fn resolve(args: &[String], env: impl Fn(&str) -> Option<String>) -> Self {
        let pick = |flag: &str, key: &str, default: &str| {
            path_arg(args, flag)
                .or_else(|| env(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(default))
        };
        Self {
            raw_path: pick("--raw", RAW_PATH_ENV, DEFAULT_RAW_PATH),
            db_path: pick("--db", DB_PATH_ENV, DEFAULT_DB_PATH),
        }
    }
}

/// `--flag=PATH` or `--flag PATH`.
fn path_arg(args: &[String], flag: &str) -> Option<PathBuf> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(flag).and_then(|rest| rest.strip_prefix('=')) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flags_beat_environment() {
        let cfg = Config::resolve(&args(&["--raw=in.json", "--db", "out.db"]), |_| {
            Some("env.path".to_string())
        });
        assert_eq!(cfg.raw_path, PathBuf::from("in.json"));
        assert_eq!(cfg.db_path, PathBuf::from("out.db"));
    }

    #[test]
    fn environment_then_defaults() {
        let cfg = Config::resolve(&[], |key| {
            (key == DB_PATH_ENV).then(|| "/tmp/archive.sqlite".to_string())
        });
        assert_eq!(cfg.raw_path, PathBuf::from(DEFAULT_RAW_PATH));
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/archive.sqlite"));
    }

    #[test]
    fn blank_values_are_ignored() {
        let cfg = Config::resolve(&args(&["--raw=", "--db"]), |_| Some("  ".to_string()));
        assert_eq!(cfg.raw_path, PathBuf::from(DEFAULT_RAW_PATH));
        assert_eq!(cfg.db_path, PathBuf::from(DEFAULT_DB_PATH));
    }
}
