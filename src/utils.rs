use crate::error::Res;
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Write a file.
pub(crate) async fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Res<()> {
    let path = path.as_ref();
    tokio::fs::write(path, contents)
        .await
        .context(format!("Unable to write to {}", path.to_string_lossy()))
}

/// Read a file to a `String`.
pub(crate) async fn read(path: &Path) -> Res<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file at {}", path.display()))
}

/// Create a directory and all of its parents.
pub(crate) async fn make_dir(p: &Path) -> Res<()> {
    tokio::fs::create_dir_all(p)
        .await
        .with_context(|| format!("Unable to create directory at {}", p.to_string_lossy()))
}

/// Make an absolute path out of `p`, which must exist.
pub(crate) async fn canonicalize(p: &Path) -> Res<PathBuf> {
    tokio::fs::canonicalize(p)
        .await
        .with_context(|| format!("Unable to canonicalize the path {}", p.to_string_lossy()))
}

/// Generates a new random identifier with the given prefix, e.g. `exp-1b4e28ba2fa1...`.
pub(crate) fn generate_id(prefix: &str) -> String {
    let rand = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{rand}")
}

/// Formats `t` the way we store it in the database. The width is fixed so that stored timestamps
/// sort lexically in time order.
pub(crate) fn timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a timestamp that was written by `timestamp`.
pub(crate) fn parse_timestamp(s: &str) -> Res<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp '{s}'"))?
        .with_timezone(&Utc))
}
