use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates the data directory, an initial `config.json` and an empty trip database.
///
/// # Arguments
/// - `pact_home` - The directory that will be the root of the data directory, e.g. `$HOME/pact`
/// - `currency_symbol` - The symbol amounts are displayed with
/// - `payment_scheme` - The URL scheme of payment links, e.g. `upi`
///
/// # Errors
/// - Returns an error if the directory was already initialized or any file operation fails.
pub async fn init(pact_home: &Path, currency_symbol: char, payment_scheme: &str) -> Result<Out<()>> {
    let config = Config::create(pact_home, currency_symbol, payment_scheme).await?;
    Ok(format!(
        "Successfully created the pact directory at {}",
        config.root().display()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("pact");
        let out = init(&home, '₹', "upi").await.unwrap();
        assert!(out.message().starts_with("Successfully created"));
        assert!(home.join("config.json").is_file());
        assert!(home.join("pact.sqlite").is_file());

        let err = init(&home, '₹', "upi").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
    }
}
