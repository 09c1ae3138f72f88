// Live smoke against a real account or an Azurite emulator. Skips with a
// friendly note when the environment is not configured.

use std::env;

use anyhow::Result;
use tempfile::TempDir;

use blobharvest::constants::{ENV_AZURE_ACCOUNT, ENV_AZURE_ACCOUNT_KEY, ENV_AZURE_CONTAINER, ENV_AZURE_SAS_TOKEN};
use blobharvest::{download_object, AzureBlob, Settings};

fn configured() -> bool {
    env::var(ENV_AZURE_ACCOUNT).is_ok()
        && env::var(ENV_AZURE_CONTAINER).is_ok()
        && (env::var(ENV_AZURE_ACCOUNT_KEY).is_ok() || env::var(ENV_AZURE_SAS_TOKEN).is_ok())
}

#[tokio::test]
async fn list_and_download_smoke() -> Result<()> {
    if !configured() {
        eprintln!(
            "SKIP: set {ENV_AZURE_ACCOUNT}, {ENV_AZURE_CONTAINER} and ({ENV_AZURE_ACCOUNT_KEY} or {ENV_AZURE_SAS_TOKEN}) to run the live smoke test"
        );
        return Ok(());
    }

    let settings = Settings::from_env()?;
    let client = AzureBlob::from_settings(&settings)?;

    // Prefix filtering is a server-side contract; hold it to it.
    let objects = client.list(&settings.prefix).await?;
    assert!(
        objects.iter().all(|o| o.path.starts_with(&settings.prefix)),
        "listing returned a name outside the prefix"
    );

    if let Some(first) = objects.first() {
        let tmp = TempDir::new()?;
        let dest = download_object(&client, &first.path, tmp.path()).await?;
        assert!(dest.is_file());

        // Re-download overwrites rather than duplicates.
        let again = download_object(&client, &first.path, tmp.path()).await?;
        assert_eq!(dest, again);
    }
    Ok(())
}
