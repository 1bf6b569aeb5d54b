use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Append `name=value` to a GitHub Actions output file. Values containing a
/// newline use the heredoc form with a random delimiter.
pub async fn write_step_output(path: &Path, name: &str, value: &str) -> anyhow::Result<()> {
    let entry = if value.contains('\n') {
        let delimiter = format!("ghadelimiter_{}", ulid::Ulid::new());
        format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
    } else {
        format!("{name}={value}\n")
    };

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| anyhow::anyhow!("open step output {}: {e}", path.display()))?;
    file.write_all(entry.as_bytes())
        .await
        .map_err(|e| anyhow::anyhow!("write step output {}: {e}", path.display()))?;
    file.flush().await?;
    Ok(())
}
