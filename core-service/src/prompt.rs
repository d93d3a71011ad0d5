//! Console code prompt for the consent flow.

use async_trait::async_trait;
use core_auth::{AuthError, CodePrompt};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Prints the consent URL and reads the pasted code from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinCodePrompt;

#[async_trait]
impl CodePrompt for StdinCodePrompt {
    async fn prompt_code(&self, auth_url: &str) -> core_auth::Result<String> {
        let mut stdout = tokio::io::stdout();
        let banner = format!(
            "Authorize this app by visiting this url:\n{}\n\nEnter the code (or the full redirect URL) from that page here: ",
            auth_url
        );
        let shown: std::io::Result<()> = async {
            stdout.write_all(banner.as_bytes()).await?;
            stdout.flush().await
        }
        .await;
        shown.map_err(|e| AuthError::Other(format!("cannot write prompt: {}", e)))?;

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| AuthError::Other(format!("cannot read code: {}", e)))?;

        let code = line.trim();
        if code.is_empty() {
            return Err(AuthError::InvalidAuthCode("no code entered".to_string()));
        }
        Ok(code.to_string())
    }
}
