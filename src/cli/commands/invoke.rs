use std::time::Duration;

use anyhow::Context;
use clap::Args;
use serde_json::{json, Value};
use tracing::debug;

use crate::cli::utils::{output_error, output_success};
use crate::cli::{OutputFormat, ReportedError};
use crate::handlers::setup_admin::SETUP_TOKEN_HEADER;

#[derive(Debug, Args)]
pub struct InvokeArgs {
    #[arg(long, help = "Full URL of the bootstrap endpoint")]
    pub url: String,

    #[arg(long, help = "Email of the registered user to promote")]
    pub email: String,

    #[arg(
        long,
        env = "ADMIN_SETUP_TOKEN",
        hide_env_values = true,
        help = "Setup token (defaults to ADMIN_SETUP_TOKEN)"
    )]
    pub token: String,

    #[arg(long, default_value_t = 30, help = "Request timeout in seconds")]
    pub timeout: u64,
}

pub async fn handle(args: InvokeArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let url = url::Url::parse(&args.url).context("invalid --url")?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout))
        .build()?;

    let response = client
        .post(url)
        .header(SETUP_TOKEN_HEADER, &args.token)
        .json(&json!({ "email": args.email }))
        .send()
        .await
        .context("request to bootstrap endpoint failed")?;

    let status = response.status();
    let text = response
        .text()
        .await
        .context("failed to read bootstrap response")?;
    let body = parse_body(&text);

    if status.is_success() {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Admin role assigned");
        output_success(&output_format, message, None)?;
        Ok(())
    } else {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unexpected response");
        output_error(&output_format, message, Some(status.as_u16()))?;
        Err(ReportedError(format!("bootstrap failed with status {}", status)).into())
    }
}

/// Responses from proxies in front of the endpoint may not be JSON; those
/// fall back to the generic messages above.
fn parse_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|e| {
        debug!("Bootstrap response is not JSON ({}): {:?}", e, text);
        Value::Null
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_response() {
        let body = parse_body(r#"{"error":"Unauthorized"}"#);
        assert_eq!(body["error"], "Unauthorized");
    }

    #[test]
    fn non_json_response_becomes_null() {
        assert_eq!(parse_body("<html>502 Bad Gateway</html>"), Value::Null);
        assert_eq!(parse_body(""), Value::Null);
    }
}
