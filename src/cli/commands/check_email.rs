use clap::Args;
use serde_json::json;

use crate::cli::utils::{output_error, output_success};
use crate::cli::{OutputFormat, ReportedError};
use crate::email::validate_email;

#[derive(Debug, Args)]
pub struct CheckEmailArgs {
    #[arg(help = "Address to check")]
    pub email: String,
}

pub fn handle(args: CheckEmailArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    match validate_email(&args.email) {
        Ok(email) => {
            let normalized = email.normalized();
            output_success(
                &output_format,
                &format!("Valid email address: {}", normalized),
                Some(json!({ "normalized": normalized })),
            )
        }
        Err(err) => {
            output_error(&output_format, "A valid email address is required", None)?;
            Err(ReportedError(err.to_string()).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(email: &str) -> anyhow::Result<()> {
        handle(CheckEmailArgs { email: email.to_string() }, OutputFormat::Json)
    }

    #[test]
    fn accepts_valid_address() {
        assert!(check(" Owner@Example.com ").is_ok());
    }

    #[test]
    fn invalid_address_is_reported_once() {
        let err = check("not-an-email").unwrap_err();
        assert!(err.downcast_ref::<ReportedError>().is_some());
    }
}
