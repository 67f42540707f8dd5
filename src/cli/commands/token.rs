use anyhow::anyhow;
use clap::Subcommand;
use serde_json::json;

use crate::auth::TokenService;
use crate::cli::utils::{connect_store, output_fields, output_success};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::Directory;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue an access/refresh pair for a user")]
    Issue {
        #[arg(help = "Login email")]
        email: String,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue { email } => {
            config().validate()?;
            let store = connect_store().await?;
            let user = store
                .find_user_by_email(&email)
                .await?
                .ok_or_else(|| anyhow!("No user with email {}", email))?;

            let tokens = TokenService::new(&config().security).issue_pair(&user)?;
            output_success(
                &output_format,
                &format!("Issued credentials for {}", user.email),
                Some(json!({ "tokens": tokens })),
            )?;
            output_fields(
                &output_format,
                &[
                    ("access", tokens.access_token.clone()),
                    ("refresh", tokens.refresh_token.clone()),
                    ("expires in", format!("{}s", tokens.access_expires_in)),
                ],
            );
            Ok(())
        }
    }
}
