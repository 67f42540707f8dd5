use anyhow::{anyhow, bail};
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{connect_store, output_fields, output_success};
use crate::cli::OutputFormat;
use crate::database::models::{system_roles, NewUser};
use crate::database::{Directory, StoreError};

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user account")]
    Create {
        #[arg(long, help = "Login email")]
        email: String,

        #[arg(long, help = "Display name")]
        name: String,
    },

    #[command(about = "Show a user and their active school")]
    Show {
        #[arg(help = "Login email")]
        email: String,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = connect_store().await?;

    match cmd {
        UserCommands::Create { email, name } => {
            let email = email.trim().to_lowercase();
            if !email.contains('@') {
                bail!("'{}' is not an email address", email);
            }
            let user = match store.create_user(NewUser { email: email.clone(), full_name: name }).await {
                Ok(user) => user,
                Err(StoreError::UniqueViolation { .. }) => bail!("A user with email {} already exists", email),
                Err(e) => return Err(e.into()),
            };

            output_success(&output_format, &format!("Created user {}", user.email), Some(json!({ "user": user })))?;
            output_fields(&output_format, &[("id", user.id.to_string()), ("name", user.full_name)]);
            Ok(())
        }
        UserCommands::Show { email } => {
            let user = store
                .find_user_by_email(&email)
                .await?
                .ok_or_else(|| anyhow!("No user with email {}", email))?;
            let membership = store.active_membership(user.id).await?;

            let role = membership
                .as_ref()
                .and_then(|m| system_roles::name_of(m.role_id))
                .unwrap_or("-");
            output_success(
                &output_format,
                &format!("User {}", user.email),
                Some(json!({ "user": user, "membership": membership })),
            )?;
            output_fields(
                &output_format,
                &[
                    ("id", user.id.to_string()),
                    ("name", user.full_name.clone()),
                    ("school", membership.map(|m| m.school_id.to_string()).unwrap_or_else(|| "-".to_string())),
                    ("role", role.to_string()),
                ],
            );
            Ok(())
        }
    }
}
