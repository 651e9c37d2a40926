//! Access token commands.

use super::Context;
use crate::cli::{TokenArgs, TokenCommands};
use crate::error::CliError;
use crate::output::get_formatter;

/// Run the token command
pub fn run_token(args: TokenArgs, ctx: &Context, json: bool) -> Result<(), CliError> {
    let formatter = get_formatter(json);
    let store = ctx.open_credentials()?;

    match args.command {
        TokenCommands::Show(args) => {
            println!("{}", formatter.format_credentials(&store.credentials(), args.reveal));
        }
        TokenCommands::Set(args) => {
            let token = args.token.trim();
            if token.is_empty() {
                return Err(CliError::InvalidArgument("token must not be empty".to_string()));
            }

            if let Some(username) = args.username {
                store.set_username(username)?;
            }
            store.set_token(token)?;

            println!("{}", formatter.format_message("Access token updated"));
        }
    }

    Ok(())
}
