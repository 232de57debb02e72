//! Hash-password command - produces the `password` value of a user record.

use anyhow::{Result, bail};
use clap::Args;

use super::Context;

/// Arguments for the hash-password command.
#[derive(Args, Debug)]
pub struct HashPasswordArgs {
    /// Password to hash (prompted for, hidden, when omitted)
    pub password: Option<String>,
}

/// Run the hash-password command.
pub fn run(args: HashPasswordArgs, ctx: &Context) -> Result<()> {
    let password = match args.password {
        Some(password) => password,
        None => {
            let first = rpassword::prompt_password("Password: ")?;
            let second = rpassword::prompt_password("Repeat password: ")?;
            if first != second {
                bail!("Passwords do not match");
            }
            first
        }
    };

    if password.is_empty() {
        bail!("Password must not be empty");
    }

    let hash = relay_server::hash_password(&password)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;

    if ctx.verbose {
        eprintln!("Store this value in the user's \"password\" field:");
    }
    println!("{}", hash);
    Ok(())
}
