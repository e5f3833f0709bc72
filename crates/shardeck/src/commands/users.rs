//! User command handlers.

use std::fmt::Write;

use tabled::Tabled;

use shardeck_core::{NewUser, User};

use super::Context;
use crate::cli::{UsersArgs, UsersCommand};
use crate::error::CliError;
use crate::output::Printer;

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Full name")]
    full_name: String,
    #[tabled(rename = "Shard key")]
    shard_key: String,
    #[tabled(rename = "Shard")]
    shard: String,
    #[tabled(rename = "Created")]
    created: String,
}

fn user_row(u: &User) -> UserRow {
    UserRow {
        id: u.id,
        username: u.username.clone(),
        email: u.email.clone(),
        full_name: u.full_name.clone().unwrap_or_default(),
        shard_key: u.shard_key.clone(),
        shard: u.shard_name.clone(),
        created: u.created_at.format("%Y-%m-%d").to_string(),
    }
}

fn detail(user: &User) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ID:         {}", user.id);
    let _ = writeln!(out, "Username:   {}", user.username);
    let _ = writeln!(out, "Email:      {}", user.email);
    if let Some(name) = &user.full_name {
        let _ = writeln!(out, "Full name:  {name}");
    }
    let _ = writeln!(out, "Shard key:  {}", user.shard_key);
    let _ = writeln!(out, "Shard:      {}", user.shard_name);
    let _ = write!(out, "Created:    {}", user.created_at.to_rfc3339());
    if let Some(updated) = user.updated_at {
        let _ = write!(out, "\nUpdated:    {}", updated.to_rfc3339());
    }
    out
}

fn print_user(printer: &Printer, user: &User) -> Result<(), CliError> {
    let out = printer.single(user, detail)?;
    printer.print(&out);
    Ok(())
}

pub async fn handle(ctx: &Context, args: UsersArgs) -> Result<(), CliError> {
    match args.command {
        UsersCommand::Create {
            username,
            email,
            full_name,
            shard_key,
        } => {
            let created = ctx
                .dashboard
                .create_user(NewUser {
                    username,
                    email,
                    full_name,
                    shard_key,
                })
                .await?;
            print_user(&ctx.printer, &created)
        }

        UsersCommand::Get { id } => {
            let user = ctx.dashboard.user(id).await?;
            print_user(&ctx.printer, &user)
        }

        UsersCommand::ByKey { shard_key } => {
            let users = ctx.dashboard.users_by_key(&shard_key).await?;
            let out = ctx.printer.list(&users, user_row)?;
            ctx.printer.print(&out);
            Ok(())
        }
    }
}
