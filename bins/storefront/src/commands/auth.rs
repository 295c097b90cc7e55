//! Sign-in commands

use crate::context::Context;
use anyhow::Result;
use owo_colors::OwoColorize;
use serde_json::json;
use storefront_api_client::endpoints::auth::{Credentials, SignupDetails, User};
use storefront_api_client::orchestrator::USER_QUERY_KEY;
use storefront_cli::output::{print_json, Status};
use storefront_core::AppError;
use tracing::warn;

pub async fn login(ctx: &Context, email: String, password: String) -> Result<()> {
    let session = ctx
        .client
        .auth()
        .login(&Credentials { email, password })
        .await?;

    let email = session.email().unwrap_or("unknown").to_string();
    ctx.emit(&json!({ "signedIn": true, "email": email }), |_| {
        Status::success(&format!("Signed in as {}", email.bold()));
    })
}

pub async fn signup(ctx: &Context, email: String, password: String, name: String) -> Result<()> {
    let session = ctx
        .client
        .auth()
        .signup(&SignupDetails {
            email,
            password,
            name,
        })
        .await?;

    let email = session.email().unwrap_or("unknown").to_string();
    ctx.emit(&json!({ "signedIn": true, "email": email }), |_| {
        Status::success(&format!("Account created; signed in as {}", email.bold()));
    })
}

/// The local session is gone either way; a failed server call only warns
pub async fn logout(ctx: &Context) -> Result<()> {
    let auth = ctx.client.auth();
    if auth.current_session().is_none() {
        Status::info("Not signed in");
        return Ok(());
    }

    if let Err(e) = auth.logout().await {
        warn!(error = %e, "Server-side sign out failed");
        Status::warning(&format!("Signed out locally; server said: {}", e.message));
    }
    ctx.orchestrator.invalidate(USER_QUERY_KEY);

    if ctx.is_json() {
        print_json(&json!({ "signedIn": false }))?;
    } else {
        Status::success("Signed out");
    }
    Ok(())
}

pub async fn whoami(ctx: &Context) -> Result<()> {
    let auth = ctx.client.auth();
    if auth.current_session().is_none() {
        return Err(AppError::http(401, "Not signed in; run `storefront login`").into());
    }

    let user: User = ctx
        .orchestrator
        .run_query(USER_QUERY_KEY, move || {
            let auth = auth.clone();
            async move { auth.get_current_user().await }
        })
        .await
        .into_result()?;

    ctx.emit(&user, |user| {
        println!("{}", user.email.as_deref().unwrap_or(&user.id).bold());
        if let Some(name) = &user.name {
            println!("  {:<6} {name}", "Name".dimmed());
        }
        println!("  {:<6} {}", "ID".dimmed(), user.id.dimmed());
    })
}
