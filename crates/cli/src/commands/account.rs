//! Account commands.

use autoparts_storefront::StorefrontContext;
use autoparts_storefront::auth::{AuthError, RegisterRequest};
use secrecy::SecretString;

/// Sign in and load the cart.
#[allow(clippy::print_stdout)]
pub async fn login(ctx: &StorefrontContext, email: &str, password: String) -> Result<(), AuthError> {
    let session = ctx.login(email, &SecretString::from(password)).await?;
    println!("Signed in as {} ({})", session.identity, session.role);
    println!("Cart: {} item(s)", ctx.cart().count());
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn register(
    ctx: &StorefrontContext,
    email: String,
    password: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
) -> Result<(), AuthError> {
    let request = RegisterRequest {
        email,
        password: SecretString::from(password),
        first_name,
        last_name,
        phone,
    };
    ctx.register(&request).await?;
    println!("Account created for {}. Run `parts-cli login` to sign in.", request.email);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn logout(ctx: &StorefrontContext) {
    ctx.logout();
    println!("Signed out");
}

#[allow(clippy::print_stdout)]
pub fn whoami(ctx: &StorefrontContext) {
    match ctx.sessions().current() {
        Some(session) => println!("{} ({})", session.identity, session.role),
        None => println!("Not signed in"),
    }
}

/// Shown after the API rejected the stored credential.
#[allow(clippy::print_stdout)]
pub fn print_login_hint(login_path: &str) {
    println!("Your session has expired ({login_path}). Run `parts-cli login` to sign in again.");
}
