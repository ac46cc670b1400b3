//! Account commands.

use marketstall_core::UserProfile;
use marketstall_storefront::{AppError, AppState};

use super::CliError;

pub async fn register(app: &AppState, email: &str, password: &str) -> Result<(), CliError> {
    let account = app.register(email, password).await?;
    println!("Registered and signed in as {} ({})", account.email, account.id);
    Ok(())
}

pub async fn login(app: &AppState, email: &str, password: &str) -> Result<(), CliError> {
    let account = app.login(email, password).await?;
    println!("Signed in as {} ({})", account.email, account.id);
    Ok(())
}

pub async fn logout(app: &AppState) -> Result<(), CliError> {
    app.logout().await?;
    println!("Signed out.");
    Ok(())
}

pub fn whoami(app: &AppState) {
    match app.accounts().current() {
        Some(account) => println!("{} ({})", account.email, account.id),
        None => println!("Not signed in."),
    }
}

/// Profile fields to change; `None` leaves a field as it is.
#[derive(Debug, Default)]
pub struct ProfileEdit {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ProfileEdit {
    const fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.address.is_none()
    }
}

/// Print the signed-in user's profile, applying `edit` first if it changes
/// anything.
pub async fn profile(app: &AppState, edit: ProfileEdit) -> Result<(), CliError> {
    let account = app
        .accounts()
        .current()
        .ok_or_else(|| AppError::Validation("Sign in to view your profile.".to_string()))?;

    let mut profile = app
        .accounts()
        .profile(&account.id)
        .await?
        .unwrap_or_else(|| UserProfile::for_new_account(account.id.clone(), &account.email));

    if !edit.is_empty() {
        if let Some(name) = edit.name {
            profile.name = name;
        }
        if let Some(phone) = edit.phone {
            profile.phone = phone;
        }
        if let Some(address) = edit.address {
            profile.address = address;
        }
        app.accounts().update_profile(&profile).await?;
    }

    println!("{}", profile.name);
    println!("  email:   {}", profile.email);
    println!("  phone:   {}", profile.phone);
    println!("  address: {}", profile.address);
    if !profile.is_complete() {
        println!("  (profile incomplete)");
    }
    Ok(())
}
