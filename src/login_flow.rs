// Interactive phone + SMS login

use anyhow::{Context, Result};
use dialoguer::Input;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::auth::{LoginClient, TokenManager};

pub const DEFAULT_AREA_CODE: &str = "+86";
pub const MAX_VERIFICATION_ATTEMPTS: u32 = 3;

fn pattern(cell: &'static OnceLock<Regex>, re: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(re).expect("static regex"))
}

pub fn is_valid_area_code(area_code: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    pattern(&RE, r"^\+\d{1,3}$").is_match(area_code)
}

pub fn is_valid_phone_number(phone: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    pattern(&RE, r"^\d{7,15}$").is_match(phone)
}

pub fn is_valid_verification_code(code: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    pattern(&RE, r"^\d{4}$").is_match(code)
}

/// Prompt for phone and code, log in, and save the credential to `token_path`
pub async fn run_interactive_login(
    login: &LoginClient,
    manager: &TokenManager,
    token_path: &Path,
) -> Result<()> {
    println!();
    println!("Log in to Xiaoyuzhou FM");
    println!();

    let area_code: String = Input::new()
        .with_prompt("Area code")
        .default(DEFAULT_AREA_CODE.to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            if is_valid_area_code(input.trim()) {
                Ok(())
            } else {
                Err("Area code must be '+' followed by 1 to 3 digits (e.g. +86)")
            }
        })
        .interact_text()
        .context("Failed to read area code")?;
    let area_code = area_code.trim().to_string();

    let phone_number: String = Input::new()
        .with_prompt("Phone number (digits only)")
        .validate_with(|input: &String| -> Result<(), &str> {
            if is_valid_phone_number(input.trim()) {
                Ok(())
            } else {
                Err("Phone number must be 7 to 15 digits")
            }
        })
        .interact_text()
        .context("Failed to read phone number")?;
    let phone_number = phone_number.trim().to_string();

    login
        .send_code(&area_code, &phone_number)
        .await
        .context("Failed to request verification code")?;
    println!("Verification code sent. Please check your phone.");

    let mut attempts = 0;
    let credential = loop {
        // Malformed codes are re-prompted by the validator and do not count
        let code: String = Input::new()
            .with_prompt(format!(
                "4-digit verification code (attempt {}/{})",
                attempts + 1,
                MAX_VERIFICATION_ATTEMPTS
            ))
            .validate_with(|input: &String| -> Result<(), &str> {
                if is_valid_verification_code(input.trim()) {
                    Ok(())
                } else {
                    Err("Verification code must be 4 digits")
                }
            })
            .interact_text()
            .context("Failed to read verification code")?;

        match login
            .login_with_code(&area_code, &phone_number, code.trim())
            .await
        {
            Ok(credential) => break credential,
            Err(e) => {
                attempts += 1;
                tracing::warn!(attempt = attempts, "Login failed: {:#}", e);
                if attempts >= MAX_VERIFICATION_ATTEMPTS {
                    anyhow::bail!("Maximum login attempts reached: {:#}", e);
                }
                println!(
                    "Login failed: {:#}. {} attempts remaining.",
                    e,
                    MAX_VERIFICATION_ATTEMPTS - attempts
                );
            }
        }
    };

    let nickname = credential.nickname.clone();
    manager.install(credential, token_path).await.with_context(|| {
        format!(
            "Logged in, but failed to save credential to {}",
            token_path.display()
        )
    })?;

    println!();
    println!(
        "✅ Logged in as {} - credential saved to {}",
        nickname,
        token_path.display()
    );
    Ok(())
}
