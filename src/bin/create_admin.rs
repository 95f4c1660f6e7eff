//! CLI tool to create an administrator account.
//!
//! Usage:
//!   cargo run --bin create-admin -- --email admin@example.com --password "long-secret" --name "Admin" --role SYSTEM_ADMIN

use std::env;
use std::sync::Arc;

use course_admin_lib::auth::{MIN_PASSWORD_LENGTH, hash_password};
use course_admin_lib::config::Config;
use course_admin_lib::db::{DataLayer, HasuraClient, sessions, users};
use course_admin_lib::models::Role;
use course_admin_lib::services::session::normalize_email;

#[actix_web::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let mut email: Option<String> = None;
    let mut password: Option<String> = None;
    let mut name: Option<String> = None;
    let mut role = Role::SystemAdmin.as_str().to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--email" | "-e" => {
                i += 1;
                if i < args.len() {
                    email = Some(args[i].clone());
                }
            }
            "--password" | "-p" => {
                i += 1;
                if i < args.len() {
                    password = Some(args[i].clone());
                }
            }
            "--name" | "-n" => {
                i += 1;
                if i < args.len() {
                    name = Some(args[i].clone());
                }
            }
            "--role" | "-r" => {
                i += 1;
                if i < args.len() {
                    role = args[i].clone();
                }
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    // Validate required arguments
    let email = match email.as_deref().map(normalize_email) {
        Some(e) if !e.is_empty() => e,
        _ => {
            eprintln!("Error: --email is required");
            print_usage();
            std::process::exit(1);
        }
    };

    let password = match password {
        Some(p) if p.chars().count() >= MIN_PASSWORD_LENGTH => p,
        Some(_) => {
            eprintln!(
                "Error: --password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            );
            std::process::exit(1);
        }
        None => {
            eprintln!("Error: --password is required");
            print_usage();
            std::process::exit(1);
        }
    };

    // Parse role
    let role_enum = match role.as_str() {
        "SYSTEM_ADMIN" | "DEPT_ADMIN" => Role::parse(&role),
        _ => {
            eprintln!(
                "Error: Invalid role '{}'. Must be: SYSTEM_ADMIN, DEPT_ADMIN",
                role
            );
            std::process::exit(1);
        }
    };

    // Load config and connect to the GraphQL backend
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let db = match HasuraClient::new(&config.graphql) {
        Ok(client) => DataLayer::new(Arc::new(client)),
        Err(e) => {
            eprintln!("Error creating GraphQL client: {}", e);
            std::process::exit(1);
        }
    };

    match users::email_in_use(&db, &email).await {
        Ok(false) => {}
        Ok(true) => {
            eprintln!("Error: a user with email {} already exists", email);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error checking email: {}", e);
            std::process::exit(1);
        }
    }

    let password_hash = match hash_password(&password) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Error hashing password: {}", e);
            std::process::exit(1);
        }
    };

    let user = match sessions::insert_credential_user(
        &db,
        &sessions::NewCredentialUser {
            email: &email,
            name: name.as_deref(),
            password_hash: &password_hash,
            role: role_enum.as_str(),
            provider: users::PROVIDER_EMAIL_PASSWORD,
        },
    )
    .await
    {
        Ok(user) => user,
        Err(e) => {
            eprintln!("Error creating user: {}", e);
            std::process::exit(1);
        }
    };

    // Output
    println!();
    println!("════════════════════════════════════════════════════════════════");
    println!("  Administrator Created");
    println!("════════════════════════════════════════════════════════════════");
    println!();
    println!("  ID:      {}", user.id);
    println!("  Email:   {}", user.email);
    println!("  Name:    {}", user.name.as_deref().unwrap_or("-"));
    println!("  Role:    {}", user.role);
    println!();
}

fn print_usage() {
    eprintln!(
        r#"
Usage: create-admin --email <EMAIL> --password <PASSWORD> [OPTIONS]

Options:
  -e, --email <EMAIL>         Sign-in email (required)
  -p, --password <PASSWORD>   Password, at least 8 characters (required)
  -n, --name <NAME>           Display name
  -r, --role <ROLE>           SYSTEM_ADMIN or DEPT_ADMIN (default: SYSTEM_ADMIN)
  -h, --help                  Print this help
"#
    );
}
