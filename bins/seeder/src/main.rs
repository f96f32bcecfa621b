//! Database seeder for MBank development and testing.
//!
//! Seeds card types, account types and one verified user per role. Every
//! seeded user signs in with `Qwer123@#$`. Rows that already exist are
//! skipped, so the seeder can be re-run.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::NaiveDate;
use mbank_core::auth::{Role, hash_password};
use mbank_core::user::Gender;
use mbank_db::repositories::{
    CreateAccountTypeInput, CreateUserInput, ReferenceError, UserError,
};
use mbank_db::{AccountTypeRepository, CardTypeRepository, UserRepository};
use mbank_shared::config::DatabaseConfig;
use sea_orm::DatabaseConnection;

/// Password shared by every seeded user.
const SEED_PASSWORD: &str = "Qwer123@#$";

struct SeedUser {
    name: &'static str,
    email: &'static str,
    phone_number: &'static str,
    national_card_id: &'static str,
    gender: Gender,
    dob: (i32, u32, u32),
    profile_image: &'static str,
    roles: &'static [Role],
}

const USERS: [SeedUser; 5] = [
    SeedUser {
        name: "ADMIN",
        email: "admin@gmail.com",
        phone_number: "096111222",
        national_card_id: "11112222",
        gender: Gender::Male,
        dob: (1999, 12, 31),
        profile_image: "profile-admin.jpg",
        roles: &Role::ALL,
    },
    SeedUser {
        name: "MANAGER",
        email: "manager@gmail.com",
        phone_number: "097111222",
        national_card_id: "22223333",
        gender: Gender::Male,
        dob: (2000, 12, 12),
        profile_image: "profile-manager.jpg",
        roles: &[Role::User, Role::Customer, Role::Staff, Role::Manager],
    },
    SeedUser {
        name: "STAFF",
        email: "staff@gmail.com",
        phone_number: "098111222",
        national_card_id: "33334444",
        gender: Gender::Female,
        dob: (2001, 5, 20),
        profile_image: "profile-staff.jpg",
        roles: &[Role::User, Role::Customer, Role::Staff],
    },
    SeedUser {
        name: "CUSTOMER",
        email: "customer@gmail.com",
        phone_number: "099111222",
        national_card_id: "44445555",
        gender: Gender::Female,
        dob: (2002, 8, 15),
        profile_image: "profile-customer.jpg",
        roles: &[Role::User, Role::Customer],
    },
    SeedUser {
        name: "USER",
        email: "user@gmail.com",
        phone_number: "095111222",
        national_card_id: "55556666",
        gender: Gender::Male,
        dob: (2003, 3, 10),
        profile_image: "profile-user.jpg",
        roles: &[Role::User],
    },
];

/// (name, alias, retired)
const ACCOUNT_TYPES: [(&str, &str, bool); 3] = [
    ("Saving Account", "saving-account", false),
    ("Payroll Account", "payroll-account", false),
    ("Current Account", "current-account", true),
];

const CARD_TYPES: [(&str, &str); 2] = [("Visa", "visa"), ("Mastercard", "mastercard")];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    println!("Connecting to database...");
    let db = mbank_db::connect(&DatabaseConfig {
        url,
        max_connections: 2,
        min_connections: 1,
    })
    .await
    .context("failed to connect to database")?;

    println!("Seeding card types...");
    seed_card_types(&db).await?;

    println!("Seeding account types...");
    seed_account_types(&db).await?;

    println!("Seeding users...");
    seed_users(&db).await?;

    println!("Seeding complete!");
    Ok(())
}

async fn seed_card_types(db: &DatabaseConnection) -> anyhow::Result<()> {
    let repo = CardTypeRepository::new(db.clone());
    for (name, alias) in CARD_TYPES {
        match repo.create(name, alias).await {
            Ok(_) => println!("  Created card type: {alias}"),
            Err(ReferenceError::DuplicateAlias { .. }) => {
                println!("  Card type {alias} already exists, skipping...");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn seed_account_types(db: &DatabaseConnection) -> anyhow::Result<()> {
    let repo = AccountTypeRepository::new(db.clone());
    for (name, alias, retired) in ACCOUNT_TYPES {
        let input = CreateAccountTypeInput {
            name: name.to_string(),
            alias: alias.to_string(),
            description: Some(name.to_string()),
        };
        match repo.create(input).await {
            Ok(_) => {
                if retired {
                    repo.delete(alias).await?;
                }
                println!("  Created account type: {alias}");
            }
            Err(ReferenceError::DuplicateAlias { .. }) => {
                println!("  Account type {alias} already exists, skipping...");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn seed_users(db: &DatabaseConnection) -> anyhow::Result<()> {
    let repo = UserRepository::new(db.clone());
    let password_hash = hash_password(SEED_PASSWORD)?;

    for seed in &USERS {
        let (year, month, day) = seed.dob;
        let input = CreateUserInput {
            name: seed.name.to_string(),
            gender: seed.gender,
            phone_number: seed.phone_number.to_string(),
            email: seed.email.to_string(),
            national_card_id: seed.national_card_id.to_string(),
            student_card_id: None,
            dob: NaiveDate::from_ymd_opt(year, month, day),
            profile_image: seed.profile_image.to_string(),
            password_hash: password_hash.clone(),
            roles: seed.roles.to_vec(),
            is_verified: true,
        };

        match repo.create(input).await {
            Ok(user) => println!("  Created user: {} ({})", seed.email, user.user.id),
            Err(UserError::Duplicate { .. }) => {
                println!("  User {} already exists, skipping...", seed.email);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
