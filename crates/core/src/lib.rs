//! Core banking logic for MBank.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `ledger` - Deposit, withdraw, transfer, payment and history queries
//! - `auth` - Roles, capabilities, password hashing and one-time secrets
//! - `money` - Scale and range of stored amounts
//! - `account` - Account opening rules, patches and lifecycle transitions
//! - `card` - Card number, CVV and expiry generation
//! - `user` - Registration checks and profile patches
//! - `branch` - Branch patches

pub mod account;
pub mod auth;
pub mod branch;
pub mod card;
pub mod ledger;
pub mod lifecycle;
pub mod money;
pub mod user;
