//! Core Kernel - Foundational types for the billing period system
//!
//! This crate provides the building blocks shared by the domain, runtime and
//! API crates:
//! - Money types with precise decimal arithmetic and a fixed-rate converter
//! - Logical time: billing windows and the clock port
//! - Typed identifiers
//! - The port error contract

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;

pub use money::{Money, Currency, CurrencyConverter, MoneyError};
pub use temporal::{BillingWindow, Clock, ManualClock, TemporalError};
pub use identifiers::{BillId, LineItemId, CustomerId, InvalidCustomerId};
pub use ports::PortError;
