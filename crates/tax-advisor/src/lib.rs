//! # tax-advisor
//!
//! Monthly income-tax advisor. An accountant agent walks the user's figures
//! through a fixed procedure and delegates each step to a worker:
//!
//! ```text
//!                    ┌──────────────┐
//!   request ───────▶ │  accountant  │ ───── answer ─────▶ sink
//!                    └──────────────┘
//!                      │    ▲
//!     deductions │ calculator │ percentage   (first key present wins)
//!                      ▼    │
//!     ┌────────────┐ ┌────────────┐ ┌────────────┐
//!     │ deductions │ │ calculator │ │ percentage │
//!     │  + table   │ │ + evaluator│ │  + table   │
//!     └────────────┘ └────────────┘ └────────────┘
//! ```
//!
//! ## Procedure
//!
//! 1. Project the monthly income to a yearly gross amount
//! 2. Look up the deductions that apply (capped per category)
//! 3. Subtract them; nothing is due when deductions exceed income
//! 4. Find the bracket: fixed amount, surplus base, percentage over surplus
//! 5. Compute the annual tax and prorate it to the current month
//! 6. Subtract what was already paid
//!
//! Arithmetic is never trusted to the model: the calculator's expression is
//! evaluated in [`rust_decimal::Decimal`] by [`expression`].

pub mod advisor;
pub mod config;
pub mod error;
pub mod expression;
pub mod svckit;

pub use advisor::{TaxAdvisor, GREETING};
pub use config::AdvisorConfig;
pub use error::{AdvisorError, Result};
pub use svckit::{
    ExpressionHook, ACCOUNTANT, ACCOUNTANT_PROMPT, CALCULATOR, CALCULATOR_PROMPT, DEDUCTIONS,
    DEDUCTIONS_PROMPT, PERCENTAGE, PERCENTAGE_PROMPT, WORKERS,
};
