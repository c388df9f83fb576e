//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and status, plus shared utilities (open_db, open_session)
//! - `reports` - Derived views (balances, net worth, budgets, insights, health, goals, scenarios)
//! - `feed` - Bank-feed link, relink, sync and list
//! - `backup` - Backup export and restore

pub mod backup;
pub mod core;
pub mod feed;
pub mod reports;

// Re-export command functions for main.rs
pub use backup::*;
pub use core::*;
pub use feed::*;
pub use reports::*;

/// How command results are printed
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
}

impl Output {
    /// Print `value` as pretty JSON. Returns false when tables are wanted.
    pub fn emit_json<T: serde::Serialize>(&self, value: &T) -> anyhow::Result<bool> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Ok(self.json)
    }
}

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Format a currency amount with sign and two decimals
pub fn money(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount)
    }
}
