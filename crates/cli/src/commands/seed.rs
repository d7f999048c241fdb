use std::sync::Arc;

use bloodlink_core::config::{AppConfig, LoadOptions};
use bloodlink_core::{BloodBank, NoopAuditSink, RequestFilter, SeedProfile};

use crate::commands::CommandResult;

/// Seeds a throwaway ledger and reports what the server would start with.
pub fn run(profile: Option<SeedProfile>) -> CommandResult {
    let profile = match profile {
        Some(profile) => profile,
        None => match AppConfig::load(LoadOptions::default()) {
            Ok(config) => config.inventory.seed,
            Err(error) => {
                return CommandResult::failure(
                    "seed",
                    "config_validation",
                    format!("configuration issue: {error}"),
                    2,
                );
            }
        },
    };

    match BloodBank::seeded(profile, Arc::new(NoopAuditSink)) {
        Ok(bank) => CommandResult::success("seed", describe(profile, &bank)),
        Err(error) => CommandResult::failure("seed", "seed_execution", error.to_string(), 5),
    }
}

fn describe(profile: SeedProfile, bank: &BloodBank) -> String {
    let mut lines = vec![format!(
        "{profile:?} ledger seeded with {} units:",
        bank.inventory().total_units()
    )];
    lines.extend(bank.inventory().snapshot().into_iter().map(|record| {
        format!(
            "  - {}: {} ({:?})",
            record.blood_type, record.units_available, record.stock_level
        )
    }));

    let requests = bank.requests().list(&RequestFilter::default());
    lines.push(format!("{} pending requests:", requests.len()));
    lines.extend(requests.into_iter().map(|request| {
        format!(
            "  - {} x{} for {} ({})",
            request.blood_type, request.units_requested, request.requester_id, request.notes
        )
    }));

    lines.join("\n")
}
