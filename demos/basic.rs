// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! # Basic Enforcement Example
//!
//! Walks a free brand account and an invited KOL through a day of metered
//! activity using the in-memory storage backend.  Run with:
//!
//! ```bash
//! RUST_LOG=credit_gate_core=debug cargo run --example basic
//! ```

use chrono::{Duration, TimeZone, Utc};
use tracing_subscriber::EnvFilter;

use credit_gate_core::{
    AuthState, Config, Enforcer, FeatureContext, GuardRequest, GuardResult, InMemoryStorage,
    PlanTier, Role, UsageFilter,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("credit-gate - Basic Example\n");

    // -----------------------------------------------------------------------
    // 1. Construct the enforcer
    // -----------------------------------------------------------------------
    let enforcer = Enforcer::new(Config::default(), InMemoryStorage::new())?;
    let morning = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single().ok_or("bad timestamp")?;

    let brand = AuthState::authenticated(Role::Brand, PlanTier::Free);
    let kol = AuthState::authenticated(Role::Kol, PlanTier::Free);

    // -----------------------------------------------------------------------
    // 2. Anonymous visitors are sent to sign-in
    // -----------------------------------------------------------------------
    let visitor = GuardRequest::new("visitor", AuthState::anonymous(Role::Brand), FeatureContext::KolSearch);
    print_result("anonymous kol_search", &enforcer.guard_at(&visitor, morning)?);

    // -----------------------------------------------------------------------
    // 3. Chat: small talk is amortized, creator lookups are flat priced
    // -----------------------------------------------------------------------
    for text in [
        "hello, how are you",
        "what should I post this week?",
        "find beauty influencers on tiktok",
        "search for: vegan food creators",
    ] {
        let request = GuardRequest::new("brand-1", brand, FeatureContext::GeneralChat).with_text(text);
        print_result(&format!("chat {text:?}"), &enforcer.guard_at(&request, morning)?);
    }

    // -----------------------------------------------------------------------
    // 4. Analytics until the daily pool runs dry
    // -----------------------------------------------------------------------
    let analytics = GuardRequest::new("brand-1", brand, FeatureContext::AdvancedAnalytics);
    print_result("advanced_analytics", &enforcer.guard_at(&analytics, morning)?);
    print_result("advanced_analytics", &enforcer.guard_at(&analytics, morning)?);

    if let Some(remaining) = enforcer.time_until_next_reset_at(morning) {
        println!("  next refill in {}h{:02}m\n", remaining.num_hours(), remaining.num_minutes() % 60);
    }

    // -----------------------------------------------------------------------
    // 5. Contacts
    // -----------------------------------------------------------------------
    let outreach = GuardRequest::new("brand-1", brand, FeatureContext::ContactKol);
    print_result("brand contacts kol", &enforcer.guard_at(&outreach, morning)?);

    let reply = GuardRequest::new("kol-1", kol, FeatureContext::ContactBrand).invited(true);
    print_result("invited kol contacts brand", &enforcer.guard_at(&reply, morning)?);

    // -----------------------------------------------------------------------
    // 6. Next morning the free pool is refilled
    // -----------------------------------------------------------------------
    let next_morning = morning + Duration::hours(23);
    print_result("advanced_analytics (next day)", &enforcer.guard_at(&analytics, next_morning)?);

    // -----------------------------------------------------------------------
    // 7. Upgrade and buy premium credits
    // -----------------------------------------------------------------------
    enforcer.accounts.set_plan_tier("brand-1", PlanTier::Premium)?;
    enforcer.accounts.grant_premium_credits("brand-1", 10)?;
    let insights = GuardRequest::new("brand-1", brand, FeatureContext::AudienceInsights);
    print_result("audience_insights (premium)", &enforcer.guard_at(&insights, next_morning)?);

    // -----------------------------------------------------------------------
    // 8. Usage log
    // -----------------------------------------------------------------------
    println!("\nUsage log for brand-1:");
    for event in enforcer.query_usage(&UsageFilter::for_account("brand-1")) {
        println!(
            "  {} {:<18} {:?}/{:<3} cost={} pool={} outcome={:?}",
            event.timestamp.format("%Y-%m-%d %H:%M"),
            event.feature_context,
            event.category,
            event.confidence_score,
            event.cost_charged,
            event.pool_debited,
            event.outcome,
        );
    }

    if let Some(account) = enforcer.accounts.account("brand-1") {
        println!(
            "\nbrand-1: plan={} free={} premium={} contacts={}",
            account.plan_tier, account.free_credits, account.premium_credits, account.monthly_contacts_used
        );
    }

    println!("\nDone.");
    Ok(())
}

fn print_result(label: &str, result: &GuardResult) {
    match result {
        GuardResult::Allowed { decision } => println!("[{label}] allowed: {decision:?}"),
        GuardResult::RequiresLogin => println!("[{label}] redirect to sign-in"),
        GuardResult::RequiresUpgrade { reason } => println!("[{label}] redirect to pricing: {reason}"),
        GuardResult::Denied { reason } => println!("[{label}] denied: {reason}"),
    }
}
