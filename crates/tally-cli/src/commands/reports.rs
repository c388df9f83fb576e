//! Report command implementations
//!
//! Every report loads a fresh ledger snapshot for the session's reference
//! date and prints one derived view.

use anyhow::{Context, Result};
use tally_core::models::{AccountKind, Scenario};
use tally_core::{
    all_goal_progress, budget_statuses, cashflow_summary, evaluate_scenario, generate_insights,
    health_score, live_balances, net_worth_timeline, pending_impact, Database, EngineContext,
    Ledger, RecordStore, ScenarioBaseline, Severity,
};

use super::{money, truncate, Output};

fn load_ledger(db: &Database, ctx: &EngineContext) -> Result<Ledger> {
    Ledger::load(db, ctx).context("Failed to load ledger")
}

pub fn cmd_balances(db: &Database, ctx: &EngineContext, output: Output) -> Result<()> {
    let ledger = load_ledger(db, ctx)?;
    let balances = live_balances(&ledger, ctx);
    let summary = cashflow_summary(&ledger, ctx);
    if output.emit_json(&serde_json::json!({
        "accounts": balances,
        "pending": pending_impact(&balances),
        "summary": summary,
    }))? {
        return Ok(());
    }

    println!();
    println!("💰 Balances as of {}", ctx.as_of);
    println!("   ─────────────────────────────────────────────────────────────");

    if balances.is_empty() {
        println!("   No accounts yet.");
        return Ok(());
    }

    println!(
        "   {:28} │ {:>5} │ {:>12} │ {:>12} │ {:>12}",
        "Account", "Kind", "Anchor", "Live", "Pending"
    );
    println!("   ─────────────────────────────┼───────┼──────────────┼──────────────┼─────────────");
    for b in &balances {
        let kind = match b.kind {
            AccountKind::Bank => "bank",
            AccountKind::Card => "card",
        };
        println!(
            "   {:28} │ {:>5} │ {:>12} │ {:>12} │ {:>12}",
            truncate(&b.name, 28),
            kind,
            money(b.anchor_balance),
            money(b.live_balance),
            money(b.pending_delta)
        );
    }

    println!();
    println!(
        "   Month to date: income {}  expenses {}  net {}",
        money(summary.total_income),
        money(summary.total_expenses),
        money(summary.net_cashflow)
    );
    println!(
        "   Card debt {} of {} limit ({:.1}% utilization)",
        money(summary.total_card_debt),
        money(summary.total_card_limit),
        summary.credit_utilization
    );
    println!(
        "   Subscriptions: {}/month",
        money(summary.monthly_subscription_cost)
    );

    Ok(())
}

pub fn cmd_net_worth(db: &Database, ctx: &EngineContext, output: Output) -> Result<()> {
    let ledger = load_ledger(db, ctx)?;
    let timeline = net_worth_timeline(&ledger, ctx);
    if output.emit_json(&timeline)? {
        return Ok(());
    }

    println!();
    println!("📈 Net Worth");
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:8} │ {:>14} │ {:>14} │ {:>14}",
        "Month", "Assets", "Liabilities", "Net"
    );
    println!("   ─────────┼────────────────┼────────────────┼───────────────");
    for point in &timeline {
        println!(
            "   {:8} │ {:>14} │ {:>14} │ {:>14}",
            point.month.format("%Y-%m"),
            money(point.assets),
            money(point.liabilities),
            money(point.net)
        );
    }

    Ok(())
}

pub fn cmd_budgets(db: &Database, ctx: &EngineContext, output: Output) -> Result<()> {
    let ledger = load_ledger(db, ctx)?;
    let statuses = budget_statuses(&ledger, ctx);
    if output.emit_json(&statuses)? {
        return Ok(());
    }

    println!();
    println!("🎯 Budgets as of {}", ctx.as_of);
    println!("   ─────────────────────────────────────────────────────────────");

    if statuses.is_empty() {
        println!("   No active budgets.");
        return Ok(());
    }

    for s in &statuses {
        let marker = if s.on_track { "✅" } else { "⚠️ " };
        println!(
            "   {} {:20} {:>8} {} of {} ({:.0}% used, {:.0}% of period elapsed)",
            marker,
            truncate(&s.category, 20),
            s.period.as_str(),
            money(s.spent),
            money(s.amount),
            s.pct_used,
            s.pct_elapsed * 100.0
        );
    }

    Ok(())
}

pub fn cmd_insights(db: &Database, ctx: &EngineContext, output: Output) -> Result<()> {
    let ledger = load_ledger(db, ctx)?;
    let findings = generate_insights(&ledger, ctx);
    if output.emit_json(&findings)? {
        return Ok(());
    }

    println!();
    println!("💡 Insights");
    println!("   ─────────────────────────────────────────────────────────────");

    if findings.is_empty() {
        println!("   Nothing to report.");
        return Ok(());
    }

    for finding in &findings {
        let icon = match finding.severity {
            Severity::Warning => "⚠️ ",
            Severity::Success => "🎉",
            Severity::Info => "ℹ️ ",
        };
        println!("   {} {}", icon, finding.title);
        println!("      {}", finding.summary);
    }

    Ok(())
}

pub fn cmd_health(db: &Database, ctx: &EngineContext, output: Output) -> Result<()> {
    let ledger = load_ledger(db, ctx)?;
    let health = health_score(&ledger, ctx);
    if output.emit_json(&health)? {
        return Ok(());
    }

    println!();
    println!(
        "🩺 Financial health: {}/100 ({})",
        health.score,
        health.rating.as_str()
    );
    println!("   ─────────────────────────────────────────────────────────────");
    for m in &health.metrics {
        println!(
            "   {:24} {:>10.2} → {:>5.1} ({}, weight {:.2})",
            m.kind.label(),
            m.value,
            m.normalized,
            m.rating.as_str(),
            m.weight
        );
    }

    Ok(())
}

pub fn cmd_goals(db: &Database, ctx: &EngineContext, output: Output) -> Result<()> {
    let ledger = load_ledger(db, ctx)?;
    let progress = all_goal_progress(&ledger, ctx);
    if output.emit_json(&progress)? {
        return Ok(());
    }

    println!();
    println!("🏁 Goals");
    println!("   ─────────────────────────────────────────────────────────────");

    if progress.is_empty() {
        println!("   No goals yet.");
        return Ok(());
    }

    for g in &progress {
        let source = if g.derived_from_account { " (from account)" } else { "" };
        print!(
            "   {:24} {} / {} ({:.0}%){}",
            truncate(&g.name, 24),
            money(g.current),
            money(g.target),
            g.pct,
            source
        );
        match g.required_monthly {
            Some(monthly) => println!("  needs {}/month", money(monthly)),
            None => println!(),
        }
    }

    Ok(())
}

pub fn cmd_scenario(db: &Database, ctx: &EngineContext, id: &str, output: Output) -> Result<()> {
    let scenario = db
        .get::<Scenario>(id)?
        .with_context(|| format!("Scenario not found: {}", id))?;
    let ledger = load_ledger(db, ctx)?;
    let baseline = ScenarioBaseline::from_ledger(&ledger, ctx);
    let evaluation = evaluate_scenario(&scenario, &baseline);
    if output.emit_json(&evaluation)? {
        return Ok(());
    }

    println!();
    println!(
        "🔮 Scenario: {}{}",
        scenario.name,
        if scenario.is_applied { " (applied)" } else { "" }
    );
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   Baseline disposable:      {}",
        money(evaluation.baseline_disposable)
    );
    println!(
        "   Monthly cost:             {}",
        money(evaluation.monthly_scenario_cost)
    );
    println!(
        "   Disposable after:         {}",
        money(evaluation.projected_disposable_after_purchase)
    );
    println!(
        "   Projected card debt:      {}",
        money(evaluation.projected_debt)
    );

    if evaluation.trajectory.len() > 1 {
        println!();
        for month in &evaluation.trajectory {
            println!(
                "   {}  pay {}  disposable {}  debt {}",
                month.month.format("%Y-%m"),
                money(month.payment),
                money(month.disposable),
                money(month.debt)
            );
        }
    }

    Ok(())
}
