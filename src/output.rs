use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::models::{PolicyMatch, RefKind, ReferencePools, ReferenceToScan, ScanPlan, ScanTarget};
use crate::policy::{KeepPolicy, Limit};

/// Print one block per evaluated keep policy with the references it kept
pub fn print_trace(trace: &[PolicyMatch]) {
    for record in trace {
        println!("\n{} {}", "POLICY".cyan().bold(), record.policy.bold());
        println!("{}", "─".repeat(60));
        if record.references.is_empty() {
            println!("  {}", "No references matched.".dimmed());
        }
        for name in &record.references {
            println!("  {}", name);
        }
    }
}

/// Print the final list of references to scan
pub fn print_targets(targets: &[ScanTarget]) {
    println!("\n{}", "═".repeat(60));
    println!(
        "{} ({}):",
        "REFERENCES TO SCAN".green().bold(),
        targets.len()
    );
    for target in targets {
        print_reference_line(&target.reference, &target.to_string());
    }
    if targets.is_empty() {
        println!("  {}", "Nothing to scan.".yellow());
    }
}

/// Print the classified branch and tag pools
pub fn print_pools(pools: &ReferencePools) {
    println!("{} ({}):", "BRANCHES".bold(), pools.branches.len());
    for r in &pools.branches {
        print_reference_line(r, r.short_name());
    }
    println!("\n{} ({}):", "TAGS".bold(), pools.tags.len());
    for r in &pools.tags {
        print_reference_line(r, r.short_name());
    }
}

pub fn print_policies(policies: &[KeepPolicy], defaulted: bool) {
    if defaulted {
        println!(
            "{}",
            "No keep policies configured, using defaults:".yellow()
        );
    }
    for (i, policy) in policies.iter().enumerate() {
        println!("  {}. {}", i + 1, policy);
    }
}

fn print_reference_line(r: &ReferenceToScan, label: &str) {
    let kind = match r.kind {
        RefKind::Branch => "BRANCH".blue().bold().to_string(),
        RefKind::Tag => "   TAG".magenta().bold().to_string(),
    };
    let depth = match r.scan_depth_limit {
        d if d < 0 => "depth ∞".to_string(),
        d => format!("depth {}", d),
    };

    println!(
        "  [{}] {:<40} {} {} {}",
        kind,
        label,
        short_hash(&r.head_commit.id.to_string()).dimmed(),
        format_time(&r.created_at).dimmed(),
        depth.dimmed(),
    );
}

fn format_time(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn short_hash(hash: &str) -> &str {
    if hash.len() > 8 {
        &hash[..8]
    } else {
        hash
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TargetView<'a> {
    name: &'a str,
    kind: RefKind,
    head_commit: String,
    created_at: DateTime<Utc>,
    scan_depth_limit: i32,
    images_per_reference: &'a Limit,
}

#[derive(Serialize)]
struct PlanView<'a> {
    policies: &'a [PolicyMatch],
    references: Vec<TargetView<'a>>,
}

/// Render a scan plan as pretty-printed JSON
pub fn plan_json(plan: &ScanPlan) -> Result<String, serde_json::Error> {
    let view = PlanView {
        policies: &plan.trace,
        references: plan
            .targets
            .iter()
            .map(|t| TargetView {
                name: t.reference.short_name(),
                kind: t.reference.kind,
                head_commit: t.reference.head_commit.id.to_string(),
                created_at: t.reference.created_at,
                scan_depth_limit: t.reference.scan_depth_limit,
                images_per_reference: &t.images_cleanup_keep_policy,
            })
            .collect(),
    };
    serde_json::to_string_pretty(&view)
}
