//! Console rendering for reports, ledger reviews and pass results.
//!
//! Pure string builders; the binary decides where the text goes.

use quartermaster_core::{Item, LedgerEntry};
use quartermaster_inventory::{Mutation, ReconciliationPlan};
use quartermaster_infra::ReconciliationOutcome;

const PREFIX: &str = "Quartermaster:";

fn line(out: &mut String, text: impl AsRef<str>) {
    out.push_str(PREFIX);
    out.push(' ');
    out.push_str(text.as_ref());
    out.push('\n');
}

pub fn report(items: &[Item]) -> String {
    let mut out = String::new();
    line(&mut out, "Current inventory:");
    for item in items {
        line(&mut out, format!("{} | {} | {}", item.name, item.quantity, item.description));
    }
    line(&mut out, "Report complete. Ever ready to assist.");
    out
}

pub fn ledger(entries: &[LedgerEntry]) -> String {
    let mut out = String::new();
    line(&mut out, "Ledger review commencing.");
    if entries.is_empty() {
        line(&mut out, "Ledger is currently empty.");
    } else {
        line(&mut out, "ID | Timestamp | Action | Item | Qty Change | Description");
        for e in entries {
            line(
                &mut out,
                format!(
                    "{} | {} | {} | {} | {:+} | {}",
                    e.id,
                    e.timestamp_text(),
                    e.action,
                    e.item,
                    e.quantity_change,
                    e.note
                ),
            );
        }
    }
    line(&mut out, "Ledger review complete. Records stand tall.");
    out
}

pub fn outcome(outcome: &ReconciliationOutcome) -> String {
    let mut out = String::new();
    if outcome.is_noop() {
        line(&mut out, "Inventory already matches the manifest.");
        return out;
    }
    for e in &outcome.entries {
        line(
            &mut out,
            format!("{} '{}' ({:+}): {}", e.action, e.item, e.quantity_change, e.note),
        );
    }
    line(&mut out, format!("Recorded {}.", outcome.summary));
    out
}

pub fn plan(plan: &ReconciliationPlan) -> String {
    let mut out = String::new();
    line(&mut out, "Dry run; nothing will be recorded.");
    if plan.is_empty() {
        line(&mut out, "Inventory already matches the manifest.");
        return out;
    }
    for m in plan.mutations() {
        line(
            &mut out,
            format!(
                "would {} '{}' ({:+}): {}",
                m.action(),
                m.item_name(),
                m.quantity_change(),
                m.note()
            ),
        );
    }
    line(&mut out, format!("Would record {}.", plan.summary()));
    out
}

/// Short description of a mutation for log lines.
pub fn mutation_label(m: &Mutation) -> String {
    format!("{} {}", m.action(), m.item_name())
}
