//! `defaults` subcommand: apply the line-input preset.

use super::{DefaultsOutput, Globals, Result, open_context, print_json};

pub(super) fn cmd_defaults(globals: &Globals) -> Result<()> {
    let ctx = open_context(globals);
    let report = ctx.apply_defaults();
    let state = ctx.save_state();

    if globals.json {
        return print_json(&DefaultsOutput { report, state });
    }

    println!("Applied: {}", list_or_none(&report.applied));
    if !report.skipped.is_empty() {
        println!("Skipped: {}", report.skipped.join(", "));
    }
    println!("State: {state}");
    Ok(())
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}
