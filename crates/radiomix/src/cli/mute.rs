//! `status`, `mute`, `unmute`, `mute-switch` subcommands.

use std::sync::atomic::Ordering;
use std::time::Duration;

use serde::Serialize;

use super::{Globals, RUNNING, Result, kv, kv_width, open_context, print_json};
use radiomix_lib::mute::{MuteReport, UnmuteReport};

#[derive(Serialize)]
struct HeldMuteOutput {
    mute: MuteReport,
    unmute: UnmuteReport,
}

pub(super) fn cmd_status(globals: &Globals) -> Result<()> {
    let ctx = open_context(globals);
    let status = ctx.mute_status();

    if globals.json {
        return print_json(&status);
    }

    let w = kv_width(
        &["State:", "Muted:", "Hardware:", "Mute switch:", "Watcher:"],
        &[],
    );
    kv("State:", status.state, w);
    kv("Muted:", yes_no(status.muted), w);
    if let Some(hw) = status.hardware_muted {
        kv("Hardware:", if hw { "muted" } else { "unmuted" }, w);
    }
    kv(
        "Mute switch:",
        if status.has_mute_switch {
            "enabled"
        } else {
            "disabled"
        },
        w,
    );
    if status.has_mute_switch {
        kv(
            "Watcher:",
            format_args!(
                "{} ({})",
                if status.watcher_active {
                    "active"
                } else {
                    "inactive"
                },
                ctx.config().watcher_service
            ),
            w,
        );
    }
    Ok(())
}

/// Mute, hold until Ctrl+C, then restore. Levels live only in this process.
pub(super) fn cmd_mute(globals: &Globals) -> Result<()> {
    let ctx = open_context(globals);
    if ctx.config().has_mute_switch {
        log::warn!("hardware mute-switch mode is enabled; the watcher may override this mute");
    }

    let mute = ctx.web_mute();
    if !globals.json {
        println!("Muted: {}", join_or_none(&mute.captured));
        for name in &mute.failed {
            println!("  could not mute {name}");
        }
        println!("Press Ctrl+C to unmute.");
    }

    while RUNNING.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    let unmute = ctx.web_unmute();
    if globals.json {
        return print_json(&HeldMuteOutput { mute, unmute });
    }
    println!("Unmuted: {}", join_or_none(&unmute.restored));
    for name in &unmute.failed {
        println!("  could not restore {name}");
    }
    Ok(())
}

pub(super) fn cmd_unmute(globals: &Globals) -> Result<()> {
    let ctx = open_context(globals);
    let report = ctx.web_unmute();
    if globals.json {
        return print_json(&report);
    }
    if report.restored.is_empty() && report.failed.is_empty() {
        println!("Nothing to restore (no web mute held by this process).");
    } else {
        println!("Unmuted: {}", join_or_none(&report.restored));
    }
    Ok(())
}

pub(super) fn cmd_mute_switch(globals: &Globals, enabled: bool) -> Result<()> {
    let mut ctx = open_context(globals);
    let report = ctx.set_mute_switch(enabled)?;

    if globals.json {
        return print_json(&ctx.mute_status());
    }
    if !report.restored.is_empty() {
        println!("Restored: {}", report.restored.join(", "));
    }
    if enabled {
        println!(
            "Hardware mute switch enabled ({} started)",
            ctx.config().watcher_service
        );
    } else {
        println!(
            "Hardware mute switch disabled ({} stopped)",
            ctx.config().watcher_service
        );
    }
    Ok(())
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

fn join_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}
