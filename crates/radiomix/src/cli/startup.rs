//! `startup` subcommand: the boot-time sequence.

use super::{Globals, Result, kv, kv_width, open_context, print_json};

pub(super) fn cmd_startup(globals: &Globals) -> Result<()> {
    let ctx = open_context(globals);
    let report = ctx.startup();

    if globals.json {
        return print_json(&report);
    }

    let w = kv_width(&["Mute switch:", "Watcher:", "Snapshot:"], &[]);
    kv(
        "Mute switch:",
        if report.has_mute_switch {
            "enabled"
        } else {
            "disabled"
        },
        w,
    );
    match &report.watcher_error {
        Some(e) => kv("Watcher:", format_args!("failed: {e}"), w),
        None => kv(
            "Watcher:",
            if report.has_mute_switch {
                "started"
            } else {
                "stopped"
            },
            w,
        ),
    }
    let snapshot = if report.restored {
        "restored".to_string()
    } else if let Some(e) = &report.restore_error {
        format!("restore failed: {e}")
    } else {
        "none stored".to_string()
    };
    kv("Snapshot:", snapshot, w);
    Ok(())
}
