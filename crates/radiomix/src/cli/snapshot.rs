//! `store`, `restore`, `saved` subcommands.

use super::{ActionOutput, Globals, Result, SavedOutput, kv, kv_width, open_context, print_json};

pub(super) fn cmd_store(globals: &Globals) -> Result<()> {
    let ctx = open_context(globals);
    ctx.store()?;
    let snapshot = ctx.snapshot().path().display().to_string();
    if globals.json {
        return print_json(&ActionOutput { ok: true, snapshot });
    }
    println!("Mixer state stored to {snapshot}");
    Ok(())
}

pub(super) fn cmd_restore(globals: &Globals) -> Result<()> {
    let ctx = open_context(globals);
    ctx.restore()?;
    let snapshot = ctx.snapshot().path().display().to_string();
    if globals.json {
        return print_json(&ActionOutput { ok: true, snapshot });
    }
    println!("Mixer state restored from {snapshot}");
    Ok(())
}

/// Whether a snapshot exists. Changes since the store are reported by the
/// `set` and `defaults` invocations that make them.
pub(super) fn cmd_saved(globals: &Globals) -> Result<()> {
    let ctx = open_context(globals);
    let saved = ctx.snapshot().exists();
    let snapshot = ctx.snapshot().path().display().to_string();

    if globals.json {
        return print_json(&SavedOutput { saved, snapshot });
    }

    let w = kv_width(&["Snapshot:", "State:"], &[]);
    kv("Snapshot:", &snapshot, w);
    kv("State:", if saved { "saved" } else { "never saved" }, w);
    Ok(())
}
