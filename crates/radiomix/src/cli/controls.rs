//! `controls`, `get`, `set` subcommands.

use super::{
    ControlValue, Globals, Result, SetOutput, describe, format_kv, open_context, print_json,
};

pub(super) fn cmd_controls(globals: &Globals, all: bool) -> Result<()> {
    let ctx = open_context(globals);
    let controls = if all {
        ctx.registry().all_controls()
    } else {
        ctx.controls()
    };

    if globals.json {
        return print_json(&controls);
    }

    if controls.is_empty() {
        println!("No controls found on card {}.", ctx.config().card);
        return Ok(());
    }

    let w = controls.keys().map(|k| k.len()).max().unwrap_or(0) + 3;
    for (name, control) in &controls {
        let key = format!("{name}:");
        println!(
            "{}  {}",
            format_kv(&key, describe(control), w),
            control.kind
        );
    }
    Ok(())
}

pub(super) fn cmd_get(globals: &Globals, name: &str) -> Result<()> {
    let ctx = open_context(globals);
    let control = ctx.get_control(name)?;
    if globals.json {
        return print_json(&control);
    }
    println!("{}: {} ({})", control.name, describe(&control), control.kind);
    Ok(())
}

pub(super) fn cmd_set(globals: &Globals, name: &str, value: &ControlValue) -> Result<()> {
    let ctx = open_context(globals);
    ctx.set_control(name, value)?;
    let control = ctx.get_control(name).ok();
    let state = ctx.save_state();

    if globals.json {
        return print_json(&SetOutput {
            name: name.to_string(),
            value: value.to_string(),
            control,
            state,
        });
    }
    match control {
        Some(c) => println!("{name}: {}", describe(&c)),
        None => println!("{name}: set to {value}"),
    }
    println!("State: {state}");
    Ok(())
}
