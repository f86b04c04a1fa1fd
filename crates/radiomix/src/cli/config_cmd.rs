//! `config` subcommand: show current configuration and file paths.

use super::{
    ConfigFilesJson, ConfigOutput, Globals, Result, config_file, kv, kv_indent, kv_width,
    load_config, path_status, print_json,
};

pub(super) fn cmd_config(globals: &Globals) -> Result<()> {
    let config = load_config(globals);
    let config_path = config_file(globals);
    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());

    let snapshot = config.snapshot_file();
    let mute_record = config.mute_record_file();

    if globals.json {
        let output = ConfigOutput {
            config_file: config_path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: config_exists,
            files: ConfigFilesJson {
                snapshot: snapshot.display().to_string(),
                snapshot_exists: snapshot.exists(),
                mute_record: mute_record.display().to_string(),
                mute_record_exists: mute_record.exists(),
            },
            settings: config,
        };
        return print_json(&output);
    }

    // Human-readable output
    let w = kv_width(
        &["Config file:"],
        &[
            "card:",
            "secondary_card:",
            "mute_targets:",
            "has_mute_switch:",
            "watcher_service:",
            "use_sudo:",
            "Snapshot:",
            "Mute record:",
        ],
    );

    match &config_path {
        Some(p) if config_exists => kv("Config file:", format_args!("{} (loaded)", p.display()), w),
        Some(p) => kv(
            "Config file:",
            format_args!("{} (not found, using defaults)", p.display()),
            w,
        ),
        None => kv("Config file:", "(no config directory)", w),
    }
    println!();

    println!("Settings:");
    kv_indent("card:", &config.card, w);
    kv_indent("secondary_card:", &config.secondary_card, w);
    kv_indent("mute_targets:", config.mute_targets.join(", "), w);
    kv_indent("has_mute_switch:", config.has_mute_switch, w);
    kv_indent("watcher_service:", &config.watcher_service, w);
    kv_indent("use_sudo:", config.use_sudo, w);
    println!();

    println!("Files:");
    kv_indent("Snapshot:", path_status(&snapshot), w);
    kv_indent("Mute record:", path_status(&mute_record), w);
    Ok(())
}
