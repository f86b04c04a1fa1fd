//! `cards`, `select-card`, `devices` subcommands.

use super::{
    CardsOutput, DevicesOutput, Globals, Result, load_config, print_json, save_config,
};
use radiomix_lib::{card, context};

pub(super) fn cmd_cards(globals: &Globals) -> Result<()> {
    let config = load_config(globals);
    let cards = card::list_cards();

    if globals.json {
        return print_json(&CardsOutput {
            current_card: config.card,
            cards,
        });
    }

    if cards.is_empty() {
        println!("No sound cards found.");
        return Ok(());
    }
    for c in &cards {
        let marker = if c.id == config.card || c.name == config.card {
            "*"
        } else {
            " "
        };
        println!("{marker} {}  {}", c.id, c.name);
    }
    Ok(())
}

pub(super) fn cmd_select_card(globals: &Globals, id: &str) -> Result<()> {
    // Start from the file, not the --card override
    let file_only = Globals {
        card: None,
        ..globals.clone()
    };
    let mut config = load_config(&file_only);
    context::select_card(&mut config, &card::list_cards(), id)?;
    let path = save_config(&config, globals)?;
    log::info!("card {id} saved to {}", path.display());

    if globals.json {
        return print_json(&config);
    }
    println!("Selected card {} (saved to {})", config.card, path.display());
    Ok(())
}

pub(super) fn cmd_devices(globals: &Globals) -> Result<()> {
    let devices = card::list_capture_devices();

    if globals.json {
        return print_json(&DevicesOutput {
            count: devices.len(),
            devices,
        });
    }

    for d in &devices {
        println!("{:<14} {}", d.plughw, d.label);
    }
    Ok(())
}
