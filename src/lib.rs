pub mod combat;
pub mod config;
pub mod entities;
pub mod telemetry;
pub mod world;

use combat::ability::{load_catalogue, summarize};
use config::CombatConfig;
use log::info;

pub fn run(args: &[String]) -> Result<(), String> {
    let config = config::AppConfig::from_args(args)?;
    telemetry::logging::init(&config.root, &telemetry::logging::LogConfig::from_env())?;
    let combat = CombatConfig::load_or_default(&config.combat_config).map_err(|err| err.to_string())?;
    let abilities = load_catalogue(&config.abilities).map_err(|err| err.to_string())?;
    let summary = summarize(&abilities);
    info!(
        "combat scan: world_type={:?}, vocations={}, abilities={}",
        combat.world_type,
        combat.vocations.len(),
        summary.total
    );

    println!("tibia-combat: combat scan");
    println!("- root: {}", config.root.display());
    if config.combat_config.exists() {
        println!("- combat config: {}", config.combat_config.display());
    } else {
        println!(
            "- combat config: {} missing, using defaults",
            config.combat_config.display()
        );
    }
    println!("- world type: {:?}", combat.world_type);
    println!("- pvp damage halving: {}", combat.pvp_damage_halving);
    println!("- max absorb: {}%", combat.max_absorb_percent);
    println!(
        "- skulls: red after {} kills, black after {} kills",
        combat.kills_to_red_skull, combat.kills_to_black_skull
    );
    println!("- vocations: {}", combat.vocations.len());
    println!("- abilities: {}", config.abilities.display());
    println!(
        "- ability catalogue: total={}, area={}, single_target={}, healing={}, fields={}, conditions={}",
        summary.total,
        summary.area,
        summary.single_target,
        summary.healing,
        summary.fields,
        summary.conditions
    );
    Ok(())
}
