//! Per-user settings commands for CLI.

use clap::Subcommand;
use mission_visual_core::Timezone;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Show the current user's settings
    Show,
    /// Set the timezone used to decide when a day is over
    Timezone {
        /// IANA timezone name (e.g. "Europe/Berlin")
        name: String,
    },
}

pub fn run(action: SettingsAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = ctx.open()?;

    match action {
        SettingsAction::Show => {
            print_json(&ws.manager.settings()?)?;
        }
        SettingsAction::Timezone { name } => {
            let timezone: Timezone = name.parse()?;
            let settings = ws.manager.update_timezone(timezone)?;
            ws.config.set_user_timezone(&settings.user_id, timezone);
            ws.config.save()?;
            print_json(&settings)?;
        }
    }

    ws.report()
}
