use clap::Subcommand;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Report the missed days found when this session started
    Init,
}

pub fn run(action: SessionAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = ctx.open()?;

    match action {
        SessionAction::Init => {
            print_json(&ws.startup_events)?;
        }
    }

    ws.report()
}
