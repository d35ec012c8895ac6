use std::path::PathBuf;

use agility_core::program::{estimate_drill, AgilityProgram};
use agility_core::{estimate_duration_with, Config};
use clap::Subcommand;
use serde_json::json;

#[derive(Subcommand)]
pub enum ProgramAction {
    /// Check a program file and list its equipment
    Validate {
        /// Program file (.toml or .json)
        file: PathBuf,
    },
    /// Expected session length in seconds
    Estimate {
        /// Program file (.toml or .json)
        file: PathBuf,
        /// Include the per-drill breakdown
        #[arg(long)]
        breakdown: bool,
    },
}

pub fn run(action: ProgramAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ProgramAction::Validate { file } => {
            let program = AgilityProgram::load(&file)?;
            program.validate()?;
            let out = json!({
                "id": program.id,
                "name": program.name,
                "drills": program.drills.len(),
                "totalReps": program.total_reps(),
                "equipment": program.required_equipment(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        ProgramAction::Estimate { file, breakdown } => {
            let program = AgilityProgram::load(&file)?;
            let defaults = Config::load_or_default().estimate_defaults();
            let total = estimate_duration_with(&program, &defaults);
            let mut out = json!({
                "programId": program.id,
                "estimatedSecs": total,
                "warmupSecs": program.warmup_duration,
                "cooldownSecs": program.cooldown_duration,
            });
            if breakdown {
                let drills: Vec<_> = program
                    .drills
                    .iter()
                    .map(|d| estimate_drill(d, &defaults))
                    .collect();
                out["drills"] = serde_json::to_value(drills)?;
            }
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}
