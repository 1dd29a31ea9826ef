//! Dice side game: roll two dice against a persisted score file.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use numbercontest_execution::{DiceOutcome, DiceRules, DiceScore, ScoreStore};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{debug, Level};

#[derive(Parser, Debug)]
#[command(author, version, about = "Number contest dice side game")]
struct Args {
    /// Score file (flat JSON).
    #[arg(long, default_value = "dice_score.json")]
    stats: PathBuf,

    /// YAML file with `winning` and `losing` totals; 7/11 win and 2/3/12
    /// lose when omitted.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Fixed RNG seed for reproducible rolls.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Throw the dice once and record the outcome.
    Roll {
        /// Keep rolling until the game is won or lost.
        #[arg(long)]
        until_decided: bool,
    },
    /// Show the recorded score.
    Stats,
    /// Zero the recorded score.
    Reset,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = Level::from_str(&args.log_level)
        .with_context(|| format!("invalid log level {}", args.log_level))?;
    tracing_subscriber::fmt().with_max_level(level).init();

    let store = ScoreStore::new(&args.stats);
    let mut score = store
        .load()
        .with_context(|| format!("failed to load {}", args.stats.display()))?;

    match args.command {
        Command::Roll { until_decided } => {
            let rules = match &args.rules {
                Some(path) => load_rules(path)?,
                None => DiceRules::default(),
            };
            let mut rng = match args.seed {
                Some(seed) => ChaCha20Rng::seed_from_u64(seed),
                None => ChaCha20Rng::from_entropy(),
            };
            loop {
                let roll = rules.roll(&mut rng);
                score.record(roll.outcome);
                debug!(dice = ?roll.dice, total = roll.total, outcome = ?roll.outcome, "rolled");
                println!(
                    "Rolled {} + {} = {}: {}",
                    roll.dice[0],
                    roll.dice[1],
                    roll.total,
                    describe(roll.outcome)
                );
                if !until_decided || roll.outcome != DiceOutcome::RollAgain {
                    break;
                }
            }
            store.save(&score).context("failed to save score")?;
            print_score(&score);
        }
        Command::Stats => print_score(&score),
        Command::Reset => {
            score.reset();
            store.save(&score).context("failed to save score")?;
            println!("Score reset.");
        }
    }
    Ok(())
}

fn load_rules(path: &Path) -> anyhow::Result<DiceRules> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read rules {}", path.display()))?;
    let rules: DiceRules = serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse rules {}", path.display()))?;
    if let Some(total) = rules.winning.iter().find(|total| rules.losing.contains(*total)) {
        anyhow::bail!("total {total} is both a winning and a losing roll");
    }
    Ok(rules)
}

fn describe(outcome: DiceOutcome) -> &'static str {
    match outcome {
        DiceOutcome::Win => "You win!",
        DiceOutcome::Lose => "You lose!",
        DiceOutcome::RollAgain => "Roll again!",
    }
}

fn print_score(score: &DiceScore) {
    println!(
        "Wins: {}  Losses: {}  Rolls: {}  Win rate: {:.1}%",
        score.wins,
        score.losses,
        score.rolls,
        score.win_rate()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_rules_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(&path, "winning: [7]\nlosing: [2, 12]\n").unwrap();

        let rules = load_rules(&path).unwrap();
        assert_eq!(rules.classify(7), DiceOutcome::Win);
        assert_eq!(rules.classify(11), DiceOutcome::RollAgain);
        assert_eq!(rules.classify(3), DiceOutcome::RollAgain);
        assert_eq!(rules.classify(12), DiceOutcome::Lose);
    }

    #[test]
    fn test_partial_rules_keep_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(&path, "winning: [6, 8]\n").unwrap();

        let rules = load_rules(&path).unwrap();
        assert_eq!(rules.winning, vec![6, 8]);
        assert_eq!(rules.losing, DiceRules::default().losing);
    }

    #[test]
    fn test_overlapping_rules_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(&path, "winning: [7]\nlosing: [7]\n").unwrap();
        assert!(load_rules(&path).is_err());
        assert!(load_rules(&dir.path().join("missing.yaml")).is_err());
    }
}
