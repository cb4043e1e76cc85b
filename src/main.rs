use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::BufReader;
use tracing_subscriber::EnvFilter;

use repcount::config::Config;
use repcount::replay::replay;
use repcount::{generate_report, ExerciseType, Session};

const CONFIG_PATH: &str = "config.toml";
const USAGE: &str = "usage: repcount <exercise> <poses.jsonl> [config.toml] [--json]";
const EXERCISES: &str = "push-up, squat, plank, hip-circle, wrist-rotation, arm-circle";

struct Args {
    exercise: ExerciseType,
    poses: String,
    config: Option<String>,
    json: bool,
}

fn parse_args() -> Result<Args> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let json = args.iter().any(|a| a == "--json");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    if positional.len() < 2 || positional.len() > 3 {
        bail!("{}", USAGE);
    }
    let exercise = positional[0]
        .parse::<ExerciseType>()
        .with_context(|| format!("{}\nexercises: {}", USAGE, EXERCISES))?;

    Ok(Args {
        exercise,
        poses: positional[1].clone(),
        config: positional.get(2).map(|s| s.to_string()),
        json,
    })
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(CONFIG_PATH),
    };

    eprintln!("repcount {}", env!("GIT_VERSION"));
    eprintln!("Exercise: {}", args.exercise);
    eprintln!("Input: {}", args.poses);

    let file = File::open(&args.poses).with_context(|| format!("failed to open {}", args.poses))?;
    let mut session = Session::start(args.exercise, &config);
    let metrics = replay(BufReader::new(file), &mut session)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        print!("{}", generate_report(&metrics, args.exercise));
    }
    Ok(())
}
