use qtsim::{ScenarioConfig, Scenario};
use qtsim::run_2d;
use qtsim::{bench_broad_phase, bench_thread_scaling};

use anyhow::{Context, Result};
use clap::Parser;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Args {
    /// Scenario file under `scenarios/`
    #[arg(short, default_value = "default.yaml")]
    file_name: String,

    /// Run without a window for a fixed number of frames
    #[arg(long)]
    headless: bool,

    /// Override `parameters.frames` for a headless run
    #[arg(long)]
    frames: Option<usize>,

    /// Print broad phase and thread scaling timings instead of simulating
    #[arg(long)]
    bench: bool,
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<ScenarioConfig> {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name);
    let file = File::open(&config_path).with_context(|| format!("opening {}", config_path.display()))?;
    let reader = BufReader::new(file);
    let scenario_cfg: ScenarioConfig =
        serde_yaml::from_reader(reader).with_context(|| format!("parsing {}", config_path.display()))?;

    Ok(scenario_cfg)
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.bench {
        env_logger::init();
        bench_broad_phase()?;
        bench_thread_scaling()?;
        return Ok(());
    }

    let scenario_cfg = load_scenario_from_yaml(&args.file_name)?;
    let mut scenario = Scenario::build_scenario(scenario_cfg)?;

    if args.headless {
        // the viewer installs its own logger through Bevy
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        if let Some(frames) = args.frames {
            scenario.parameters.frames = frames;
        }
        scenario.run_headless()?;
    } else {
        run_2d(scenario);
    }

    Ok(())
}
