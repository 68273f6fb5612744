use std::path::PathBuf;
use std::process;

use cumulus_tool::report;
use cumulus_tool::runner::{self, RunConfig};

fn usage() {
    eprintln!("Usage: cumulus [OPTIONS]");
    eprintln!("  --settings <path>   Load cloud settings from RON (default: built-in preset)");
    eprintln!("  --force             Regenerate even if the saved field is current");
    eprintln!("  --cpu               Use the CPU backend instead of the GPU");
    eprintln!("  --seed <n>          Seed for point jitter (default: random)");
    eprintln!("  --continuous-points Keep raw point jitter instead of snapping to voxels");
    eprintln!("  --output <path>     Field file (raw little-endian f32 voxels); reused on Apply");
    eprintln!("  --report <path>     Field statistics as JSON; identifies the saved field");
    eprintln!("  --dump-settings     Print the effective settings as RON and exit");
}

/// Value following a flag, or exit with a message.
fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i) {
        Some(value) => value,
        None => {
            eprintln!("Missing value for {}", flag);
            process::exit(1);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    let mut config = RunConfig::default();
    let mut dump_settings = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--settings" => {
                i += 1;
                config.settings_path = Some(PathBuf::from(flag_value(&args, i, "--settings")));
            }
            "--force" => config.force = true,
            "--cpu" => config.cpu_only = true,
            "--continuous-points" => config.continuous_points = true,
            "--seed" => {
                i += 1;
                match flag_value(&args, i, "--seed").parse() {
                    Ok(seed) => config.seed = Some(seed),
                    Err(_) => {
                        eprintln!("Invalid --seed value: {}", args[i]);
                        process::exit(1);
                    }
                }
            }
            "--output" => {
                i += 1;
                config.output_path = Some(PathBuf::from(flag_value(&args, i, "--output")));
            }
            "--report" => {
                i += 1;
                config.report_path = Some(PathBuf::from(flag_value(&args, i, "--report")));
            }
            "--dump-settings" => dump_settings = true,
            "--help" | "-h" => {
                usage();
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    if dump_settings {
        let ron = runner::load_run_settings(&config)
            .and_then(|settings| cumulus_volume::settings::to_ron_string(&settings));
        match ron {
            Ok(ron) => println!("{}", ron),
            Err(e) => {
                eprintln!("ERROR: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    let outcome = match runner::run(&config) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    println!("\n## Noise Field\n");
    println!("{}", report::format_markdown(&outcome.report));

    if outcome.block.is_none() {
        log::warn!("Cloud rendering is disabled in these settings; no parameter block produced");
    }
    if !outcome.regenerated {
        log::info!("Saved field reused; pass --force to regenerate");
    }

    log::info!("Done.");
}
