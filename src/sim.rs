use sim_lib::cpu::CPUPolicy;
use sim_lib::error::SimulatorError;
use sim_lib::pipelined::branch_predictor::PredictorHeuristic;
use sim_lib::pipelined::hazard::HazardPolicy;
use sim_lib::report;
use sim_lib::run_wrapper;
use std::env;
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage: sim -i <image> [options]
  -h, --help            print this message
  -i, --input <file>    binary image to run
  -o, --output <file>   write the register dump to <file>
  -f, --detect_forward  resolve data hazards by forwarding (default: stall)
  -s, --bp_static       static not-taken branch prediction (default)
  -1, --bp_1bit         1-bit branch prediction
  -2, --bp_2bit         2-bit branch prediction
  -m, --max-cycles <n>  abort after <n> cycles
  -v, --verbose         print the pipeline trace of every cycle";

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let mut policy = CPUPolicy::default();
    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut heuristics: Vec<PredictorHeuristic> = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("{}", USAGE);
                return Ok(());
            }
            "-i" | "--input" => {
                let path = args
                    .next()
                    .ok_or("You should specify an image file after -i")?;
                input = Some(path.into());
            }
            "-o" | "--output" => {
                let path = args
                    .next()
                    .ok_or("You should specify an output file after -o")?;
                output = Some(path.into());
            }
            "-f" | "--detect_forward" => policy.hazard = HazardPolicy::Forward,
            "-s" | "--bp_static" => heuristics.push(PredictorHeuristic::Static),
            "-1" | "--bp_1bit" => heuristics.push(PredictorHeuristic::OneBit),
            "-2" | "--bp_2bit" => heuristics.push(PredictorHeuristic::TwoBit),
            "-m" | "--max-cycles" => {
                let limit = args
                    .next()
                    .ok_or("You should specify a cycle count after -m")?;
                policy.max_cycles = limit.parse().map_err(|_| {
                    SimulatorError::ConfigError(format!(
                        "Invalid cycle count: {}",
                        limit
                    ))
                })?;
            }
            "-v" | "--verbose" => policy.verbose = true,
            _ => {
                eprintln!("{}", USAGE);
                return Err(SimulatorError::ConfigError(format!(
                    "Unknown parameter: {}",
                    arg
                ))
                .into());
            }
        }
    }

    // The most complex predictor requested wins
    if let Some(heuristic) = heuristics.into_iter().max() {
        policy.heuristic = heuristic;
    }

    let Some(input) = input else {
        eprintln!("{}", USAGE);
        return Err("You should specify an image file with -i".into());
    };

    let cpu = run_wrapper::run(&input, policy)?;

    print!("{}", report::Stats::new(&cpu.history, &cpu.gpr));
    if let Some(output) = output {
        report::store_results(&output, &cpu.gpr)?;
    }

    Ok(())
}
