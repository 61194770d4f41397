use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use plotters::prelude::*;
use sim_lib::cpu::CPUHistory;
use sim_lib::cpu::CPUPolicy;
use sim_lib::error::SimulatorError;
use sim_lib::error::SimulatorResult;
use sim_lib::loader;
use sim_lib::pipelined::branch_predictor::PredictorHeuristic;
use sim_lib::pipelined::hazard::HazardPolicy;
use sim_lib::run_wrapper::run_image;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run_eval() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// One configuration and its statistics, `None` if the run failed
type EvalResult = (HazardPolicy, PredictorHeuristic, Option<CPUHistory>);

fn io_error(message: String) -> SimulatorError {
    SimulatorError::IoError(std::io::Error::new(std::io::ErrorKind::Other, message))
}

const USAGE: &str = "\
Usage: policy-eval <image> [out-dir] [options]
  -p, --policies <list>    hazard policies to compare (default: stall,forward)
  -b, --predictors <list>  branch predictors to compare (default: static,1bit,2bit)";

/// Parses a comma-separated list such as `stall,forward`
fn parse_list<T>(list: &str) -> SimulatorResult<Vec<T>>
where
    T: FromStr<Err = SimulatorError>,
{
    list.split(',').map(|item| item.trim().parse()).collect()
}

fn run_eval() -> SimulatorResult<()> {
    let mut image_path: Option<PathBuf> = None;
    let mut out_dir = PathBuf::from("eval");
    let mut policies = vec![HazardPolicy::Stall, HazardPolicy::Forward];
    let mut heuristics = vec![
        PredictorHeuristic::Static,
        PredictorHeuristic::OneBit,
        PredictorHeuristic::TwoBit,
    ];

    let mut args = std::env::args().skip(1);
    let mut positional = 0;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-p" | "--policies" => {
                let list = args.next().ok_or_else(|| {
                    SimulatorError::ConfigError(format!("Missing list after {}\n{}", arg, USAGE))
                })?;
                policies = parse_list(&list)?;
            }
            "-b" | "--predictors" => {
                let list = args.next().ok_or_else(|| {
                    SimulatorError::ConfigError(format!("Missing list after {}\n{}", arg, USAGE))
                })?;
                heuristics = parse_list(&list)?;
            }
            _ if arg.starts_with('-') => {
                return Err(SimulatorError::ConfigError(format!(
                    "Unknown parameter: {}\n{}",
                    arg, USAGE
                )));
            }
            _ => {
                match positional {
                    0 => image_path = Some(arg.into()),
                    1 => out_dir = arg.into(),
                    _ => {
                        return Err(SimulatorError::ConfigError(format!(
                            "Unexpected argument: {}\n{}",
                            arg, USAGE
                        )))
                    }
                }
                positional += 1;
            }
        }
    }

    let image_path = image_path.ok_or_else(|| {
        SimulatorError::ConfigError(format!(
            "You should specify exactly one image file\n{}",
            USAGE
        ))
    })?;
    std::fs::create_dir_all(&out_dir)?;

    let image = loader::read_image(&image_path)?;

    let mut results: Vec<EvalResult> = Vec::new();
    for &hazard in &policies {
        for &heuristic in &heuristics {
            eprintln!("Running configuration: {}/{}", hazard, heuristic);
            let policy = CPUPolicy { hazard, heuristic, ..Default::default() };
            match run_image(&image, policy) {
                Ok(cpu) => results.push((hazard, heuristic, Some(cpu.history))),
                Err(e) => {
                    eprintln!(
                        "Warning: Failed to run {}/{}: {}",
                        hazard,
                        heuristic,
                        e.root()
                    );
                    results.push((hazard, heuristic, None));
                }
            }
        }
    }

    write_csv(&out_dir.join("policy_eval.csv"), &results)?;
    plot(&out_dir.join("policy_eval.svg"), &image_path, &results)?;

    Ok(())
}

fn write_csv(path: &Path, results: &[EvalResult]) -> SimulatorResult<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        io_error(format!("Failed to create CSV file '{}': {}", path.display(), e))
    })?;

    writer
        .write_record([
            "Policy", "Predictor", "Cycles", "CPI", "Hits", "Misses", "Stalls",
            "Forwards",
        ])
        .map_err(|e| io_error(format!("Failed to write header to CSV: {}", e)))?;

    for (hazard, heuristic, history) in results {
        let mut record = vec![hazard.to_string(), heuristic.to_string()];
        match history {
            Some(history) => record.extend([
                history.cycle_count.to_string(),
                format!("{:.3}", history.cpi()),
                history.branch_hit_count.to_string(),
                history.branch_miss_count.to_string(),
                history.stall_count.to_string(),
                history.forward_count.to_string(),
            ]),
            None => record.extend(std::iter::repeat("Error".to_string()).take(6)),
        }
        writer
            .write_record(&record)
            .map_err(|e| io_error(format!("Failed to write record to CSV: {}", e)))?;
    }

    writer.flush()?;
    Ok(())
}

fn plot(path: &Path, image_path: &Path, results: &[EvalResult]) -> SimulatorResult<()> {
    let plot_error = |e: &dyn std::fmt::Display| io_error(format!("Failed to plot: {}", e));

    // Failed configurations have no bar
    let bars: Vec<(String, u64)> = results
        .iter()
        .filter_map(|(hazard, heuristic, history)| {
            history.map(|h| (format!("{}/{}", hazard, heuristic), h.cycle_count))
        })
        .collect();

    let image_name = image_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let plot_title = format!("Cycles per configuration: {}", image_name);
    let y_max = bars.iter().map(|(_, cycles)| *cycles).max().unwrap_or(1);

    let root = SVGBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_error(&e))?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(plot_title.as_str(), ("sans-serif", 32).into_font())
        .margin(5)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (0..bars.len() as u32).into_segmented(),
            0u64..y_max + y_max / 10 + 1,
        )
        .map_err(|e| plot_error(&e))?;

    ctx.configure_mesh()
        .disable_x_mesh()
        .x_desc("Hazard policy / predictor")
        .y_desc("Cycles")
        .x_label_formatter(&|x| match x {
            SegmentValue::CenterOf(i) => bars
                .get(*i as usize)
                .map(|(label, _)| label.clone())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .draw()
        .map_err(|e| plot_error(&e))?;

    ctx.draw_series(bars.iter().enumerate().map(|(i, (_, cycles))| {
        let color = Palette99::pick(i).to_rgba();
        let x = i as u32;
        Rectangle::new(
            [(SegmentValue::Exact(x), 0), (SegmentValue::Exact(x + 1), *cycles)],
            color.filled(),
        )
    }))
    .map_err(|e| plot_error(&e))?;

    root.present().map_err(|e| plot_error(&e))?;
    Ok(())
}
