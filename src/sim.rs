use std::process;

use apex_sim::error::SimulatorResult;
use apex_sim::flags::ApexSimArgs;
use apex_sim::run_wrapper;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr; `RUST_LOG` overrides the level picked by `--verbose`
fn logging_setup(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() {
    let args = ApexSimArgs::from_env_or_exit();
    logging_setup(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: &ApexSimArgs) -> SimulatorResult<()> {
    let report = run_wrapper::run(&args.program, args.policy(), args.trace.as_deref())?;

    for (i, value) in report.registers.iter().enumerate() {
        println!("Register Value: R{} = {}", i, value);
    }
    Ok(())
}
