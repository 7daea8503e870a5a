use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use schedsim::logger;
use schedsim::prelude::*;
use std::path::PathBuf;
use std::time::Duration;

fn cli() -> Command {
    Command::new("schedsim")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Uniprocessor CPU scheduler simulator")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Diagnostic output on stderr (repeat for more)"),
        )
        .subcommand(
            Command::new("run")
                .about("Schedule a workload file and write the logs")
                .arg(
                    Arg::new("workload")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Workload file (id arrival runtime priority memsize)"),
                )
                .arg(
                    Arg::new("policy")
                        .short('p')
                        .long("policy")
                        .default_value("hpf")
                        .value_parser(|s: &str| s.parse::<SchedulingPolicy>().map_err(|e| e.to_string()))
                        .help("hpf, srtn, rr or rr:<quantum>"),
                )
                .arg(
                    Arg::new("quantum")
                        .short('q')
                        .long("quantum")
                        .value_parser(value_parser!(u64))
                        .help("Round robin time slice (implies rr)"),
                )
                .arg(
                    Arg::new("arena")
                        .long("arena")
                        .default_value("1024")
                        .value_parser(value_parser!(usize))
                        .help("Memory arena size in bytes (power of two)"),
                )
                .arg(
                    Arg::new("capacity")
                        .long("capacity")
                        .default_value("1000")
                        .value_parser(value_parser!(usize))
                        .help("Ready structure capacity"),
                )
                .arg(
                    Arg::new("tick-ms")
                        .long("tick-ms")
                        .default_value("0")
                        .value_parser(value_parser!(u64))
                        .help("Wall-clock length of a tick for the threaded runtime"),
                )
                .arg(
                    Arg::new("out")
                        .short('o')
                        .long("out")
                        .default_value(".")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory for scheduler.log, memory.log and scheduler.perf"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .value_parser(value_parser!(PathBuf))
                        .help("Also write the whole report as JSON"),
                )
                .arg(
                    Arg::new("deterministic")
                        .long("deterministic")
                        .action(ArgAction::SetTrue)
                        .help("Single-threaded lockstep simulation instead of threads"),
                ),
        )
        .subcommand(
            Command::new("generate")
                .about("Write a random workload file")
                .arg(
                    Arg::new("count")
                        .short('n')
                        .long("count")
                        .default_value("10")
                        .value_parser(value_parser!(usize))
                        .help("Number of processes"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_parser(value_parser!(u64))
                        .help("Random seed (random if omitted)"),
                )
                .arg(
                    Arg::new("arena")
                        .long("arena")
                        .default_value("1024")
                        .value_parser(value_parser!(usize))
                        .help("Arena size the memory requests are spread over"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .default_value("processes.txt")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
}

fn main() {
    let matches = cli().get_matches();
    let verbosity = matches.get_count("verbose");
    if let Err(e) = logger::init(logger::level_for_verbosity(verbosity)) {
        eprintln!("schedsim: {}", e);
    }

    let result = match matches.subcommand() {
        Some(("run", sub)) => run(sub),
        Some(("generate", sub)) => generate(sub),
        _ => Err(Error::config("no subcommand given")),
    };

    if let Err(e) = result {
        eprintln!("schedsim: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &ArgMatches) -> Result<()> {
    let workload_path = required::<PathBuf>(args, "workload")?;
    let workload = Workload::from_file(&workload_path)?;

    let mut policy = required::<SchedulingPolicy>(args, "policy")?;
    if let Some(&quantum) = args.get_one::<u64>("quantum") {
        policy = SchedulingPolicy::RoundRobin { quantum };
    }

    let config = Config::builder()
        .policy(policy)
        .arena_size(required::<usize>(args, "arena")?)
        .ready_capacity(required::<usize>(args, "capacity")?)
        .tick_interval(Duration::from_millis(required::<u64>(args, "tick-ms")?))
        .build()?;

    let report = if args.get_flag("deterministic") {
        Simulation::new(config)?.run(&workload)?
    } else {
        Runtime::new(config)?.run(workload)?
    };

    LogFileExporter::new(required::<PathBuf>(args, "out")?).export(&report)?;
    if let Some(path) = args.get_one::<PathBuf>("json") {
        JsonExporter::new(path).export(&report)?;
    }
    ConsoleExporter::new(args.get_count("verbose") > 0).export(&report)
}

fn generate(args: &ArgMatches) -> Result<()> {
    let count = required::<usize>(args, "count")?;
    let seed = args
        .get_one::<u64>("seed")
        .copied()
        .unwrap_or_else(rand::random);
    let arena = required::<usize>(args, "arena")?;
    let output = required::<PathBuf>(args, "output")?;

    let workload = Workload::generate(count, seed, arena)?;
    workload.save(&output)?;
    log::info!(
        "wrote {} processes to {} (seed {})",
        workload.len(),
        output.display(),
        seed
    );
    Ok(())
}

fn required<T: Clone + Send + Sync + 'static>(args: &ArgMatches, name: &str) -> Result<T> {
    args.get_one::<T>(name)
        .cloned()
        .ok_or_else(|| Error::config(format!("missing argument --{}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn test_run_arguments_parse() {
        let matches = cli()
            .try_get_matches_from(["schedsim", "run", "procs.txt", "-p", "rr:3", "--deterministic"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "run");
        assert_eq!(
            sub.get_one::<SchedulingPolicy>("policy"),
            Some(&SchedulingPolicy::RoundRobin { quantum: 3 })
        );
        assert!(sub.get_flag("deterministic"));
    }
}
