use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{error, info};
use vm_oracle::config::{AdapterKind, OracleConfig};
use vm_oracle::corpus::OperandCorpus;
use vm_oracle::descriptor::InstructionGroup;
use vm_oracle::report::ReportMode;
use vm_oracle::summary::RunSummary;
use vm_oracle::table::{TableOptions, standard_table};

const EXIT_CLEAN: i32 = 0;
const EXIT_MISMATCH: i32 = 1;
const EXIT_ERROR: i32 = 2;
const EXIT_UNSUPPORTED: i32 = 3;

fn cli() -> Command {
    Command::new("vm-oracle")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Golden-value verification of PowerPC FPU, logical and AltiVec instructions")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("instructions")
                .short('i')
                .long("instructions")
                .value_name("MNEMONIC")
                .value_delimiter(',')
                .action(ArgAction::Append)
                .help("Instructions to run (comma separated)"),
        )
        .arg(
            Arg::new("groups")
                .short('g')
                .long("groups")
                .value_name("GROUP")
                .value_delimiter(',')
                .action(ArgAction::Append)
                .help("Instruction groups to run (fpu, integer_logical, vector_integer, vector_float, vector_permute, vector_memory)"),
        )
        .arg(
            Arg::new("exclude")
                .short('x')
                .long("exclude")
                .value_name("MNEMONIC")
                .value_delimiter(',')
                .action(ArgAction::Append)
                .help("Instructions to skip"),
        )
        .arg(
            Arg::new("adapter")
                .short('a')
                .long("adapter")
                .value_name("KIND")
                .help("Executor under test (model, host, replay)"),
        )
        .arg(
            Arg::new("replay")
                .short('r')
                .long("replay")
                .value_name("FILE")
                .help("Observation dump for the replay executor (implies --adapter replay)"),
        )
        .arg(
            Arg::new("mode")
                .short('m')
                .long("mode")
                .value_name("MODE")
                .help("Report mode (summary, verbose, dump)"),
        )
        .arg(
            Arg::new("workers")
                .short('w')
                .long("workers")
                .value_name("NUM")
                .help("Worker threads"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .value_name("FILE")
                .help("Write the run summary as JSON"),
        )
        .arg(
            Arg::new("non-java")
                .long("non-java")
                .action(ArgAction::SetTrue)
                .help("Run AltiVec floating point in non-Java mode (VSCR[NJ]=1)"),
        )
        .arg(
            Arg::new("extended")
                .long("extended")
                .action(ArgAction::SetTrue)
                .help("Add denormal and signalling NaN operands to the corpus"),
        )
        .arg(
            Arg::new("no-flags")
                .long("no-flags")
                .action(ArgAction::SetTrue)
                .help("Compare result values only"),
        )
        .arg(
            Arg::new("ignore-nan-payload")
                .long("ignore-nan-payload")
                .action(ArgAction::SetTrue)
                .help("Accept any NaN where a NaN is expected"),
        )
        .arg(
            Arg::new("fail-on-unsupported")
                .long("fail-on-unsupported")
                .action(ArgAction::SetTrue)
                .help("Exit non-zero when the executor cannot run some cases"),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .action(ArgAction::SetTrue)
                .help("List the instruction table and exit"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Debug logging"),
        )
}

fn strings(matches: &ArgMatches, id: &str) -> Option<Vec<String>> {
    matches.get_many::<String>(id).map(|values| values.cloned().collect())
}

/// 命令行参数覆盖配置文件
fn load_config(matches: &ArgMatches) -> anyhow::Result<OracleConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => OracleConfig::from_file(path).with_context(|| format!("loading {}", path))?,
        None => OracleConfig::default(),
    };

    if let Some(instructions) = strings(matches, "instructions") {
        config.selection.instructions = instructions;
    }
    if let Some(groups) = strings(matches, "groups") {
        config.selection.groups = groups
            .iter()
            .map(|g| g.parse::<InstructionGroup>())
            .collect::<Result<_, _>>()?;
    }
    if let Some(exclude) = strings(matches, "exclude") {
        config.selection.exclude = exclude;
    }
    if let Some(kind) = matches.get_one::<String>("adapter") {
        config.adapter.kind = kind.parse::<AdapterKind>().map_err(anyhow::Error::msg)?;
    }
    if let Some(path) = matches.get_one::<String>("replay") {
        config.adapter.kind = AdapterKind::Replay;
        config.adapter.replay_path = Some(PathBuf::from(path));
    }
    if let Some(mode) = matches.get_one::<String>("mode") {
        config.report.mode = mode.parse::<ReportMode>().map_err(anyhow::Error::msg)?;
    }
    if let Some(workers) = matches.get_one::<String>("workers") {
        config.engine.workers = workers
            .parse()
            .with_context(|| format!("invalid worker count: {}", workers))?;
    }
    if let Some(path) = matches.get_one::<String>("json") {
        config.report.json_summary = Some(PathBuf::from(path));
    }
    if matches.get_flag("non-java") {
        config.vector.non_java = true;
    }
    if matches.get_flag("extended") {
        config.corpus.extended_values = true;
    }
    if matches.get_flag("no-flags") {
        config.compare.check_flags = false;
    }
    if matches.get_flag("ignore-nan-payload") {
        config.compare.ignore_nan_payload = true;
    }
    if matches.get_flag("fail-on-unsupported") {
        config.report.fail_on_unsupported = true;
    }

    config.validate()?;
    Ok(config)
}

fn list_instructions(config: &OracleConfig) -> anyhow::Result<()> {
    let corpus = OperandCorpus::build(&config.corpus);
    let table = standard_table(&corpus, &TableOptions::new(&corpus, config.vector.mode()))?;
    for descriptor in config.select(&table)? {
        let operands: Vec<String> = descriptor.operands.iter().map(ToString::to_string).collect();
        println!(
            "{:<12} {:<16} ({}) -> {}",
            descriptor.mnemonic,
            descriptor.group.to_string(),
            operands.join(", "),
            descriptor.result
        );
    }
    Ok(())
}

fn exit_code(summary: &RunSummary, config: &OracleConfig) -> i32 {
    if !summary.is_clean() {
        EXIT_MISMATCH
    } else if summary.unsupported > 0 && config.report.fail_on_unsupported {
        EXIT_UNSUPPORTED
    } else {
        EXIT_CLEAN
    }
}

fn run(matches: &ArgMatches) -> anyhow::Result<i32> {
    let config = load_config(matches)?;
    if matches.get_flag("list") {
        list_instructions(&config)?;
        return Ok(EXIT_CLEAN);
    }

    info!("adapter {:?}, {} workers", config.adapter.kind, config.engine.workers);
    let summary = vm_oracle::run_with_config(&config, std::io::stdout().lock())?;
    Ok(exit_code(&summary, &config))
}

fn main() {
    let matches = cli().get_matches();
    let default_filter = if matches.get_flag("verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", default_filter)).init();

    match run(&matches) {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            process::exit(EXIT_ERROR);
        }
    }
}
