use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use kvmig_core::{
    parse_documents, render_yaml, Converter, ConverterConfig, Format, KvStore, MemoryStore,
    ResourceFailure,
};
use kvmig_flat::FlatEntry;
use tracing_subscriber::EnvFilter;

/// Result of one command, before anything is written out
#[derive(Debug, Default)]
struct Run {
    output: String,
    /// One line per failed resource or rejected entry
    problems: Vec<String>,
    summary: String,
    success: bool,
}

fn cli() -> Command {
    let input = Arg::new("input")
        .long("input")
        .short('i')
        .required(true)
        .value_parser(value_parser!(PathBuf));
    let output = Arg::new("output")
        .long("output")
        .short('o')
        .value_parser(value_parser!(PathBuf))
        .help("Output file (default: stdout)");

    Command::new("kvmig")
        .version(kvmig_core::VERSION)
        .about("Migrate v3 resources to flat key/value entries and back")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML converter configuration"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Convert resources in parallel"),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Fail when entries are left unrecognized"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::Count)
                .help("Increase log verbosity"),
        )
        .subcommand(
            Command::new("decompose")
                .about("Split resource documents (YAML or JSON) into flat entries (JSON)")
                .arg(input.clone().help("Resource documents"))
                .arg(output.clone()),
        )
        .subcommand(
            Command::new("reconstruct")
                .about("Rebuild resource documents (YAML) from flat entries (JSON)")
                .arg(input.help("Flat entries"))
                .arg(output),
        )
        .subcommand(Command::new("schema").about("Print the field descriptor tables"))
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<ConverterConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ConverterConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ConverterConfig::default(),
    };
    if matches.get_flag("parallel") {
        config = config.with_parallel(true);
    }
    if matches.get_flag("strict") {
        config = config.with_strict_unrecognized(true);
    }
    tracing::debug!(
        key_root = %config.key_root,
        parallel = config.parallel,
        strict = config.strict_unrecognized,
        "configuration loaded"
    );
    Ok(config)
}

fn decompose(converter: &Converter, text: &str, format: Format) -> anyhow::Result<Run> {
    let docs = parse_documents(text, format).context("parsing resource documents")?;
    let registry = converter.registry();

    let mut resources = Vec::with_capacity(docs.len());
    let mut rejected = Vec::new();
    for doc in &docs {
        match registry.resource_from_document(doc) {
            Ok(resource) => resources.push(resource),
            Err(e) => rejected.push(ResourceFailure {
                id: doc.id(),
                error: e.into(),
            }),
        }
    }

    // Output is the store listing, so entries come out in key order
    let store = MemoryStore::new();
    let report = converter.decompose_to_store(&resources, &store)?;
    let problems: Vec<String> = rejected
        .iter()
        .chain(&report.failures)
        .map(ToString::to_string)
        .collect();
    let mut output = serde_json::to_string_pretty(&store.list(converter.scheme().root())?)?;
    output.push('\n');

    Ok(Run {
        output,
        success: problems.is_empty(),
        summary: format!("{}, {} documents rejected", report.summary(), rejected.len()),
        problems,
    })
}

fn reconstruct(converter: &Converter, text: &str) -> anyhow::Result<Run> {
    let entries: Vec<FlatEntry> = serde_json::from_str(text).context("parsing flat entries")?;
    let report = converter.reconstruct_many(entries);

    let docs = report
        .resources
        .iter()
        .map(|r| converter.registry().document_from_resource(r))
        .collect::<Result<Vec<_>, _>>()?;

    let mut problems: Vec<String> = report.failures.iter().map(ToString::to_string).collect();
    problems.extend(
        report
            .unrecognized
            .iter()
            .map(|u| format!("unrecognized {}: {}", u.entry.key, u.reason)),
    );

    Ok(Run {
        output: render_yaml(&docs)?,
        problems,
        summary: report.summary(),
        success: report.is_success(),
    })
}

fn schema(converter: &Converter) -> Run {
    let mut output = String::new();
    for table in converter.registry().iter() {
        let _ = writeln!(output, "{}:", table.kind());
        for d in table.iter() {
            let _ = writeln!(
                output,
                "  {:<30} {:<30} {:<12} {}",
                d.name,
                d.key_suffix,
                d.field_type.to_string(),
                d.scope.as_str()
            );
        }
    }
    Run {
        output,
        success: true,
        ..Run::default()
    }
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn run(matches: &ArgMatches) -> anyhow::Result<Run> {
    let config = load_config(matches)?;
    let converter = Converter::with_defaults(config)?;

    let run = match matches.subcommand() {
        Some(("decompose", args)) => {
            let input = args.get_one::<PathBuf>("input").context("missing --input")?;
            let format = Format::from_extension(input.extension().and_then(|e| e.to_str()));
            decompose(&converter, &read_input(input)?, format)?
        }
        Some(("reconstruct", args)) => {
            let input = args.get_one::<PathBuf>("input").context("missing --input")?;
            reconstruct(&converter, &read_input(input)?)?
        }
        Some(("schema", _)) => schema(&converter),
        _ => anyhow::bail!("unknown command"),
    };

    let output = matches
        .subcommand()
        .and_then(|(_, args)| args.try_get_one::<PathBuf>("output").ok().flatten());
    match output {
        Some(path) => std::fs::write(path, &run.output)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{}", run.output),
    }
    Ok(run)
}

fn main() {
    let matches = cli().get_matches();
    init_tracing(matches.get_count("verbose"));

    match run(&matches) {
        Ok(run) => {
            for problem in &run.problems {
                eprintln!("{problem}");
            }
            if !run.summary.is_empty() {
                eprintln!("{}", run.summary);
            }
            std::process::exit(if run.success { 0 } else { 1 });
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}
