use anyhow::Result;
use certsub::cli::{Cli, CommonArgs, Commands};
use certsub::options::{log_filter, normalize_domain, OptionMethod, Options};
use certsub::runner::Runner;
use clap::{CommandFactory, Parser};
use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn collect_domains(common: &CommonArgs, list: Option<&Path>) -> Result<Vec<String>> {
    let mut raw: Vec<String> = Vec::new();
    raw.extend(common.domains.iter().cloned());
    raw.extend(common.positional_domains.iter().cloned());
    if common.stdin {
        for line in io::stdin().lock().lines() { raw.push(line?); }
    }
    if let Some(p) = list {
        let f = File::open(p)?;
        for line in io::BufReader::new(f).lines() { raw.push(line?); }
    }
    Ok(raw.iter().filter_map(|d| normalize_domain(d)).collect())
}

fn print_help(sub: &str) {
    let mut cmd = Cli::command();
    if let Some(sc) = cmd.find_subcommand_mut(sub) { let _ = sc.print_help(); println!(); }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let opt = match cli.command {
        Commands::Enum(args) => {
            let domains = collect_domains(&args.common, args.domain_list.as_deref())?;
            if domains.is_empty() {
                print_help("enum");
                return Ok(());
            }
            Options {
                domains,
                sub_prefixes: args.sub_prefixes,
                top_labels: args.top_labels,
                verbose: args.verbose,
                timeout: args.common.timeout,
                port: args.common.port,
                method: OptionMethod::Enum,
                output: args.output,
                output_type: args.output_type,
                gzip: args.gzip,
                append: args.append,
                not_print: args.not_print,
                log_level: args.common.log_level,
            }
        }
        Commands::Probe(args) => {
            let domains = collect_domains(&args.common, None)?;
            if domains.is_empty() {
                print_help("probe");
                return Ok(());
            }
            Options {
                domains,
                timeout: args.common.timeout,
                port: args.common.port,
                method: OptionMethod::Probe,
                log_level: args.common.log_level,
                ..Options::default()
            }
        }
    };

    init_logging(&opt.log_level);
    tracing::debug!(options = ?opt, "parsed options");
    let runner = Runner::new(opt)?;
    runner.run().await
}
