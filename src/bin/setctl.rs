//! `setctl` — an interactive demonstrator for [`ebst::ConcurrentSet`].
//!
//! Not part of the core algorithm: a thin multicall REPL, in the style of
//! a database shell, that exercises `{insert, delete, contains, size,
//! iter, dot}` against a single shared set. Out of scope for the library
//! crate per spec.md §1; lives here as an external collaborator.

use anyhow::{Context, Result};
use clap::Command;
use log::info;
use std::io::Write;

use ebst::ConcurrentSet;

/// User keys fit in `[i64::MIN, i64::MAX - 3]`; the two top values are
/// reserved as sentinels, as spec.md §8's concrete scenarios recommend.
const SENTINEL1: i64 = i64::MAX - 1;
const SENTINEL2: i64 = i64::MAX;

fn main() -> Result<()> {
    env_logger::init();
    let set = ConcurrentSet::new(SENTINEL1, SENTINEL2).expect("sentinels are ordered by construction");
    info!("setctl started, sentinels = ({SENTINEL1}, {SENTINEL2})");
    repl_loop(&set)
}

fn repl_loop(set: &ConcurrentSet<i64>) -> Result<()> {
    loop {
        let line = readline()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match respond(set, line) {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => {
                writeln!(std::io::stdout(), "error: {err}").context("failed to write error to stdout")?;
                std::io::stdout().flush().context("failed to flush stdout")?;
            }
        }
    }
    Ok(())
}

fn readline() -> Result<String> {
    write!(std::io::stdout(), "\nsetctl> ").context("failed to write prompt")?;
    std::io::stdout().flush().context("failed to flush stdout")?;
    let mut buffer = String::new();
    std::io::stdin()
        .read_line(&mut buffer)
        .context("failed to read line from stdin")?;
    Ok(buffer)
}

/// Returns `Ok(true)` iff the REPL should exit.
fn respond(set: &ConcurrentSet<i64>, line: &str) -> Result<bool> {
    let args = shlex::split(line).context("invalid quoting on args")?;
    let matches = cli().try_get_matches_from(args).context("failed to parse command")?;

    match matches.subcommand() {
        Some(("insert", sub)) => {
            let key: i64 = *sub.get_one("key").expect("key is required");
            let inserted = set.insert(key)?;
            println_flushed(if inserted { "true" } else { "false" })?;
        }
        Some(("delete", sub)) => {
            let key: i64 = *sub.get_one("key").expect("key is required");
            let deleted = set.delete(&key)?;
            println_flushed(if deleted { "true" } else { "false" })?;
        }
        Some(("contains", sub)) => {
            let key: i64 = *sub.get_one("key").expect("key is required");
            let present = set.contains(&key)?;
            println_flushed(if present { "true" } else { "false" })?;
        }
        Some(("size", _)) => {
            println_flushed(&set.size().to_string())?;
        }
        Some(("iter", _)) => {
            let keys: Vec<String> = set.iter().map(|k| k.to_string()).collect();
            println_flushed(&format!("[{}]", keys.join(", ")))?;
        }
        Some(("dot", _)) => {
            println_flushed(&set.to_dot())?;
        }
        Some((".exit", _)) => {
            println_flushed("Exiting ...")?;
            return Ok(true);
        }
        Some((name, _)) => unimplemented!("{name}"),
        None => unreachable!("subcommand required"),
    }
    Ok(false)
}

fn println_flushed(text: &str) -> Result<()> {
    writeln!(std::io::stdout(), "{text}").context("failed to write to stdout")?;
    std::io::stdout().flush().context("failed to flush stdout")?;
    Ok(())
}

fn cli() -> Command {
    use clap::{value_parser, Arg};

    const PARSER_TEMPLATE: &str = "{all-args}";
    const APPLET_TEMPLATE: &str = "{about-with-newline}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}";

    Command::new("setctl")
        .multicall(true)
        .arg_required_else_help(true)
        .subcommand_required(true)
        .subcommand_value_name("COMMAND")
        .subcommand_help_heading("COMMANDS")
        .help_template(PARSER_TEMPLATE)
        .subcommand(
            Command::new("insert")
                .about("Insert a key")
                .help_template(APPLET_TEMPLATE)
                .arg(Arg::new("key").required(true).value_parser(value_parser!(i64))),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a key")
                .help_template(APPLET_TEMPLATE)
                .arg(Arg::new("key").required(true).value_parser(value_parser!(i64))),
        )
        .subcommand(
            Command::new("contains")
                .about("Test membership of a key")
                .help_template(APPLET_TEMPLATE)
                .arg(Arg::new("key").required(true).value_parser(value_parser!(i64))),
        )
        .subcommand(
            Command::new("size")
                .about("Approximate cardinality")
                .help_template(APPLET_TEMPLATE),
        )
        .subcommand(
            Command::new("iter")
                .about("Snapshot the set in ascending order")
                .help_template(APPLET_TEMPLATE),
        )
        .subcommand(
            Command::new("dot")
                .about("Render the current tree shape as Graphviz DOT")
                .help_template(APPLET_TEMPLATE),
        )
        .subcommand(
            Command::new(".exit")
                .alias("exit")
                .about("Quit setctl")
                .help_template(APPLET_TEMPLATE),
        )
}
