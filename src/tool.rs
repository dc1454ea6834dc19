// Copyright (c) 2018 Fabian Schuiki
#[macro_use]
extern crate clap;

use std::fs::File;
use std::io::{self, Read};
use std::process;

use clap::{App, Arg, ArgMatches};
use log::{debug, info};
use memmap::Mmap;
use sglr::glr::{Parser, ParserConfig, SkippingErrorHandler};
use sglr::implode::{ImplodeConfig, Imploder};
use sglr::table::ParseTable;

fn main() {
    let matches = App::new(crate_name!())
        .version(crate_version!())
        .author(crate_authors!())
        .about(crate_description!())
        .arg(
            Arg::with_name("verbosity")
                .short("v")
                .multiple(true)
                .help("Increase message verbosity"),
        )
        .arg(
            Arg::with_name("implode")
                .long("implode")
                .help("Print the abstract syntax term instead of the parse tree"),
        )
        .arg(
            Arg::with_name("allow-amb")
                .long("allow-amb")
                .requires("implode")
                .help("Implode ambiguities into amb([...]) terms instead of failing"),
        )
        .arg(
            Arg::with_name("skip")
                .long("skip")
                .takes_value(true)
                .value_name("N")
                .help("Skip up to N unexpected characters"),
        )
        .arg(
            Arg::with_name("TABLE")
                .required(true)
                .help("The parse table to parse with"),
        )
        .arg(
            Arg::with_name("INPUT")
                .help("The file to parse; standard input is parsed if omitted"),
        )
        .get_matches();

    if let Err(e) = stderrlog::new()
        .module("sglr")
        .verbosity(matches.occurrences_of("verbosity") as usize)
        .init()
    {
        eprintln!("cannot initialize logging: {}", e);
    }

    match run(&matches) {
        Ok(true) => (),
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

/// Parse the input and print the result. Returns whether the input was
/// accepted.
fn run(matches: &ArgMatches) -> Result<bool, String> {
    let table_path = matches.value_of("TABLE").unwrap_or_default();
    let table = with_file(table_path, |text| text.parse::<ParseTable>())?
        .map_err(|e| format!("{}: {}", table_path, e))?;
    info!(
        "loaded {} with {} states and {} productions",
        table_path,
        table.num_states(),
        table.productions().len()
    );

    let mut config = ParserConfig::new();
    if let Some(skip) = matches.value_of("skip") {
        let limit = skip
            .parse()
            .map_err(|_| format!("invalid number of characters to skip `{}`", skip))?;
        config = config.error_handler(SkippingErrorHandler::new(limit));
    }
    let mut parser = Parser::with_config(&table, config);
    let result = match matches.value_of("INPUT") {
        Some(path) => with_file(path, |text| parser.parse_str(text))?,
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| format!("cannot read standard input: {}", e))?;
            parser.parse_str(&text)
        }
    };
    debug!("forest has {} nodes", result.forest.len());

    for msg in &result.messages {
        eprintln!("{}", msg);
    }
    let root = match result.root {
        Some(root) => root,
        None => return Ok(false),
    };
    if matches.is_present("implode") {
        let config = ImplodeConfig::new().allow_ambiguity(matches.is_present("allow-amb"));
        let term = Imploder::with_config(&table, config)
            .implode(&result.forest, root)
            .map_err(|e| e.to_string())?;
        println!("{}", term);
    } else {
        println!("{}", result.forest.pretty(&table, root));
    }
    Ok(true)
}

/// Memory-map a file and pass its contents to a function.
fn with_file<T, F: FnOnce(&str) -> T>(path: &str, f: F) -> Result<T, String> {
    let file = File::open(path).map_err(|e| format!("cannot open {}: {}", path, e))?;
    let len = file
        .metadata()
        .map_err(|e| format!("cannot stat {}: {}", path, e))?
        .len();
    // Empty files cannot be mapped.
    if len == 0 {
        return Ok(f(""));
    }
    let map = unsafe { Mmap::map(&file) }.map_err(|e| format!("cannot map {}: {}", path, e))?;
    let text = std::str::from_utf8(&map).map_err(|e| format!("{}: {}", path, e))?;
    Ok(f(text))
}
