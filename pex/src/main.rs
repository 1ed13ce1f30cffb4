#[macro_use]
extern crate clap;

use clap::{Arg, SubCommand};
use std::io;
use std::path::Path;
use std::process;

fn main() {
    let matches = app_from_crate!()
        .subcommand(
            SubCommand::with_name("compile")
                .about("Compiles a source program to assembly text")
                .arg(
                    Arg::with_name("SRC")
                        .help("Source program to compile")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::with_name("DST")
                        .help("Assembly file to write")
                        .required(true)
                        .index(2),
                ),
        )
        .subcommand(
            SubCommand::with_name("run")
                .about("Executes a compiled program")
                .arg(
                    Arg::with_name("PROGRAM")
                        .help("Assembly file to execute")
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(
            SubCommand::with_name("debug")
                .about("Single-steps a compiled program, dumping machine state")
                .arg(
                    Arg::with_name("PROGRAM")
                        .help("Assembly file to step through")
                        .required(true)
                        .index(1),
                ),
        )
        .get_matches();

    let result = match matches.subcommand() {
        ("compile", Some(sub)) => pex::compile_file(
            Path::new(sub.value_of("SRC").unwrap()),
            Path::new(sub.value_of("DST").unwrap()),
        ),
        ("run", Some(sub)) => {
            pex::run_file(Path::new(sub.value_of("PROGRAM").unwrap())).map(|output| {
                for line in output {
                    println!("{}", line);
                }
            })
        }
        ("debug", Some(sub)) => {
            let stdout = io::stdout();
            pex::debug_file(
                Path::new(sub.value_of("PROGRAM").unwrap()),
                &mut stdout.lock(),
            )
        }
        _ => {
            eprintln!("{}", matches.usage());
            process::exit(1);
        }
    };

    if let Err(err) = result {
        eprintln!("{}", err);
        process::exit(err.exit_code());
    }
}
