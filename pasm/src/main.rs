#[macro_use]
extern crate clap;

use clap::Arg;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
enum IoContext {
    ReadInput,
    WriteOutput,
}

#[derive(Debug)]
enum Error {
    Asm(pasm::AsmError),
    Io(std::io::Error, IoContext, PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, context, path) => writeln!(
                f,
                "{} file \"{}\" failed: {}",
                match context {
                    IoContext::ReadInput => "Reading input",
                    IoContext::WriteOutput => "Writing output",
                },
                path.display(),
                err
            ),
            Error::Asm(err) => {
                writeln!(f, "Assembling input failed:")?;
                write!(f, "{}", err)
            }
        }
    }
}

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the input file to use")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .value_name("OUTPUT")
                .help("Sets the output file to write to"),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let output = matches.value_of("output");

    if let Err(err) = pasm_main(input, output) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

fn pasm_main(input: &str, output: Option<&str>) -> Result<(), Error> {
    let input_path = Path::new(input);
    let text = fs::read_to_string(input_path)
        .map_err(|err| Error::Io(err, IoContext::ReadInput, input_path.to_owned()))?;

    let words = pasm::assemble(&text).map_err(Error::Asm)?;
    let image = pasm::write_image(&words);

    let output_path: PathBuf = output
        .map(PathBuf::from)
        .unwrap_or_else(|| input_path.with_extension("mem"));
    fs::write(&output_path, image)
        .map_err(|err| Error::Io(err, IoContext::WriteOutput, output_path.clone()))?;
    Ok(())
}
