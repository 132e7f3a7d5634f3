mod cmd;

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use cmd::App;

fn main() -> ExitCode {
    let app = App::parse();
    match app.run() {
        Ok(code) => code,
        Err(err) => {
            _ = writeln!(io::stderr(), "Fatal: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
