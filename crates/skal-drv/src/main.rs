use clap::Parser;
use skal_drv::Cli;

fn main() {
    match skal_drv::run(Cli::parse()) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(2);
        }
    }
}
