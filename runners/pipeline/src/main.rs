//! 胶质母细胞瘤分割流水线的命令行入口.

mod result;
mod runner;

use clap::Parser;
use runner::Cli;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = simple_logger::init_with_level(cli.log_level()) {
        eprintln!("cannot install logger: {e}");
    }
    log::debug!("{} cpus available", utils::cpus());

    match cli.run() {
        Ok(r) => r.analyze(),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
