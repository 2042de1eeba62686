mod convert;
mod dump;
mod info;
mod io;
mod opts;
mod types;
mod utils;

use chrono::Local;
use clap::Parser;
use env_logger::Builder;
use eyre::Result;
use log::LevelFilter;
use opts::{Info, Opts};
use std::io::Write;

fn main() -> Result<()> {
    color_eyre::install()?;

    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Info)
        .parse_default_env()
        .init();

    let opts = Opts::parse();

    match opts {
        Opts::Info(Info { file }) => {
            crate::info::info(file)?;
        }
        Opts::Convert(args) => {
            crate::convert::convert(args)?;
        }
        Opts::Dump(args) => {
            crate::dump::dump(args)?;
        }
    }

    Ok(())
}
