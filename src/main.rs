use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use schwarz_driver::io::{MeshInfo, write_mesh, write_tiling};
use schwarz_driver::logging::LoggerConfig;
use schwarz_driver::{Tiling, sim};
use tracing::info;

const USAGE: &str = "usage:
  schwarz-driver <input.yaml>
  schwarz-driver gen-mesh <dir> <cells> <length> [<domains> <overlap>]";

fn parse_arg<T: std::str::FromStr>(value: &str, name: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("Invalid {name}: {value}"))
}

fn gen_mesh(args: &[String]) -> Result<()> {
    if args.len() != 3 && args.len() != 5 {
        bail!("{USAGE}");
    }
    let dir = PathBuf::from(&args[0]);
    let mesh = MeshInfo {
        cells: parse_arg(&args[1], "cells")?,
        length: parse_arg(&args[2], "length")?,
    };
    write_mesh(&dir, &mesh)?;
    info!(dir = %dir.display(), cells = mesh.cells, length = mesh.length, "wrote mesh");

    if args.len() == 5 {
        let domains: usize = parse_arg(&args[3], "domains")?;
        let overlap: usize = parse_arg(&args[4], "overlap")?;
        let tiling = Tiling::line(mesh.cells, domains, overlap)?;
        write_tiling(&dir, &tiling)?;
        info!(domains, overlap, ranges = ?tiling.ranges(), "wrote tiling");
    }
    Ok(())
}

fn main() -> Result<()> {
    LoggerConfig::from_env().init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("gen-mesh") => gen_mesh(&args[1..]),
        Some(input) if args.len() == 1 => {
            let summary = sim::driver::run_file(Path::new(input))?;
            info!(
                steps = summary.steps,
                final_time = summary.final_time,
                unconverged = summary.unconverged_steps,
                "done"
            );
            Ok(())
        }
        _ => bail!("{USAGE}"),
    }
}
