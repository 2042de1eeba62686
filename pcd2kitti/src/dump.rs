use crate::{
    io::{load_bin_iter, load_capture},
    opts::Dump,
    types::FileFormat,
    utils::guess_file_format,
};
use eyre::{eyre, Result};
use kitti_format::PointSample;
use std::path::Path;

pub fn dump(args: Dump) -> Result<()> {
    let Dump { input, format } = args;

    let format = match format {
        Some(format) => format,
        None => guess_file_format(&input)
            .ok_or_else(|| eyre!("unable to guess file format of '{}'", input.display()))?,
    };

    println!("x\ty\tz\tintensity");

    use FileFormat as F;
    match format {
        F::Pcd => dump_pcd(&input)?,
        F::KittiBin => dump_bin(&input)?,
    }

    Ok(())
}

fn dump_pcd<P>(path: P) -> Result<()>
where
    P: AsRef<Path>,
{
    let frame = load_capture(path, 1.0)?;
    frame.points.iter().for_each(print_point);
    Ok(())
}

fn dump_bin<P>(path: P) -> Result<()>
where
    P: AsRef<Path>,
{
    for point in load_bin_iter(path)? {
        print_point(&point?);
    }
    Ok(())
}

fn print_point(point: &PointSample) {
    let [x, y, z, intensity] = point.to_record();
    println!("{x}\t{y}\t{z}\t{intensity}");
}
