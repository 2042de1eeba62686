use eyre::{Result, WrapErr};
use kitti_format::{
    decode_bin_iter, parse_annotations, BoxAnnotation, DecodeError, FrameOutput,
    PointCloudFrame, PointSample,
};
use std::{
    fs::{self, File},
    io::{self, prelude::*, BufReader, BufWriter},
    path::{Path, PathBuf},
};

pub fn create_pcd_reader<P>(
    input_path: P,
) -> Result<pcd_rs::Reader<pcd_rs::DynRecord, BufReader<File>>, DecodeError>
where
    P: AsRef<Path>,
{
    pcd_rs::DynReader::open(input_path).map_err(|err| DecodeError::Pcd(err.to_string()))
}

pub fn load_capture<P>(path: P, intensity_scale: f32) -> Result<PointCloudFrame, DecodeError>
where
    P: AsRef<Path>,
{
    let reader = create_pcd_reader(path)?;
    PointCloudFrame::from_pcd_reader(reader, intensity_scale)
}

pub fn load_annotations<P>(path: P) -> Result<Vec<BoxAnnotation>, DecodeError>
where
    P: AsRef<Path>,
{
    let bytes = fs::read(path)?;
    parse_annotations(&bytes)
}

pub fn load_bin_iter<P>(path: P) -> Result<impl Iterator<Item = Result<PointSample, DecodeError>>>
where
    P: AsRef<Path>,
{
    let bin_path = path.as_ref();

    let input = BufReader::new(
        File::open(bin_path)
            .wrap_err_with(|| format!("Failed to open file {}", bin_path.display()))?,
    );

    Ok(decode_bin_iter(input))
}

/// The `lidar/` and `label/` directories of an output root.
#[derive(Debug, Clone)]
pub struct OutputDirs {
    pub lidar: PathBuf,
    pub label: PathBuf,
}

impl OutputDirs {
    pub fn new(root: &Path) -> Self {
        Self {
            lidar: root.join("lidar"),
            label: root.join("label"),
        }
    }

    pub fn create(root: &Path) -> Result<Self> {
        let dirs = Self::new(root);
        for dir in [&dirs.lidar, &dirs.label] {
            fs::create_dir_all(dir)
                .wrap_err_with(|| format!("unable to create directory {}", dir.display()))?;
        }
        Ok(dirs)
    }

    pub fn bin_path(&self, frame_id: &str) -> PathBuf {
        self.lidar.join(format!("{frame_id}.bin"))
    }

    pub fn label_path(&self, frame_id: &str) -> PathBuf {
        self.label.join(format!("{frame_id}.txt"))
    }

    /// Writes both files of a frame.
    ///
    /// Contents go to hidden temporary files first and are renamed into
    /// place only after both are complete, so an interrupted or failed
    /// frame never leaves a file under its final name.
    pub fn write_frame(&self, frame_id: &str, output: &FrameOutput) -> io::Result<()> {
        let bin_path = self.bin_path(frame_id);
        let label_path = self.label_path(frame_id);
        let bin_tmp = temp_path(&bin_path);
        let label_tmp = temp_path(&label_path);

        let result = write_synced(&bin_tmp, &output.bin)
            .and_then(|()| write_synced(&label_tmp, output.labels.as_bytes()))
            .and_then(|()| fs::rename(&bin_tmp, &bin_path))
            .and_then(|()| {
                fs::rename(&label_tmp, &label_path).map_err(|err| {
                    let _ = fs::remove_file(&bin_path);
                    err
                })
            });

        if result.is_err() {
            let _ = fs::remove_file(&bin_tmp);
            let _ = fs::remove_file(&label_tmp);
        }
        result
    }

    /// Removes both files of a frame left over from an earlier run.
    pub fn remove_frame(&self, frame_id: &str) -> io::Result<()> {
        for path in [self.bin_path(frame_id), self.label_path(frame_id)] {
            match fs::remove_file(&path) {
                Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(err),
                _ => {}
            }
        }
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    path.with_file_name(format!(".{file_name}.tmp"))
}

fn write_synced(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(contents)?;
    writer.into_inner()?.sync_all()
}

/// Writes `frame_id base_name` lines mapping index names back to captures.
pub fn write_index<'a, P, I>(path: P, entries: I) -> Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let path = path.as_ref();
    let mut writer = BufWriter::new(
        File::create(path).wrap_err_with(|| format!("unable to create {}", path.display()))?,
    );
    for (frame_id, source) in entries {
        writeln!(writer, "{frame_id} {source}")?;
    }
    writer.flush()?;
    Ok(())
}
