use crate::types::FileFormat;
use eyre::{Result, WrapErr};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

/// Suffix some capture files carry that the matching annotation lacks.
const CAPTURE_SUFFIX: &str = "_IMG";

/// Suffix of annotation files, tried before the bare base name.
const ANNOTATION_SUFFIX: &str = "_CUB";

pub fn guess_file_format<P>(file: P) -> Option<FileFormat>
where
    P: AsRef<Path>,
{
    let format = match file.as_ref().extension()?.to_str()? {
        "pcd" => FileFormat::Pcd,
        "bin" => FileFormat::KittiBin,
        _ => return None,
    };

    Some(format)
}

/// One capture and the annotation file that belongs to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePair {
    /// Stem of the output files.
    pub frame_id: String,
    /// Capture stem without the capture suffix.
    pub base_name: String,
    pub pcd_path: PathBuf,
    pub label_path: Option<PathBuf>,
    /// Earlier capture that already claimed `frame_id`.
    pub duplicate_of: Option<PathBuf>,
}

/// Capture stem with a trailing `_IMG` removed.
pub fn base_name(stem: &str) -> &str {
    stem.strip_suffix(CAPTURE_SUFFIX).unwrap_or(stem)
}

/// Looks for `<base>_CUB.json`, then `<base>.json`.
pub fn find_annotation(label_dir: &Path, base_name: &str) -> Option<PathBuf> {
    [
        format!("{base_name}{ANNOTATION_SUFFIX}.json"),
        format!("{base_name}.json"),
    ]
    .into_iter()
    .map(|file_name| label_dir.join(file_name))
    .find(|path| path.is_file())
}

/// Every `*.pcd` file in `dir`, sorted by file name.
pub fn list_pcd_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .wrap_err_with(|| format!("unable to list directory '{}'", dir.display()))?;

    let mut files = vec![];
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && guess_file_format(&path) == Some(FileFormat::Pcd) {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

/// Matches every capture in `pcd_dir` with its annotation in `label_dir`.
///
/// With `index_names`, frame ids are the zero-padded position of the
/// capture in the sorted listing. Otherwise the base name is the frame id,
/// and a capture whose id was already taken by an earlier one is marked
/// with `duplicate_of`.
pub fn pair_frames(pcd_dir: &Path, label_dir: &Path, index_names: bool) -> Result<Vec<FramePair>> {
    let mut claimed: HashMap<String, PathBuf> = HashMap::new();

    let pairs = list_pcd_files(pcd_dir)?
        .into_iter()
        .filter_map(|pcd_path| {
            let Some(stem) = pcd_path.file_stem().and_then(|stem| stem.to_str()) else {
                log::warn!("skip '{}': file name is not valid UTF-8", pcd_path.display());
                return None;
            };
            let base_name = base_name(stem).to_string();
            Some((base_name, pcd_path))
        })
        .enumerate()
        .map(|(index, (base_name, pcd_path))| {
            let label_path = find_annotation(label_dir, &base_name);
            let frame_id = if index_names {
                format!("{index:06}")
            } else {
                base_name.clone()
            };

            let duplicate_of = claimed.get(&frame_id).cloned();
            if duplicate_of.is_none() {
                claimed.insert(frame_id.clone(), pcd_path.clone());
            }

            FramePair {
                frame_id,
                base_name,
                pcd_path,
                label_path,
                duplicate_of,
            }
        })
        .collect();

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: PathBuf) -> PathBuf {
        fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn guess_format_by_extension() {
        assert_eq!(guess_file_format("scan.pcd"), Some(FileFormat::Pcd));
        assert_eq!(guess_file_format("out/000001.bin"), Some(FileFormat::KittiBin));
        assert_eq!(guess_file_format("label.json"), None);
    }

    #[test]
    fn base_name_strips_capture_suffix() {
        assert_eq!(
            base_name("MA_011_HR_20231110_PM_001_000_000_0000_IMG"),
            "MA_011_HR_20231110_PM_001_000_000_0000"
        );
        assert_eq!(base_name("frame_0001"), "frame_0001");
    }

    #[test]
    fn pairs_follow_naming_conventions() {
        let pcd_dir = tempdir().unwrap();
        let label_dir = tempdir().unwrap();

        let b = touch(pcd_dir.path().join("b_IMG.pcd"));
        let a = touch(pcd_dir.path().join("a.pcd"));
        let c = touch(pcd_dir.path().join("c.pcd"));
        touch(pcd_dir.path().join("notes.txt"));
        let a_label = touch(label_dir.path().join("a.json"));
        let b_label = touch(label_dir.path().join("b_CUB.json"));

        let pairs = pair_frames(pcd_dir.path(), label_dir.path(), false).unwrap();
        assert_eq!(
            pairs,
            vec![
                FramePair {
                    frame_id: "a".to_string(),
                    base_name: "a".to_string(),
                    pcd_path: a,
                    label_path: Some(a_label),
                    duplicate_of: None,
                },
                FramePair {
                    frame_id: "b".to_string(),
                    base_name: "b".to_string(),
                    pcd_path: b,
                    label_path: Some(b_label),
                    duplicate_of: None,
                },
                FramePair {
                    frame_id: "c".to_string(),
                    base_name: "c".to_string(),
                    pcd_path: c,
                    label_path: None,
                    duplicate_of: None,
                },
            ]
        );
    }

    #[test]
    fn cub_annotation_is_preferred() {
        let label_dir = tempdir().unwrap();
        touch(label_dir.path().join("a.json"));
        let cub = touch(label_dir.path().join("a_CUB.json"));

        assert_eq!(find_annotation(label_dir.path(), "a"), Some(cub));
    }

    #[test]
    fn index_names_are_zero_padded() {
        let pcd_dir = tempdir().unwrap();
        let label_dir = tempdir().unwrap();
        touch(pcd_dir.path().join("y.pcd"));
        touch(pcd_dir.path().join("x.pcd"));

        let ids: Vec<_> = pair_frames(pcd_dir.path(), label_dir.path(), true)
            .unwrap()
            .into_iter()
            .map(|pair| (pair.frame_id, pair.base_name))
            .collect();
        assert_eq!(
            ids,
            [
                ("000000".to_string(), "x".to_string()),
                ("000001".to_string(), "y".to_string()),
            ]
        );
    }

    #[test]
    fn colliding_base_names_are_marked() {
        let pcd_dir = tempdir().unwrap();
        let label_dir = tempdir().unwrap();
        let a = touch(pcd_dir.path().join("a.pcd"));
        let a_img = touch(pcd_dir.path().join("a_IMG.pcd"));
        touch(label_dir.path().join("a.json"));

        let pairs = pair_frames(pcd_dir.path(), label_dir.path(), false).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].pcd_path, a);
        assert_eq!(pairs[0].duplicate_of, None);
        assert_eq!(pairs[1].pcd_path, a_img);
        assert_eq!(pairs[1].frame_id, "a");
        assert_eq!(pairs[1].duplicate_of, Some(a));

        let pairs = pair_frames(pcd_dir.path(), label_dir.path(), true).unwrap();
        assert!(pairs.iter().all(|pair| pair.duplicate_of.is_none()));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_names_leave_no_index_gap() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let pcd_dir = tempdir().unwrap();
        let label_dir = tempdir().unwrap();
        touch(pcd_dir.path().join("a.pcd"));
        touch(pcd_dir.path().join(OsStr::from_bytes(b"b\xff.pcd")));
        touch(pcd_dir.path().join("c.pcd"));

        let ids: Vec<_> = pair_frames(pcd_dir.path(), label_dir.path(), true)
            .unwrap()
            .into_iter()
            .map(|pair| (pair.frame_id, pair.base_name))
            .collect();
        assert_eq!(
            ids,
            [
                ("000000".to_string(), "a".to_string()),
                ("000001".to_string(), "c".to_string()),
            ]
        );
    }
}
