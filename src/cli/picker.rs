//! Interactive scenario picker.
//!
//! Used when `pvs sim` / `pvs day` run without `-f`: lists `*.json` files under
//! the current directory and lets the user choose one by number or path.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Directory recursion depth when looking for scenario files.
const DEFAULT_SEARCH_DEPTH: usize = 4;

/// Prompt the user to select a scenario file from the current directory tree.
///
/// Accepts a list number or an explicit path; `q` cancels.
pub fn prompt_for_scenario_path() -> Result<PathBuf, AppError> {
    let files = discover_json_files();
    if files.is_empty() {
        return Err(AppError::new(
            2,
            "No .json files found. Create one with `pvs init` or pass `-f <scenario.json>`.",
        ));
    }

    println!("Found {} scenario file(s):", files.len());
    for (idx, path) in files.iter().enumerate() {
        println!("{:>3}) {}", idx + 1, pretty_path(path));
    }

    loop {
        print!("Select a file by number (1-{}) or type a path (q to quit): ", files.len());
        io::stdout()
            .flush()
            .map_err(|e| AppError::new(2, format!("Failed to write prompt: {e}")))?;

        let mut input = String::new();
        let bytes = io::stdin()
            .read_line(&mut input)
            .map_err(|e| AppError::new(2, format!("Failed to read input: {e}")))?;

        if bytes == 0 {
            return Err(AppError::new(
                2,
                "No input received. Pass a scenario with `-f <scenario.json>`.",
            ));
        }

        let input = input.trim();
        if input.eq_ignore_ascii_case("q") {
            return Err(AppError::new(2, "Canceled."));
        }

        if let Ok(choice) = input.parse::<usize>() {
            if (1..=files.len()).contains(&choice) {
                return validate_json_path(&files[choice - 1]);
            }
            println!("Invalid choice: {choice}. Enter a number between 1 and {}.", files.len());
            continue;
        }

        let candidate = PathBuf::from(input);
        match validate_json_path(&candidate) {
            Ok(path) => return Ok(path),
            Err(err) => {
                println!("{err}");
                continue;
            }
        }
    }
}

/// Check that `path` is an existing `.json` file.
pub fn validate_json_path(path: &Path) -> Result<PathBuf, AppError> {
    if !path.exists() {
        return Err(AppError::new(
            2,
            format!("Scenario file not found: {}", path.display()),
        ));
    }
    if path.is_dir() {
        return Err(AppError::new(
            2,
            format!("Expected a file, got a directory: {}", path.display()),
        ));
    }
    if !has_json_extension(path) {
        return Err(AppError::new(
            2,
            format!("Expected a .json scenario (got: {}).", path.display()),
        ));
    }

    Ok(path.to_path_buf())
}

/// `*.json` files under the current directory, sorted by display path.
pub fn discover_json_files() -> Vec<PathBuf> {
    find_json_files(Path::new("."), DEFAULT_SEARCH_DEPTH)
}

fn find_json_files(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut out = Vec::new();
    find_json_files_inner(root, 0, max_depth, &mut out);
    out.sort_by(|a, b| pretty_path(a).cmp(&pretty_path(b)));
    out
}

fn find_json_files_inner(root: &Path, depth: usize, max_depth: usize, out: &mut Vec<PathBuf>) {
    if depth > max_depth {
        return;
    }

    let Ok(entries) = fs::read_dir(root) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(_) => continue,
        };

        if file_type.is_dir() {
            if should_skip_dir(&path) {
                continue;
            }
            find_json_files_inner(&path, depth + 1, max_depth, out);
            continue;
        }

        if file_type.is_file() && has_json_extension(&path) {
            out.push(path);
        }
    }
}

fn has_json_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn should_skip_dir(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    // `debug/` holds our own bundles, never scenarios.
    matches!(name, ".git" | "target" | "node_modules" | "debug")
}

fn pretty_path(path: &Path) -> String {
    let stripped = path.strip_prefix("./").unwrap_or(path);
    stripped.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_json_files_and_skips_build_dirs() {
        let root = std::env::temp_dir().join(format!("pvs-picker-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::create_dir_all(root.join("target")).unwrap();
        fs::write(root.join("b.json"), "{}").unwrap();
        fs::write(root.join("nested/a.JSON"), "{}").unwrap();
        fs::write(root.join("target/skip.json"), "{}").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();

        let found = find_json_files(&root, 2);
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"b.json".to_string()));
        assert!(names.contains(&"a.JSON".to_string()));
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn validation_rejects_directories_and_other_extensions() {
        let dir = std::env::temp_dir();
        assert!(validate_json_path(&dir).is_err());
        assert!(validate_json_path(Path::new("missing.json")).is_err());

        let txt = dir.join(format!("pvs-picker-{}.txt", std::process::id()));
        fs::write(&txt, "").unwrap();
        assert_eq!(validate_json_path(&txt).unwrap_err().exit_code(), 2);
        let _ = fs::remove_file(txt);
    }
}
