use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const VERSION_ENV: &str = "DEEPCHECK_VERSION";

fn main() {
    let workspace_root = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .map(|manifest| manifest.join("..").join(".."))
        .unwrap_or_else(|| panic!("cargo did not set CARGO_MANIFEST_DIR"));
    let version_file = workspace_root.join("VERSION");
    println!("cargo:rerun-if-changed={}", version_file.display());

    match read_version(&version_file) {
        Ok(version) => println!("cargo:rustc-env={VERSION_ENV}={version}"),
        Err(reason) => panic!("{}: {reason}", version_file.display()),
    }
}

// First non-blank line, which must look like `MAJOR.MINOR.PATCH`.
fn read_version(path: &Path) -> Result<String, String> {
    let contents = fs::read_to_string(path).map_err(|error| error.to_string())?;
    let version = contents
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or("file is empty")?;

    let numeric = version.split('.').count() == 3
        && version
            .split('.')
            .all(|part| !part.is_empty() && part.bytes().all(|byte| byte.is_ascii_digit()));
    if numeric {
        Ok(version.to_string())
    } else {
        Err(format!("{version:?} is not MAJOR.MINOR.PATCH"))
    }
}
