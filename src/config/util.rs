//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from current directory
///
/// Starts from cwd and walks up parent directories until finding `config_name`
/// Returns the absolute path to the config file if found
///
/// # Example
/// ```text
/// /home/user/site/app/pages/   ← cwd
/// /home/user/site/tether.toml  ← found!
/// ```
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let cwd = std::env::current_dir().ok()?;
    let mut current = cwd.as_path();
    loop {
        let candidate = current.join(config_name);
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_absolute_config() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("tether.toml");
        std::fs::write(&path, "").unwrap();

        assert_eq!(find_config_file(&path), Some(path.clone()));
        assert_eq!(find_config_file(&temp.path().join("missing.toml")), None);
    }
}
