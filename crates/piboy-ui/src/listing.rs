use std::fs;
use std::path::Path;

/// Names of the regular, non-hidden files in `dir` whose extension matches
/// one of `extensions` (case-insensitive), sorted by name. A missing or
/// unreadable directory yields an empty list.
pub fn list_files<S: AsRef<str>>(dir: &Path, extensions: &[S]) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!("Cannot list {}: {}", dir.display(), err);
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| !name.starts_with('.'))
        .filter(|name| has_extension(name, extensions))
        .collect();
    names.sort();
    names
}

fn has_extension<S: AsRef<str>>(name: &str, extensions: &[S]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            extensions
                .iter()
                .any(|wanted| ext.eq_ignore_ascii_case(wanted.as_ref().trim_start_matches('.')))
        })
}
