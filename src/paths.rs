//! Naming rules that tie a repository path to a remote flow and folder.

/// Extension of flow documents on disk.
pub const FLOW_EXTENSION: &str = ".json";
/// Directory segment under which flow documents live.
pub const FLOWS_DIR: &str = "flows";

/// Split a repository path into clean segments: `\` becomes `/`, empty and
/// `.` segments are dropped and `..` pops the previous segment.
pub fn normalized_segments(path: &str) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for seg in path.split(['/', '\\']) {
        match seg {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    out
}

/// A flow file ends in `.json` and sits below a directory named exactly `flows`.
pub fn is_flow_path(path: &str) -> bool {
    if !path.ends_with(FLOW_EXTENSION) {
        return false;
    }
    let segs = normalized_segments(path);
    match segs.split_last() {
        Some((_, dirs)) => dirs.iter().any(|s| *s == FLOWS_DIR),
        None => false,
    }
}

/// Remote flow name: the file name with the `.json` extension stripped.
pub fn flow_name_from_path(path: &str) -> String {
    let file = normalized_segments(path).last().copied().unwrap_or(path);
    file.strip_suffix(FLOW_EXTENSION).unwrap_or(file).to_string()
}

/// Folder implied by the path: the segment right after `flows`, provided the
/// file itself still follows it. `flows/invoice.json` has no folder.
pub fn folder_name_from_path(path: &str) -> Option<String> {
    let segs = normalized_segments(path);
    let idx = segs.iter().position(|s| *s == FLOWS_DIR)?;
    if idx + 1 < segs.len().saturating_sub(1) {
        Some(segs[idx + 1].to_string())
    } else {
        None
    }
}
