//! Plain-text rendering of discovery and search results.

use adtlink_core::{RepositoryObject, VirtualFolder};

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// One line per folder: facet, name, count, then label or description
pub fn format_folder(folder: &VirtualFolder) -> String {
    let label = folder
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or(&folder.display_name);
    let marker = if folder.has_children_of_same_facet { "+" } else { " " };
    format!(
        "{:<8} {}{:<30} {:>6}  {}",
        folder.facet.to_string(),
        marker,
        truncate_string(&folder.technical_name, 30),
        folder.count,
        truncate_string(label, 60)
    )
}

pub fn format_object(object: &RepositoryObject) -> String {
    let package = object.package_name.as_deref().unwrap_or("");
    format!(
        "{:<40} {:<24} {}",
        truncate_string(&object.name, 40),
        truncate_string(&object.object_type, 24),
        package
    )
}
