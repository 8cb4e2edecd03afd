use std::path::Path;

use crate::paths::list_files;

const TEMPLATE_EXTENSIONS: [&str; 3] = [".tpl", ".html", ".txt"];

/// Human-readable label of a template file: `welcome_mail.html` becomes `Welcome mail`.
pub fn template_label(file_name: &str) -> String {
    let mut stem = file_name.to_string();
    for extension in TEMPLATE_EXTENSIONS {
        stem = stem.replace(extension, "");
    }
    let spaced = stem.replace(['_', '-'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Maps a label back to the file in `dir` that produces it. The last matching
/// file (in name order) wins; an empty string means nothing matched.
pub fn resolve_template_file(dir: &Path, label: &str) -> String {
    list_files(dir)
        .into_iter()
        .filter(|file_name| template_label(file_name) == label)
        .last()
        .unwrap_or_default()
}

/// `(label, label)` pairs for a select box; the stored file name is restored on save.
pub fn template_options(dir: &Path) -> Vec<(String, String)> {
    list_files(dir)
        .into_iter()
        .map(|file_name| {
            let label = template_label(&file_name);
            (label.clone(), label)
        })
        .collect()
}
