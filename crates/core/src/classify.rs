use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// A named bucket of file extensions used to choose a destination folder.
/// The table is loaded once per run and immutable while the run is active.
/// Extensions are expected to be disjoint across categories; if they are
/// not, the first matching category wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub extensions: Vec<String>,
}

impl Category {
    pub fn new(name: &str, extensions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            extensions: extensions
                .iter()
                .map(|ext| normalize_extension(ext))
                .collect(),
        }
    }
}

/// Built-in table used when the configuration does not supply one.
pub static DEFAULT_CATEGORIES: Lazy<Vec<Category>> = Lazy::new(|| {
    vec![
        Category::new(
            "Images",
            &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff"],
        ),
        Category::new("Videos", &[".mp4", ".mkv", ".avi", ".mov"]),
        Category::new("Documents", &[".pdf", ".docx", ".txt", ".xlsx"]),
        Category::new("Audios", &[".mp3", ".wav", ".flac", ".aac"]),
        Category::new("Archives", &[".zip", ".tar", ".rar", ".7z"]),
    ]
});

/// Case-insensitive lookup of an extension across the category table. An
/// unmatched extension is not an error at this layer; callers treat it as an
/// unrecognized-type event.
pub fn classify<'a>(table: &'a [Category], extension: &str) -> Option<&'a Category> {
    if extension.is_empty() {
        return None;
    }
    let needle = normalize_extension(extension);
    table
        .iter()
        .find(|category| category.extensions.iter().any(|ext| *ext == needle))
}

/// Lower-cases and ensures the leading dot, so ".JPG", "JPG" and "jpg" all
/// compare equal.
pub fn normalize_extension(extension: &str) -> String {
    let lowered = extension.trim().to_lowercase();
    if lowered.is_empty() || lowered.starts_with('.') {
        lowered
    } else {
        format!(".{lowered}")
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, normalize_extension, Category, DEFAULT_CATEGORIES};

    #[test]
    fn classifies_known_extensions_case_insensitively() {
        let images = classify(&DEFAULT_CATEGORIES, ".JPG").expect("jpg is an image");
        assert_eq!(images.name, "Images");
        let archives = classify(&DEFAULT_CATEGORIES, ".7z").expect("7z is an archive");
        assert_eq!(archives.name, "Archives");
    }

    #[test]
    fn unmatched_extension_returns_none() {
        assert!(classify(&DEFAULT_CATEGORIES, ".iso").is_none());
        assert!(classify(&DEFAULT_CATEGORIES, "").is_none());
    }

    #[test]
    fn first_category_wins_on_overlap() {
        let table = vec![
            Category::new("First", &[".dat"]),
            Category::new("Second", &[".dat"]),
        ];
        assert_eq!(classify(&table, ".dat").expect("matched").name, "First");
    }

    #[test]
    fn normalization_adds_dot_and_lowercases() {
        assert_eq!(normalize_extension("PDF"), ".pdf");
        assert_eq!(normalize_extension(".PDF"), ".pdf");
        assert_eq!(normalize_extension(""), "");
    }
}
