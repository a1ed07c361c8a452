//! Reads the package list out of an exported requirements.txt

use fs_err as fs;
use std::path::Path;

/// Returns the package spec lines of a requirements.txt, or an empty list if the
/// file doesn't exist
pub fn packages(requirements_txt: &Path) -> Vec<String> {
    match fs::read_to_string(requirements_txt) {
        Ok(content) => parse_packages(&content),
        Err(_) => Vec::new(),
    }
}

/// Extracts package specs, skipping comments, blank lines and option lines
/// such as `--index-url`
pub fn parse_packages(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('-'))
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod test {
    use super::parse_packages;
    use indoc::indoc;

    #[test]
    fn test_parse_packages() {
        let requirements_txt = indoc! {"
            # exported by uv
            --index-url https://pypi.org/simple

            fastapi==0.103.1
            uvicorn==0.23.2
                pandas==2.1.0
        "};
        assert_eq!(
            parse_packages(requirements_txt),
            ["fastapi==0.103.1", "uvicorn==0.23.2", "pandas==2.1.0"]
        );
    }

    #[test]
    fn test_parse_packages_empty() {
        assert_eq!(parse_packages(""), Vec::<String>::new());
        assert_eq!(parse_packages("# only a comment\n"), Vec::<String>::new());
    }
}
