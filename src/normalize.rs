use std::sync::LazyLock;

use regex::Regex;

static DUB_WITH_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:hu|ua|2d|3d|4dx)\s+dub$").expect("valid dub suffix pattern")
});

static BARE_DUB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+dub$").expect("valid dub pattern"));

/// Strips one trailing dub suffix ("Hu dub", "2D dub", or a bare "dub") so
/// release variants of a film share a key. Not meant for display.
pub fn normalize_movie_name(name: &str) -> String {
    let name = name.trim_end();
    let stripped = if DUB_WITH_TAG.is_match(name) {
        DUB_WITH_TAG.replace(name, "")
    } else {
        BARE_DUB.replace(name, "")
    };
    stripped.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_language_dub_suffix() {
        assert_eq!(normalize_movie_name("Avatar: Fire and ash Hu dub"), "Avatar: Fire and ash");
        assert_eq!(
            normalize_movie_name("Five nights at Freddy's 2 HU dub"),
            "Five nights at Freddy's 2"
        );
        assert_eq!(normalize_movie_name("Zootopia 2 Ua dub"), "Zootopia 2");
    }

    #[test]
    fn strips_format_dub_suffix_and_collapses_whitespace() {
        assert_eq!(normalize_movie_name("Movie Name   2D dub"), "Movie Name");
        assert_eq!(normalize_movie_name("A mouse hunt for Christmas 2D dub"), "A mouse hunt for Christmas");
        assert_eq!(normalize_movie_name("Dune 4dx DUB"), "Dune");
    }

    #[test]
    fn strips_bare_dub() {
        assert_eq!(normalize_movie_name("Moana dub"), "Moana");
        assert_eq!(normalize_movie_name("  Moana Dub  "), "Moana");
    }

    #[test]
    fn leaves_mid_string_dub_alone() {
        assert_eq!(normalize_movie_name("Dub Masters: The Movie"), "Dub Masters: The Movie");
        assert_eq!(normalize_movie_name("Dubai Nights"), "Dubai Nights");
        assert_eq!(normalize_movie_name("Hubdub"), "Hubdub");
    }

    #[test]
    fn strips_only_one_suffix() {
        assert_eq!(normalize_movie_name("Cars 3D dub Hu dub"), "Cars 3D dub");
    }

    #[test]
    fn normalizing_twice_is_stable() {
        for title in [
            "Avatar: Fire and ash Hu dub",
            "Movie Name   2D dub",
            "Dub Masters: The Movie",
            "Moana dub",
            "  padded  ",
            "",
            "dub",
            "Wicked: For Good",
        ] {
            let once = normalize_movie_name(title);
            assert_eq!(normalize_movie_name(&once), once, "title {title:?}");
        }
    }
}
