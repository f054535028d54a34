//! Static language registry.
//!
//! Entries are compile-time constants; the catalog served by the metadata
//! endpoint is serialised once on first use.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// Metadata for one registered language.
#[derive(Debug, Clone, Serialize)]
pub struct Language {
    pub name: &'static str,
    pub image: &'static str,
    pub version: &'static str,
    pub url: &'static str,
    pub sbcs: bool,
    #[serde(rename = "SE_class")]
    pub se_class: &'static str,
}

static LANGUAGES: Lazy<HashMap<&'static str, Language>> = Lazy::new(|| {
    HashMap::from([
        (
            "python",
            Language {
                name: "Python",
                image: "runbox/python",
                version: "Latest",
                url: "https://www.python.org",
                sbcs: false,
                se_class: "python",
            },
        ),
        (
            "python2",
            Language {
                name: "Python 2",
                image: "runbox/python2",
                version: "2",
                url: "https://docs.python.org/2/",
                sbcs: false,
                se_class: "python2",
            },
        ),
        (
            "whython",
            Language {
                name: "Whython",
                image: "runbox/whython",
                version: "Latest",
                url: "https://github.com/pxeger/whython",
                sbcs: false,
                se_class: "python",
            },
        ),
        (
            "bash",
            Language {
                name: "Bash",
                image: "runbox/bash",
                version: "Latest",
                url: "https://www.gnu.org/software/bash/",
                sbcs: false,
                se_class: "",
            },
        ),
        (
            "zsh",
            Language {
                name: "Zsh",
                image: "runbox/zsh",
                version: "5",
                url: "https://www.zsh.org/",
                sbcs: false,
                se_class: "bash",
            },
        ),
        (
            "ruby",
            Language {
                name: "Ruby",
                image: "runbox/ruby",
                version: "Latest",
                url: "https://www.ruby-lang.org/",
                sbcs: false,
                se_class: "ruby",
            },
        ),
        (
            "java",
            Language {
                name: "Java",
                image: "runbox/java",
                version: "Latest",
                url: "https://en.wikipedia.org/wiki/Java_(programming_language)",
                sbcs: false,
                se_class: "java",
            },
        ),
        (
            "scala2",
            Language {
                name: "Scala 2",
                image: "runbox/scala2",
                version: "2",
                url: "https://www.scala-lang.org/",
                sbcs: false,
                se_class: "",
            },
        ),
        (
            "scala3",
            Language {
                name: "Scala 3",
                image: "runbox/scala3",
                version: "3",
                url: "https://www.scala-lang.org/",
                sbcs: false,
                se_class: "",
            },
        ),
        (
            "jelly",
            Language {
                name: "Jelly",
                image: "runbox/jelly",
                version: "70c9fd93",
                url: "https://github.com/DennisMitchell/jellylanguage",
                sbcs: true,
                se_class: "",
            },
        ),
        (
            "tictac",
            Language {
                name: "Tictac",
                image: "runbox/tictac",
                version: "Latest",
                url: "https://github.com/pxeger/tictac",
                sbcs: true,
                se_class: "",
            },
        ),
        (
            "pip",
            Language {
                name: "Pip",
                image: "runbox/pip",
                version: "Latest",
                url: "https://github.com/dloscutoff/pip",
                sbcs: false,
                se_class: "",
            },
        ),
        (
            "funky2",
            Language {
                name: "Funky2",
                image: "runbox/funky2",
                version: "Latest",
                url: "https://funky2.a-ta.co/",
                sbcs: false,
                se_class: "",
            },
        ),
        (
            "c_gcc",
            Language {
                name: "C (GCC)",
                image: "runbox/base",
                version: "11",
                url: "https://gcc.gnu.org",
                sbcs: false,
                se_class: "",
            },
        ),
    ])
});

static CATALOG: Lazy<Vec<u8>> = Lazy::new(|| {
    rmp_serde::to_vec_named(&*LANGUAGES).expect("language catalog must serialise")
});

/// Look up a language by its short identifier.
pub fn lookup(id: &str) -> Option<&'static Language> {
    LANGUAGES.get(id)
}

/// The registry in the wire encoding, serialised once.
pub fn catalog() -> &'static [u8] {
    &CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct CatalogEntry {
        name: String,
        image: String,
        version: String,
        url: String,
        sbcs: bool,
        #[serde(rename = "SE_class")]
        se_class: String,
    }

    #[test]
    fn lookup_finds_registered_languages() {
        let python = lookup("python").unwrap();
        assert_eq!(python.name, "Python");
        assert!(lookup("cobol").is_none());
    }

    #[test]
    fn catalog_matches_registry() {
        let decoded: HashMap<String, CatalogEntry> = rmp_serde::from_slice(catalog()).unwrap();
        assert_eq!(decoded.len(), LANGUAGES.len());
        for (id, language) in LANGUAGES.iter() {
            let entry = decoded.get(*id).unwrap_or_else(|| panic!("{id} missing from catalog"));
            assert_eq!(entry.name, language.name);
            assert_eq!(entry.image, language.image);
            assert_eq!(entry.version, language.version);
            assert_eq!(entry.url, language.url);
            assert_eq!(entry.sbcs, language.sbcs);
            assert_eq!(entry.se_class, language.se_class);
        }
    }
}
