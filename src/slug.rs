use ring::digest::{digest, SHA256};

/// ASCII replacement for a Latin letter with diacritics, or `None` to keep it.
fn fold_char(c: char) -> Option<&'static str> {
    let folded = match c {
        'ą' | 'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'ć' | 'ç' | 'č' => "c",
        'ę' | 'è' | 'é' | 'ê' | 'ë' | 'ě' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ł' => "l",
        'ń' | 'ñ' | 'ň' => "n",
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
        'ś' | 'š' | 'ß' => "s",
        'ù' | 'ú' | 'û' | 'ü' | 'ů' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        'ř' => "r",
        'ď' => "d",
        'ť' => "t",
        'æ' => "ae",
        'œ' => "oe",
        _ => return None,
    };
    Some(folded)
}

/// URL-safe slug: lowercase ASCII letters and digits separated by single dashes.
///
/// `"Łódź Express"` becomes `"lodz-express"`.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        let piece: Option<std::borrow::Cow<'_, str>> = if c.is_ascii_alphanumeric() {
            Some(c.to_string().into())
        } else {
            fold_char(c).map(Into::into)
        };
        match piece {
            Some(p) => {
                if pending_dash && !out.is_empty() {
                    out.push('-');
                }
                pending_dash = false;
                out.push_str(&p);
            }
            None => pending_dash = true,
        }
    }
    out
}

/// City slug for a new source. An explicit slug wins; otherwise it is derived
/// from the name, falling back to a short digest when nothing survives slugify
/// (e.g. names written in a non-Latin script).
pub fn source_slug(name: &str, explicit: &str) -> String {
    let explicit = slugify(explicit);
    if !explicit.is_empty() {
        return explicit;
    }
    let from_name = slugify(name);
    if !from_name.is_empty() {
        return from_name;
    }
    let hash = digest(&SHA256, name.trim().as_bytes());
    let hex: String = hash.as_ref()[..4].iter().map(|b| format!("{:02x}", b)).collect();
    format!("source-{}", hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_polish_names() {
        assert_eq!(slugify("Warszawa News"), "warszawa-news");
        assert_eq!(slugify("Łódź Express"), "lodz-express");
        assert_eq!(slugify("Kraków"), "krakow");
        assert_eq!(slugify("Gdańsk / Sopot"), "gdansk-sopot");
        assert_eq!(slugify("Zielona Góra"), "zielona-gora");
    }

    #[test]
    fn test_slugify_collapses_and_trims_separators() {
        assert_eq!(slugify("  --Bielsko--Biała!!  "), "bielsko-biala");
        assert_eq!(slugify("News 24/7"), "news-24-7");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_source_slug_prefers_explicit() {
        assert_eq!(source_slug("Warszawa News", "waw"), "waw");
        assert_eq!(source_slug("Warszawa News", " Stolica City "), "stolica-city");
        assert_eq!(source_slug("Warszawa News", "   "), "warszawa-news");
    }

    #[test]
    fn test_source_slug_digest_fallback_is_stable() {
        let a = source_slug("Киев", "");
        let b = source_slug("Киев", "");
        assert_eq!(a, b);
        assert!(a.starts_with("source-"));
        assert_eq!(a.len(), "source-".len() + 8);
        assert_ne!(a, source_slug("Минск", ""));
    }
}
