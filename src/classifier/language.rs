use whatlang::Lang;

/// A language classifier confidence at or above this value is treated as
/// trustworthy by the document and sentence gates.
pub const CONFIDENT: f64 = 0.90;

/// Ranked language identification over a text fragment.
///
/// Implementations return (language code, confidence) pairs ordered by
/// confidence, best first. An empty list means no language could be
/// determined. The trait exists so filtering logic can be tested with a
/// stubbed classifier.
pub trait LanguageClassifier: Send + Sync {
    fn detect(&self, text: &str) -> Vec<(String, f64)>;
}

/// Statistical trigram-based classifier backed by `whatlang`.
///
/// whatlang reports a single best guess, so the ranking it produces has at
/// most one entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangClassifier;

impl LanguageClassifier for WhatlangClassifier {
    fn detect(&self, text: &str) -> Vec<(String, f64)> {
        match whatlang::detect(text) {
            Some(info) => vec![(lang_to_code(info.lang()).to_string(), info.confidence())],
            None => Vec::new(),
        }
    }
}

/// Map whatlang's ISO 639-3 variants onto the two-letter codes used in
/// configuration and output attributes.
pub fn lang_to_code(lang: Lang) -> &'static str {
    match lang {
        Lang::Eng => "en",
        Lang::Rus => "ru",
        Lang::Cmn => "zh",
        Lang::Spa => "es",
        Lang::Fra => "fr",
        Lang::Deu => "de",
        Lang::Jpn => "ja",
        Lang::Kor => "ko",
        Lang::Por => "pt",
        Lang::Ita => "it",
        Lang::Nld => "nl",
        Lang::Pol => "pl",
        Lang::Tur => "tr",
        Lang::Swe => "sv",
        Lang::Dan => "da",
        Lang::Fin => "fi",
        Lang::Heb => "he",
        Lang::Ara => "ar",
        Lang::Hin => "hi",
        Lang::Tha => "th",
        Lang::Vie => "vi",
        Lang::Ukr => "uk",
        Lang::Ces => "cs",
        Lang::Ell => "el",
        Lang::Hun => "hu",
        Lang::Ron => "ro",
        other => other.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_english() {
        let text = "This is a long enough passage of English text for the \
                    statistical classifier to identify with some confidence.";
        let ranked = WhatlangClassifier.detect(text);
        assert_eq!(ranked.first().map(|(code, _)| code.as_str()), Some("en"));
    }

    #[test]
    fn empty_ranking_for_noise() {
        let ranked = WhatlangClassifier.detect("");
        assert!(ranked.is_empty());
    }

    #[test]
    fn code_mapping_covers_common_languages() {
        assert_eq!(lang_to_code(Lang::Fra), "fr");
        assert_eq!(lang_to_code(Lang::Deu), "de");
    }
}
