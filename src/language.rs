//! Natural-language detection over extracted text.
//!
//! The whatlang detector is built once per process behind a [`Lazy`] and
//! handed out by reference through [`WhatlangDetector::shared`]. The
//! assembler takes any [`LanguageDetector`], so tests can substitute a
//! fake.

use once_cell::sync::Lazy;
use whatlang::{Detector, Lang};

/// Characters of text inspected per document.
const SAMPLE_CHARS: usize = 16 * 1024;

static SHARED: Lazy<WhatlangDetector> = Lazy::new(WhatlangDetector::new);

/// Best-effort language identification.
pub trait LanguageDetector {
    /// ISO 639-1 code for the language of `text`, or `""` when the text
    /// carries no usable signal (empty, whitespace, digits only).
    fn detect(&self, text: &str) -> String;

    /// Advisory only: short inputs routinely produce a confident-looking
    /// but wrong answer, so `true` here guarantees nothing.
    fn is_reasonably_certain(&self, _text: &str) -> bool {
        false
    }
}

pub struct WhatlangDetector {
    detector: Detector,
}

impl Default for WhatlangDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl WhatlangDetector {
    pub fn new() -> Self {
        Self {
            detector: Detector::new(),
        }
    }

    /// The process-wide instance, initialised on first use.
    pub fn shared() -> &'static WhatlangDetector {
        &SHARED
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> String {
        let sample = sample(text);
        if sample.trim().is_empty() {
            return String::new();
        }
        self.detector
            .detect_lang(sample)
            .map(|lang| lang_to_iso639_1(lang).to_string())
            .unwrap_or_default()
    }

    fn is_reasonably_certain(&self, text: &str) -> bool {
        self.detector
            .detect(sample(text))
            .map(|info| info.is_reliable())
            .unwrap_or(false)
    }
}

fn sample(text: &str) -> &str {
    match text.char_indices().nth(SAMPLE_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// whatlang speaks ISO 639-3; results are reported as ISO 639-1.
fn lang_to_iso639_1(lang: Lang) -> &'static str {
    match lang {
        Lang::Eng => "en",
        Lang::Rus => "ru",
        Lang::Cmn => "zh",
        Lang::Spa => "es",
        Lang::Por => "pt",
        Lang::Ita => "it",
        Lang::Fra => "fr",
        Lang::Deu => "de",
        Lang::Ukr => "uk",
        Lang::Kat => "ka",
        Lang::Ara => "ar",
        Lang::Hin => "hi",
        Lang::Jpn => "ja",
        Lang::Heb => "he",
        Lang::Yid => "yi",
        Lang::Pol => "pl",
        Lang::Amh => "am",
        Lang::Jav => "jv",
        Lang::Kor => "ko",
        Lang::Nob => "nb",
        Lang::Dan => "da",
        Lang::Swe => "sv",
        Lang::Fin => "fi",
        Lang::Tur => "tr",
        Lang::Nld => "nl",
        Lang::Hun => "hu",
        Lang::Ces => "cs",
        Lang::Ell => "el",
        Lang::Bul => "bg",
        Lang::Bel => "be",
        Lang::Mar => "mr",
        Lang::Kan => "kn",
        Lang::Ron => "ro",
        Lang::Slv => "sl",
        Lang::Hrv => "hr",
        Lang::Srp => "sr",
        Lang::Mkd => "mk",
        Lang::Lit => "lt",
        Lang::Lav => "lv",
        Lang::Est => "et",
        Lang::Tam => "ta",
        Lang::Vie => "vi",
        Lang::Urd => "ur",
        Lang::Tha => "th",
        Lang::Guj => "gu",
        Lang::Uzb => "uz",
        Lang::Pan => "pa",
        Lang::Aze => "az",
        Lang::Ind => "id",
        Lang::Tel => "te",
        Lang::Pes => "fa",
        Lang::Mal => "ml",
        Lang::Ori => "or",
        Lang::Mya => "my",
        Lang::Nep => "ne",
        Lang::Sin => "si",
        Lang::Khm => "km",
        Lang::Tuk => "tk",
        Lang::Aka => "ak",
        Lang::Zul => "zu",
        Lang::Sna => "sn",
        Lang::Afr => "af",
        Lang::Lat => "la",
        Lang::Slk => "sk",
        Lang::Cat => "ca",
        Lang::Tgl => "tl",
        Lang::Hye => "hy",
        Lang::Epo => "eo",
        Lang::Ben => "bn",
        Lang::Cym => "cy",
    }
}
