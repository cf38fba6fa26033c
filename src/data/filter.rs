use std::fmt;

use log::{debug, info};
use thiserror::Error;

use super::model::{CommentDataset, Record};

// ---------------------------------------------------------------------------
// Language identification backend
// ---------------------------------------------------------------------------

/// Best-scoring language for a text.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// ISO 639-1 code where one exists (`"en"`), otherwise ISO 639-3.
    pub code: String,
    pub confidence: f64,
}

/// Why a text could not be classified. Every variant excludes the row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    #[error("empty input")]
    EmptyInput,
    /// Source bytes were not valid UTF-8.
    #[error("text is not valid UTF-8")]
    InvalidEncoding,
    #[error("no language could be determined")]
    Undetermined,
    #[error("detector unavailable: {0}")]
    Unavailable(String),
}

/// Maps a text to its dominant language.
pub trait LanguageIdentifier {
    fn identify(&self, text: &str) -> Result<Detection, DetectError>;
}

impl<F> LanguageIdentifier for F
where
    F: Fn(&str) -> Result<Detection, DetectError>,
{
    fn identify(&self, text: &str) -> Result<Detection, DetectError> {
        self(text)
    }
}

/// Trigram-based identification via `whatlang`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhatlangIdentifier;

impl LanguageIdentifier for WhatlangIdentifier {
    fn identify(&self, text: &str) -> Result<Detection, DetectError> {
        if text.trim().is_empty() {
            return Err(DetectError::EmptyInput);
        }
        let info = whatlang::detect(text).ok_or(DetectError::Undetermined)?;
        Ok(Detection {
            code: normalize_language_code(info.lang().code()),
            confidence: info.confidence(),
        })
    }
}

/// Convert ISO 639-3 codes to ISO 639-1 where a two-letter code exists.
pub fn normalize_language_code(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "eng" | "english" => "en",
        "spa" => "es",
        "fra" => "fr",
        "deu" => "de",
        "ita" => "it",
        "por" => "pt",
        "nld" => "nl",
        "swe" => "sv",
        "dan" => "da",
        "nob" => "nb",
        "fin" => "fi",
        "pol" => "pl",
        "ces" => "cs",
        "slk" => "sk",
        "slv" => "sl",
        "hun" => "hu",
        "ron" => "ro",
        "hrv" => "hr",
        "srp" => "sr",
        "bul" => "bg",
        "rus" => "ru",
        "ukr" => "uk",
        "bel" => "be",
        "lit" => "lt",
        "lav" => "lv",
        "est" => "et",
        "ell" => "el",
        "tur" => "tr",
        "ara" => "ar",
        "heb" => "he",
        "pes" => "fa",
        "hin" => "hi",
        "ben" => "bn",
        "urd" => "ur",
        "tha" => "th",
        "vie" => "vi",
        "ind" => "id",
        "tgl" => "tl",
        "jpn" => "ja",
        "kor" => "ko",
        "cmn" => "zh",
        "cat" => "ca",
        "afr" => "af",
        "epo" => "eo",
        "lat" => "la",
        other => return other.to_string(),
    }
    .to_string()
}

// ---------------------------------------------------------------------------
// Filter predicate
// ---------------------------------------------------------------------------

/// Outcome of classifying one text.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterVerdict {
    Keep,
    /// Detected, but not the target language (or below the confidence floor).
    Reject(Detection),
    Failed(DetectError),
}

/// Tally of one filtering pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub kept: usize,
    pub rejected: usize,
    pub empty: usize,
    pub malformed: usize,
    pub undetermined: usize,
    pub unavailable: usize,
}

impl FilterReport {
    pub fn excluded(&self) -> usize {
        self.rejected + self.empty + self.malformed + self.undetermined + self.unavailable
    }

    fn record(&mut self, verdict: &FilterVerdict) {
        match verdict {
            FilterVerdict::Keep => self.kept += 1,
            FilterVerdict::Reject(_) => self.rejected += 1,
            FilterVerdict::Failed(DetectError::EmptyInput) => self.empty += 1,
            FilterVerdict::Failed(DetectError::InvalidEncoding) => self.malformed += 1,
            FilterVerdict::Failed(DetectError::Undetermined) => self.undetermined += 1,
            FilterVerdict::Failed(DetectError::Unavailable(_)) => self.unavailable += 1,
        }
    }
}

impl fmt::Display for FilterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "kept {}, other language {}, empty {}, bad encoding {}, undetermined {}, detector failures {}",
            self.kept,
            self.rejected,
            self.empty,
            self.malformed,
            self.undetermined,
            self.unavailable
        )
    }
}

/// Keeps rows whose text is in the target language.
pub struct LanguageFilter {
    identifier: Box<dyn LanguageIdentifier>,
    target: String,
    min_confidence: f64,
}

impl fmt::Debug for LanguageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageFilter")
            .field("target", &self.target)
            .field("min_confidence", &self.min_confidence)
            .finish_non_exhaustive()
    }
}

impl Default for LanguageFilter {
    /// English via `whatlang`, no confidence floor.
    fn default() -> Self {
        LanguageFilter::new(WhatlangIdentifier, "en")
    }
}

impl LanguageFilter {
    pub fn new(identifier: impl LanguageIdentifier + 'static, target: &str) -> Self {
        LanguageFilter {
            identifier: Box::new(identifier),
            target: normalize_language_code(target),
            min_confidence: 0.0,
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn classify(&self, text: &str) -> FilterVerdict {
        match self.identifier.identify(text) {
            Ok(det) if det.code == self.target && det.confidence >= self.min_confidence => {
                FilterVerdict::Keep
            }
            Ok(det) => FilterVerdict::Reject(det),
            Err(err) => FilterVerdict::Failed(err),
        }
    }

    /// Like [`classify`](Self::classify), but rows that failed to decode are
    /// excluded without reaching the identifier.
    pub fn classify_record(&self, record: &Record) -> FilterVerdict {
        if !record.valid_utf8 {
            return FilterVerdict::Failed(DetectError::InvalidEncoding);
        }
        self.classify(&record.comment_text)
    }

    /// `true` iff `text` is in the target language. Never fails.
    pub fn is_target(&self, text: &str) -> bool {
        matches!(self.classify(text), FilterVerdict::Keep)
    }

    /// Return indices of records whose text passes the filter.
    pub fn filtered_indices(&self, dataset: &CommentDataset) -> (Vec<usize>, FilterReport) {
        let mut report = FilterReport::default();
        let indices = dataset
            .records
            .iter()
            .enumerate()
            .filter(|(i, record)| {
                let verdict = self.classify_record(record);
                if let FilterVerdict::Failed(err) = &verdict {
                    debug!("Row {i}: language detection failed ({err}), excluding");
                }
                report.record(&verdict);
                verdict == FilterVerdict::Keep
            })
            .map(|(i, _)| i)
            .collect();
        (indices, report)
    }

    /// New dataset holding only target-language rows.
    pub fn apply(&self, dataset: &CommentDataset) -> (CommentDataset, FilterReport) {
        let (indices, report) = self.filtered_indices(dataset);
        info!("Language filter ({}): {report}", self.target);
        (dataset.select(&indices), report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub(text: &str) -> Result<Detection, DetectError> {
        match text {
            "" => Err(DetectError::EmptyInput),
            "???" => Err(DetectError::Undetermined),
            "boom" => Err(DetectError::Unavailable("model not loaded".into())),
            t if t.starts_with("fr:") => Ok(Detection { code: "fr".into(), confidence: 0.9 }),
            t if t.starts_with("weak:") => Ok(Detection { code: "en".into(), confidence: 0.2 }),
            _ => Ok(Detection { code: "en".into(), confidence: 0.99 }),
        }
    }

    #[test]
    fn failures_are_never_english() {
        let filter = LanguageFilter::new(stub, "en");
        assert!(!filter.is_target(""));
        assert!(!filter.is_target("???"));
        assert!(!filter.is_target("boom"));
        assert!(!filter.is_target("fr: bonjour"));
        assert!(filter.is_target("hello"));
    }

    #[test]
    fn confidence_floor() {
        let filter = LanguageFilter::new(stub, "en").with_min_confidence(0.5);
        assert!(matches!(filter.classify("weak: hi"), FilterVerdict::Reject(_)));
        assert_eq!(filter.classify("strong"), FilterVerdict::Keep);
    }

    #[test]
    fn report_counts_each_failure_class() {
        let ds = CommentDataset::new(
            vec![
                Record::new("one"),
                Record::new(""),
                Record::new("???"),
                Record::new("boom"),
                Record::new("fr: salut"),
                Record::malformed("bad \u{fffd} bytes"),
                Record::new("two"),
            ],
            vec![],
        );
        let (kept, report) = LanguageFilter::new(stub, "en").apply(&ds);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept.records[1].comment_text, "two");
        assert_eq!(
            report,
            FilterReport {
                kept: 2,
                rejected: 1,
                empty: 1,
                malformed: 1,
                undetermined: 1,
                unavailable: 1,
            }
        );
        assert_eq!(report.excluded(), 5);
    }

    #[test]
    fn undecodable_text_never_reaches_the_identifier() {
        let filter = LanguageFilter::new(
            |_: &str| -> Result<Detection, DetectError> {
                Ok(Detection { code: "en".into(), confidence: 1.0 })
            },
            "en",
        );
        assert_eq!(
            filter.classify_record(&Record::malformed("looks english enough")),
            FilterVerdict::Failed(DetectError::InvalidEncoding)
        );
        assert_eq!(filter.classify_record(&Record::new("fine")), FilterVerdict::Keep);
    }

    #[test]
    fn target_code_is_normalized() {
        assert_eq!(LanguageFilter::new(stub, "eng").target(), "en");
        assert_eq!(normalize_language_code("deu"), "de");
        assert_eq!(normalize_language_code("zul"), "zul");
    }

    #[test]
    fn whatlang_detects_plain_english() {
        let filter = LanguageFilter::default();
        assert!(filter.is_target(
            "This is a perfectly ordinary English sentence, written to describe \
             the weather and the people walking through the park this afternoon."
        ));
    }

    #[test]
    fn whatlang_rejects_other_languages_and_blank_text() {
        let filter = LanguageFilter::default();
        assert!(!filter.is_target(
            "Ceci est une phrase tout à fait ordinaire, écrite en français pour \
             décrire le temps qu'il fait et les gens qui se promènent dans le parc."
        ));
        assert!(!filter.is_target("Это совершенно обычное предложение на русском языке."));
        assert_eq!(
            WhatlangIdentifier.identify("   "),
            Err(DetectError::EmptyInput)
        );
        assert!(!filter.is_target(""));
    }
}
