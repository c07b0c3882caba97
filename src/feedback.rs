use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::analytics::Metric;
use crate::error::{Error, Result};

// --- Header table ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Overall,
    Strengths,
    Weaknesses,
    Suggestions,
}

impl Slot {
    pub const ALL: [Slot; 4] = [Slot::Overall, Slot::Strengths, Slot::Weaknesses, Slot::Suggestions];

    pub fn title(&self) -> &'static str {
        match self {
            Slot::Overall => "Overall",
            Slot::Strengths => "Strengths",
            Slot::Weaknesses => "Weaknesses",
            Slot::Suggestions => "Suggestions",
        }
    }
}

/// Recognised header spellings per slot. Order matters: when one line matches
/// several slots the earlier row wins.
pub const HEADER_TABLE: &[(Slot, &[&str])] = &[
    (
        Slot::Overall,
        &["Overall Assessment", "Overall Summary", "Overall Analysis", "overall_analysis"],
    ),
    (
        Slot::Strengths,
        &["Key Strengths", "Strengths", "Positive Aspects", "What Went Well"],
    ),
    (
        Slot::Weaknesses,
        &[
            "Missing Elements & Weaknesses",
            "Missing Elements/Areas for Improvement",
            "Missing Elements",
            "Weaknesses",
            "Areas for Improvement",
            "Areas Needing Improvement",
            "Limitations",
            "Concerns",
        ],
    ),
    (
        Slot::Suggestions,
        &[
            "Suggestions for Improvement",
            "Specific Suggestions",
            "Improvement Suggestions",
            "Suggestions",
            "Recommendations",
            "Improvements",
            "Advice",
        ],
    ),
];

// --- Matching ---

/// Turns one header spelling into a pattern fragment. Words may be separated
/// by any run of spaces or underscores; `&` and `/` also accept "and".
fn spelling_pattern(spelling: &str) -> String {
    let spaced = spelling.replace('&', " & ").replace('/', " / ");
    let mut pattern = String::new();
    let mut pending_join = false;
    let mut pending_sep = false;

    for token in spaced.split(|c: char| c.is_whitespace() || c == '_').filter(|t| !t.is_empty()) {
        if token == "&" || token == "/" {
            pending_sep = true;
            continue;
        }
        if pending_sep {
            pattern.push_str(r"(?:\s*[&/]\s*|\s+and\s+)");
        } else if pending_join {
            pattern.push_str(r"[\s_]+");
        }
        pattern.push_str(&regex::escape(token));
        pending_join = true;
        pending_sep = false;
    }
    pattern
}

fn header_regex(spellings: &[&str]) -> std::result::Result<Regex, regex::Error> {
    let alternatives: Vec<String> = spellings.iter().map(|s| spelling_pattern(s)).collect();
    // Leading emoji, markdown markers or a list number; trailing emphasis and
    // an optional colon, after which inline text is allowed.
    Regex::new(&format!(
        r"(?i)^[^\p{{L}}\p{{N}}]*(?:\d+[.)]\s*)?[^\p{{L}}\p{{N}}]*(?:{})(?:[\s*_]*|[\s*_]*:.*)$",
        alternatives.join("|")
    ))
}

/// Line splitter shared by every matcher: newlines and HTML line breaks.
fn line_break() -> &'static Regex {
    static LINE_BREAK: OnceLock<Regex> = OnceLock::new();
    LINE_BREAK.get_or_init(|| Regex::new(r"(?i)\r?\n|<br\s*/?>").expect("line break pattern is valid"))
}

pub struct SectionMatcher {
    patterns: Vec<(Slot, Regex)>,
}

impl SectionMatcher {
    pub fn from_table(table: &[(Slot, &[&str])]) -> std::result::Result<Self, regex::Error> {
        let patterns = table
            .iter()
            .map(|(slot, spellings)| header_regex(spellings).map(|re| (*slot, re)))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// The slot whose header this line is, if any.
    pub fn classify(&self, line: &str) -> Option<Slot> {
        let line = line.trim();
        if line.is_empty() || is_list_item(line) {
            return None;
        }
        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(line))
            .map(|(slot, _)| *slot)
    }

    /// Splits `text` into the four slots. Never fails: a slot whose header
    /// never appears is simply empty.
    pub fn extract(&self, text: &str) -> FeedbackSections {
        let lines: Vec<&str> = line_break().split(text).collect();

        // First header line for each slot
        let mut headers: Vec<(Slot, usize)> = Vec::new();
        for (idx, line) in lines.iter().enumerate() {
            if let Some(slot) = self.classify(line) {
                if !headers.iter().any(|(s, _)| *s == slot) {
                    headers.push((slot, idx));
                }
            }
        }
        headers.sort_by_key(|(_, idx)| *idx);

        let mut sections = FeedbackSections::default();
        for (i, (slot, start)) in headers.iter().enumerate() {
            let end = headers.get(i + 1).map(|(_, idx)| *idx).unwrap_or(lines.len());
            let body = trim_blank_edges(&lines[start + 1..end]);
            *sections.slot_mut(*slot) = body;
        }
        sections
    }
}

fn trim_blank_edges(lines: &[&str]) -> Vec<String> {
    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    match (first, last) {
        (Some(first), Some(last)) => lines[first..=last].iter().map(|l| l.trim_end().to_string()).collect(),
        _ => Vec::new(),
    }
}

fn default_matcher() -> &'static SectionMatcher {
    static MATCHER: OnceLock<SectionMatcher> = OnceLock::new();
    MATCHER.get_or_init(|| SectionMatcher::from_table(HEADER_TABLE).expect("built-in header table is valid"))
}

/// Extract with the built-in header table.
pub fn extract_sections(text: &str) -> FeedbackSections {
    default_matcher().extract(text)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackSections {
    pub overall: Vec<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
}

impl FeedbackSections {
    pub fn get(&self, slot: Slot) -> &[String] {
        match slot {
            Slot::Overall => &self.overall,
            Slot::Strengths => &self.strengths,
            Slot::Weaknesses => &self.weaknesses,
            Slot::Suggestions => &self.suggestions,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Vec<String> {
        match slot {
            Slot::Overall => &mut self.overall,
            Slot::Strengths => &mut self.strengths,
            Slot::Weaknesses => &mut self.weaknesses,
            Slot::Suggestions => &mut self.suggestions,
        }
    }

    pub fn is_empty(&self) -> bool {
        Slot::ALL.iter().all(|slot| self.get(*slot).is_empty())
    }
}

// --- Rendering contract ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionBody {
    Empty,
    Paragraph(String),
    Bullets(Vec<String>),
}

const BULLET_MARKERS: [char; 3] = ['*', '-', '•'];

/// A bullet marker followed by whitespace opens a body item, never a header.
/// Markdown emphasis such as `**Strengths**` has no space after the marker.
fn is_list_item(line: &str) -> bool {
    let mut chars = line.chars();
    matches!(chars.next(), Some(c) if BULLET_MARKERS.contains(&c))
        && chars.next().is_some_and(char::is_whitespace)
}

fn starts_with_bullet(line: &str) -> bool {
    line.trim_start().starts_with(BULLET_MARKERS)
}

fn strip_bullet(line: &str) -> String {
    line.trim()
        .trim_start_matches(BULLET_MARKERS)
        .trim()
        .to_string()
}

/// A lone line without a bullet reads as a paragraph; anything else becomes
/// one bullet per non-blank line.
pub fn render_body(lines: &[String]) -> SectionBody {
    let content: Vec<&String> = lines.iter().filter(|l| !l.trim().is_empty()).collect();
    match content.as_slice() {
        [] => SectionBody::Empty,
        [only] if !starts_with_bullet(only) => SectionBody::Paragraph(only.trim().to_string()),
        many => SectionBody::Bullets(many.iter().map(|l| strip_bullet(l)).collect()),
    }
}

// --- Structured match feedback ---

#[derive(Debug, Deserialize)]
struct StructuredFeedback {
    #[serde(default)]
    overall_analysis: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    suggestions: Vec<String>,
}

/// The match endpoint sometimes returns its feedback as a fenced JSON block
/// instead of prose. Rewrite that into headed text so it goes through the
/// same extractor; anything else (including broken JSON) is returned as is.
pub fn normalize_feedback(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```json") else {
        return raw.to_string();
    };
    let body = rest.trim().trim_end_matches("```").trim();

    let parsed: StructuredFeedback = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!(error = %e, "fenced feedback is not valid JSON; using raw text");
            return raw.to_string();
        }
    };

    let bullets = |items: &[String]| {
        items
            .iter()
            .map(|item| format!("* {}", item))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "Overall Assessment\n{}\n\nKey Strengths\n{}\n\nMissing Elements & Weaknesses\n{}\n\nSuggestions for Improvement\n{}",
        parsed.overall_analysis,
        bullets(&parsed.strengths),
        bullets(&parsed.weaknesses),
        bullets(&parsed.suggestions)
    )
}

// --- Remote report shapes ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResumeFeedback {
    #[serde(default)]
    pub overall_impression: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub areas_for_improvement: Vec<String>,
    #[serde(default)]
    pub section_feedback: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub ats_readability: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeReview {
    pub feedback: ResumeFeedback,
    #[serde(default)]
    pub static_feedback: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReport {
    pub match_score: Metric,
    #[serde(default)]
    pub matched_skills: Vec<String>,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub jd_skills: Vec<String>,
    #[serde(default)]
    pub feedback: String,
}

/// Uploads are PDF files that exist on disk.
pub fn check_upload(path: &Path) -> Result<()> {
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(Error::Validation(format!("{} is not a PDF file", path.display())));
    }
    if !path.is_file() {
        return Err(Error::Validation(format!("{} does not exist", path.display())));
    }
    Ok(())
}

impl MatchReport {
    pub fn sections(&self) -> FeedbackSections {
        extract_sections(&normalize_feedback(&self.feedback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_upload_requires_existing_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("resume.PDF");
        let txt = dir.path().join("resume.txt");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        std::fs::write(&txt, b"plain").unwrap();

        assert!(check_upload(&pdf).is_ok());
        assert!(matches!(check_upload(&txt), Err(Error::Validation(_))));
        assert!(matches!(check_upload(&dir.path().join("gone.pdf")), Err(Error::Validation(_))));
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extract_follows_source_order_not_table_order() {
        let text = "Weaknesses\nNo tests\nOverall Assessment\nSolid fit\nSuggestions\n* Add CI\nStrengths\n* Rust\n* SQL";
        let sections = extract_sections(text);

        assert_eq!(sections.weaknesses, lines(&["No tests"]));
        assert_eq!(sections.overall, lines(&["Solid fit"]));
        assert_eq!(sections.suggestions, lines(&["* Add CI"]));
        assert_eq!(sections.strengths, lines(&["* Rust", "* SQL"]));
    }

    #[test]
    fn test_extract_degrades_to_empty() {
        assert!(extract_sections("").is_empty());
        assert!(extract_sections("The candidate looks fine.\nNothing else to add.").is_empty());
    }

    #[test]
    fn test_missing_slot_is_empty() {
        let sections = extract_sections("Overall Summary\nGood\nKey Strengths\n- Go");
        assert_eq!(sections.overall, lines(&["Good"]));
        assert_eq!(sections.strengths, lines(&["- Go"]));
        assert!(sections.weaknesses.is_empty());
        assert!(sections.suggestions.is_empty());
    }

    #[test]
    fn test_header_tolerates_markdown_emoji_and_colon() {
        let matcher = default_matcher();
        assert_eq!(matcher.classify("**Key Strengths:**"), Some(Slot::Strengths));
        assert_eq!(matcher.classify("## Overall Assessment"), Some(Slot::Overall));
        assert_eq!(matcher.classify("📝 Overall Assessment"), Some(Slot::Overall));
        assert_eq!(matcher.classify("⚠️ Missing Elements & Weaknesses"), Some(Slot::Weaknesses));
        assert_eq!(matcher.classify("Missing Elements and Weaknesses:"), Some(Slot::Weaknesses));
        assert_eq!(matcher.classify("3. Recommendations"), Some(Slot::Suggestions));
        assert_eq!(matcher.classify("overall_analysis"), Some(Slot::Overall));
        assert_eq!(matcher.classify("**Advice**: keep it short"), Some(Slot::Suggestions));
    }

    #[test]
    fn test_prose_mentioning_a_header_word_is_not_a_header() {
        let matcher = default_matcher();
        assert_eq!(matcher.classify("Your strengths are clear."), None);
        assert_eq!(matcher.classify("* Strengths in Rust and Go"), None);
        assert_eq!(matcher.classify("* Concerns"), None);
        assert_eq!(matcher.classify("- Suggestions:"), None);
        assert_eq!(matcher.classify("• Strengths"), None);
    }

    #[test]
    fn test_bullet_items_named_like_headers_stay_in_the_body() {
        let sections = extract_sections(
            "Key Strengths\n* Communication\n* Concerns\n* Teamwork\nSuggestions\n* Add metrics",
        );
        assert_eq!(sections.strengths, lines(&["* Communication", "* Concerns", "* Teamwork"]));
        assert!(sections.weaknesses.is_empty());
        assert_eq!(sections.suggestions, lines(&["* Add metrics"]));
        let matcher = default_matcher();
        assert_eq!(matcher.classify(""), None);
    }

    #[test]
    fn test_ambiguous_line_goes_to_first_table_row() {
        let table: &[(Slot, &[&str])] = &[
            (Slot::Weaknesses, &["Improvements"]),
            (Slot::Suggestions, &["Improvements"]),
        ];
        let matcher = SectionMatcher::from_table(table).unwrap();
        let sections = matcher.extract("Improvements\nMore tests");
        assert_eq!(sections.weaknesses, lines(&["More tests"]));
        assert!(sections.suggestions.is_empty());
    }

    #[test]
    fn test_first_occurrence_of_a_header_wins() {
        let sections = extract_sections("Strengths\nA\nConcerns\nB\nStrengths\nC");
        assert_eq!(sections.strengths, lines(&["A"]));
        // The repeated header is not a boundary, so it stays in the preceding body
        assert_eq!(sections.weaknesses, lines(&["B", "Strengths", "C"]));
    }

    #[test]
    fn test_html_breaks_split_lines() {
        let sections = extract_sections("Overall Assessment<br>Great<br/>Limitations<BR />Short");
        assert_eq!(sections.overall, lines(&["Great"]));
        assert_eq!(sections.weaknesses, lines(&["Short"]));
    }

    #[test]
    fn test_blank_only_body_is_empty() {
        let sections = extract_sections("Overall Assessment\n\n   \nStrengths\nx");
        assert!(sections.overall.is_empty());
        assert_eq!(render_body(&sections.overall), SectionBody::Empty);
    }

    #[test]
    fn test_render_body_paragraph_vs_bullets() {
        assert_eq!(
            render_body(&lines(&["", "A single verdict."])),
            SectionBody::Paragraph("A single verdict.".to_string())
        );
        assert_eq!(
            render_body(&lines(&["* only item"])),
            SectionBody::Bullets(lines(&["only item"]))
        );
        assert_eq!(
            render_body(&lines(&["- one", "", "• two", "three"])),
            SectionBody::Bullets(lines(&["one", "two", "three"]))
        );
    }

    #[test]
    fn test_normalize_fenced_json_feedback() {
        let raw = "```json\n{\"overall_analysis\":\"Decent\",\"strengths\":[\"Rust\"],\"weaknesses\":[\"Docker\"],\"suggestions\":[\"Ship\"]}\n```";
        let sections = extract_sections(&normalize_feedback(raw));

        assert_eq!(sections.overall, lines(&["Decent"]));
        assert_eq!(sections.strengths, lines(&["* Rust"]));
        assert_eq!(sections.weaknesses, lines(&["* Docker"]));
        assert_eq!(sections.suggestions, lines(&["* Ship"]));
    }

    #[test]
    fn test_normalize_keeps_broken_json_and_prose() {
        let broken = "```json\n{not json}\n```";
        assert_eq!(normalize_feedback(broken), broken);
        assert_eq!(normalize_feedback("Overall Summary\nok"), "Overall Summary\nok");
    }

    #[test]
    fn test_headerless_match_feedback_has_no_sections() {
        let report: MatchReport =
            serde_json::from_str(r#"{"matchScore":40,"feedback":"Decent overlap, needs more cloud work."}"#).unwrap();
        assert!(report.sections().is_empty());
        assert!(!extract_sections("Strengths\n* Rust").is_empty());
    }

    #[test]
    fn test_match_report_tolerates_string_score() {
        let report: MatchReport = serde_json::from_str(
            r#"{"matchScore":"72.5","matchedSkills":["rust"],"missingSkills":[],"feedback":"Strengths\n* rust"}"#,
        )
        .unwrap();
        assert_eq!(report.match_score.as_f64(), Some(72.5));
        assert!(report.jd_skills.is_empty());
        assert_eq!(report.sections().strengths, lines(&["* rust"]));
    }

    #[test]
    fn test_resume_review_defaults_missing_lists() {
        let review: ResumeReview =
            serde_json::from_str(r#"{"feedback":{"overall_impression":"Good"}}"#).unwrap();
        assert_eq!(review.feedback.overall_impression, "Good");
        assert!(review.feedback.strengths.is_empty());
        assert!(review.static_feedback.is_empty());
    }
}
