//! Prompt text for every model call the engine makes.
//!
//! Page content is cut to a fixed character budget per call site before it is
//! embedded.

use scout_client::SearchResult;
use scout_client::markup::Link;
use scout_core::{SelectorSet, ValidationFeedback};

use crate::navigate::Rejection;

/// Visible text shown to the navigation decision.
pub const NAVIGATION_TEXT_BUDGET: usize = 5_000;
pub const SEARCH_TEXT_BUDGET: usize = 8_000;
pub const SEARCH_MARKUP_BUDGET: usize = 100_000;
pub const VERIFY_TEXT_BUDGET: usize = 5_000;
pub const INFERENCE_MARKUP_BUDGET: usize = 500_000;
pub const EVALUATION_MARKUP_BUDGET: usize = 200_000;
const REJECTION_TEXT_BUDGET: usize = 2_000;

/// Longest prefix of `text` with at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn navigation_system() -> &'static str {
    "You are analyzing a careers website to find internship job listings.\n\n\
     If you see actual job postings (at least 3 concrete internship listings with titles and apply buttons/links), return \"STAY\".\n\
     If only general information, look for links such as: \"View all internships\", \"Search internship opportunities\", \
     \"Apply for internships\", \"Browse positions\", \"Job search\", \"Opportunities\".\n\
     If this page has no relevant content at all and returning to the previous page is better, return \"BACK\".\n\n\
     Return: \"STAY\", \"BACK\", a number (1-N) for the link to click, or \"0\" if no link is relevant."
}

pub fn navigation(url: &str, visible_text: &str, links: &[Link], rejected: &[Rejection]) -> String {
    let links_text = links
        .iter()
        .enumerate()
        .map(|(i, link)| format!("{}. \"{}\" -> {}", i + 1, link.text, link.url))
        .collect::<Vec<_>>()
        .join("\n");

    let rejected_text = if rejected.is_empty() {
        String::new()
    } else {
        let lines = rejected
            .iter()
            .map(|r| format!("- {} ({})", r.url, r.reason))
            .collect::<Vec<_>>()
            .join("\n");
        format!("\nPAGES ALREADY REJECTED (do not choose these again):\n{lines}\n")
    };

    format!(
        "Analyze this careers page: {url}\n\n\
         PAGE CONTENT:\n{}\n\n\
         AVAILABLE LINKS TO CLICK:\n{links_text}\n{rejected_text}\n\
         Does this page show specific internship job listings, or do I need to click a link to find them?\n\n\
         Response (ONLY return 'STAY', 'BACK', a number 1-{}, or '0'):",
        truncate_chars(visible_text, NAVIGATION_TEXT_BUDGET),
        links.len(),
    )
}

pub fn rejection_reason(url: &str, visible_text: &str) -> String {
    format!(
        "Why is this page not useful for finding internship job listings?\n\n\
         URL: {url}\n\nPAGE CONTENT:\n{}\n\n\
         Answer in one short sentence.",
        truncate_chars(visible_text, REJECTION_TEXT_BUDGET),
    )
}

pub fn search_need(url: &str, visible_text: &str, markup: &str) -> String {
    format!(
        "Analyze this job board page to determine if search interaction is needed.\n\n\
         URL: {url}\n\n\
         PAGE CONTENT:\n{}\n\n\
         HTML STRUCTURE:\n{}\n\n\
         TASK: Determine if this page shows actual job listings OR needs search interaction.\n\n\
         Return needs_search: false if you see actual job postings with titles and apply buttons.\n\
         Return needs_search: true if you only see search forms, filters, or program descriptions.\n\n\
         If needs_search is true, identify the search elements by examining the HTML:\n\
         - search_input_selector: the input field (type=\"text\", type=\"search\", or search-related name/id). \
           Use an empty string when a filter button alone reveals the listings.\n\
         - search_query: the text to type, e.g. \"intern\". Empty when there is no input.\n\
         - search_submit_selector: the button or link that triggers the search. \
           Empty string means press Enter in the input.\n\n\
         Return the EXACT selectors from the HTML, not generic examples. Return ONLY a JSON object:\n\
         {{\"needs_search\": true/false, \"search_query\": \"...\", \"search_input_selector\": \"...\", \
         \"search_submit_selector\": \"...\", \"reasoning\": \"...\"}}",
        truncate_chars(visible_text, SEARCH_TEXT_BUDGET),
        truncate_chars(markup, SEARCH_MARKUP_BUDGET),
    )
}

pub fn search_verification(url: &str, visible_text: &str) -> String {
    format!(
        "Did this search successfully load job listings?\n\n\
         URL: {url}\n\nPAGE CONTENT:\n{}\n\n\
         Return ONLY \"YES\" if you see actual job listings with titles, locations, or apply buttons.\n\
         Return ONLY \"NO\" if you see search forms, filters, or general program descriptions without specific job postings.",
        truncate_chars(visible_text, VERIFY_TEXT_BUDGET),
    )
}

const SELECTOR_RULES: &str = "Selector rules:\n\
     - title/url/description/location selectors are relative to the job container.\n\
     - url_selector may be an empty string when the container itself carries the href.\n\
     - Use empty strings for fields that are not present on the page.\n\
     - Use only CSS2/CSS3 selector syntax. Do NOT use :has(), :contains(), :text() or other non-standard pseudo-selectors.\n\
     - Use actual selectors from the HTML structure, never placeholder names.";

pub fn inference_system() -> String {
    format!(
        "You are an expert web scraper analyzer. Analyze internship job board pages and identify the best way \
         to scrape job listings. Use the HTML structure to identify specific CSS selectors for job listings.\n\n\
         {SELECTOR_RULES}"
    )
}

pub fn inference_first(url: &str, markup: &str) -> String {
    format!(
        "Analyze this internship job board page:\n\n\
         URL: {url}\n\n\
         HTML STRUCTURE:\n{}\n\n\
         Identify specific CSS selectors for scraping internship job listings. Look for repeating HTML patterns \
         that contain job titles, locations, and apply links.",
        truncate_chars(markup, INFERENCE_MARKUP_BUDGET),
    )
}

pub fn inference_retry(url: &str, markup: &str, feedback: &ValidationFeedback) -> String {
    let previous = serde_json::to_string_pretty(&feedback.previous_schema).unwrap_or_default();
    format!(
        "RETRY ANALYSIS - attempt {} failed validation.\n\n\
         URL: {url}\n\n\
         PREVIOUS SELECTORS THAT FAILED:\n{previous}\n\n\
         ISSUES FOUND:\n{}\n\n\
         SUGGESTIONS:\n{}\n\n\
         HTML STRUCTURE:\n{}\n\n\
         Learn from the issues above and provide BETTER CSS selectors that will actually work. \
         Be more specific than, and different from, the selectors that failed.",
        feedback.attempt_number,
        bullet_list(&feedback.issues),
        bullet_list(&feedback.suggestions),
        truncate_chars(markup, INFERENCE_MARKUP_BUDGET),
    )
}

pub fn evaluation_system() -> &'static str {
    "You are evaluating a job scraper configuration. Analyze the test results and determine if the config is good \
     or needs improvement. You are given the first 3 jobs extracted as a sample.\n\n\
     CRITICAL REQUIREMENTS (must work for success):\n\
     - The job container selector finds job elements.\n\
     - The title selector extracts job titles.\n\
     - The url selector extracts valid job links.\n\
     - At least one job was extracted with both a title and a URL.\n\n\
     OPTIONAL ELEMENTS (empty or missing is acceptable):\n\
     - Description, location and requirements selectors: listing pages often lack them.\n\
     - Pagination selector: only needed when the site has multiple pages.\n\n\
     Only flag a selector as broken if it was expected to work and demonstrably returned nothing. \
     Never penalize empty optional selectors. Only recommend retry if critical selectors are broken \
     or no jobs were extracted."
}

pub fn evaluation(
    url: &str, selectors: &SelectorSet, selector_tests: &str, jobs_total: usize, job_sample: &str, pagination_test: &str,
    markup: &str,
) -> String {
    let schema = serde_json::to_string_pretty(selectors).unwrap_or_default();
    format!(
        "Evaluate this job scraper configuration:\n\n\
         URL: {url}\n\n\
         PROPOSED SELECTORS:\n{schema}\n\n\
         SELECTOR TEST RESULTS:\n{selector_tests}\n\n\
         JOBS EXTRACTED ({jobs_total} total):\n{job_sample}\n\n\
         PAGINATION TEST (if applicable):\n{pagination_test}\n\n\
         HTML STRUCTURE (for reference):\n{}\n\n\
         Evaluate the configuration quality and recommend whether a retry is needed.",
        truncate_chars(markup, EVALUATION_MARKUP_BUDGET),
    )
}

pub fn discovery_system(company: &str) -> String {
    format!(
        "You are an expert at identifying the best job board URLs for internship listings.\n\n\
         Select the BEST URL that will lead to {company}'s internship job listings. Prioritize URLs that:\n\
         1. Are from {company}'s official website (not third-party job sites)\n\
         2. Specifically mention internships, interns, students, or graduates\n\
         3. Lead directly to job listings (not general information pages)\n\
         4. Are likely to contain multiple internship postings\n\n\
         Avoid LinkedIn, Indeed, Glassdoor, Monster, ZipRecruiter and other third-party sites, \
         general company information pages, blog posts, news articles and social media."
    )
}

pub fn discovery(company: &str, results: &[SearchResult], rejected: &[Rejection]) -> String {
    let results_text = results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. URL: {}\n   Title: {}\n   Description: {}", i + 1, r.url, r.title, r.snippet))
        .collect::<Vec<_>>()
        .join("\n\n");

    let rejected_text = if rejected.is_empty() {
        String::new()
    } else {
        let lines = rejected
            .iter()
            .map(|r| format!("- {}: {}", r.url, r.reason))
            .collect::<Vec<_>>()
            .join("\n");
        format!("\nThese pages were already visited and rejected:\n{lines}\n")
    };

    format!(
        "Select the best URL for finding {company} internship job listings:\n\n{results_text}\n{rejected_text}\n\
         Return only the number of the best result (1-{}) or \"0\" if none are suitable.",
        results.len(),
    )
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "- (none reported)".into();
    }
    items.iter().map(|item| format!("- {item}")).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_navigation_prompt_enumerates_links_and_rejections() {
        let links = vec![
            Link { text: "Students".into(), url: "https://acme.test/students".into() },
            Link { text: "Jobs".into(), url: "https://acme.test/jobs".into() },
        ];
        let rejected = vec![Rejection { url: "https://acme.test/blog".into(), reason: "a blog".into() }];
        let prompt = navigation("https://acme.test", "Welcome", &links, &rejected);
        assert!(prompt.contains("1. \"Students\" -> https://acme.test/students"));
        assert!(prompt.contains("2. \"Jobs\" -> https://acme.test/jobs"));
        assert!(prompt.contains("https://acme.test/blog (a blog)"));
        assert!(prompt.contains("a number 1-2"));
    }

    #[test]
    fn test_retry_prompt_carries_feedback() {
        let feedback = ValidationFeedback {
            previous_schema: SelectorSet { job_container_selector: ".card".into(), ..Default::default() },
            issues: vec!["container matched 0 elements".into()],
            suggestions: vec!["try li.job".into()],
            attempt_number: 1,
        };
        let prompt = inference_retry("https://acme.test", "<ul></ul>", &feedback);
        assert!(prompt.starts_with("RETRY ANALYSIS"));
        assert!(prompt.contains(".card"));
        assert!(prompt.contains("- container matched 0 elements"));
        assert!(prompt.contains("- try li.job"));
    }

    #[test]
    fn test_markup_budget_applied() {
        let markup = "x".repeat(INFERENCE_MARKUP_BUDGET + 10);
        let prompt = inference_first("https://acme.test", &markup);
        assert!(prompt.len() < markup.len() + 500);
        assert!(!prompt.contains(&"x".repeat(INFERENCE_MARKUP_BUDGET + 1)));
    }
}
