// Form extraction and passive vulnerability indicators

use crate::result::{BountyPotential, FormField, FormMethod, FormRecord, VulnerabilityIndicator};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

/// Hidden input names containing any of these are treated as CSRF tokens.
pub const CSRF_TOKEN_NAMES: &[&str] = &[
    "csrf",
    "token",
    "xsrf",
    "_token",
    "authenticity_token",
    "anti_csrf",
];

const HIGH_PRIORITY: &[VulnerabilityIndicator] = &[
    VulnerabilityIndicator::MissingCsrf,
    VulnerabilityIndicator::HttpAction,
    VulnerabilityIndicator::PredictableId,
];

const MEDIUM_PRIORITY: &[VulnerabilityIndicator] = &[
    VulnerabilityIndicator::StateChangingGet,
    VulnerabilityIndicator::PasswordAutocomplete,
];

static FORM_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form").expect("valid selector"));
static FIELD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input, textarea, select").expect("valid selector"));
static INPUT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input").expect("valid selector"));

/// Extracts every `<form>` in `html`, resolving actions against `page_url`.
pub fn extract(html: &str, page_url: &str) -> Vec<FormRecord> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    document
        .select(&FORM_SELECTOR)
        .map(|form| extract_form(form, page_url, base.as_ref()))
        .collect()
}

fn extract_form(form: ElementRef<'_>, page_url: &str, base: Option<&Url>) -> FormRecord {
    let method = FormMethod::from_attr(form.value().attr("method"));
    let action = form.value().attr("action").unwrap_or("").trim();

    let action_url = base
        .and_then(|b| b.join(action).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| page_url.to_string());

    let fields = form
        .select(&FIELD_SELECTOR)
        .filter_map(|el| {
            let name = el.value().attr("name").unwrap_or("");
            if name.is_empty() {
                return None;
            }
            let field_type = match el.value().name() {
                "input" => el.value().attr("type").unwrap_or("text").to_ascii_lowercase(),
                other => other.to_string(),
            };
            Some(FormField {
                name: name.to_string(),
                field_type,
                required: el.value().attr("required").is_some(),
            })
        })
        .collect();

    let inputs: Vec<ElementRef<'_>> = form.select(&INPUT_SELECTOR).collect();
    let has_csrf_token = detect_csrf_token(&inputs);
    let vulnerability_indicators =
        detect_indicators(&inputs, method, &action_url, has_csrf_token);

    FormRecord {
        page_url: page_url.to_string(),
        action_url,
        method,
        fields,
        has_csrf_token,
        vulnerability_indicators,
    }
}

fn input_type(input: &ElementRef<'_>) -> String {
    input
        .value()
        .attr("type")
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

fn lower_name(input: &ElementRef<'_>) -> String {
    input.value().attr("name").unwrap_or("").to_lowercase()
}

fn detect_csrf_token(inputs: &[ElementRef<'_>]) -> bool {
    inputs
        .iter()
        .filter(|i| input_type(i) == "hidden")
        .any(|i| {
            let name = lower_name(i);
            CSRF_TOKEN_NAMES.iter().any(|pattern| name.contains(pattern))
        })
}

fn detect_indicators(
    inputs: &[ElementRef<'_>],
    method: FormMethod,
    action_url: &str,
    has_csrf_token: bool,
) -> Vec<VulnerabilityIndicator> {
    let mut indicators = Vec::new();

    if method == FormMethod::Post && !has_csrf_token {
        indicators.push(VulnerabilityIndicator::MissingCsrf);
    }

    if action_url.starts_with("http://") {
        indicators.push(VulnerabilityIndicator::HttpAction);
    }

    if method == FormMethod::Get
        && inputs.iter().any(|i| {
            let name = lower_name(i);
            input_type(i) == "password"
                || name.contains("password")
                || name.contains("secret")
                || name.contains("token")
        })
    {
        indicators.push(VulnerabilityIndicator::StateChangingGet);
    }

    let autocompletes_password = inputs
        .iter()
        .filter(|i| input_type(i) == "password")
        .any(|i| {
            let autocomplete = i
                .value()
                .attr("autocomplete")
                .map(|a| a.trim().to_ascii_lowercase());
            !matches!(autocomplete.as_deref(), Some("off") | Some("new-password"))
        });
    if autocompletes_password {
        indicators.push(VulnerabilityIndicator::PasswordAutocomplete);
    }

    // "userid" contains "id", so one check covers both names
    let predictable_id = inputs
        .iter()
        .filter(|i| input_type(i) == "hidden")
        .any(|i| {
            let value = i.value().attr("value").unwrap_or("");
            lower_name(i).contains("id")
                && !value.is_empty()
                && value.chars().all(|c| c.is_ascii_digit())
        });
    if predictable_id {
        indicators.push(VulnerabilityIndicator::PredictableId);
    }

    indicators
}

/// High beats medium beats low; the tiers are checked in that order.
pub fn estimate_bounty_potential(indicators: &[VulnerabilityIndicator]) -> BountyPotential {
    if indicators.iter().any(|i| HIGH_PRIORITY.contains(i)) {
        return BountyPotential::High;
    }
    if indicators.iter().any(|i| MEDIUM_PRIORITY.contains(i)) {
        return BountyPotential::Medium;
    }
    BountyPotential::Low
}

#[cfg(test)]
mod tests {
    use super::*;
    use VulnerabilityIndicator::*;

    const PAGE: &str = "https://example.com/account/settings";

    fn single(html: &str) -> FormRecord {
        let mut forms = extract(html, PAGE);
        assert_eq!(forms.len(), 1, "expected exactly one form");
        forms.remove(0)
    }

    #[test]
    fn test_extract_no_forms() {
        assert!(extract("<html><body><p>nothing</p></body></html>", PAGE).is_empty());
    }

    #[test]
    fn test_extract_fields_and_method() {
        let form = single(
            r#"<form action="/update" method="post">
                <input type="hidden" name="csrf_token" value="abc">
                <input name="nickname" required>
                <input type="email" name="email">
                <textarea name="bio"></textarea>
                <select name="country"><option>NZ</option></select>
                <input type="submit" value="Save">
            </form>"#,
        );

        assert_eq!(form.method, FormMethod::Post);
        assert_eq!(form.page_url, PAGE);
        assert_eq!(form.action_url, "https://example.com/update");
        assert!(form.has_csrf_token);

        let names: Vec<&str> = form.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["csrf_token", "nickname", "email", "bio", "country"]);
        assert_eq!(form.fields[1].field_type, "text");
        assert!(form.fields[1].required);
        assert!(!form.fields[2].required);
        assert_eq!(form.fields[3].field_type, "textarea");
        assert!(form.vulnerability_indicators.is_empty());
    }

    #[test]
    fn test_missing_action_resolves_to_page() {
        let form = single(r#"<form><input name="q"></form>"#);
        assert_eq!(form.action_url, PAGE);
        assert_eq!(form.method, FormMethod::Get);
    }

    #[test]
    fn test_relative_action_and_bad_page_url() {
        let forms = extract(r#"<form action="login"></form>"#, "not a url");
        assert_eq!(forms[0].action_url, "not a url");
    }

    #[test]
    fn test_post_without_csrf_is_high() {
        let form = single(
            r#"<form method="POST" action="/transfer">
                <input type="hidden" name="account" value="abc">
                <input name="amount">
            </form>"#,
        );
        assert!(!form.has_csrf_token);
        assert_eq!(form.vulnerability_indicators, vec![MissingCsrf]);
        assert_eq!(
            estimate_bounty_potential(&form.vulnerability_indicators),
            BountyPotential::High
        );
    }

    #[test]
    fn test_csrf_name_is_case_insensitive() {
        let form = single(
            r#"<form method="post"><input type="hidden" name="AUTHENTICITY_TOKEN" value="x"></form>"#,
        );
        assert!(form.has_csrf_token);
        assert!(!form.vulnerability_indicators.contains(&MissingCsrf));
    }

    #[test]
    fn test_visible_token_field_is_not_csrf() {
        let form = single(r#"<form method="post"><input type="text" name="csrf"></form>"#);
        assert!(!form.has_csrf_token);
    }

    #[test]
    fn test_http_action() {
        let form = single(
            r#"<form action="http://insecure.example.com/submit"><input name="q"></form>"#,
        );
        assert_eq!(form.vulnerability_indicators, vec![HttpAction]);
    }

    #[test]
    fn test_state_changing_get_and_autocomplete() {
        let form = single(
            r#"<form method="get" action="/login">
                <input name="user">
                <input type="password" name="pass">
            </form>"#,
        );
        assert_eq!(
            form.vulnerability_indicators,
            vec![StateChangingGet, PasswordAutocomplete]
        );
        assert_eq!(
            estimate_bounty_potential(&form.vulnerability_indicators),
            BountyPotential::Medium
        );
    }

    #[test]
    fn test_get_with_secret_name() {
        let form = single(r#"<form><input name="api_secret"></form>"#);
        assert_eq!(form.vulnerability_indicators, vec![StateChangingGet]);
    }

    #[test]
    fn test_password_autocomplete_off_is_fine() {
        let form = single(
            r#"<form method="post">
                <input type="hidden" name="_token" value="t">
                <input type="password" name="pw" autocomplete="off">
                <input type="password" name="pw2" autocomplete="new-password">
            </form>"#,
        );
        assert!(form.vulnerability_indicators.is_empty());
        assert_eq!(
            estimate_bounty_potential(&form.vulnerability_indicators),
            BountyPotential::Low
        );
    }

    #[test]
    fn test_predictable_id() {
        let form = single(
            r#"<form method="post">
                <input type="hidden" name="xsrf" value="t">
                <input type="hidden" name="userId" value="1042">
            </form>"#,
        );
        assert_eq!(form.vulnerability_indicators, vec![PredictableId]);
    }

    #[test]
    fn test_non_numeric_id_is_not_predictable() {
        let form = single(
            r#"<form method="post">
                <input type="hidden" name="xsrf" value="t">
                <input type="hidden" name="session_id" value="a9f3">
                <input type="hidden" name="order_id" value="">
            </form>"#,
        );
        assert!(form.vulnerability_indicators.is_empty());
    }

    #[test]
    fn test_multiple_forms() {
        let forms = extract(
            r#"<form id="a" method="post"></form><form id="b"><input name="q"></form>"#,
            PAGE,
        );
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[0].method, FormMethod::Post);
        assert_eq!(forms[1].method, FormMethod::Get);
    }

    #[test]
    fn test_estimate_priority_order() {
        assert_eq!(
            estimate_bounty_potential(&[PasswordAutocomplete, PredictableId]),
            BountyPotential::High
        );
        assert_eq!(
            estimate_bounty_potential(&[StateChangingGet]),
            BountyPotential::Medium
        );
        assert_eq!(estimate_bounty_potential(&[]), BountyPotential::Low);
    }
}
