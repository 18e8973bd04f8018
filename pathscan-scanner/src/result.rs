use serde::{Deserialize, Serialize};

/// Where a URL was first discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlSource {
    Sitemap,
    Robots,
    Crawl,
    Initial,
}

impl UrlSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlSource::Sitemap => "sitemap",
            UrlSource::Robots => "robots",
            UrlSource::Crawl => "crawl",
            UrlSource::Initial => "initial",
        }
    }
}

/// Coarse priority for security follow-up. Variant order is significant:
/// `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BountyPotential {
    Low,
    Medium,
    High,
}

impl BountyPotential {
    pub fn as_str(&self) -> &'static str {
        match self {
            BountyPotential::High => "high",
            BountyPotential::Medium => "medium",
            BountyPotential::Low => "low",
        }
    }

    /// Raises `self` to `other` if `other` is higher. Never downgrades.
    pub fn raise_to(&mut self, other: BountyPotential) {
        if other > *self {
            *self = other;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRecord {
    pub url: String,
    pub source: UrlSource,
    pub depth: usize,
    pub has_forms: bool,
    pub form_count: usize,
    pub bounty_potential: BountyPotential,
}

impl UrlRecord {
    /// New records start at `Medium` until form extraction says otherwise.
    pub fn new(url: String, source: UrlSource, depth: usize) -> Self {
        Self {
            url,
            source,
            depth,
            has_forms: false,
            form_count: 0,
            bounty_potential: BountyPotential::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FormMethod {
    Get,
    Post,
}

impl FormMethod {
    /// Anything other than `post` falls back to GET, as browsers do.
    pub fn from_attr(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(ref v) if v == "post" => FormMethod::Post,
            _ => FormMethod::Get,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormMethod::Get => "GET",
            FormMethod::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VulnerabilityIndicator {
    MissingCsrf,
    HttpAction,
    StateChangingGet,
    PasswordAutocomplete,
    PredictableId,
}

impl VulnerabilityIndicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            VulnerabilityIndicator::MissingCsrf => "missing-csrf",
            VulnerabilityIndicator::HttpAction => "http-action",
            VulnerabilityIndicator::StateChangingGet => "state-changing-get",
            VulnerabilityIndicator::PasswordAutocomplete => "password-autocomplete",
            VulnerabilityIndicator::PredictableId => "predictable-id",
        }
    }
}

impl std::fmt::Display for VulnerabilityIndicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRecord {
    pub page_url: String,
    pub action_url: String,
    pub method: FormMethod,
    pub fields: Vec<FormField>,
    pub has_csrf_token: bool,
    pub vulnerability_indicators: Vec<VulnerabilityIndicator>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_to_never_downgrades() {
        let mut potential = BountyPotential::Medium;
        potential.raise_to(BountyPotential::Low);
        assert_eq!(potential, BountyPotential::Medium);
        potential.raise_to(BountyPotential::High);
        assert_eq!(potential, BountyPotential::High);
    }

    #[test]
    fn test_form_method_from_attr() {
        assert_eq!(FormMethod::from_attr(Some("POST")), FormMethod::Post);
        assert_eq!(FormMethod::from_attr(Some(" post ")), FormMethod::Post);
        assert_eq!(FormMethod::from_attr(Some("put")), FormMethod::Get);
        assert_eq!(FormMethod::from_attr(None), FormMethod::Get);
    }

    #[test]
    fn test_url_record_serializes_camel_case() {
        let record = UrlRecord::new("https://example.com/".to_string(), UrlSource::Sitemap, 0);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["source"], "sitemap");
        assert_eq!(value["hasForms"], false);
        assert_eq!(value["formCount"], 0);
        assert_eq!(value["bountyPotential"], "medium");
    }

    #[test]
    fn test_form_record_serialization() {
        let form = FormRecord {
            page_url: "https://example.com/".to_string(),
            action_url: "https://example.com/login".to_string(),
            method: FormMethod::Post,
            fields: vec![FormField {
                name: "user".to_string(),
                field_type: "text".to_string(),
                required: true,
            }],
            has_csrf_token: false,
            vulnerability_indicators: vec![VulnerabilityIndicator::MissingCsrf],
        };
        let value = serde_json::to_value(&form).unwrap();
        assert_eq!(value["method"], "POST");
        assert_eq!(value["fields"][0]["type"], "text");
        assert_eq!(value["hasCsrfToken"], false);
        assert_eq!(value["vulnerabilityIndicators"][0], "missing-csrf");
    }
}
