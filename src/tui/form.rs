use crate::slug::source_slug;
use crate::store::types::NewSource;

pub const FIELD_COUNT: usize = 6;

const NAME: usize = 0;
const SLUG: usize = 1;
const RSS: usize = 2;
const ENDPOINT: usize = 3;
const USER: usize = 4;
const PASSWORD: usize = 5;

pub const LABELS: [&str; FIELD_COUNT] = [
    "Source Name (e.g. Warszawa News)",
    "City Slug (e.g. warszawa)",
    "RSS Feed URL",
    "WordPress API Endpoint",
    "WP Username",
    "WP App Password",
];

/// "Configure New City" form state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceForm {
    pub values: [String; FIELD_COUNT],
    pub focus: usize,
    pub error: Option<String>,
}

impl SourceForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % FIELD_COUNT;
    }

    pub fn focus_prev(&mut self) {
        self.focus = (self.focus + FIELD_COUNT - 1) % FIELD_COUNT;
    }

    pub fn on_last_field(&self) -> bool {
        self.focus == FIELD_COUNT - 1
    }

    pub fn push_char(&mut self, c: char) {
        self.values[self.focus].push(c);
        self.error = None;
    }

    pub fn backspace(&mut self) {
        self.values[self.focus].pop();
    }

    pub fn is_secret(field: usize) -> bool {
        field == PASSWORD
    }

    /// Text shown for a field; the password is masked.
    pub fn display_value(&self, field: usize) -> String {
        if Self::is_secret(field) {
            "*".repeat(self.values[field].chars().count())
        } else {
            self.values[field].clone()
        }
    }

    /// Slug that will be stored if the form is submitted now.
    pub fn slug_preview(&self) -> Option<String> {
        let name = self.values[NAME].trim();
        if name.is_empty() && self.values[SLUG].trim().is_empty() {
            return None;
        }
        Some(source_slug(name, &self.values[SLUG]))
    }

    pub fn validate(&self) -> Result<NewSource, String> {
        let name = self.values[NAME].trim();
        let rss = self.values[RSS].trim();
        let endpoint = self.values[ENDPOINT].trim();
        if name.is_empty() || rss.is_empty() || endpoint.is_empty() {
            return Err("Please fill required fields.".to_string());
        }
        for (label, url) in [(LABELS[RSS], rss), (LABELS[ENDPOINT], endpoint)] {
            if !is_http_url(url) {
                return Err(format!("{} must start with http:// or https://", label));
            }
        }
        Ok(NewSource {
            name: name.to_string(),
            city_slug: source_slug(name, &self.values[SLUG]),
            rss_url: rss.to_string(),
            wp_api_endpoint: endpoint.to_string(),
            wp_username: self.values[USER].trim().to_string(),
            wp_app_password: self.values[PASSWORD].trim().to_string(),
        })
    }
}

fn is_http_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    ["http://", "https://"]
        .iter()
        .any(|scheme| lower.starts_with(scheme) && lower.len() > scheme.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> SourceForm {
        let mut form = SourceForm::new();
        form.values = [
            "Łódź Express".into(),
            String::new(),
            "https://lodz.example/feed".into(),
            "https://wp.lodz.example/wp-json/wp/v2".into(),
            "editor".into(),
            "abcd efgh ijkl".into(),
        ];
        form
    }

    #[test]
    fn test_valid_form_generates_slug() {
        let source = filled().validate().unwrap();
        assert_eq!(source.city_slug, "lodz-express");
        assert_eq!(source.wp_app_password, "abcd efgh ijkl");
    }

    #[test]
    fn test_explicit_slug_is_normalised() {
        let mut form = filled();
        form.values[SLUG] = "Łódź".into();
        assert_eq!(form.validate().unwrap().city_slug, "lodz");
    }

    #[test]
    fn test_required_fields() {
        let mut form = filled();
        form.values[ENDPOINT] = "   ".into();
        assert_eq!(form.validate().unwrap_err(), "Please fill required fields.");
        // username/password are optional
        let mut form = filled();
        form.values[USER].clear();
        form.values[PASSWORD].clear();
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_urls_must_be_http() {
        let mut form = filled();
        form.values[RSS] = "ftp://lodz.example/feed".into();
        assert!(form.validate().unwrap_err().starts_with("RSS Feed URL"));
        form.values[RSS] = "https://".into();
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_focus_wraps_and_password_masked() {
        let mut form = SourceForm::new();
        form.focus_prev();
        assert!(form.on_last_field());
        form.push_char('s');
        form.push_char('3');
        assert_eq!(form.display_value(PASSWORD), "**");
        form.focus_next();
        assert_eq!(form.focus, NAME);
        assert_eq!(form.slug_preview(), None);
        form.push_char('K');
        assert_eq!(form.slug_preview().as_deref(), Some("k"));
    }
}
