// src/form.rs
use scraper::{Html, Selector};

/// Name/value pairs scraped from every `<input>` on a page, in document order.
///
/// Whatever the page carries is echoed back untouched; only fields set through
/// [`HiddenFormState::set`] differ from what was scraped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiddenFormState {
    fields: Vec<(String, String)>,
}

impl HiddenFormState {
    pub fn scrape(html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut state = Self::default();
        let Ok(selector) = Selector::parse("input[name]") else {
            return state;
        };
        for input in document.select(&selector) {
            let el = input.value();
            let Some(name) = el.attr("name").filter(|n| !n.is_empty()) else {
                continue;
            };
            state.set(name, el.attr("value").unwrap_or_default());
        }
        state
    }

    /// Overwrites in place when the field exists, appends otherwise.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.fields.push((name.to_string(), value.to_string())),
        }
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.fields
    }
}
