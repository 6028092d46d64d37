/// Closed-list multi-select over string options.
///
/// Selection order is insertion order. Options are expected to be unique;
/// nothing here deduplicates the option list itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiSelect {
    options: Vec<String>,
    selected: Vec<String>,
}

impl MultiSelect {
    pub fn new(options: Vec<String>) -> Self {
        MultiSelect {
            options,
            selected: Vec::new(),
        }
    }

    pub fn with_selected(options: Vec<String>, selected: Vec<String>) -> Self {
        let mut select = MultiSelect::new(options);
        for item in selected {
            if !select.is_selected(&item) {
                select.toggle(&item);
            }
        }
        select
    }

    pub fn is_selected(&self, option: &str) -> bool {
        self.selected.iter().any(|s| s == option)
    }

    /// Adds `option` if absent, removes it if present. Unknown options are ignored.
    pub fn toggle(&mut self, option: &str) -> bool {
        if !self.options.iter().any(|o| o == option) {
            return false;
        }
        if self.is_selected(option) {
            self.selected.retain(|s| s != option);
        } else {
            self.selected.push(option.to_string());
        }
        true
    }

    /// Case-insensitive substring match over the option list
    pub fn filter(&self, text: &str) -> Vec<&str> {
        let needle = text.trim().to_lowercase();
        self.options
            .iter()
            .filter(|o| needle.is_empty() || o.to_lowercase().contains(&needle))
            .map(|o| o.as_str())
            .collect()
    }

    /// Selected items, in the order they were chosen
    pub fn badges(&self) -> &[String] {
        &self.selected
    }

    pub fn into_selected(self) -> Vec<String> {
        self.selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<String> {
        vec!["vegan".into(), "dessert".into(), "Vegetarian".into(), "quick".into()]
    }

    #[test]
    fn test_toggle_twice_restores_selection() {
        let mut select = MultiSelect::with_selected(options(), vec!["quick".into()]);
        let before = select.badges().to_vec();

        select.toggle("dessert");
        assert_eq!(select.badges(), &["quick".to_string(), "dessert".to_string()]);
        select.toggle("dessert");

        assert_eq!(select.badges(), before.as_slice());
    }

    #[test]
    fn test_toggle_unknown_option_is_ignored() {
        let mut select = MultiSelect::new(options());
        assert!(!select.toggle("keto"));
        assert!(select.badges().is_empty());
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let select = MultiSelect::new(options());
        assert_eq!(select.filter("veg"), vec!["vegan", "Vegetarian"]);
        assert_eq!(select.filter("").len(), 4);
        assert!(select.filter("xyz").is_empty());
    }

    #[test]
    fn test_with_selected_drops_duplicates_and_unknowns() {
        let select = MultiSelect::with_selected(
            options(),
            vec!["vegan".into(), "vegan".into(), "keto".into()],
        );
        assert_eq!(select.into_selected(), vec!["vegan".to_string()]);
    }
}
