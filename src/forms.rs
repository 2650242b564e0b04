//! Validation errors and the maud components shared by every form.

use maud::{Markup, html};
use serde::{Deserialize, Serialize};

use crate::html::{
    FORM_ERROR_STYLE, FORM_HELP_TEXT_STYLE, FORM_LABEL_STYLE, FORM_RADIO_GROUP_STYLE,
    FORM_RADIO_INPUT_STYLE, FORM_RADIO_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
};

/// The message shown when a required field is left empty.
pub const REQUIRED_MESSAGE: &str = "This field is required.";

/// The message shown when a choice field has a value that is not one of its choices.
pub const INVALID_CHOICE_MESSAGE: &str = "Select a valid choice.";

/// The validation errors of a form, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: Vec<(&'static str, String)>,
    non_field: Vec<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` against `field`.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.push((field, message.into()));
    }

    /// Record an error that does not belong to one field.
    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.iter().any(|(name, _)| *name == field)
    }

    /// The messages recorded against `field`.
    pub fn get(&self, field: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(name, _)| *name == field)
            .map(|(_, message)| message.as_str())
            .collect()
    }

    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    /// `Ok(value)` if no errors were recorded, otherwise the errors.
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

/// Trim `value` and record [REQUIRED_MESSAGE] against `field` if nothing is left.
pub fn require(value: &str, field: &'static str, errors: &mut FormErrors) -> String {
    let value = value.trim().to_owned();

    if value.is_empty() {
        errors.add(field, REQUIRED_MESSAGE);
    }

    value
}

/// Replace every run of whitespace in `value` with a single space.
pub fn collapse_whitespace(value: &str) -> String {
    let mut collapsed = String::with_capacity(value.len());
    let mut in_whitespace = false;

    for c in value.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                collapsed.push(' ');
            }
            in_whitespace = true;
        } else {
            collapsed.push(c);
            in_whitespace = false;
        }
    }

    collapsed
}

/// The label of the choice with `value`.
pub fn choice_label(choices: &[(&'static str, &'static str)], value: &str) -> Option<&'static str> {
    choices
        .iter()
        .find(|(choice, _)| *choice == value)
        .map(|(_, label)| *label)
}

/// A yes/no question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationForm {
    pub confirmation: String,
}

impl ConfirmationForm {
    pub const CHOICES: [(&'static str, &'static str); 2] = [("yes", "Yes"), ("no", "No")];
    pub const REQUIRED_MESSAGE: &'static str = "Please select ‘yes’ or ‘no’";

    /// Whether "yes" was selected.
    ///
    /// # Errors
    /// Returns an error on `confirmation` if neither option was selected.
    pub fn clean(&self) -> Result<bool, FormErrors> {
        match self.confirmation.as_str() {
            "yes" => Ok(true),
            "no" => Ok(false),
            _ => {
                let mut errors = FormErrors::new();
                errors.add("confirmation", Self::REQUIRED_MESSAGE);
                Err(errors)
            }
        }
    }
}

/// The messages for one field, nothing if there are none.
pub fn field_errors(name: &str, errors: &FormErrors) -> Markup {
    let messages = errors.get(name);

    html! {
        @if !messages.is_empty() {
            p id={ (name) "-error" } class=(FORM_ERROR_STYLE) role="alert" {
                (messages.join(" "))
            }
        }
    }
}

/// Errors that are not about a single field, shown at the top of a form.
pub fn non_field_errors(errors: &FormErrors) -> Markup {
    html! {
        @if !errors.non_field().is_empty() {
            div id="form-error" class="p-3 rounded border border-red-300 bg-red-50 dark:bg-gray-800" role="alert" {
                @for message in errors.non_field() {
                    p class=(FORM_ERROR_STYLE) { (message) }
                }
            }
        }
    }
}

/// Describes a single line text input.
#[derive(Debug, Clone, Copy)]
pub struct TextField<'a> {
    pub name: &'a str,
    pub label: &'a str,
    pub value: &'a str,
    pub input_type: &'a str,
    pub help_text: Option<&'a str>,
    pub max_length: Option<usize>,
    pub required: bool,
}

impl<'a> TextField<'a> {
    pub fn new(name: &'a str, label: &'a str, value: &'a str) -> Self {
        Self {
            name,
            label,
            value,
            input_type: "text",
            help_text: None,
            max_length: None,
            required: false,
        }
    }

    pub fn help(mut self, help_text: &'a str) -> Self {
        self.help_text = Some(help_text);
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn input_type(mut self, input_type: &'a str) -> Self {
        self.input_type = input_type;
        self
    }

    pub fn render(&self, errors: &FormErrors) -> Markup {
        html! {
            div
            {
                label for=(self.name) class=(FORM_LABEL_STYLE) { (self.label) }

                @if let Some(help_text) = self.help_text {
                    p class=(FORM_HELP_TEXT_STYLE) { (help_text) }
                }

                input
                    type=(self.input_type)
                    name=(self.name)
                    id=(self.name)
                    value=(self.value)
                    maxlength=[self.max_length]
                    required[self.required]
                    aria-invalid=[errors.has(self.name).then_some("true")]
                    class=(FORM_TEXT_INPUT_STYLE);

                (field_errors(self.name, errors))
            }
        }
    }
}

/// A group of radio buttons, one per choice, with `selected` checked.
pub fn radio_group(
    name: &str,
    legend: &str,
    choices: &[(&str, &str)],
    selected: &str,
    errors: &FormErrors,
) -> Markup {
    html! {
        fieldset
        {
            legend class=(FORM_LABEL_STYLE) { (legend) }

            div class=(FORM_RADIO_GROUP_STYLE)
            {
                @for (value, label) in choices {
                    @let id = format!("{name}-{value}");
                    div class="flex items-center gap-x-3"
                    {
                        input
                            type="radio"
                            name=(name)
                            id=(id)
                            value=(value)
                            checked[selected == *value]
                            class=(FORM_RADIO_INPUT_STYLE);

                        label for=(id) class=(FORM_RADIO_LABEL_STYLE) { (label) }
                    }
                }
            }

            (field_errors(name, errors))
        }
    }
}

/// A `<select>` with one option per choice, with `selected` chosen.
pub fn select_field(
    name: &str,
    label: &str,
    choices: &[(&str, &str)],
    selected: &str,
    errors: &FormErrors,
) -> Markup {
    html! {
        div
        {
            label for=(name) class=(FORM_LABEL_STYLE) { (label) }

            select name=(name) id=(name) class=(FORM_TEXT_INPUT_STYLE)
            {
                @for (value, text) in choices {
                    option value=(value) selected[selected == *value] { (text) }
                }
            }

            (field_errors(name, errors))
        }
    }
}

#[cfg(test)]
mod forms_tests {
    use scraper::Html;

    use crate::test_utils::{assert_field_error, assert_no_field_errors};

    use super::{
        ConfirmationForm, FormErrors, TextField, collapse_whitespace, radio_group, require,
    };

    #[test]
    fn confirmation_requires_a_choice() {
        let yes = ConfirmationForm {
            confirmation: "yes".to_owned(),
        };
        let no = ConfirmationForm {
            confirmation: "no".to_owned(),
        };

        assert_eq!(yes.clean(), Ok(true));
        assert_eq!(no.clean(), Ok(false));

        let errors = ConfirmationForm::default().clean().unwrap_err();
        assert_eq!(errors.get("confirmation"), vec!["Please select ‘yes’ or ‘no’"]);
    }

    #[test]
    fn require_trims_and_reports_empty_values() {
        let mut errors = FormErrors::new();

        assert_eq!(require("  London ", "city", &mut errors), "London");
        assert!(errors.is_empty());

        require("   ", "city", &mut errors);
        assert!(errors.has("city"));
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(collapse_whitespace("rent \t for\n\nmay"), "rent for may");
    }

    #[test]
    fn text_field_shows_value_and_error() {
        let mut errors = FormErrors::new();
        errors.add("postcode", "Enter a full valid UK postcode");

        let markup = TextField::new("postcode", "Postcode", "SW1").render(&errors);
        let html = Html::parse_fragment(&markup.into_string());

        assert_field_error(&html, "postcode", "Enter a full valid UK postcode");
    }

    #[test]
    fn radio_group_checks_the_selected_choice() {
        let markup = radio_group(
            "method",
            "Sending method",
            &[("bank_transfer", "Bank transfer"), ("cheque", "Cheque")],
            "cheque",
            &FormErrors::new(),
        );
        let html = Html::parse_fragment(&markup.into_string());

        let checked = html
            .select(&scraper::Selector::parse("input[checked]").unwrap())
            .map(|input| input.value().attr("value").unwrap().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(checked, vec!["cheque"]);
        assert_no_field_errors(&html);
    }
}
