use scraper::{ElementRef, Html, Selector};

#[track_caller]
pub(crate) fn must_get_form(html: &Html) -> ElementRef<'_> {
    html.select(&Selector::parse("form").unwrap())
        .next()
        .expect("No form found")
}

#[track_caller]
pub(crate) fn assert_hx_endpoint(form: &ElementRef<'_>, endpoint: &str, attribute: &str) {
    let hx_post = form
        .value()
        .attr(attribute)
        .unwrap_or_else(|| panic!("{attribute} attribute missing"));

    assert_eq!(
        hx_post, endpoint,
        "want form with attribute {attribute}=\"{endpoint}\", got {hx_post:?}"
    );
}

#[track_caller]
pub(crate) fn assert_form_input(form: &ElementRef<'_>, name: &str, type_: &str) {
    let selector = Selector::parse(&format!("input[name=\"{name}\"]")).unwrap();
    let input = form
        .select(&selector)
        .next()
        .unwrap_or_else(|| panic!("No input found with name \"{name}\""));
    let input_type = input.value().attr("type").unwrap_or_default();

    assert_eq!(
        input_type, type_,
        "want input {name} with type \"{type_}\", got {input_type:?}"
    );
}

#[track_caller]
pub(crate) fn assert_form_input_with_value(form: &ElementRef<'_>, name: &str, value: &str) {
    let selector = Selector::parse(&format!("input[name=\"{name}\"]")).unwrap();
    let input = form
        .select(&selector)
        .next()
        .unwrap_or_else(|| panic!("No input found with name \"{name}\""));
    let input_value = input.value().attr("value").unwrap_or_default();

    assert_eq!(
        input_value, value,
        "want input {name} with value \"{value}\", got {input_value:?}"
    );
}

/// Assert that the radio button `name` with `value` is checked.
#[track_caller]
pub(crate) fn assert_radio_checked(form: &ElementRef<'_>, name: &str, value: &str) {
    let selector =
        Selector::parse(&format!("input[type=radio][name=\"{name}\"][value=\"{value}\"]"))
            .unwrap();
    let input = form
        .select(&selector)
        .next()
        .unwrap_or_else(|| panic!("No radio button {name}={value}"));

    assert!(
        input.value().attr("checked").is_some(),
        "want radio button {name}={value} to be checked"
    );
}

#[track_caller]
pub(crate) fn assert_form_submit_button(form: &ElementRef<'_>) {
    let submit_button = form
        .select(&Selector::parse("button").unwrap())
        .next()
        .expect("No button found");

    assert_eq!(
        submit_button.value().attr("type").unwrap_or_default(),
        "submit",
        "want submit button with type=\"submit\""
    );
}

/// Assert that the error shown for `field` reads `want_error_message`.
#[track_caller]
pub(crate) fn assert_field_error(html: &Html, field: &str, want_error_message: &str) {
    let selector = Selector::parse(&format!("#{field}-error")).unwrap();
    let error_message = html
        .select(&selector)
        .next()
        .unwrap_or_else(|| panic!("No error message found for {field}"))
        .text()
        .collect::<Vec<_>>()
        .join("");

    assert_eq!(want_error_message, error_message.trim());
}

#[track_caller]
pub(crate) fn assert_no_field_errors(html: &Html) {
    let selector = Selector::parse("[id$=\"-error\"]").unwrap();
    let errors = html
        .select(&selector)
        .map(|element| element.text().collect::<String>())
        .collect::<Vec<_>>();

    assert!(errors.is_empty(), "want no field errors, got {errors:?}");
}
