#![allow(missing_docs)]

pub(crate) mod fake_api;
pub(crate) mod form;
pub(crate) mod html;
pub(crate) mod http;

pub(crate) use fake_api::{Recorder, spawn_fake_api, test_app_state};
pub(crate) use form::{
    assert_field_error, assert_form_input, assert_form_input_with_value,
    assert_form_submit_button, assert_hx_endpoint, assert_no_field_errors, assert_radio_checked,
    must_get_form,
};
pub(crate) use html::{
    assert_page_contains, assert_valid_html, page_text, parse_html_document, parse_html_fragment,
    select_text,
};
pub(crate) use http::{
    assert_content_type, assert_hx_redirect, assert_redirect, assert_status_ok, get_header,
};
