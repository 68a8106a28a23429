//! Natural-identifier canonicalization across URL surface forms.

use vmem_domain::utils::url::extract_youtube_id;

#[test]
fn watch_and_short_forms_resolve_to_the_same_identifier() {
    let forms = [
        "https://www.youtube.com/watch?v=XYZabc12345",
        "https://youtu.be/XYZabc12345",
        "https://m.youtube.com/watch?v=XYZabc12345&t=120",
        "https://www.youtube.com/shorts/XYZabc12345",
        "https://www.youtube.com/embed/XYZabc12345?rel=0",
    ];
    for form in forms {
        assert_eq!(extract_youtube_id(form), Some("XYZabc12345"), "form: {form}");
    }
}

#[test]
fn identifier_must_be_exactly_eleven_chars() {
    assert_eq!(extract_youtube_id("https://youtu.be/short"), None);
}

#[test]
fn plain_urls_have_no_natural_identifier() {
    assert_eq!(extract_youtube_id("https://example.com/video/123"), None);
}
