use healrag_core::config::NormalizeSettings;
use healrag_heal::{extract_main_content, ExtractionStrategy};

const P1: &str = "Quantum computing is a type of computation that harnesses quantum mechanical phenomena.";
const P2: &str = "Superposition lets a qubit represent several states at the same time during a computation.";
const P3: &str = "Entanglement links qubits so that measuring one of them immediately informs the other one.";

fn extract(html: &str) -> Option<healrag_heal::Extracted> {
    extract_main_content(html, &NormalizeSettings::default())
}

#[test]
fn main_container_wins_and_chrome_is_ignored() {
    let html = format!(
        "<html><head><style>p {{ color: red; }}</style></head><body>\
         <nav>Home About Contact Blog Archive</nav>\
         <main><p>{P1}</p><p>{P2}</p><script>trackVisitor();</script><p>{P3}</p></main>\
         <footer>Footer text that should never appear</footer></body></html>"
    );
    let out = extract(&html).expect("extracted");
    assert_eq!(out.strategy, ExtractionStrategy::MainContainer);
    assert!(out.text.starts_with("Quantum computing"));
    assert!(out.text.contains("Superposition"));
    assert!(!out.text.contains("trackVisitor"));
    assert!(!out.text.contains("Footer"));
}

#[test]
fn content_class_is_second_choice() {
    let html = format!("<html><body><div class=\"post-content\"><p>{P1}</p><p>{P2}</p><p>{P3}</p></div></body></html>");
    let out = extract(&html).expect("extracted");
    assert_eq!(out.strategy, ExtractionStrategy::ContentClass);
    assert!(out.text.contains("Entanglement"));
}

#[test]
fn paragraphs_are_combined_without_containers() {
    let html = format!("<html><body><section><p>{P1}</p><p>Short.</p><p>{P2}</p><p>{P3}</p></section></body></html>");
    let out = extract(&html).expect("extracted");
    assert_eq!(out.strategy, ExtractionStrategy::Paragraphs);
    assert!(!out.text.contains("Short."));
    assert!(out.text.contains("Superposition") && out.text.contains("Entanglement"));
}

#[test]
fn body_text_is_used_when_nothing_else_fits() {
    let html = format!("<html><body><span>{P1}</span> <span>{P2}</span> <span>{P3}</span></body></html>");
    let out = extract(&html).expect("extracted");
    assert_eq!(out.strategy, ExtractionStrategy::Body);
}

#[test]
fn minimal_cleaning_is_the_last_resort() {
    let html = "<html><body>\
        <p>Subscribe to the newsletter, follow us on twitter, facebook, instagram and linkedin for updates</p>\
        <p>BREAKING NEWS ABOUT EVERYTHING HAPPENING IN THE WORLD TODAY RIGHT NOW</p>\
        <p>Sign up or log in to manage preferences, accept all cookies and read more about the privacy policy</p>\
        </body></html>";
    let out = extract(html).expect("extracted");
    assert_eq!(out.strategy, ExtractionStrategy::MinimalParagraphs);
    assert!(out.text.starts_with("Subscribe to the newsletter"));
    assert!(out.text.contains("privacy policy"));
    assert!(!out.text.contains("BREAKING"));
}

#[test]
fn thin_pages_yield_nothing() {
    assert!(extract("<html><body><p>Hello there.</p></body></html>").is_none());
    assert!(extract("").is_none());
}
