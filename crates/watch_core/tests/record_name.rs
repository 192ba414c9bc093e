use std::collections::HashSet;

use watch_core::{record_file_name, Topic, TopicError};

fn is_safe(name: &str) -> bool {
    !name
        .chars()
        .any(|c| matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control())
}

#[test]
fn clean_names_keep_their_trimmed_form() {
    assert_eq!(record_file_name("sofas"), "sofas.json");
    assert_eq!(record_file_name("  chairs \n"), "chairs.json");
    assert_eq!(record_file_name("דירות להשכרה"), "דירות להשכרה.json");
}

#[test]
fn unsafe_characters_are_replaced_and_hashed() {
    let name = record_file_name("Cars/Trucks:2024");
    assert!(name.starts_with("Cars_Trucks_2024--"), "unexpected name: {name}");
    assert!(name.ends_with(".json"));
    assert!(is_safe(&name));
    assert_eq!(name, record_file_name("Cars/Trucks:2024"));
}

#[test]
fn distinct_names_never_share_a_record() {
    let topics = [
        "Cars/Trucks:2024",
        "Cars:Trucks/2024",
        "Cars_Trucks_2024",
        "Cars?Trucks*2024",
        "a/b",
        "a:b",
        "a_b",
        "a|b",
        "sofas",
        "sofas?",
        "untitled",
        "con",
    ];
    let names: HashSet<String> = topics.iter().map(|t| record_file_name(t)).collect();
    assert_eq!(names.len(), topics.len());
    assert!(names.iter().all(|n| is_safe(n)));
}

#[test]
fn blank_and_reserved_names_are_patched() {
    assert_eq!(record_file_name("   "), "untitled.json");
    assert_eq!(record_file_name("NUL"), "NUL_.json");
}

#[test]
fn topic_validation_checks_name_and_url() {
    assert_eq!(Topic::new("sofas", "https://example.com/list").validate(), Ok(()));
    assert_eq!(
        Topic::new(" ", "https://example.com").validate(),
        Err(TopicError::BlankName)
    );
    assert!(matches!(
        Topic::new("sofas", "not a url").validate(),
        Err(TopicError::InvalidUrl(_))
    ));
    assert_eq!(
        Topic::new("sofas", "ftp://example.com").validate(),
        Err(TopicError::UnsupportedScheme("ftp".to_string()))
    );
}

#[test]
fn topic_enabled_flag() {
    let mut topic = Topic::new("sofas", "https://example.com");
    assert!(topic.is_enabled());
    topic.disabled = true;
    assert!(!topic.is_enabled());
    assert_eq!(topic.record_file_name(), "sofas.json");
}
