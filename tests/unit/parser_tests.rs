/*!
 * Tests for recovering page translations from backend replies
 */

use std::collections::BTreeMap;

use pagetran::translation::ResponseParser;
use pagetran::translation::parser::{ParseStrategy, unescape_content};

/// A typical chatty reply: prose, a fenced block, pretty-printed objects
#[test]
fn test_parse_withChattyFencedReply_shouldRecoverAllPages() {
    let reply = r#"Sure! Here is the translation you asked for:

```json
[
  {
    "page": 7,
    "translated_text": "سلام دنیا\nخط دوم"
  },
  {
    "page": 8,
    "translated_text": "او گفت \"بله\""
  }
]
```

Let me know if you need anything else."#;

    let pages = ResponseParser::default().parse(reply).unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[&7], "سلام دنیا\nخط دوم");
    assert_eq!(pages[&8], "او گفت \"بله\"");
}

#[test]
fn test_parse_withAlternateFieldOnly_shouldFallBack() {
    let reply = r#"[{"page": 1, "translation": "Bonjour"}, {"page": 2, "translation": "Monde"}]"#;

    let pages = ResponseParser::default().parse(reply).unwrap();
    assert_eq!(pages[&1], "Bonjour");
    assert_eq!(pages[&2], "Monde");
}

#[test]
fn test_parse_withMixedFields_shouldOnlyUsePrimary() {
    let reply = r#"[{"page": 1, "translated_text": "Eins"}, {"page": 2, "translation": "Zwei"}]"#;

    let pages = ResponseParser::default().parse(reply).unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[&1], "Eins");
}

#[test]
fn test_parse_withProseOnly_shouldReturnErrorWithExcerpt() {
    let reply = "I cannot translate this document.";
    let err = ResponseParser::default().parse(reply).unwrap_err();

    assert_eq!(err.reply_chars, reply.chars().count());
    assert_eq!(err.excerpt, reply);
}

#[test]
fn test_parse_withCustomStrategy_shouldUseIt() {
    struct Numbered;

    impl ParseStrategy for Numbered {
        fn name(&self) -> &str {
            "numbered"
        }

        fn extract(&self, raw: &str) -> BTreeMap<u32, String> {
            raw.lines()
                .filter_map(|line| line.split_once(": "))
                .filter_map(|(n, text)| Some((n.trim().parse().ok()?, text.to_string())))
                .collect()
        }
    }

    let parser = ResponseParser::new(vec![Box::new(Numbered)]);
    let pages = parser.parse("1: one\n2: two").unwrap();
    assert_eq!(pages[&2], "two");
}

#[test]
fn test_unescape_content_withEscapedBackslashBeforeN_shouldFollowFixedOrder() {
    // `\\n` decodes `\n` first, leaving a backslash followed by a newline
    assert_eq!(unescape_content(r"a\\nb"), "a\\\nb");
    assert_eq!(unescape_content(r#"say \"hi\""#), "say \"hi\"");
}
