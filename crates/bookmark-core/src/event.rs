use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::url::extract_resource_tag;
use crate::EventError;

/// NIP-B0 web bookmark, a parameterized replaceable event keyed by `d`.
pub const KIND_WEB_BOOKMARK: u16 = 39701;

pub const TAG_D: &str = "d";
pub const TAG_TITLE: &str = "title";
pub const TAG_PUBLISHED_AT: &str = "published_at";
pub const TAG_HASHTAG: &str = "t";

/// A Nostr tag: `[name, value, ...]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(pub Vec<String>);

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self(vec![name.into(), value.into()])
    }

    pub fn name(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn value(&self) -> Option<&str> {
        self.0.get(1).map(String::as_str)
    }
}

/// A web bookmark event as produced by [`build`], before an external signer
/// has computed its id and signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEvent {
    pub pubkey: String,
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<Tag>,
    pub content: String,
}

impl UnsignedEvent {
    /// Attach the id and signature computed by the signer.
    pub fn into_signed(self, id: impl Into<String>, sig: impl Into<String>) -> SignedEvent {
        SignedEvent {
            id: id.into(),
            pubkey: self.pubkey,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            sig: sig.into(),
        }
    }
}

/// A signed web bookmark event in NIP-01 wire shape.
///
/// Only obtained through [`parse_and_validate`] (or by signing an
/// [`UnsignedEvent`]) and treated as immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEvent {
    pub id: String,
    pub pubkey: String,
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<Tag>,
    pub content: String,
    pub sig: String,
}

impl SignedEvent {
    pub fn to_json(&self) -> Result<String, EventError> {
        Ok(serde_json::to_string(self)?)
    }

    /// The `d` tag value, if any.
    pub fn d_tag(&self) -> Option<&str> {
        tag_value(&self.tags, TAG_D)
    }
}

/// Everything a bookmark record needs from an event, gathered in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventMetadata {
    pub event_id: String,
    pub d_tag: Option<String>,
    pub published_at: Option<u64>,
    pub title: Option<String>,
    pub description: String,
    pub hashtags: BTreeSet<String>,
}

/// Build an unsigned web bookmark event for `url`.
///
/// Tags are `d`, `published_at` and `title`, followed by one `t` tag per
/// `#hashtag` found in `description` (in order, duplicates kept).
pub fn build(
    pubkey: &str,
    url: &str,
    title: &str,
    description: &str,
    created_at: u64,
) -> UnsignedEvent {
    let mut tags = vec![
        Tag::new(TAG_D, extract_resource_tag(url)),
        Tag::new(TAG_PUBLISHED_AT, created_at.to_string()),
        Tag::new(TAG_TITLE, title),
    ];
    tags.extend(
        scan_hashtags(description)
            .into_iter()
            .map(|hashtag| Tag::new(TAG_HASHTAG, hashtag)),
    );

    UnsignedEvent {
        pubkey: pubkey.to_string(),
        created_at,
        kind: KIND_WEB_BOOKMARK,
        tags,
        content: description.to_string(),
    }
}

/// Parse a JSON string and validate it as a web bookmark event.
pub fn parse_and_validate_json(raw: &str) -> Result<SignedEvent, EventError> {
    let value: Value = serde_json::from_str(raw)?;
    parse_and_validate(&value)
}

/// Validate a loosely typed event payload.
///
/// Checks, in order: kind (numeric strings are coerced), the `id`, `pubkey`
/// and `sig` fields, then the presence of a non-empty `d` tag. The signature
/// itself is not verified here.
pub fn parse_and_validate(raw: &Value) -> Result<SignedEvent, EventError> {
    let object = raw
        .as_object()
        .ok_or_else(|| EventError::Malformed("event must be a JSON object".to_string()))?;

    let kind = match object.get("kind") {
        Some(value) => coerce_integer(value),
        None => None,
    };
    if kind != Some(u64::from(KIND_WEB_BOOKMARK)) {
        let found = object
            .get("kind")
            .map(Value::to_string)
            .unwrap_or_else(|| "nothing".to_string());
        return Err(EventError::InvalidKind(found));
    }

    let id = required_string(object, "id")?;
    let pubkey = required_string(object, "pubkey")?;
    let sig = required_string(object, "sig")?;
    let created_at = object
        .get("created_at")
        .and_then(coerce_integer)
        .ok_or(EventError::MissingRequiredField("created_at"))?;

    let tags = parse_tags(object.get("tags"))?;
    if !tags
        .iter()
        .any(|tag| tag.name() == Some(TAG_D) && tag.value().is_some_and(|v| !v.is_empty()))
    {
        return Err(EventError::MissingDTag);
    }

    let content = match object.get("content") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(content)) => content.clone(),
        Some(_) => return Err(EventError::Malformed("content must be a string".to_string())),
    };

    debug!(event_id = %id, tags = tags.len(), "Validated web bookmark event");

    Ok(SignedEvent {
        id,
        pubkey,
        created_at,
        kind: KIND_WEB_BOOKMARK,
        tags,
        content,
        sig,
    })
}

/// First `title` tag value.
pub fn extract_title(event: &SignedEvent) -> Option<String> {
    tag_value(&event.tags, TAG_TITLE).map(String::from)
}

pub fn extract_description(event: &SignedEvent) -> String {
    event.content.clone()
}

/// Unique, non-empty `t` tag values.
pub fn extract_hashtags(event: &SignedEvent) -> BTreeSet<String> {
    event
        .tags
        .iter()
        .filter(|tag| tag.name() == Some(TAG_HASHTAG))
        .filter_map(Tag::value)
        .filter(|value| !value.is_empty())
        .map(String::from)
        .collect()
}

/// The `published_at` tag as unix seconds, when present and numeric.
pub fn extract_published_at(event: &SignedEvent) -> Option<u64> {
    tag_value(&event.tags, TAG_PUBLISHED_AT).and_then(|value| value.trim().parse().ok())
}

pub fn extract_metadata(event: &SignedEvent) -> EventMetadata {
    EventMetadata {
        event_id: event.id.clone(),
        d_tag: event.d_tag().filter(|d| !d.is_empty()).map(String::from),
        published_at: extract_published_at(event),
        title: extract_title(event),
        description: extract_description(event),
        hashtags: extract_hashtags(event),
    }
}

pub fn tag_value<'a>(tags: &'a [Tag], name: &str) -> Option<&'a str> {
    tags.iter()
        .find(|tag| tag.name() == Some(name))
        .and_then(Tag::value)
}

/// Hashtags are `#` followed by word characters, at the start of the text or
/// right after whitespace.
fn scan_hashtags(text: &str) -> Vec<String> {
    let mut hashtags = Vec::new();
    let mut previous: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        let at_boundary = previous.map_or(true, char::is_whitespace);
        previous = Some(c);
        if c != '#' || !at_boundary {
            continue;
        }

        let start = idx + c.len_utf8();
        let mut end = start;
        while let Some(&(next_idx, next)) = chars.peek() {
            if !is_word_char(next) {
                break;
            }
            end = next_idx + next.len_utf8();
            previous = Some(next);
            chars.next();
        }

        if end > start {
            hashtags.push(text[start..end].to_string());
        }
    }

    hashtags
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn coerce_integer(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn required_string(object: &Map<String, Value>, field: &'static str) -> Result<String, EventError> {
    object
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .map(String::from)
        .ok_or(EventError::MissingRequiredField(field))
}

fn parse_tags(value: Option<&Value>) -> Result<Vec<Tag>, EventError> {
    let Some(Value::Array(entries)) = value else {
        return Err(EventError::MissingDTag);
    };

    let mut tags = Vec::with_capacity(entries.len());
    for entry in entries {
        let Value::Array(parts) = entry else {
            return Err(EventError::MissingDTag);
        };
        let parts = parts
            .iter()
            .map(|part| {
                part.as_str()
                    .map(String::from)
                    .ok_or_else(|| EventError::Malformed("tag values must be strings".to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        tags.push(Tag(parts));
    }

    Ok(tags)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const PUBKEY: &str = "2729620da105979b22acfdfe9585274a78c282869b493abfa4120d3af2061298";
    const EVENT_ID: &str = "d7a92714f81d0f712e715556aee69ea6da6bfb287e6baf794a095d301d603ec7";
    const SIG: &str = "36d34e6448fe0223e9999361c39c492a208bc423d2fcdfc2a3404e04df7c22dc";

    fn valid_payload() -> Value {
        json!({
            "kind": 39701,
            "id": EVENT_ID,
            "pubkey": PUBKEY,
            "created_at": 1738869705,
            "tags": [
                ["d", "alice.blog/post"],
                ["published_at", "1738863000"],
                ["title", "Blog insights by Alice"],
                ["t", "post"],
                ["t", "insight"]
            ],
            "content": "A marvelous insight by Alice about the nature of blogs and posts.",
            "sig": SIG
        })
    }

    #[test]
    fn test_build_web_bookmark_event() {
        let event = build(
            PUBKEY,
            "https://alice.blog/post?param=value#section",
            "Blog insights by Alice",
            "A marvelous insight by Alice about the nature of blogs and posts. #post #insight",
            1738869705,
        );

        assert_eq!(event.kind, KIND_WEB_BOOKMARK);
        assert_eq!(event.pubkey, PUBKEY);
        assert_eq!(event.created_at, 1738869705);
        assert_eq!(tag_value(&event.tags, TAG_D), Some("alice.blog/post"));
        assert_eq!(tag_value(&event.tags, TAG_PUBLISHED_AT), Some("1738869705"));
        assert_eq!(tag_value(&event.tags, TAG_TITLE), Some("Blog insights by Alice"));
        assert_eq!(
            &event.tags[3..],
            &[Tag::new("t", "post"), Tag::new("t", "insight")]
        );
    }

    #[test]
    fn test_hashtag_scan_rules() {
        assert_eq!(scan_hashtags("#rust first"), vec!["rust"]);
        assert_eq!(
            scan_hashtags("about #ruby and #ruby again"),
            vec!["ruby", "ruby"]
        );
        assert_eq!(scan_hashtags("mail me at a#b or #"), Vec::<String>::new());
        assert_eq!(scan_hashtags("#a#b\t#C_1-x"), vec!["a", "C_1"]);
        assert_eq!(scan_hashtags("line\n#next"), vec!["next"]);
    }

    #[test]
    fn test_parse_valid_event() {
        let event = parse_and_validate(&valid_payload()).unwrap();
        assert_eq!(event.id, EVENT_ID);
        assert_eq!(event.d_tag(), Some("alice.blog/post"));
        assert_eq!(event.tags.len(), 5);
    }

    #[test]
    fn test_rejects_wrong_kind() {
        let mut payload = valid_payload();
        payload["kind"] = json!(1);
        assert!(matches!(
            parse_and_validate(&payload),
            Err(EventError::InvalidKind(_))
        ));

        payload.as_object_mut().unwrap().remove("kind");
        assert!(matches!(
            parse_and_validate(&payload),
            Err(EventError::InvalidKind(_))
        ));
    }

    #[test]
    fn test_coerces_string_kind() {
        let mut payload = valid_payload();
        payload["kind"] = json!("39701");
        payload["created_at"] = json!("1738869705");
        let event = parse_and_validate(&payload).unwrap();
        assert_eq!(event.kind, KIND_WEB_BOOKMARK);
        assert_eq!(event.created_at, 1738869705);
    }

    #[test]
    fn test_rejects_missing_required_fields() {
        for field in ["id", "pubkey", "sig"] {
            let mut payload = valid_payload();
            payload[field] = json!("");
            match parse_and_validate(&payload) {
                Err(EventError::MissingRequiredField(name)) => assert_eq!(name, field),
                other => panic!("expected missing {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_kind_checked_before_fields() {
        let payload = json!({ "kind": 1, "tags": [] });
        assert!(matches!(
            parse_and_validate(&payload),
            Err(EventError::InvalidKind(_))
        ));
    }

    #[test]
    fn test_rejects_missing_d_tag() {
        let mut payload = valid_payload();
        payload["tags"] = json!([["title", "Blog insights by Alice"]]);
        assert!(matches!(
            parse_and_validate(&payload),
            Err(EventError::MissingDTag)
        ));

        payload["tags"] = json!([["d", ""]]);
        assert!(matches!(
            parse_and_validate(&payload),
            Err(EventError::MissingDTag)
        ));

        payload["tags"] = json!("not a list");
        assert!(matches!(
            parse_and_validate(&payload),
            Err(EventError::MissingDTag)
        ));
    }

    #[test]
    fn test_rejects_non_object_payload() {
        assert!(matches!(
            parse_and_validate(&json!([1, 2, 3])),
            Err(EventError::Malformed(_))
        ));
        assert!(matches!(
            parse_and_validate_json("{not json"),
            Err(EventError::Json(_))
        ));
    }

    #[test]
    fn test_build_then_validate_roundtrip() {
        let description = "Great read on #rust and #async, more #rust";
        let signed = build(PUBKEY, "https://example.com/post?x=1", "A title", description, 1700000000)
            .into_signed(EVENT_ID, SIG);

        let json = signed.to_json().unwrap();
        let parsed = parse_and_validate_json(&json).unwrap();

        assert_eq!(parsed, signed);
        assert_eq!(extract_title(&parsed).as_deref(), Some("A title"));
        assert_eq!(extract_description(&parsed), description);
        assert_eq!(
            extract_hashtags(&parsed),
            BTreeSet::from(["async".to_string(), "rust".to_string()])
        );
        assert_eq!(parsed.d_tag(), Some("example.com/post"));
    }

    #[test]
    fn test_extract_hashtags_deduplicates() {
        let signed = build(PUBKEY, "example.com", "T", "about #ruby and #ruby again", 1)
            .into_signed(EVENT_ID, SIG);
        assert_eq!(extract_hashtags(&signed), BTreeSet::from(["ruby".to_string()]));
    }

    #[test]
    fn test_extract_metadata() {
        let event = parse_and_validate(&valid_payload()).unwrap();
        let metadata = extract_metadata(&event);

        assert_eq!(metadata.event_id, EVENT_ID);
        assert_eq!(metadata.d_tag.as_deref(), Some("alice.blog/post"));
        assert_eq!(metadata.published_at, Some(1738863000));
        assert_eq!(metadata.title.as_deref(), Some("Blog insights by Alice"));
        assert_eq!(metadata.hashtags.len(), 2);
    }

    #[test]
    fn test_title_absent() {
        let mut payload = valid_payload();
        payload["tags"] = json!([["d", "alice.blog/post"]]);
        let event = parse_and_validate(&payload).unwrap();
        assert_eq!(extract_title(&event), None);
        assert_eq!(extract_published_at(&event), None);
    }
}
