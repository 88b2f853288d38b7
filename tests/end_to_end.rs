//! End-to-end tests across parsing, resolution and validation

use lexicon_engine::union;
use lexicon_engine::{
    DirectorySchemaSource, MemorySchemaSource, Nsid, ResolutionError, Resolver, SchemaDocument,
    SchemaSource, SourceError, TypeDefinition, TypeKind, UnionType, ValidationMode, Validator,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Memory source that counts loads
#[derive(Default)]
struct CountingSource {
    inner: MemorySchemaSource,
    loads: AtomicUsize,
}

impl CountingSource {
    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl SchemaSource for CountingSource {
    fn load(&self, nsid: &Nsid) -> Result<Value, SourceError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(nsid)
    }
}

fn doc(raw: Value) -> SchemaDocument {
    SchemaDocument::from_raw(raw, None).unwrap()
}

#[test]
fn test_nsid_parse_agrees_with_is_valid() {
    let long_segment = "a".repeat(63);
    let too_long = format!("{0}.{0}.{0}.{0}.{0}.abc", long_segment);
    assert!(too_long.len() > 317);

    let cases = [
        "app.bsky.feed.post",
        "com.example.fooBar",
        "com.example.foo-bar",
        "net.users.bob.ping",
        "a.b.c",
        "com.example",
        "com..example.foo",
        "com.example.3foo",
        "com.example.foo-",
        "com.exa mple.foo",
        ".com.example.foo",
        "",
        too_long.as_str(),
    ];

    for case in cases {
        assert_eq!(
            Nsid::is_valid(case),
            Nsid::parse(case).is_ok(),
            "disagreement on {:?}",
            case
        );
    }

    assert!(Nsid::is_valid("app.bsky.feed.post"));
    assert!(!Nsid::is_valid("com.example"));
    assert!(!Nsid::is_valid(&too_long));
}

#[test]
fn test_document_raw_round_trip() -> anyhow::Result<()> {
    let raw = json!({
        "lexicon": 1,
        "id": "app.test.profile",
        "revision": 3,
        "description": "A test profile",
        "defs": {
            "main": {
                "type": "record",
                "key": "literal:self",
                "record": {
                    "type": "object",
                    "properties": {
                        "displayName": {"type": "string", "maxGraphemes": 64},
                        "avatar": {"type": "blob", "accept": ["image/png"], "maxSize": 1000000},
                        "pinned": {"type": "ref", "ref": "#pin"}
                    }
                }
            },
            "pin": {
                "type": "object",
                "required": ["uri"],
                "properties": {"uri": {"type": "string", "format": "at-uri"}}
            }
        }
    });

    let parsed = SchemaDocument::from_raw(raw.clone(), Some("inline"))?;
    assert_eq!(parsed.to_raw(), raw);
    assert_eq!(parsed.source_label.as_deref(), Some("inline"));
    assert!(parsed.is_record());
    Ok(())
}

#[test]
fn test_resolution_is_memoized() -> anyhow::Result<()> {
    init_tracing();

    let source = CountingSource::default();
    source.inner.insert_raw(json!({
        "lexicon": 1,
        "id": "app.test.defs",
        "defs": {
            "label": {"type": "string", "maxLength": 32}
        }
    }))?;

    let post = doc(json!({
        "lexicon": 1,
        "id": "app.test.post",
        "defs": {"main": {"type": "object", "properties": {}}}
    }));

    let resolver = Resolver::new(&source);
    let first = resolver.resolve_reference("app.test.defs#label", &post)?;
    assert_eq!(source.loads(), 1);

    let second = resolver.resolve_reference("app.test.defs#label", &post)?;
    assert_eq!(first, second);
    assert_eq!(first.kind(), TypeKind::String);
    assert_eq!(source.loads(), 1);
    Ok(())
}

#[test]
fn test_cycle_then_independent_resolution() {
    init_tracing();

    let cyclic = doc(json!({
        "lexicon": 1,
        "id": "app.test.cycle",
        "defs": {
            "a": {"type": "ref", "ref": "#b"},
            "b": {"type": "ref", "ref": "#a"},
            "c": {"type": "integer", "minimum": 0}
        }
    }));

    let resolver = Resolver::new(MemorySchemaSource::new());

    match resolver.resolve_reference("#a", &cyclic) {
        Err(ResolutionError::CircularReference { reference, chain }) => {
            assert_eq!(reference, "#a");
            assert_eq!(chain.len(), 3);
        }
        other => panic!("expected a circular reference, got {:?}", other),
    }

    let fresh = resolver.resolve_reference("#c", &cyclic).unwrap();
    assert_eq!(fresh.kind(), TypeKind::Integer);

    // The failure is not memoized
    assert!(matches!(
        resolver.resolve_reference("#b", &cyclic),
        Err(ResolutionError::CircularReference { .. })
    ));
}

#[test]
fn test_record_end_to_end() -> anyhow::Result<()> {
    init_tracing();

    let schema = doc(json!({
        "lexicon": 1,
        "id": "app.test.post",
        "defs": {
            "main": {
                "type": "record",
                "key": "tid",
                "record": {
                    "type": "object",
                    "required": ["text"],
                    "properties": {
                        "text": {"type": "string", "maxLength": 10}
                    }
                }
            }
        }
    }));

    let validator = Validator::new(MemorySchemaSource::new());

    assert!(validator.validate(&json!({"text": "hello"}), &schema));
    assert!(validator
        .validate_with_errors(&json!({"text": "hello"}), &schema)?
        .is_empty());

    let errors = validator.validate_with_errors(&json!({"text": "this is too long"}), &schema)?;
    assert_eq!(errors.len(), 1);
    assert!(errors.contains_key("text"));
    assert!(!validator.validate(&json!({"text": "this is too long"}), &schema));
    Ok(())
}

#[test]
fn test_cross_document_record_validation() -> anyhow::Result<()> {
    let source = MemorySchemaSource::new();
    source.insert_raw(json!({
        "lexicon": 1,
        "id": "app.test.defs",
        "defs": {
            "strongRef": {
                "type": "object",
                "required": ["uri", "cid"],
                "properties": {
                    "uri": {"type": "string", "format": "at-uri"},
                    "cid": {"type": "string", "format": "cid"}
                }
            }
        }
    }))?;

    let like = doc(json!({
        "lexicon": 1,
        "id": "app.test.like",
        "defs": {
            "main": {
                "type": "record",
                "key": "tid",
                "record": {
                    "type": "object",
                    "required": ["subject", "createdAt"],
                    "properties": {
                        "subject": {"type": "ref", "ref": "app.test.defs#strongRef"},
                        "createdAt": {"type": "string", "format": "datetime"}
                    }
                }
            }
        }
    }));

    let validator = Validator::new(source);
    let good = json!({
        "subject": {
            "uri": "at://did:plc:abc/app.test.post/3k2abc",
            "cid": "bafyreie5737gdxlw5i64vzichcalba3z2v5n6icifvx5xytvske7mr3hpm"
        },
        "createdAt": "2024-05-01T12:00:00.000Z"
    });
    assert!(validator.validate(&good, &like));

    let bad = json!({
        "subject": {"uri": "at://did:plc:abc/app.test.post/3k2abc"},
        "createdAt": "2024-05-01T12:00:00.000Z"
    });
    let errors = validator.validate_with_errors(&bad, &like)?;
    assert!(errors.contains_key("subject.cid"));
    Ok(())
}

#[test]
fn test_unresolvable_reference_is_an_error() {
    let schema = doc(json!({
        "lexicon": 1,
        "id": "app.test.broken",
        "defs": {
            "main": {
                "type": "object",
                "properties": {"thing": {"type": "ref", "ref": "app.test.missing#thing"}}
            }
        }
    }));

    let validator = Validator::new(MemorySchemaSource::new());
    assert!(validator
        .validate_with_errors(&json!({"thing": 1}), &schema)
        .is_err());
    assert!(!validator.validate(&json!({"thing": 1}), &schema));

    // Absent optional fields never trigger resolution
    assert!(validator.validate(&json!({}), &schema));
}

#[test]
fn test_union_properties() {
    let closed = UnionType {
        refs: vec!["a.b.c".to_string(), "a.b.d".to_string()],
        closed: true,
        ..Default::default()
    };

    assert_eq!(
        union::resolve(&json!({"$type": "a.b.c"}), &closed),
        Ok(Some("a.b.c".to_string()))
    );
    assert!(union::resolve(&json!({"$type": "a.b.e"}), &closed).is_err());
    assert!(union::resolve(&json!({}), &closed).is_err());

    let open = UnionType {
        refs: vec!["a.b.c".to_string()],
        closed: false,
        ..Default::default()
    };
    for value in [json!({"$type": "x.y.z"}), json!({}), json!(5), json!("text"), json!([1])] {
        assert_eq!(union::resolve(&value, &open), Ok(None));
    }
}

#[test]
fn test_grapheme_limits() {
    // Family emoji: five code points, one grapheme
    let family = "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}";
    let n = 4;
    let text = family.repeat(n);

    let schema_for = |max: usize| {
        doc(json!({
            "lexicon": 1,
            "id": "app.test.status",
            "defs": {
                "main": {
                    "type": "object",
                    "properties": {"text": {"type": "string", "maxGraphemes": max}}
                }
            }
        }))
    };

    let validator = Validator::new(MemorySchemaSource::new());
    assert!(validator.validate(&json!({"text": text}), &schema_for(n)));
    assert!(!validator.validate(&json!({"text": text}), &schema_for(n - 1)));

    let lenient = Validator::with_mode(MemorySchemaSource::new(), ValidationMode::Lenient);
    assert!(lenient.validate(&json!({"text": text}), &schema_for(n - 1)));
}

#[test]
fn test_directory_source() -> anyhow::Result<()> {
    init_tracing();

    let dir = TempDir::new()?;
    let nested = dir.path().join("app").join("test");
    std::fs::create_dir_all(&nested)?;
    std::fs::write(
        nested.join("note.json"),
        serde_json::to_string_pretty(&json!({
            "lexicon": 1,
            "id": "app.test.note",
            "defs": {
                "main": {
                    "type": "record",
                    "key": "any",
                    "record": {
                        "type": "object",
                        "required": ["body"],
                        "properties": {
                            "body": {"type": "string"},
                            "mood": {"type": "ref", "ref": "app.test.mood"}
                        }
                    }
                }
            }
        }))?,
    )?;
    std::fs::write(
        dir.path().join("app.test.mood.json"),
        serde_json::to_string(&json!({
            "lexicon": 1,
            "id": "app.test.mood",
            "defs": {
                "main": {"type": "string", "knownValues": ["happy", "sad"], "maxLength": 8}
            }
        }))?,
    )?;

    let validator = Validator::new(DirectorySchemaSource::new(dir.path()));
    let nsid = Nsid::parse("app.test.note")?;

    let report = validator.validate_by_nsid(&json!({"body": "hi", "mood": "happy"}), &nsid)?;
    assert!(report.is_valid());

    let report = validator.validate_by_nsid(&json!({"body": "hi", "mood": "overjoyed"}), &nsid)?;
    assert_eq!(report.errors_at("mood").count(), 1);

    assert!(validator
        .validate_by_nsid(&json!({}), &Nsid::parse("app.test.absent")?)
        .is_err());

    let mood = validator
        .resolver()
        .resolve_reference("app.test.mood", &SchemaDocument::new(nsid))?;
    assert!(matches!(mood, TypeDefinition::String(_)));
    Ok(())
}
