//! End-to-end checks of the UANodeSet loader against small documents.

use std::str::FromStr;

use opcua_runtime::address_space::loader::parse_nodeset;
use opcua_runtime::ua;

const NS_DECL: &str = concat!(
    "xmlns=\"http://opcfoundation.org/UA/2011/03/UANodeSet.xsd\" ",
    "xmlns:uax=\"http://opcfoundation.org/UA/2008/02/Types.xsd\"",
);

fn document(body: &str) -> String {
    format!("<?xml version=\"1.0\" encoding=\"utf-8\"?><UANodeSet {NS_DECL}>{body}</UANodeSet>")
}

#[test]
fn load_trivial_nodeset() {
    let space = parse_nodeset(
        document(r#"<UAObject NodeId="i=100" BrowseName="0:Foo"></UAObject>"#).as_bytes(),
    )
    .unwrap();

    assert_eq!(space.len(), 1);
    let item = space.get(&ua::NodeId::numeric(0, 100)).unwrap();
    assert_eq!(item.node_class(), ua::NodeClass::Object);
    assert_eq!(item.node_id, ua::NodeId::numeric(0, 100));
    assert_eq!(item.browse_name, ua::QualifiedName::new(0, "Foo"));
    assert!(item.references.is_empty());
}

#[test]
fn alias_resolution() {
    let space = parse_nodeset(
        document(concat!(
            r#"<Aliases><Alias Alias="HasComponent">i=47</Alias></Aliases>"#,
            r#"<UAObject NodeId="i=85" BrowseName="0:Objects">"#,
            r#"<References>"#,
            r#"<Reference ReferenceType="HasComponent" IsForward="true">i=84</Reference>"#,
            r#"</References>"#,
            r#"</UAObject>"#,
        ))
        .as_bytes(),
    )
    .unwrap();

    let item = space.get(&ua::NodeId::numeric(0, 85)).unwrap();
    assert_eq!(item.references.len(), 1);
    let reference = &item.references[0];
    // The alias is fully resolved; no alias name survives loading.
    assert_eq!(reference.reference_type_id, ua::NodeId::numeric(0, 47));
    assert!(!reference.is_inverse);
    assert_eq!(
        reference.target_id,
        ua::ExpandedNodeId::local(ua::NodeId::numeric(0, 84))
    );
}

#[test]
fn byte_string_value_from_base64() {
    let space = parse_nodeset(
        document(concat!(
            r#"<UAVariable NodeId="ns=1;i=42" BrowseName="1:Blob" DataType="i=15">"#,
            r#"<DisplayName>Blob</DisplayName>"#,
            r#"<Value><uax:ByteString>SGVsbG8=</uax:ByteString></Value>"#,
            r#"</UAVariable>"#,
        ))
        .as_bytes(),
    )
    .unwrap();

    let item = space.get(&ua::NodeId::numeric(1, 42)).unwrap();
    match item.value() {
        Some(ua::Variant::ByteString(bytes)) => {
            assert_eq!(bytes.as_bytes(), Some(&[0x48, 0x65, 0x6C, 0x6C, 0x6F][..]));
            assert_eq!(bytes.len(), 5);
        }
        other => panic!("unexpected value: {other:?}"),
    }
    assert_eq!(item.value_status(), Some(ua::StatusCode::GOOD));
}

#[test]
fn item_count_matches_node_elements() {
    let space = parse_nodeset(
        document(concat!(
            r#"<UAObject NodeId="i=1" BrowseName="0:A"/>"#,
            r#"<UAVariable NodeId="i=2" BrowseName="0:B" DataType="i=6"/>"#,
            r#"<UAMethod NodeId="i=3" BrowseName="0:C"/>"#,
            r#"<UAObjectType NodeId="i=4" BrowseName="0:D"/>"#,
            r#"<UAReferenceType NodeId="i=5" BrowseName="0:E"/>"#,
            r#"<UAVariableType NodeId="i=6" BrowseName="0:F" DataType="i=6"/>"#,
            r#"<UADataType NodeId="i=7" BrowseName="0:G"/>"#,
            r#"<UAView NodeId="i=8" BrowseName="0:H"/>"#,
        ))
        .as_bytes(),
    )
    .unwrap();
    assert_eq!(space.len(), 8);
}

#[test]
fn all_scalar_kinds() {
    let space = parse_nodeset(
        document(concat!(
            r#"<UAVariable NodeId="ns=1;i=1" BrowseName="1:B" DataType="i=1">"#,
            r#"<Value><uax:Boolean>true</uax:Boolean></Value></UAVariable>"#,
            r#"<UAVariable NodeId="ns=1;i=2" BrowseName="1:D" DataType="i=11">"#,
            r#"<Value><uax:Double>2.5</uax:Double></Value></UAVariable>"#,
            r#"<UAVariable NodeId="ns=1;i=3" BrowseName="1:S" DataType="i=12">"#,
            r#"<Value><uax:String>hello</uax:String></Value></UAVariable>"#,
            r#"<UAVariable NodeId="ns=1;i=4" BrowseName="1:G" DataType="i=14">"#,
            r#"<Value><uax:Guid>72962b91-fa75-4ae6-8d28-b404dc7daf63</uax:Guid></Value>"#,
            r#"</UAVariable>"#,
            r#"<UAVariable NodeId="ns=1;i=5" BrowseName="1:N" DataType="i=17">"#,
            r#"<Value><uax:NodeId>ns=2;s=Target</uax:NodeId></Value></UAVariable>"#,
            r#"<UAVariable NodeId="ns=1;i=6" BrowseName="1:Q" DataType="i=20">"#,
            r#"<Value><uax:QualifiedName>3:Name</uax:QualifiedName></Value></UAVariable>"#,
            r#"<UAVariable NodeId="ns=1;i=7" BrowseName="1:L" DataType="i=21">"#,
            r#"<Value><uax:LocalizedText>Ein Text</uax:LocalizedText></Value></UAVariable>"#,
        ))
        .as_bytes(),
    )
    .unwrap();

    assert_eq!(
        space.get(&ua::NodeId::numeric(1, 1)).unwrap().value(),
        Some(&ua::Variant::Boolean(true))
    );
    assert_eq!(
        space.get(&ua::NodeId::numeric(1, 2)).unwrap().value(),
        Some(&ua::Variant::Double(2.5))
    );
    assert_eq!(
        space.get(&ua::NodeId::numeric(1, 3)).unwrap().value(),
        Some(&ua::Variant::String(ua::String::from("hello")))
    );
    assert_eq!(
        space.get(&ua::NodeId::numeric(1, 4)).unwrap().value(),
        Some(&ua::Variant::Guid(
            ua::Guid::from_str("72962b91-fa75-4ae6-8d28-b404dc7daf63").unwrap()
        ))
    );
    assert_eq!(
        space.get(&ua::NodeId::numeric(1, 5)).unwrap().value(),
        Some(&ua::Variant::NodeId(Box::new(ua::NodeId::string(
            2, "Target"
        ))))
    );
    assert_eq!(
        space.get(&ua::NodeId::numeric(1, 6)).unwrap().value(),
        Some(&ua::Variant::QualifiedName(Box::new(
            ua::QualifiedName::new(3, "Name")
        )))
    );
    assert_eq!(
        space.get(&ua::NodeId::numeric(1, 7)).unwrap().value(),
        Some(&ua::Variant::LocalizedText(Box::new(
            ua::LocalizedText::text_only("Ein Text")
        )))
    );
}

#[test]
fn display_name_and_description() {
    let space = parse_nodeset(
        document(concat!(
            r#"<UAObject NodeId="i=100" BrowseName="0:Foo">"#,
            r#"<DisplayName>My display name</DisplayName>"#,
            r#"<Description> padded description </Description>"#,
            r#"</UAObject>"#,
        ))
        .as_bytes(),
    )
    .unwrap();

    let item = space.get(&ua::NodeId::numeric(0, 100)).unwrap();
    assert_eq!(
        item.display_name.text,
        ua::String::from("My display name")
    );
    // Surrounding whitespace is stripped.
    assert_eq!(
        item.description.text,
        ua::String::from("padded description")
    );
}

#[test]
fn malformed_document_is_rejected_entirely() {
    // The first node is fine, the second is malformed: nothing survives.
    let result = parse_nodeset(
        document(concat!(
            r#"<UAObject NodeId="i=1" BrowseName="0:Ok"/>"#,
            r#"<UAObject NodeId="i=2" BrowseName="0:Bad" ValueRank="borked"/>"#,
        ))
        .as_bytes(),
    );
    assert!(result.is_err());
}

#[test]
fn value_rank_only_on_variable_classes() {
    let result = parse_nodeset(
        document(r#"<UAObject NodeId="i=1" BrowseName="0:X" ValueRank="1"/>"#).as_bytes(),
    );
    assert!(result.is_err());
}
