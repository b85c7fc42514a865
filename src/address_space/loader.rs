//! Streaming UANodeSet XML loader.
//!
//! An event-driven parser over [`quick_xml::reader::NsReader`] materializes
//! nodes, references, aliases and typed values into an [`AddressSpace`].
//! Aliases live only for the duration of the load; every reference type id
//! in the resulting space is fully resolved. Any malformed input aborts the
//! load and discards the partially built space as a whole.

use std::fs::File;
use std::io::BufRead;
use std::path::Path;
use std::str::FromStr;

use log::{debug, error};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

use crate::address_space::{AddressSpace, AddressSpaceItem, NodeData, Reference};
use crate::collections::Dictionary;
use crate::ua::{self, base64};
use crate::{Error, Result};

const UA_NODESET_NS: &[u8] = b"http://opcfoundation.org/UA/2011/03/UANodeSet.xsd";
const UA_TYPES_NS: &[u8] = b"http://opcfoundation.org/UA/2008/02/Types.xsd";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Beginning of the document.
    Start,
    /// In the UANodeSet element.
    NodeSet,
    /// In an Aliases element.
    Aliases,
    /// ... in one of its Alias children.
    Alias,
    /// In a UANode subtype element.
    Node,
    /// ... in its DisplayName.
    NodeDisplayName,
    /// ... in its Description.
    NodeDescription,
    /// ... in its References.
    NodeReferences,
    /// ... in one Reference.
    NodeReference,
    /// In the Value element of a UAVariable/UAVariableType.
    NodeValue,
    /// ... reading a scalar.
    NodeValueScalar,
    /// ... reading the elements of a ListOf* array.
    NodeValueArray,
}

struct ParseContext {
    state: ParseState,
    /// While set, elements are ignored until the matching end tag;
    /// the counter tracks same-name nesting.
    skip: Option<(Vec<u8>, u32)>,
    /// Character data of the current element, accumulated across split
    /// text events.
    char_data: String,
    aliases: Dictionary<String, String>,
    current_alias: Option<String>,
    current_value_kind: ua::VariantKind,
    current_value_is_array: bool,
    item: Option<AddressSpaceItem>,
    references: Vec<Reference>,
    list_items: Vec<ua::Variant>,
    space: AddressSpace,
}

impl ParseContext {
    fn new() -> Self {
        Self {
            state: ParseState::Start,
            skip: None,
            char_data: String::new(),
            aliases: Dictionary::new(String::new()),
            current_alias: None,
            current_value_kind: ua::VariantKind::Null,
            current_value_is_array: false,
            item: None,
            references: Vec::new(),
            list_items: Vec::new(),
            space: AddressSpace::new(),
        }
    }

    fn take_char_data(&mut self) -> String {
        let stripped = self.char_data.trim().to_owned();
        self.char_data.clear();
        stripped
    }

    fn item_mut(&mut self) -> &mut AddressSpaceItem {
        self.item.as_mut().expect("node item under construction")
    }

    fn resolve_alias<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(&name.to_owned()).map_or(name, String::as_str)
    }
}

/// Loads a UANodeSet document from a file.
///
/// # Errors
///
/// Fails with `Nok` on unreadable or malformed input; nothing of a failed
/// load is kept.
pub fn load_nodeset_file(path: &Path) -> Result<AddressSpace> {
    let file = File::open(path).map_err(|err| {
        error!("cannot open nodeset {}: {err}", path.display());
        Error::Nok
    })?;
    parse_nodeset(std::io::BufReader::new(file))
}

/// Parses a UANodeSet document from a byte stream.
///
/// # Errors
///
/// Fails with `Nok` on malformed input; the partially built address space
/// is discarded as a whole.
pub fn parse_nodeset(input: impl BufRead) -> Result<AddressSpace> {
    let mut reader = NsReader::from_reader(input);
    // Self-closing elements arrive as separate start and end events.
    reader.config_mut().expand_empty_elements = true;

    let mut ctx = ParseContext::new();
    let mut buf = Vec::new();

    loop {
        let event = reader.read_resolved_event_into(&mut buf).map_err(|err| {
            error!("XML parsing failed: {err}");
            Error::Nok
        })?;
        match event {
            (ns, Event::Start(start)) => handle_start(&mut ctx, &ns, &start)?,
            (_, Event::End(end)) => {
                let name = end.name().as_ref().to_vec();
                handle_end(&mut ctx, &name)?;
            }
            (_, Event::Text(text)) => {
                if ctx.skip.is_none() {
                    let text = text.unescape().map_err(|err| {
                        error!("bad character data: {err}");
                        Error::Nok
                    })?;
                    handle_char_data(&mut ctx, &text);
                }
            }
            (_, Event::CData(data)) => {
                if ctx.skip.is_none() {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    handle_char_data(&mut ctx, &text);
                }
            }
            (_, Event::Eof) => break,
            _ => {}
        }
        buf.clear();
    }

    if ctx.state != ParseState::Start && ctx.state != ParseState::NodeSet {
        error!("truncated nodeset document");
        return Err(Error::Nok);
    }

    debug!("nodeset loaded: {} items", ctx.space.len());
    Ok(ctx.space)
}

fn ns_is(ns: &ResolveResult<'_>, expected: &[u8]) -> bool {
    matches!(ns, ResolveResult::Bound(bound) if bound.0 == expected)
}

fn attr_value(attr: &Attribute<'_>) -> Result<String> {
    attr.unescape_value()
        .map(|value| value.into_owned())
        .map_err(|err| {
            error!("bad attribute value: {err}");
            Error::Nok
        })
}

fn node_class_from_tag(local: &[u8]) -> Option<ua::NodeClass> {
    Some(match local {
        b"UADataType" => ua::NodeClass::DataType,
        b"UAMethod" => ua::NodeClass::Method,
        b"UAObject" => ua::NodeClass::Object,
        b"UAObjectType" => ua::NodeClass::ObjectType,
        b"UAReferenceType" => ua::NodeClass::ReferenceType,
        b"UAVariable" => ua::NodeClass::Variable,
        b"UAVariableType" => ua::NodeClass::VariableType,
        b"UAView" => ua::NodeClass::View,
        _ => return None,
    })
}

/// Maps a Types-namespace element name onto a built-in kind and the
/// array flag (`ListOf*` elements).
fn kind_from_tag(local: &[u8]) -> Option<(ua::VariantKind, bool)> {
    let (name, is_array) = match local.strip_prefix(b"ListOf") {
        Some(rest) => (rest, true),
        None => (local, false),
    };
    let kind = match name {
        b"Boolean" => ua::VariantKind::Boolean,
        b"SByte" => ua::VariantKind::SByte,
        b"Byte" => ua::VariantKind::Byte,
        b"Int16" => ua::VariantKind::Int16,
        b"UInt16" => ua::VariantKind::UInt16,
        b"Int32" => ua::VariantKind::Int32,
        b"UInt32" => ua::VariantKind::UInt32,
        b"Int64" => ua::VariantKind::Int64,
        b"UInt64" => ua::VariantKind::UInt64,
        b"Float" => ua::VariantKind::Float,
        b"Double" => ua::VariantKind::Double,
        b"String" => ua::VariantKind::String,
        b"DateTime" => ua::VariantKind::DateTime,
        b"Guid" => ua::VariantKind::Guid,
        b"ByteString" => ua::VariantKind::ByteString,
        b"XmlElement" => ua::VariantKind::XmlElement,
        b"NodeId" if !is_array => ua::VariantKind::NodeId,
        b"ExpandedNodeId" if !is_array => ua::VariantKind::ExpandedNodeId,
        b"StatusCode" if !is_array => ua::VariantKind::StatusCode,
        b"QualifiedName" if !is_array => ua::VariantKind::QualifiedName,
        b"LocalizedText" if !is_array => ua::VariantKind::LocalizedText,
        _ => return None,
    };
    Some((kind, is_array))
}

fn start_skip(ctx: &mut ParseContext, start: &BytesStart<'_>) {
    debug_assert!(ctx.skip.is_none());
    ctx.skip = Some((start.name().as_ref().to_vec(), 1));
}

fn handle_start(ctx: &mut ParseContext, ns: &ResolveResult<'_>, start: &BytesStart<'_>) -> Result<()> {
    if let Some((name, depth)) = &mut ctx.skip {
        if start.name().as_ref() == name.as_slice() {
            *depth += 1;
        }
        return Ok(());
    }

    let local = start.local_name();
    let local = local.as_ref();
    let in_nodeset_ns = ns_is(ns, UA_NODESET_NS);

    match ctx.state {
        ParseState::Start => {
            if !in_nodeset_ns || local != b"UANodeSet" {
                error!("unexpected root element");
                return Err(Error::Nok);
            }
            ctx.state = ParseState::NodeSet;
        }
        ParseState::NodeSet => {
            if in_nodeset_ns {
                if let Some(node_class) = node_class_from_tag(local) {
                    start_node(ctx, node_class, start)?;
                    return Ok(());
                }
                if local == b"Aliases" {
                    ctx.state = ParseState::Aliases;
                    return Ok(());
                }
            }
            start_skip(ctx, start);
        }
        ParseState::Aliases => {
            if in_nodeset_ns && local == b"Alias" {
                start_alias(ctx, start)?;
            } else {
                start_skip(ctx, start);
            }
        }
        ParseState::Alias => {
            error!("unexpected element inside Alias");
            return Err(Error::Nok);
        }
        ParseState::Node => {
            if in_nodeset_ns && local == b"DisplayName" {
                ctx.state = ParseState::NodeDisplayName;
            } else if in_nodeset_ns && local == b"Description" {
                ctx.state = ParseState::NodeDescription;
            } else if in_nodeset_ns && local == b"References" {
                ctx.state = ParseState::NodeReferences;
            } else if in_nodeset_ns && local == b"Value" && item_has_value(ctx) {
                ctx.state = ParseState::NodeValue;
            } else {
                start_skip(ctx, start);
            }
        }
        ParseState::NodeReferences => {
            if in_nodeset_ns && local == b"Reference" {
                start_reference(ctx, start)?;
            } else {
                start_skip(ctx, start);
            }
        }
        ParseState::NodeReference => {
            error!("unexpected element inside Reference");
            return Err(Error::Nok);
        }
        ParseState::NodeDisplayName | ParseState::NodeDescription => {
            error!("unexpected element inside DisplayName/Description");
            return Err(Error::Nok);
        }
        ParseState::NodeValue => {
            let Some((kind, is_array)) = ns_is(ns, UA_TYPES_NS)
                .then(|| kind_from_tag(local))
                .flatten()
            else {
                debug!("unsupported value type, skipping");
                start_skip(ctx, start);
                return Ok(());
            };
            ctx.current_value_kind = kind;
            ctx.current_value_is_array = is_array;
            if is_array {
                debug_assert!(ctx.list_items.is_empty());
                ctx.state = ParseState::NodeValueArray;
            } else {
                ctx.state = ParseState::NodeValueScalar;
            }
        }
        ParseState::NodeValueScalar => {
            error!("unexpected element while parsing scalar value");
            return Err(Error::Nok);
        }
        ParseState::NodeValueArray => {
            let Some((kind, is_array)) = ns_is(ns, UA_TYPES_NS)
                .then(|| kind_from_tag(local))
                .flatten()
            else {
                error!("unsupported element in array value");
                return Err(Error::Nok);
            };
            if is_array {
                error!("arrays cannot be nested");
                return Err(Error::Nok);
            }
            if kind != ctx.current_value_kind {
                error!("array element type does not match array type");
                return Err(Error::Nok);
            }
            ctx.state = ParseState::NodeValueScalar;
        }
    }
    Ok(())
}

fn item_has_value(ctx: &ParseContext) -> bool {
    matches!(
        ctx.item.as_ref().map(AddressSpaceItem::node_class),
        Some(ua::NodeClass::Variable | ua::NodeClass::VariableType)
    )
}

fn start_alias(ctx: &mut ParseContext, start: &BytesStart<'_>) -> Result<()> {
    debug_assert!(ctx.current_alias.is_none());
    for attr in start.attributes().flatten() {
        if attr.key.as_ref() == b"Alias" {
            ctx.current_alias = Some(attr_value(&attr)?);
            break;
        }
    }
    ctx.state = ParseState::Alias;
    Ok(())
}

fn start_node(
    ctx: &mut ParseContext,
    node_class: ua::NodeClass,
    start: &BytesStart<'_>,
) -> Result<()> {
    debug_assert!(ctx.item.is_none());
    let mut item = AddressSpaceItem::new(node_class);
    let is_variable_class =
        matches!(node_class, ua::NodeClass::Variable | ua::NodeClass::VariableType);
    let mut has_node_id = false;

    for attr in start.attributes().flatten() {
        match attr.key.as_ref() {
            b"NodeId" => {
                let value = attr_value(&attr)?;
                let node_id = ua::NodeId::from_str(&value).map_err(|_| {
                    error!("invalid NodeId: {value}");
                    Error::Nok
                })?;
                // OPC UA namespace-0 nodes keep a Good status; elsewhere a
                // value element must be present to leave Uncertain.
                let default_status = if node_id.namespace == 0 {
                    ua::StatusCode::GOOD
                } else {
                    ua::StatusCode::UNCERTAIN_INITIAL_VALUE
                };
                match &mut item.data {
                    NodeData::Variable(data) => data.value_status = default_status,
                    NodeData::VariableType(data) => data.value_status = default_status,
                    _ => {}
                }
                item.node_id = node_id;
                has_node_id = true;
            }
            b"BrowseName" => {
                let value = attr_value(&attr)?;
                item.browse_name = ua::QualifiedName::from_str(&value).map_err(|_| {
                    error!("invalid browse name: {value}");
                    Error::Nok
                })?;
            }
            b"DataType" => {
                if !is_variable_class {
                    error!("unexpected DataType attribute on {node_class} node");
                    return Err(Error::Nok);
                }
                let value = attr_value(&attr)?;
                let resolved = ctx.resolve_alias(&value);
                let data_type = ua::NodeId::from_str(resolved).map_err(|_| {
                    error!("invalid DataType NodeId: {resolved}");
                    Error::Nok
                })?;
                match &mut item.data {
                    NodeData::Variable(data) => data.data_type = data_type,
                    NodeData::VariableType(data) => data.data_type = data_type,
                    _ => unreachable!(),
                }
            }
            b"ValueRank" => {
                if !is_variable_class {
                    error!("unexpected ValueRank attribute on {node_class} node");
                    return Err(Error::Nok);
                }
                let value = attr_value(&attr)?;
                let value_rank = value.parse::<i32>().map_err(|_| {
                    error!("incorrect ValueRank value: {value}");
                    Error::Nok
                })?;
                match &mut item.data {
                    NodeData::Variable(data) => data.value_rank = value_rank,
                    NodeData::VariableType(data) => data.value_rank = value_rank,
                    _ => unreachable!(),
                }
            }
            b"AccessLevel" => {
                if node_class != ua::NodeClass::Variable {
                    error!("unexpected AccessLevel attribute on {node_class} node");
                    return Err(Error::Nok);
                }
                let value = attr_value(&attr)?;
                let access_level = value.parse::<u8>().map_err(|_| {
                    error!("invalid AccessLevel value: {value}");
                    Error::Nok
                })?;
                if let NodeData::Variable(data) = &mut item.data {
                    data.access_level = access_level;
                }
            }
            _ => {} // Unknown attributes are skipped.
        }
    }

    if !has_node_id {
        error!("node element without NodeId attribute");
        return Err(Error::Nok);
    }

    ctx.item = Some(item);
    ctx.state = ParseState::Node;
    Ok(())
}

fn start_reference(ctx: &mut ParseContext, start: &BytesStart<'_>) -> Result<()> {
    let mut reference_type_id = ua::NodeId::null();
    let mut is_inverse = false;

    for attr in start.attributes().flatten() {
        match attr.key.as_ref() {
            b"ReferenceType" => {
                let value = attr_value(&attr)?;
                let resolved = ctx.resolve_alias(&value);
                reference_type_id = ua::NodeId::from_str(resolved).map_err(|_| {
                    error!("cannot parse ReferenceType '{resolved}' into a NodeId");
                    Error::Nok
                })?;
            }
            b"IsForward" => {
                // Case-sensitive: anything but "true" is inverse.
                is_inverse = attr_value(&attr)? != "true";
            }
            _ => {}
        }
    }

    ctx.references.push(Reference {
        reference_type_id,
        is_inverse,
        target_id: ua::ExpandedNodeId::null(),
    });
    ctx.state = ParseState::NodeReference;
    Ok(())
}

fn handle_char_data(ctx: &mut ParseContext, text: &str) {
    match ctx.state {
        ParseState::NodeDisplayName
        | ParseState::NodeDescription
        | ParseState::Alias
        | ParseState::NodeReference
        | ParseState::NodeValueScalar => ctx.char_data.push_str(text),
        _ => {}
    }
}

fn handle_end(ctx: &mut ParseContext, qname: &[u8]) -> Result<()> {
    if let Some((name, depth)) = &mut ctx.skip {
        // Skip until the matching end of the recorded qualified name.
        if name.as_slice() == qname {
            *depth -= 1;
            if *depth == 0 {
                ctx.skip = None;
            }
        }
        return Ok(());
    }

    match ctx.state {
        ParseState::Start => {
            error!("end element in start state");
            return Err(Error::Nok);
        }
        ParseState::NodeSet => {}
        ParseState::Aliases => ctx.state = ParseState::NodeSet,
        ParseState::Alias => {
            finalize_alias(ctx)?;
            ctx.state = ParseState::Aliases;
        }
        ParseState::Node => {
            finalize_node(ctx)?;
            ctx.state = ParseState::NodeSet;
        }
        ParseState::NodeDisplayName | ParseState::NodeDescription => {
            let text = ctx.take_char_data();
            let is_display_name = ctx.state == ParseState::NodeDisplayName;
            let item = ctx.item_mut();
            let target = if is_display_name {
                &mut item.display_name
            } else {
                &mut item.description
            };
            target.text.clear();
            if !text.is_empty() {
                target.text = ua::String::from(text.as_str());
            }
            ctx.state = ParseState::Node;
        }
        ParseState::NodeReferences => ctx.state = ParseState::Node,
        ParseState::NodeReference => {
            finalize_reference(ctx)?;
            ctx.state = ParseState::NodeReferences;
        }
        ParseState::NodeValue => ctx.state = ParseState::Node,
        ParseState::NodeValueScalar => {
            debug_assert_ne!(ctx.current_value_kind, ua::VariantKind::Null);
            if ctx.current_value_is_array {
                append_array_element(ctx)?;
                ctx.state = ParseState::NodeValueArray;
            } else {
                set_scalar_value(ctx)?;
                ctx.current_value_kind = ua::VariantKind::Null;
                ctx.state = ParseState::NodeValue;
            }
        }
        ParseState::NodeValueArray => {
            set_array_value(ctx)?;
            ctx.current_value_kind = ua::VariantKind::Null;
            ctx.current_value_is_array = false;
            ctx.state = ParseState::NodeValue;
        }
    }
    Ok(())
}

fn finalize_alias(ctx: &mut ParseContext) -> Result<()> {
    let Some(alias) = ctx.current_alias.take() else {
        error!("missing Alias attribute on Alias");
        return Err(Error::Nok);
    };
    let target = ctx.take_char_data();
    ctx.aliases.insert(alias, target).map_err(|_| Error::Nok)
}

fn finalize_reference(ctx: &mut ParseContext) -> Result<()> {
    let text = ctx.take_char_data();
    let target_id = ua::NodeId::from_str(&text).map_err(|_| {
        error!("cannot parse reference target '{text}' into a NodeId");
        Error::Nok
    })?;
    let reference = ctx.references.last_mut().expect("reference under construction");
    reference.target_id = ua::ExpandedNodeId::local(target_id);
    Ok(())
}

fn finalize_node(ctx: &mut ParseContext) -> Result<()> {
    let mut item = ctx.item.take().expect("node item under construction");
    item.references = std::mem::take(&mut ctx.references);
    ctx.space.append(item).map_err(|_| Error::Nok)
}

fn parse_scalar(kind: ua::VariantKind, text: &str) -> Result<ua::Variant> {
    fn invalid(kind: ua::VariantKind, text: &str) -> Error {
        error!("invalid {kind:?} value: '{text}'");
        Error::Nok
    }

    Ok(match kind {
        ua::VariantKind::Boolean => ua::Variant::Boolean(text == "true"),
        ua::VariantKind::SByte => {
            ua::Variant::SByte(text.parse().map_err(|_| invalid(kind, text))?)
        }
        ua::VariantKind::Byte => ua::Variant::Byte(text.parse().map_err(|_| invalid(kind, text))?),
        ua::VariantKind::Int16 => {
            ua::Variant::Int16(text.parse().map_err(|_| invalid(kind, text))?)
        }
        ua::VariantKind::UInt16 => {
            ua::Variant::UInt16(text.parse().map_err(|_| invalid(kind, text))?)
        }
        ua::VariantKind::Int32 => {
            ua::Variant::Int32(text.parse().map_err(|_| invalid(kind, text))?)
        }
        ua::VariantKind::UInt32 => {
            ua::Variant::UInt32(text.parse().map_err(|_| invalid(kind, text))?)
        }
        ua::VariantKind::Int64 => {
            ua::Variant::Int64(text.parse().map_err(|_| invalid(kind, text))?)
        }
        ua::VariantKind::UInt64 => {
            ua::Variant::UInt64(text.parse().map_err(|_| invalid(kind, text))?)
        }
        ua::VariantKind::Float => {
            let value: f64 = text.parse().map_err(|_| invalid(kind, text))?;
            if !value.is_finite() || value.abs() > f64::from(f32::MAX) {
                return Err(invalid(kind, text));
            }
            ua::Variant::Float(value as f32)
        }
        ua::VariantKind::Double => {
            let value: f64 = text.parse().map_err(|_| invalid(kind, text))?;
            if !value.is_finite() {
                return Err(invalid(kind, text));
            }
            ua::Variant::Double(value)
        }
        ua::VariantKind::String => ua::Variant::String(ua::String::from(text)),
        ua::VariantKind::XmlElement => ua::Variant::XmlElement(ua::XmlElement::from(text)),
        ua::VariantKind::DateTime => {
            // Tick-count form; the XML date syntax is not supported here.
            ua::Variant::DateTime(ua::DateTime::from_ticks(
                text.parse().map_err(|_| invalid(kind, text))?,
            ))
        }
        ua::VariantKind::Guid => {
            ua::Variant::Guid(ua::Guid::from_str(text).map_err(|_| invalid(kind, text))?)
        }
        ua::VariantKind::ByteString => {
            let bytes = base64::decode(text).map_err(|_| invalid(kind, text))?;
            ua::Variant::ByteString(ua::ByteString::from_bytes(bytes))
        }
        ua::VariantKind::NodeId => ua::Variant::NodeId(Box::new(
            ua::NodeId::from_str(text).map_err(|_| invalid(kind, text))?,
        )),
        ua::VariantKind::ExpandedNodeId => ua::Variant::ExpandedNodeId(Box::new(
            ua::ExpandedNodeId::local(ua::NodeId::from_str(text).map_err(|_| invalid(kind, text))?),
        )),
        ua::VariantKind::StatusCode => ua::Variant::StatusCode(ua::StatusCode::new(
            text.parse().map_err(|_| invalid(kind, text))?,
        )),
        ua::VariantKind::QualifiedName => ua::Variant::QualifiedName(Box::new(
            ua::QualifiedName::from_str(text).map_err(|_| invalid(kind, text))?,
        )),
        ua::VariantKind::LocalizedText => {
            ua::Variant::LocalizedText(Box::new(ua::LocalizedText::text_only(text)))
        }
        _ => return Err(invalid(kind, text)),
    })
}

fn set_scalar_value(ctx: &mut ParseContext) -> Result<()> {
    let text = ctx.take_char_data();
    let value = parse_scalar(ctx.current_value_kind, &text)?;
    let item = ctx.item_mut();
    match &mut item.data {
        NodeData::Variable(data) => {
            data.value = value;
            data.value_status = ua::StatusCode::GOOD;
        }
        NodeData::VariableType(data) => {
            data.value = value;
            data.value_status = ua::StatusCode::GOOD;
        }
        _ => unreachable!("value elements only occur on variable classes"),
    }
    Ok(())
}

fn append_array_element(ctx: &mut ParseContext) -> Result<()> {
    let text = ctx.take_char_data();
    let value = parse_scalar(ctx.current_value_kind, &text)?;
    ctx.list_items.push(value);
    Ok(())
}

fn set_array_value(ctx: &mut ParseContext) -> Result<()> {
    let values = std::mem::take(&mut ctx.list_items);
    let value =
        ua::Variant::array(ctx.current_value_kind, values).map_err(|_| Error::Nok)?;
    let item = ctx.item_mut();
    match &mut item.data {
        NodeData::Variable(data) => {
            data.value = value;
            data.value_status = ua::StatusCode::GOOD;
        }
        NodeData::VariableType(data) => {
            data.value = value;
            data.value_status = ua::StatusCode::GOOD;
        }
        _ => unreachable!("value elements only occur on variable classes"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS_DECL: &str = concat!(
        "xmlns=\"http://opcfoundation.org/UA/2011/03/UANodeSet.xsd\" ",
        "xmlns:uax=\"http://opcfoundation.org/UA/2008/02/Types.xsd\"",
    );

    fn parse(body: &str) -> Result<AddressSpace> {
        let document = format!("<?xml version=\"1.0\"?><UANodeSet {NS_DECL}>{body}</UANodeSet>");
        parse_nodeset(document.as_bytes())
    }

    #[test]
    fn trivial_object_node() {
        let space = parse(r#"<UAObject NodeId="i=100" BrowseName="0:Foo"></UAObject>"#).unwrap();
        assert_eq!(space.len(), 1);
        let item = space.get(&ua::NodeId::numeric(0, 100)).unwrap();
        assert_eq!(item.node_class(), ua::NodeClass::Object);
        assert_eq!(item.browse_name, ua::QualifiedName::new(0, "Foo"));
        assert!(item.references.is_empty());
    }

    #[test]
    fn self_closing_node_element() {
        let space = parse(r#"<UAObject NodeId="i=101" BrowseName="0:Bar"/>"#).unwrap();
        assert_eq!(space.len(), 1);
    }

    #[test]
    fn alias_resolution_in_references() {
        let space = parse(concat!(
            r#"<Aliases><Alias Alias="HasComponent">i=47</Alias></Aliases>"#,
            r#"<UAObject NodeId="i=100" BrowseName="0:Foo"><References>"#,
            r#"<Reference ReferenceType="HasComponent" IsForward="true">i=84</Reference>"#,
            r#"</References></UAObject>"#,
        ))
        .unwrap();
        let item = space.get(&ua::NodeId::numeric(0, 100)).unwrap();
        assert_eq!(item.references.len(), 1);
        let reference = &item.references[0];
        assert_eq!(reference.reference_type_id, ua::NodeId::numeric(0, 47));
        assert!(!reference.is_inverse);
        assert_eq!(
            reference.target_id,
            ua::ExpandedNodeId::local(ua::NodeId::numeric(0, 84))
        );
    }

    #[test]
    fn is_forward_is_case_sensitive() {
        let space = parse(concat!(
            r#"<UAObject NodeId="i=1" BrowseName="0:N"><References>"#,
            r#"<Reference ReferenceType="i=47" IsForward="True">i=2</Reference>"#,
            r#"</References></UAObject>"#,
        ))
        .unwrap();
        let item = space.get(&ua::NodeId::numeric(0, 1)).unwrap();
        assert!(item.references[0].is_inverse);
    }

    #[test]
    fn byte_string_value_is_base64_decoded() {
        let space = parse(concat!(
            r#"<UAVariable NodeId="ns=1;i=5" BrowseName="1:Blob" DataType="i=15">"#,
            r#"<Value><uax:ByteString>SGVsbG8=</uax:ByteString></Value>"#,
            r#"</UAVariable>"#,
        ))
        .unwrap();
        let item = space.get(&ua::NodeId::numeric(1, 5)).unwrap();
        assert_eq!(
            item.value(),
            Some(&ua::Variant::ByteString(ua::ByteString::from(
                &b"Hello"[..]
            )))
        );
        assert_eq!(item.value_status(), Some(ua::StatusCode::GOOD));
    }

    #[test]
    fn bad_base64_fails_the_load() {
        let result = parse(concat!(
            r#"<UAVariable NodeId="ns=1;i=5" BrowseName="1:Blob" DataType="i=15">"#,
            r#"<Value><uax:ByteString>S*GVsbG8=</uax:ByteString></Value>"#,
            r#"</UAVariable>"#,
        ));
        assert!(result.is_err());
    }

    #[test]
    fn value_status_defaults() {
        let space = parse(concat!(
            r#"<UAVariable NodeId="ns=1;i=6" BrowseName="1:NoValue" DataType="i=6"/>"#,
            r#"<UAVariable NodeId="i=2256" BrowseName="0:Ns0" DataType="i=6"/>"#,
            r#"<UAVariable NodeId="ns=1;i=7" BrowseName="1:WithValue" DataType="i=6">"#,
            r#"<Value><uax:Int32>42</uax:Int32></Value></UAVariable>"#,
        ))
        .unwrap();
        assert_eq!(
            space.get(&ua::NodeId::numeric(1, 6)).unwrap().value_status(),
            Some(ua::StatusCode::UNCERTAIN_INITIAL_VALUE)
        );
        assert_eq!(
            space.get(&ua::NodeId::numeric(0, 2256)).unwrap().value_status(),
            Some(ua::StatusCode::GOOD)
        );
        assert_eq!(
            space.get(&ua::NodeId::numeric(1, 7)).unwrap().value_status(),
            Some(ua::StatusCode::GOOD)
        );
    }

    #[test]
    fn array_value() {
        let space = parse(concat!(
            r#"<UAVariable NodeId="ns=1;i=8" BrowseName="1:Arr" DataType="i=6" ValueRank="1">"#,
            r#"<Value><uax:ListOfInt32><uax:Int32>1</uax:Int32><uax:Int32>2</uax:Int32>"#,
            r#"<uax:Int32>3</uax:Int32></uax:ListOfInt32></Value></UAVariable>"#,
        ))
        .unwrap();
        let item = space.get(&ua::NodeId::numeric(1, 8)).unwrap();
        let expected = ua::Variant::array(
            ua::VariantKind::Int32,
            vec![
                ua::Variant::Int32(1),
                ua::Variant::Int32(2),
                ua::Variant::Int32(3),
            ],
        )
        .unwrap();
        assert_eq!(item.value(), Some(&expected));
    }

    #[test]
    fn mismatched_array_element_type_fails() {
        let result = parse(concat!(
            r#"<UAVariable NodeId="ns=1;i=9" BrowseName="1:Bad" DataType="i=6" ValueRank="1">"#,
            r#"<Value><uax:ListOfInt32><uax:Boolean>true</uax:Boolean></uax:ListOfInt32>"#,
            r#"</Value></UAVariable>"#,
        ));
        assert!(result.is_err());
    }

    #[test]
    fn unknown_elements_are_skipped() {
        let space = parse(concat!(
            r#"<Models><Model ModelUri="urn:x"><Nested/></Model></Models>"#,
            r#"<UAObject NodeId="i=100" BrowseName="0:Foo">"#,
            r#"<Extensions><Extension><Inner>text</Inner></Extension></Extensions>"#,
            r#"</UAObject>"#,
        ))
        .unwrap();
        assert_eq!(space.len(), 1);
    }

    #[test]
    fn integer_range_checks() {
        assert!(parse(concat!(
            r#"<UAVariable NodeId="ns=1;i=10" BrowseName="1:V" DataType="i=2">"#,
            r#"<Value><uax:SByte>300</uax:SByte></Value></UAVariable>"#,
        ))
        .is_err());
    }

    #[test]
    fn malformed_document_discards_space() {
        let result = parse(r#"<UAObject NodeId="not-a-nodeid" BrowseName="0:X"/>"#);
        assert!(result.is_err());
    }

    #[test]
    fn wrong_root_element_fails() {
        assert!(parse_nodeset("<NotANodeSet/>".as_bytes()).is_err());
    }
}
