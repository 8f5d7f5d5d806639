//! `AccessControlPolicy` documents.
//!
//! The encoded layout is the persisted and on-wire form of an ACL and must stay
//! byte-stable: fixed indentation, grants in list order, and the `xsi` prefix
//! declared on every `<Grantee>` element.

use crate::acl::{AccessControlList, DEFAULT_MAX_GRANTS};
use crate::error::{Error, Result};
use crate::grant::Grant;
use crate::grantee::{CanonicalUser, Grantee, Group};
use crate::permission::Permission;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use tracing::debug;

pub const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

#[derive(Debug, Clone, Copy)]
pub struct AclXmlCodec {
    max_grants: usize,
}

impl Default for AclXmlCodec {
    fn default() -> Self {
        Self {
            max_grants: DEFAULT_MAX_GRANTS,
        }
    }
}

impl AclXmlCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject documents carrying more than `max_grants` grants.
    pub fn with_max_grants(max_grants: usize) -> Self {
        Self { max_grants }
    }

    pub fn encode(&self, acl: &AccessControlList) -> Vec<u8> {
        self.encode_to_string(acl).into_bytes()
    }

    pub fn encode_to_string(&self, acl: &AccessControlList) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push_str(&format!("\n<AccessControlPolicy xmlns=\"{}\">", S3_NAMESPACE));
        xml.push_str("\n    <Owner>");
        push_user(&mut xml, acl.owner(), 8);
        xml.push_str("\n    </Owner>");

        if acl.is_empty() {
            xml.push_str("\n    <AccessControlList></AccessControlList>");
        } else {
            xml.push_str("\n    <AccessControlList>");
            for grant in acl.grants() {
                push_grant(&mut xml, grant);
            }
            xml.push_str("\n    </AccessControlList>");
        }

        xml.push_str("\n</AccessControlPolicy>");
        xml
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<AccessControlList> {
        let root = parse_document(bytes).map_err(|e| {
            debug!("Rejecting ACL document: {}", e);
            e
        })?;

        if root.name != "AccessControlPolicy" {
            return Err(malformed(format!(
                "expected <AccessControlPolicy>, found <{}>",
                root.name
            )));
        }
        root.container(&["Owner", "AccessControlList"])?;

        let owner = root.required_child("Owner")?;
        owner.container(&["ID", "DisplayName"])?;
        let owner = parse_user(owner)?;

        let list = root.required_child("AccessControlList")?;
        list.container(&["Grant"])?;
        if list.children.len() > self.max_grants {
            return Err(Error::TooManyGrants {
                count: list.children.len(),
                max: self.max_grants,
            });
        }

        let grants = list
            .children
            .iter()
            .map(parse_grant)
            .collect::<Result<Vec<_>>>()?;

        Ok(AccessControlList::from_parts(owner, grants))
    }
}

fn push_user(xml: &mut String, user: &CanonicalUser, indent: usize) {
    let pad = " ".repeat(indent);
    xml.push_str(&format!("\n{}<ID>{}</ID>", pad, escape(user.id())));
    if !user.display_name().is_empty() {
        xml.push_str(&format!(
            "\n{}<DisplayName>{}</DisplayName>",
            pad,
            escape(user.display_name())
        ));
    }
}

fn push_grant(xml: &mut String, grant: &Grant) {
    let grantee = grant.grantee();

    xml.push_str("\n        <Grant>");
    xml.push_str(&format!(
        "\n            <Grantee xmlns:xsi=\"{}\" xsi:type=\"{}\">",
        XSI_NAMESPACE,
        grantee.xsi_type()
    ));
    match grantee {
        Grantee::CanonicalUser(user) => push_user(xml, user, 16),
        Grantee::Group(group) => {
            xml.push_str(&format!("\n                <URI>{}</URI>", escape(group.uri())));
        }
        Grantee::EmailAddress(email) => {
            xml.push_str(&format!(
                "\n                <EmailAddress>{}</EmailAddress>",
                escape(email.as_str())
            ));
        }
    }
    xml.push_str("\n            </Grantee>");
    xml.push_str(&format!(
        "\n            <Permission>{}</Permission>",
        grant.permission()
    ));
    xml.push_str("\n        </Grant>");
}

fn malformed(reason: impl Into<String>) -> Error {
    Error::MalformedAclXml(reason.into())
}

struct Attribute {
    namespace: Option<String>,
    local: String,
    value: String,
}

/// A parsed element, keyed by local name.
struct Element {
    name: String,
    attributes: Vec<Attribute>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn open(reader: &NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| malformed(e.to_string()))?;
            let (namespace, local) = reader.resolve_attribute(attr.key);
            attributes.push(Attribute {
                namespace: match namespace {
                    ResolveResult::Bound(Namespace(ns)) => {
                        Some(String::from_utf8_lossy(ns).into_owned())
                    }
                    _ => None,
                },
                local: String::from_utf8_lossy(local.as_ref()).into_owned(),
                value: attr.unescape_value()?.into_owned(),
            });
        }

        Ok(Self {
            name,
            attributes,
            text: String::new(),
            children: Vec::new(),
        })
    }

    fn child(&self, name: &str) -> Result<Option<&Element>> {
        let mut matches = self.children.iter().filter(|c| c.name == name);
        let first = matches.next();
        if matches.next().is_some() {
            return Err(malformed(format!(
                "<{}> appears more than once in <{}>",
                name, self.name
            )));
        }
        Ok(first)
    }

    fn required_child(&self, name: &str) -> Result<&Element> {
        self.child(name)?
            .ok_or_else(|| malformed(format!("missing <{}> in <{}>", name, self.name)))
    }

    fn leaf_text(&self) -> Result<&str> {
        if let Some(child) = self.children.first() {
            return Err(malformed(format!(
                "unexpected <{}> in <{}>",
                child.name, self.name
            )));
        }
        Ok(self.text.as_str())
    }

    /// Identifier text (ids, URIs, addresses, permissions), trimmed.
    fn required_text(&self, name: &str) -> Result<&str> {
        let text = self.required_child(name)?.leaf_text()?.trim();
        if text.is_empty() {
            return Err(malformed(format!("empty <{}> in <{}>", name, self.name)));
        }
        Ok(text)
    }

    /// Free text, kept verbatim.
    fn optional_text(&self, name: &str) -> Result<&str> {
        match self.child(name)? {
            Some(child) => child.leaf_text(),
            None => Ok(""),
        }
    }

    /// Only the named children and no text of its own.
    fn container(&self, allowed: &[&str]) -> Result<()> {
        if !self.text.trim().is_empty() {
            return Err(malformed(format!("unexpected text in <{}>", self.name)));
        }
        match self
            .children
            .iter()
            .find(|c| !allowed.contains(&c.name.as_str()))
        {
            Some(unexpected) => Err(malformed(format!(
                "unexpected <{}> in <{}>",
                unexpected.name, self.name
            ))),
            None => Ok(()),
        }
    }

    fn xsi_type(&self) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.local == "type" && a.namespace.as_deref() == Some(XSI_NAMESPACE))
            .map(|a| a.value.as_str())
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_some() => return Err(malformed("multiple root elements")),
        None => *root = Some(element),
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(current) => current.text.push_str(text),
        None if text.trim().is_empty() => {}
        None => return Err(malformed("text outside the root element")),
    }
    Ok(())
}

fn parse_document(bytes: &[u8]) -> Result<Element> {
    let mut reader = NsReader::from_reader(bytes);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => stack.push(Element::open(&reader, e)?),
            Event::Empty(ref e) => {
                let element = Element::open(&reader, e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed("unbalanced closing tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(ref e) => push_text(&mut stack, &e.unescape()?)?,
            Event::CData(ref e) => push_text(&mut stack, &String::from_utf8_lossy(e))?,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(malformed("unexpected end of document"));
    }
    root.ok_or_else(|| malformed("empty document"))
}

fn parse_user(element: &Element) -> Result<CanonicalUser> {
    let id = element.required_text("ID")?;
    let display_name = element.optional_text("DisplayName")?;
    CanonicalUser::new(id, display_name).map_err(|e| malformed(e.to_string()))
}

fn parse_grant(element: &Element) -> Result<Grant> {
    element.container(&["Grantee", "Permission"])?;

    let grantee = parse_grantee(element.required_child("Grantee")?)?;
    let permission: Permission = element.required_text("Permission")?.parse()?;

    Ok(Grant::new(grantee, permission))
}

fn parse_grantee(element: &Element) -> Result<Grantee> {
    element.container(&["ID", "DisplayName", "URI", "EmailAddress"])?;

    let xsi_type = element
        .xsi_type()
        .ok_or_else(|| malformed("<Grantee> is missing xsi:type"))?;

    match xsi_type {
        "CanonicalUser" => Ok(Grantee::CanonicalUser(parse_user(element)?)),
        "Group" => {
            let group: Group = element.required_text("URI")?.parse()?;
            Ok(Grantee::Group(group))
        }
        "AmazonCustomerByEmail" => Grantee::email(element.required_text("EmailAddress")?)
            .map_err(|e| malformed(e.to_string())),
        other => Err(malformed(format!("unknown grantee xsi:type {}", other))),
    }
}
