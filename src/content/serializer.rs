//! Resource documents: XML reading and writing per resource type.
//!
//! Document shape (one file per revision):
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <page id="4bd6c1a2-..." path="/about/" version="work">
//!   <content language="de" original="true" title="Über uns"><![CDATA[...]]></content>
//!   <content language="en" title="About"><![CDATA[...]]></content>
//! </page>
//! ```
//!
//! The root element name is the resource type. Files and images name their
//! binary payload with a `filename` attribute on each `content`.

use super::{LocalizedContent, Resource, ResourceUri, Version, types};
use crate::language::{LanguageError, LanguageRegistry};
use parking_lot::RwLock;
use quick_xml::Reader;
use quick_xml::escape::{escape, resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerializerError {
    #[error("malformed resource document: {0}")]
    Malformed(String),

    #[error("expected a `{expected}` document, found `{found}`")]
    TypeMismatch { expected: String, found: String },

    #[error("invalid version `{0}`")]
    Version(String),

    #[error(transparent)]
    Language(#[from] LanguageError),
}

/// Reader and writer for one resource type.
pub trait ResourceSerializer: Send + Sync {
    /// Type handled, equal to the document root element name.
    fn resource_type(&self) -> &str;

    /// Parse a revision document of `site`.
    fn read(&self, document: &str, site: &str) -> Result<Resource, SerializerError>;

    /// Render a revision document.
    fn write(&self, resource: &Resource) -> Result<String, SerializerError>;
}

// ============================================================================
// Registry
// ============================================================================

/// Resource type -> serializer.
#[derive(Default)]
pub struct SerializerRegistry {
    serializers: RwLock<FxHashMap<String, Arc<dyn ResourceSerializer>>>,
}

impl SerializerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with XML serializers for pages, files and images.
    pub fn with_defaults(languages: Arc<LanguageRegistry>) -> Self {
        let registry = Self::new();
        for resource_type in [types::PAGE, types::FILE, types::IMAGE] {
            registry.register(Arc::new(XmlResourceSerializer::new(
                resource_type,
                Arc::clone(&languages),
            )));
        }
        registry
    }

    /// Register a serializer, replacing any previous one for its type.
    pub fn register(&self, serializer: Arc<dyn ResourceSerializer>) {
        self.serializers
            .write()
            .insert(serializer.resource_type().to_string(), serializer);
    }

    pub fn unregister(&self, resource_type: &str) -> Option<Arc<dyn ResourceSerializer>> {
        self.serializers.write().remove(resource_type)
    }

    pub fn get(&self, resource_type: &str) -> Option<Arc<dyn ResourceSerializer>> {
        self.serializers.read().get(resource_type).map(Arc::clone)
    }

    /// Registered types, sorted.
    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<_> = self.serializers.read().keys().cloned().collect();
        types.sort();
        types
    }
}

impl fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializerRegistry")
            .field("types", &self.types())
            .finish()
    }
}

/// Resource type of a document: the name of its root element.
pub fn sniff_resource_type(document: &str) -> Option<String> {
    let mut reader = Reader::from_str(document);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

// ============================================================================
// XML serializer
// ============================================================================

/// XML serializer shared by all built-in resource types.
#[derive(Debug, Clone)]
pub struct XmlResourceSerializer {
    resource_type: String,
    languages: Arc<LanguageRegistry>,
}

impl XmlResourceSerializer {
    pub fn new(resource_type: impl Into<String>, languages: Arc<LanguageRegistry>) -> Self {
        Self {
            resource_type: resource_type.into(),
            languages,
        }
    }
}

/// Attributes of an element as unescaped `(name, value)` pairs.
fn attributes(e: &BytesStart<'_>) -> Result<Vec<(String, String)>, SerializerError> {
    let mut pairs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| SerializerError::Malformed(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = unescape(&raw)
            .map_err(|e| SerializerError::Malformed(e.to_string()))?
            .into_owned();
        pairs.push((key, value));
    }
    Ok(pairs)
}

/// Content element being read.
struct PendingContent {
    content: LocalizedContent,
    text: String,
    cdata: String,
    has_cdata: bool,
}

impl XmlResourceSerializer {
    fn start_content(&self, e: &BytesStart<'_>) -> Result<PendingContent, SerializerError> {
        let mut language = None;
        let mut title = None;
        let mut filename = None;
        let mut original = false;
        for (key, value) in attributes(e)? {
            match key.as_str() {
                "language" => language = Some(self.languages.resolve(&value)?),
                "title" => title = Some(value),
                "filename" => filename = Some(value),
                "original" => original = value == "true",
                _ => {}
            }
        }
        let language = language.ok_or_else(|| {
            SerializerError::Malformed("content element without language".to_string())
        })?;

        let mut content = LocalizedContent::new(language).with_original(original);
        if let Some(title) = title {
            content = content.with_title(title);
        }
        if let Some(filename) = filename {
            content = content.with_filename(filename);
        }
        Ok(PendingContent {
            content,
            text: String::new(),
            cdata: String::new(),
            has_cdata: false,
        })
    }

    fn start_root(&self, e: &BytesStart<'_>, site: &str) -> Result<Resource, SerializerError> {
        let found = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        if found != self.resource_type {
            return Err(SerializerError::TypeMismatch {
                expected: self.resource_type.clone(),
                found,
            });
        }

        let mut uri = ResourceUri::new(site, &self.resource_type);
        for (key, value) in attributes(e)? {
            match key.as_str() {
                "id" if !value.is_empty() => uri.set_id(value),
                "path" if !value.is_empty() => uri.set_path(value),
                "version" => {
                    let version: Version = value
                        .parse()
                        .map_err(|_| SerializerError::Version(value.clone()))?;
                    uri = uri.with_version(version);
                }
                _ => {}
            }
        }
        Ok(Resource::new(uri))
    }
}

impl ResourceSerializer for XmlResourceSerializer {
    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    fn read(&self, document: &str, site: &str) -> Result<Resource, SerializerError> {
        let mut reader = Reader::from_str(document);
        let mut resource: Option<Resource> = None;
        let mut pending: Option<PendingContent> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    if resource.is_none() {
                        resource = Some(self.start_root(&e, site)?);
                    } else if pending.is_none() && e.name().as_ref() == b"content" {
                        pending = Some(self.start_content(&e)?);
                    }
                }
                Ok(Event::Empty(e)) => {
                    if resource.is_none() {
                        resource = Some(self.start_root(&e, site)?);
                    } else if pending.is_none()
                        && e.name().as_ref() == b"content"
                        && let Some(resource) = &mut resource
                    {
                        resource.add_content(self.start_content(&e)?.content);
                    }
                }
                Ok(Event::End(e)) if e.name().as_ref() == b"content" => {
                    if let (Some(resource), Some(done)) = (&mut resource, pending.take()) {
                        let body = if done.has_cdata {
                            done.cdata
                        } else {
                            done.text.trim().to_string()
                        };
                        resource.add_content(done.content.with_body(body));
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(p) = &mut pending {
                        let raw = String::from_utf8_lossy(&e);
                        let text = unescape(&raw)
                            .map_err(|e| SerializerError::Malformed(e.to_string()))?;
                        p.text.push_str(&text);
                    }
                }
                Ok(Event::GeneralRef(e)) => {
                    if let Some(p) = &mut pending {
                        let name = String::from_utf8_lossy(&e);
                        match resolve_reference(&name) {
                            Some(resolved) => p.text.push_str(&resolved),
                            None => {
                                return Err(SerializerError::Malformed(format!(
                                    "unknown entity `&{name};`"
                                )));
                            }
                        }
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(p) = &mut pending {
                        p.cdata
                            .push_str(&String::from_utf8_lossy(e.into_inner().as_ref()));
                        p.has_cdata = true;
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(SerializerError::Malformed(format!(
                        "{e} at position {}",
                        reader.error_position()
                    )));
                }
            }
        }

        if pending.is_some() {
            return Err(SerializerError::Malformed(
                "unterminated content element".to_string(),
            ));
        }
        resource.ok_or_else(|| SerializerError::Malformed("empty document".to_string()))
    }

    fn write(&self, resource: &Resource) -> Result<String, SerializerError> {
        let uri = resource.uri();
        if uri.resource_type() != self.resource_type {
            return Err(SerializerError::TypeMismatch {
                expected: self.resource_type.clone(),
                found: uri.resource_type().to_string(),
            });
        }

        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        xml.push('<');
        xml.push_str(&self.resource_type);
        if let Some(id) = uri.id() {
            push_attribute(&mut xml, "id", id);
        }
        if let Some(path) = uri.path() {
            push_attribute(&mut xml, "path", path.as_str());
        }
        push_attribute(&mut xml, "version", &uri.version().as_attribute());
        xml.push_str(">\n");

        for content in resource.contents() {
            xml.push_str("  <content");
            push_attribute(&mut xml, "language", content.language().identifier());
            if content.is_original() {
                push_attribute(&mut xml, "original", "true");
            }
            if let Some(title) = content.title() {
                push_attribute(&mut xml, "title", title);
            }
            if let Some(filename) = content.filename() {
                push_attribute(&mut xml, "filename", filename);
            }
            xml.push('>');
            push_cdata(&mut xml, content.body());
            xml.push_str("</content>\n");
        }

        xml.push_str("</");
        xml.push_str(&self.resource_type);
        xml.push_str(">\n");
        Ok(xml)
    }
}

fn push_attribute(xml: &mut String, name: &str, value: &str) {
    xml.push(' ');
    xml.push_str(name);
    xml.push_str("=\"");
    xml.push_str(&escape(value));
    xml.push('"');
}

/// CDATA section; `]]>` inside the text is split across two sections.
fn push_cdata(xml: &mut String, text: &str) {
    xml.push_str("<![CDATA[");
    xml.push_str(&text.replace("]]>", "]]]]><![CDATA[>"));
    xml.push_str("]]>");
}

/// Predefined entity or character reference, without `&` and `;`.
fn resolve_reference(name: &str) -> Option<String> {
    if let Some(code) = name.strip_prefix('#') {
        let value = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => code.parse().ok()?,
        };
        return char::from_u32(value).map(String::from);
    }
    resolve_predefined_entity(name).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serializer(resource_type: &str) -> XmlResourceSerializer {
        XmlResourceSerializer::new(resource_type, LanguageRegistry::shared())
    }

    fn sample() -> Resource {
        let languages = LanguageRegistry::shared();
        let uri = ResourceUri::new("demo", types::PAGE)
            .with_id("4bd6c1a2-0001-4a2b-9c3d-0123456789ab")
            .with_path("/about/")
            .with_version(Version::Work);
        Resource::new(uri)
            .with_content(
                LocalizedContent::new(languages.resolve("de").unwrap())
                    .with_title("Über \"uns\" & <mehr>")
                    .with_body("<p>Hallo</p> ]]> Ende")
                    .with_original(true),
            )
            .with_content(LocalizedContent::new(languages.resolve("en").unwrap()).with_body(""))
    }

    #[test]
    fn test_write_then_read_preserves_resource() {
        let page = serializer(types::PAGE);
        let xml = page.write(&sample()).unwrap();
        assert!(xml.contains("<page id=\"4bd6c1a2-0001-4a2b-9c3d-0123456789ab\""));
        assert!(xml.contains("version=\"work\""));

        let parsed = page.read(&xml, "demo").unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_read_hand_written_document() {
        let xml = r#"<?xml version="1.0"?>
<file path="/docs/manual" version="17">
  <content language="fr" filename="manuel.pdf">Le &amp; manuel &#233;</content>
  <content language="deu" original="true"/>
</file>"#;
        let resource = serializer(types::FILE).read(xml, "demo").unwrap();
        let uri = resource.uri();
        assert_eq!(uri.id(), None);
        assert_eq!(uri.path().map(|p| p.as_str()), Some("/docs/manual/"));
        assert_eq!(uri.version(), Version::Revision(17));

        let fr = LanguageRegistry::shared().resolve("fr").unwrap();
        let content = resource.content(&fr).unwrap();
        assert_eq!(content.body(), "Le & manuel é");
        assert_eq!(content.filename(), Some("manuel.pdf"));
        assert_eq!(
            resource.original_language().map(|l| l.identifier()),
            Some("de")
        );
    }

    #[test]
    fn test_missing_version_is_live() {
        let resource = serializer(types::PAGE)
            .read("<page id=\"a-b\"/>", "demo")
            .unwrap();
        assert_eq!(resource.uri().version(), Version::Live);
        assert!(resource.contents().is_empty());
    }

    #[test]
    fn test_read_errors() {
        let page = serializer(types::PAGE);
        assert!(matches!(
            page.read("<image/>", "demo"),
            Err(SerializerError::TypeMismatch { .. })
        ));
        assert!(matches!(
            page.read("<page version=\"draft\"/>", "demo"),
            Err(SerializerError::Version(_))
        ));
        assert!(matches!(
            page.read("<page><content language=\"xx\"/></page>", "demo"),
            Err(SerializerError::Language(_))
        ));
        assert!(matches!(
            page.read("<page><content language=\"de\">x", "demo"),
            Err(SerializerError::Malformed(_))
        ));
        assert!(matches!(page.read("", "demo"), Err(SerializerError::Malformed(_))));
    }

    #[test]
    fn test_write_rejects_other_types() {
        assert!(matches!(
            serializer(types::FILE).write(&sample()),
            Err(SerializerError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_registry_defaults_and_sniffing() {
        let registry = SerializerRegistry::with_defaults(LanguageRegistry::shared());
        assert_eq!(registry.types(), vec!["file", "image", "page"]);
        assert!(registry.get("page").is_some());
        assert!(registry.get("movie").is_none());

        assert_eq!(
            sniff_resource_type("<?xml version=\"1.0\"?>\n<!-- c -->\n<image id=\"x\"/>"),
            Some("image".to_string())
        );
        assert_eq!(sniff_resource_type("no markup"), None);

        registry.unregister("image");
        assert!(registry.get("image").is_none());
    }
}
