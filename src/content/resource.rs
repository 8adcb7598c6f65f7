//! Resource revisions and their localized content.

use super::ResourceUri;
use crate::language::Language;
use std::sync::Arc;

/// Content of a resource in one language.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalizedContent {
    language: Arc<Language>,
    title: Option<String>,
    body: String,
    filename: Option<String>,
    original: bool,
}

impl LocalizedContent {
    pub fn new(language: Arc<Language>) -> Self {
        Self {
            language,
            title: None,
            body: String::new(),
            filename: None,
            original: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Name of the binary content file (files and images).
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Mark this as the language the resource was authored in.
    pub fn with_original(mut self, original: bool) -> Self {
        self.original = original;
        self
    }

    pub fn language(&self) -> &Arc<Language> {
        &self.language
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn is_original(&self) -> bool {
        self.original
    }
}

/// One revision of a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    uri: ResourceUri,
    contents: Vec<LocalizedContent>,
}

impl Resource {
    pub fn new(uri: ResourceUri) -> Self {
        Self {
            uri,
            contents: Vec::new(),
        }
    }

    pub fn uri(&self) -> &ResourceUri {
        &self.uri
    }

    pub fn uri_mut(&mut self) -> &mut ResourceUri {
        &mut self.uri
    }

    /// Add content, replacing existing content in the same language.
    pub fn add_content(&mut self, content: LocalizedContent) {
        match self
            .contents
            .iter_mut()
            .find(|c| c.language == content.language)
        {
            Some(existing) => *existing = content,
            None => self.contents.push(content),
        }
    }

    pub fn with_content(mut self, content: LocalizedContent) -> Self {
        self.add_content(content);
        self
    }

    pub fn remove_content(&mut self, language: &Language) -> Option<LocalizedContent> {
        let pos = self
            .contents
            .iter()
            .position(|c| c.language.as_ref() == language)?;
        Some(self.contents.remove(pos))
    }

    pub fn content(&self, language: &Language) -> Option<&LocalizedContent> {
        self.contents
            .iter()
            .find(|c| c.language.as_ref() == language)
    }

    pub fn contents(&self) -> &[LocalizedContent] {
        &self.contents
    }

    /// Languages in insertion order.
    pub fn languages(&self) -> Vec<Arc<Language>> {
        self.contents.iter().map(|c| Arc::clone(&c.language)).collect()
    }

    pub fn supports_language(&self, language: &Language) -> bool {
        self.content(language).is_some()
    }

    /// First language flagged as original.
    pub fn original_language(&self) -> Option<&Arc<Language>> {
        self.contents
            .iter()
            .find(|c| c.original)
            .map(|c| &c.language)
    }

    /// Flag or unflag the content in `language` as original.
    ///
    /// Returns `false` when there is no content in that language.
    pub fn set_original(&mut self, language: &Language, original: bool) -> bool {
        match self
            .contents
            .iter_mut()
            .find(|c| c.language.as_ref() == language)
        {
            Some(content) => {
                content.original = original;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::types;
    use crate::language::LanguageRegistry;

    #[test]
    fn test_contents_replace_by_language() {
        let registry = LanguageRegistry::shared();
        let de = registry.resolve("de").unwrap();
        let en = registry.resolve("en").unwrap();

        let mut resource = Resource::new(ResourceUri::new("demo", types::PAGE))
            .with_content(LocalizedContent::new(de.clone()).with_body("alt"))
            .with_content(LocalizedContent::new(en.clone()).with_body("hello"));
        resource.add_content(LocalizedContent::new(de.clone()).with_body("neu"));

        assert_eq!(resource.languages(), vec![de.clone(), en.clone()]);
        assert_eq!(resource.content(&de).map(|c| c.body()), Some("neu"));
        assert!(resource.original_language().is_none());

        assert!(resource.set_original(&en, true));
        assert_eq!(resource.original_language(), Some(&en));

        assert!(resource.remove_content(&en).is_some());
        assert!(!resource.supports_language(&en));
        assert!(!resource.set_original(&en, true));
    }
}
