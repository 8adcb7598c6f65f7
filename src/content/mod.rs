//! Resources, their versions and their on-disk documents.

mod resource;
mod serializer;
mod uri;
mod version;

pub use resource::{LocalizedContent, Resource};
pub use serializer::{
    ResourceSerializer, SerializerError, SerializerRegistry, XmlResourceSerializer,
    sniff_resource_type,
};
pub use uri::{ResourceUri, types};
pub use version::{DOCUMENT_EXTENSION, Version};
