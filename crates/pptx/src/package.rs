//! OPC package access: parts held in memory, relationships, content types.

use crate::xml::{XmlDocument, XmlElement};
use qbr_core::{Error, Result};
use std::io::{Cursor, Read, Seek, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// A named part and its raw bytes.
#[derive(Debug, Clone)]
pub struct Part {
    pub name: String,
    pub data: Vec<u8>,
}

/// One `<Relationship>` entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Whether the relationship type ends with `/{kind}`, e.g. `slide`.
    pub fn is_kind(&self, kind: &str) -> bool {
        self.rel_type
            .rsplit_once('/')
            .map(|(_, last)| last == kind)
            .unwrap_or(false)
    }

    /// Part name the target points at, resolved against `source_part`.
    pub fn target_part(&self, source_part: &str) -> String {
        resolve_target(source_part, &self.target)
    }
}

/// An opened package. Part order is kept so untouched archives round-trip
/// with the same layout.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<Part>,
}

impl Package {
    /// Read every entry of a ZIP archive into memory.
    pub fn open<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut parts = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive
                .by_index(index)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", index, e)))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?;
            parts.push(Part { name, data });
        }

        log::debug!("Opened package with {} parts", parts.len());
        Ok(Self { parts })
    }

    /// Write all parts to a new deflated ZIP archive.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for part in &self.parts {
            zip.start_file(part.name.as_str(), options)
                .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", part.name, e)))?;
            zip.write_all(&part.data)?;
        }

        let cursor = zip
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish ZIP: {}", e)))?;
        Ok(cursor.into_inner())
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.iter().any(|p| p.name == name)
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.data.as_slice())
    }

    /// Replace a part's bytes, appending it if it does not exist yet.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|p| p.name == name) {
            Some(part) => part.data = data,
            None => self.parts.push(Part {
                name: name.to_string(),
                data,
            }),
        }
    }

    /// Parse a part as XML.
    pub fn xml(&self, name: &str) -> Result<XmlDocument> {
        let data = self
            .part(name)
            .ok_or_else(|| Error::MissingPart(name.to_string()))?;
        XmlDocument::parse_bytes(data).map_err(|e| match e {
            Error::XmlError(msg) => Error::XmlError(format!("{}: {}", name, msg)),
            other => other,
        })
    }

    pub fn set_xml(&mut self, name: &str, doc: &XmlDocument) -> Result<()> {
        let bytes = doc.to_bytes()?;
        self.set_part(name, bytes);
        Ok(())
    }

    /// Relationships of `source_part` (`""` for the package root). A missing
    /// `.rels` part means no relationships.
    pub fn relationships(&self, source_part: &str) -> Result<Vec<Relationship>> {
        let rels_part = rels_for_part(source_part);
        if !self.contains(&rels_part) {
            return Ok(Vec::new());
        }

        let doc = self.xml(&rels_part)?;
        Ok(doc
            .root
            .elements()
            .filter(|el| el.local_name() == "Relationship")
            .filter_map(|el| {
                Some(Relationship {
                    id: el.attr("Id")?.to_string(),
                    rel_type: el.attr("Type").unwrap_or_default().to_string(),
                    target: el.attr("Target").unwrap_or_default().to_string(),
                    external: el.attr("TargetMode") == Some("External"),
                })
            })
            .collect())
    }

    /// Add a relationship from `source_part` to `target_part`. Returns the new id.
    pub fn add_relationship(
        &mut self,
        source_part: &str,
        rel_type: &str,
        target_part: &str,
    ) -> Result<String> {
        let rels_part = rels_for_part(source_part);
        let mut doc = if self.contains(&rels_part) {
            self.xml(&rels_part)?
        } else {
            XmlDocument::with_root(XmlElement::new("Relationships").with_attr("xmlns", RELATIONSHIPS_NS))
        };

        let next = doc
            .root
            .elements()
            .filter_map(|el| el.attr("Id"))
            .filter_map(|id| id.strip_prefix("rId").and_then(|n| n.parse::<u32>().ok()))
            .max()
            .unwrap_or(0)
            + 1;
        let id = format!("rId{}", next);

        let rel = XmlElement::new(doc.root.qualify("Relationship"))
            .with_attr("Id", &id)
            .with_attr("Type", rel_type)
            .with_attr("Target", &relative_target(source_part, target_part));
        doc.root.push(rel);

        self.set_xml(&rels_part, &doc)?;
        Ok(id)
    }

    /// Register a content type for a part added to the package.
    pub fn add_content_type_override(&mut self, part: &str, content_type: &str) -> Result<()> {
        let mut doc = self.xml(CONTENT_TYPES_PART)?;
        let part_name = format!("/{}", part);

        let exists = doc
            .root
            .elements()
            .any(|el| el.local_name() == "Override" && el.attr("PartName") == Some(part_name.as_str()));
        if !exists {
            let entry = XmlElement::new(doc.root.qualify("Override"))
                .with_attr("PartName", &part_name)
                .with_attr("ContentType", content_type);
            doc.root.push(entry);
            self.set_xml(CONTENT_TYPES_PART, &doc)?;
        }
        Ok(())
    }
}

/// Name of the `.rels` part holding `part`'s relationships.
pub fn rels_for_part(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file_name)) => format!("{dir}/_rels/{file_name}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target URI against its source part.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let target = target.split('#').next().unwrap_or(target);
    if target.is_empty() {
        return normalize(source_part);
    }
    if let Some(target) = target.strip_prefix('/') {
        return normalize(target);
    }

    let base_dir = source_part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    normalize(&format!("{base_dir}/{target}"))
}

/// Relative URI from `source_part`'s directory to `target_part`.
pub fn relative_target(source_part: &str, target_part: &str) -> String {
    let source_dir: Vec<&str> = source_part
        .rsplit_once('/')
        .map(|(dir, _)| dir.split('/').collect())
        .unwrap_or_default();
    let target: Vec<&str> = target_part.split('/').collect();

    let common = source_dir
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count()
        .min(target.len().saturating_sub(1));

    let mut segments: Vec<&str> = vec![".."; source_dir.len() - common];
    segments.extend(&target[common..]);
    segments.join("/")
}

fn normalize(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out.join("/")
}
