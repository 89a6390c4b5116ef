//! A PPTX presentation opened for editing.

use crate::package::{Package, CONTENT_TYPES_PART};
use crate::shapes::{body_text, TextBody};
use crate::xml::{XmlDocument, XmlElement};
use qbr_core::{Error, PresentationFormat, Result, TextFrame};
use std::io::{Cursor, Read, Seek};

const SLIDE_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const NOTES_SLIDE_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
const NOTES_MASTER_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesMaster";
const THEME_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
const RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NOTES_SLIDE_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml";
const NOTES_MASTER_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.notesMaster+xml";
const THEME_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.theme+xml";

const DEFAULT_MAIN_PART: &str = "ppt/presentation.xml";

/// Skeleton for a notes slide with a slide image and a body placeholder.
const NOTES_SLIDE_TEMPLATE: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<p:notes xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
    r#"<p:cSld><p:spTree>"#,
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr/>"#,
    r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Slide Image Placeholder 1"/>"#,
    r#"<p:cNvSpPr><a:spLocks noGrp="1" noRot="1" noChangeAspect="1"/></p:cNvSpPr>"#,
    r#"<p:nvPr><p:ph type="sldImg"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#,
    r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Notes Placeholder 2"/>"#,
    r#"<p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr>"#,
    r#"<p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/>"#,
    r#"<p:txBody><a:bodyPr/><a:lstStyle/><a:p/></p:txBody></p:sp>"#,
    r#"</p:spTree></p:cSld>"#,
    r#"<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>"#,
    r#"</p:notes>"#
);

/// Notes master with a slide image and a body placeholder, used when the deck
/// has none.
const NOTES_MASTER_TEMPLATE: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<p:notesMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
    r#"<p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>"#,
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr/>"#,
    r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Slide Image Placeholder 1"/>"#,
    r#"<p:cNvSpPr><a:spLocks noGrp="1" noRot="1" noChangeAspect="1"/></p:cNvSpPr>"#,
    r#"<p:nvPr><p:ph type="sldImg" idx="2"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#,
    r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Notes Placeholder 2"/>"#,
    r#"<p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr>"#,
    r#"<p:nvPr><p:ph type="body" sz="quarter" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/>"#,
    r#"<p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:pPr lvl="0"/><a:r><a:rPr lang="en-US"/>"#,
    r#"<a:t>Click to edit Master text styles</a:t></a:r></a:p></p:txBody></p:sp>"#,
    r#"</p:spTree></p:cSld>"#,
    r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" "#,
    r#"accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" "#,
    r#"hlink="hlink" folHlink="folHlink"/>"#,
    r#"</p:notesMaster>"#
);

/// Theme for a created notes master when the slide master's theme cannot be copied.
const THEME_TEMPLATE: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme">"#,
    r#"<a:themeElements><a:clrScheme name="Office">"#,
    r#"<a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>"#,
    r#"<a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>"#,
    r#"<a:dk2><a:srgbClr val="44546A"/></a:dk2><a:lt2><a:srgbClr val="E7E6E6"/></a:lt2>"#,
    r#"<a:accent1><a:srgbClr val="4472C4"/></a:accent1><a:accent2><a:srgbClr val="ED7D31"/></a:accent2>"#,
    r#"<a:accent3><a:srgbClr val="A5A5A5"/></a:accent3><a:accent4><a:srgbClr val="FFC000"/></a:accent4>"#,
    r#"<a:accent5><a:srgbClr val="5B9BD5"/></a:accent5><a:accent6><a:srgbClr val="70AD47"/></a:accent6>"#,
    r#"<a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink>"#,
    r#"</a:clrScheme><a:fontScheme name="Office">"#,
    r#"<a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
    r#"<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>"#,
    r#"</a:fontScheme><a:fmtScheme name="Office"><a:fillStyleLst>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"</a:fillStyleLst><a:lnStyleLst>"#,
    r#"<a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"<a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"<a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"</a:lnStyleLst><a:effectStyleLst>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"</a:effectStyleLst><a:bgFillStyleLst>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#
);

/// One slide part, parsed.
#[derive(Debug, Clone)]
pub struct Slide {
    /// 1-based position in the deck.
    pub number: usize,

    /// Part name inside the package, e.g. `ppt/slides/slide1.xml`.
    pub part_name: String,

    pub xml: XmlDocument,

    modified: bool,
}

impl Slide {
    /// The slide's `p:spTree`, if present.
    pub fn shape_tree_mut(&mut self) -> Option<&mut XmlElement> {
        self.xml.root.find_mut(&["cSld", "spTree"])
    }

    /// Flag the slide so it is re-serialized on save.
    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

/// An editable presentation: the package plus its slides in deck order.
#[derive(Debug, Clone)]
pub struct Presentation {
    package: Package,
    main_part: String,
    slides: Vec<Slide>,
}

impl Presentation {
    /// Open a presentation from raw bytes, rejecting anything that is not PPTX.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match PresentationFormat::from_magic(bytes) {
            Some(PresentationFormat::Pptx) => Self::open(Cursor::new(bytes)),
            Some(PresentationFormat::Ppt) => Err(Error::UnsupportedFormat(
                "legacy .ppt files are not supported, save the template as .pptx".to_string(),
            )),
            None => Err(Error::UnsupportedFormat(
                "payload is not a PPTX (ZIP) document".to_string(),
            )),
        }
    }

    /// Open a presentation from a reader.
    pub fn open<R: Read + Seek>(reader: R) -> Result<Self> {
        let package = Package::open(reader)?;

        let main_part = package
            .relationships("")?
            .into_iter()
            .find(|rel| rel.is_kind("officeDocument"))
            .map(|rel| rel.target_part(""))
            .unwrap_or_else(|| DEFAULT_MAIN_PART.to_string());
        if !package.contains(&main_part) {
            return Err(Error::InvalidPackage(format!(
                "main presentation part '{}' not found",
                main_part
            )));
        }

        let slide_parts = slide_order(&package, &main_part)?;
        let mut slides = Vec::with_capacity(slide_parts.len());
        for (idx, part_name) in slide_parts.into_iter().enumerate() {
            let xml = package.xml(&part_name)?;
            slides.push(Slide {
                number: idx + 1,
                part_name,
                xml,
                modified: false,
            });
        }

        log::debug!("Opened presentation with {} slides", slides.len());
        Ok(Self {
            package,
            main_part,
            slides,
        })
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn slides_mut(&mut self) -> &mut [Slide] {
        &mut self.slides
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Write modified slides back and serialize the package.
    pub fn save(&mut self) -> Result<Vec<u8>> {
        for slide in self.slides.iter_mut().filter(|s| s.modified) {
            self.package.set_xml(&slide.part_name, &slide.xml)?;
            slide.modified = false;
        }
        self.package.to_bytes()
    }

    /// Notes text of the slide at `index`, if it has a notes slide.
    pub fn notes_text(&self, index: usize) -> Result<Option<String>> {
        let slide = self
            .slides
            .get(index)
            .ok_or_else(|| Error::InvalidPackage(format!("no slide at index {}", index)))?;
        let Some(notes_part) = self.notes_part_for(&slide.part_name)? else {
            return Ok(None);
        };
        let doc = self.package.xml(&notes_part)?;
        match find_body_placeholder(&doc.root).and_then(|sp| sp.child("txBody")) {
            Some(body) => body_text(body).map(Some),
            None => Ok(None),
        }
    }

    /// Replace the notes of the last slide with `text`.
    ///
    /// Creates the notes slide, and the deck's notes master if it has none.
    /// Returns `false` only for a deck without slides.
    pub fn set_last_slide_notes(&mut self, text: &str) -> Result<bool> {
        let Some(slide_part) = self.slides.last().map(|s| s.part_name.clone()) else {
            return Ok(false);
        };

        let notes_part = match self.notes_part_for(&slide_part)? {
            Some(part) => part,
            None => self.create_notes_slide(&slide_part)?,
        };

        let mut doc = self.package.xml(&notes_part)?;
        let sp = find_body_placeholder_mut(&mut doc.root).ok_or_else(|| {
            Error::MalformedShape(format!("{} has no notes body placeholder", notes_part))
        })?;
        if sp.child("txBody").is_none() {
            sp.push(empty_text_body(&sp.qualify("txBody")));
        }
        let body = sp
            .child_mut("txBody")
            .ok_or_else(|| Error::MalformedShape("notes body vanished".to_string()))?;
        TextBody::new(body)?.set_text(text)?;

        self.package.set_xml(&notes_part, &doc)?;
        Ok(true)
    }

    fn notes_part_for(&self, slide_part: &str) -> Result<Option<String>> {
        Ok(self
            .package
            .relationships(slide_part)?
            .into_iter()
            .find(|rel| rel.is_kind("notesSlide") && !rel.external)
            .map(|rel| rel.target_part(slide_part))
            .filter(|part| self.package.contains(part)))
    }

    fn create_notes_slide(&mut self, slide_part: &str) -> Result<String> {
        if !self.package.contains(CONTENT_TYPES_PART) {
            return Err(Error::InvalidPackage(format!("{} is missing", CONTENT_TYPES_PART)));
        }

        let master = match self.notes_master()? {
            Some(master) => master,
            None => self.create_notes_master()?,
        };

        let notes_part = next_free_part(&self.package, "ppt/notesSlides/notesSlide");
        let doc = XmlDocument::parse(NOTES_SLIDE_TEMPLATE)?;
        self.package.set_xml(&notes_part, &doc)?;
        self.package
            .add_relationship(&notes_part, NOTES_MASTER_REL, &master)?;
        self.package.add_relationship(&notes_part, SLIDE_REL, slide_part)?;
        self.package
            .add_relationship(slide_part, NOTES_SLIDE_REL, &notes_part)?;
        self.package
            .add_content_type_override(&notes_part, NOTES_SLIDE_CONTENT_TYPE)?;

        log::debug!("Created {} for {}", notes_part, slide_part);
        Ok(notes_part)
    }

    fn notes_master(&self) -> Result<Option<String>> {
        Ok(self
            .package
            .relationships(&self.main_part)?
            .into_iter()
            .find(|rel| rel.is_kind("notesMaster") && !rel.external)
            .map(|rel| rel.target_part(&self.main_part))
            .filter(|part| self.package.contains(part)))
    }

    /// Add a notes master with its own theme and register it in the main part.
    fn create_notes_master(&mut self) -> Result<String> {
        let master = next_free_part(&self.package, "ppt/notesMasters/notesMaster");
        let theme = next_free_part(&self.package, "ppt/theme/theme");

        let theme_bytes = match self.slide_master_theme()? {
            Some(bytes) => bytes,
            None => XmlDocument::parse(THEME_TEMPLATE)?.to_bytes()?,
        };
        self.package.set_part(&theme, theme_bytes);
        self.package
            .add_content_type_override(&theme, THEME_CONTENT_TYPE)?;

        let doc = XmlDocument::parse(NOTES_MASTER_TEMPLATE)?;
        self.package.set_xml(&master, &doc)?;
        self.package.add_relationship(&master, THEME_REL, &theme)?;
        self.package
            .add_content_type_override(&master, NOTES_MASTER_CONTENT_TYPE)?;

        let rel_id = self
            .package
            .add_relationship(&self.main_part, NOTES_MASTER_REL, &master)?;
        let mut main = self.package.xml(&self.main_part)?;
        let r = relationship_prefix(&mut main.root);
        let entry = XmlElement::new(main.root.qualify("notesMasterId"))
            .with_attr(&format!("{}:id", r), &rel_id);
        match main.root.child_mut("notesMasterIdLst") {
            Some(list) => list.push(entry),
            None => {
                let list = XmlElement::new(main.root.qualify("notesMasterIdLst")).with_child(entry);
                main.root.insert_after(&["sldMasterIdLst"], list);
            }
        }
        self.package.set_xml(&self.main_part, &main)?;

        log::info!("Deck has no notes master, created {}", master);
        Ok(master)
    }

    /// Bytes of the first slide master's theme, if there is one to copy.
    fn slide_master_theme(&self) -> Result<Option<Vec<u8>>> {
        let Some(slide_master) = self
            .package
            .relationships(&self.main_part)?
            .into_iter()
            .find(|rel| rel.is_kind("slideMaster") && !rel.external)
            .map(|rel| rel.target_part(&self.main_part))
        else {
            return Ok(None);
        };
        Ok(self
            .package
            .relationships(&slide_master)?
            .into_iter()
            .find(|rel| rel.is_kind("theme") && !rel.external)
            .and_then(|rel| self.package.part(&rel.target_part(&slide_master)))
            .map(<[u8]>::to_vec))
    }
}

/// Slide parts in deck order.
///
/// Uses `p:sldIdLst` from the main part. Decks without one fall back to the
/// slide relationships ordered by the number in their id or target.
fn slide_order(package: &Package, main_part: &str) -> Result<Vec<String>> {
    let rels = package.relationships(main_part)?;
    let main = package.xml(main_part)?;

    let listed: Vec<String> = main
        .root
        .child("sldIdLst")
        .map(|list| {
            list.elements()
                .filter(|el| el.local_name() == "sldId")
                .filter_map(relationship_id)
                .filter_map(|id| rels.iter().find(|rel| rel.id == id))
                .map(|rel| rel.target_part(main_part))
                .collect()
        })
        .unwrap_or_default();
    if !listed.is_empty() {
        return Ok(listed);
    }

    let mut slides: Vec<(String, Option<usize>)> = rels
        .iter()
        .filter(|rel| rel.is_kind("slide"))
        .map(|rel| {
            let order = extract_slide_number(&rel.id).or_else(|| extract_slide_number(&rel.target));
            (rel.target_part(main_part), order)
        })
        .collect();

    slides.sort_by(|a, b| match (a.1, b.1) {
        (Some(na), Some(nb)) => na.cmp(&nb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    });

    Ok(slides.into_iter().map(|(path, _)| path).collect())
}

/// First unused `{stem}N.xml` part name.
fn next_free_part(package: &Package, stem: &str) -> String {
    (1..)
        .map(|n| format!("{}{}.xml", stem, n))
        .find(|name| !package.contains(name))
        .unwrap_or_default()
}

/// Prefix bound to the relationships namespace on `root`, declaring `r` if missing.
fn relationship_prefix(root: &mut XmlElement) -> String {
    let bound = root.attributes.iter().find_map(|(key, value)| {
        key.strip_prefix("xmlns:")
            .filter(|_| value == RELATIONSHIPS_NS)
            .map(str::to_string)
    });
    match bound {
        Some(prefix) => prefix,
        None => {
            root.set_attr("xmlns:r", RELATIONSHIPS_NS);
            "r".to_string()
        }
    }
}

/// The `r:id` attribute of a `p:sldId`, whatever the prefix.
fn relationship_id(el: &XmlElement) -> Option<String> {
    el.attributes
        .iter()
        .find(|(key, _)| key.ends_with(":id"))
        .map(|(_, value)| value.clone())
}

fn find_body_placeholder(el: &XmlElement) -> Option<&XmlElement> {
    let tree = el.find(&["cSld", "spTree"])?;
    tree.elements()
        .filter(|sp| sp.local_name() == "sp")
        .find(|sp| is_body_placeholder(sp))
}

fn find_body_placeholder_mut(el: &mut XmlElement) -> Option<&mut XmlElement> {
    let tree = el.find_mut(&["cSld", "spTree"])?;
    tree.elements_mut()
        .filter(|sp| sp.local_name() == "sp")
        .find(|sp| is_body_placeholder(sp))
}

fn is_body_placeholder(sp: &XmlElement) -> bool {
    sp.find(&["nvSpPr", "nvPr", "ph"])
        .and_then(|ph| ph.attr("type"))
        == Some("body")
}

fn empty_text_body(name: &str) -> XmlElement {
    XmlElement::new(name)
        .with_child(XmlElement::new("a:bodyPr"))
        .with_child(XmlElement::new("a:lstStyle"))
        .with_child(XmlElement::new("a:p"))
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("rId1"), Some(1));
        assert_eq!(extract_slide_number("rId12"), Some(12));
        assert_eq!(extract_slide_number("slide1.xml"), Some(1));
        assert_eq!(extract_slide_number("slide123.xml"), Some(123));
        assert_eq!(extract_slide_number("nodigits"), None);
    }

    #[test]
    fn test_notes_template_has_body_placeholder() {
        let doc = XmlDocument::parse(NOTES_SLIDE_TEMPLATE).unwrap();
        let sp = find_body_placeholder(&doc.root).unwrap();
        assert_eq!(body_text(sp.child("txBody").unwrap()).unwrap(), "");
    }

    #[test]
    fn test_created_part_templates_parse() {
        let master = XmlDocument::parse(NOTES_MASTER_TEMPLATE).unwrap();
        assert!(find_body_placeholder(&master.root).is_some());
        let theme = XmlDocument::parse(THEME_TEMPLATE).unwrap();
        assert_eq!(theme.root.local_name(), "theme");
    }

    #[test]
    fn test_relationship_prefix() {
        let mut root = XmlElement::new("p:presentation").with_attr("xmlns:rel", RELATIONSHIPS_NS);
        assert_eq!(relationship_prefix(&mut root), "rel");

        let mut bare = XmlElement::new("p:presentation");
        assert_eq!(relationship_prefix(&mut bare), "r");
        assert_eq!(bare.attr("xmlns:r"), Some(RELATIONSHIPS_NS));
    }

    #[test]
    fn test_relationship_id_any_prefix() {
        let el = XmlElement::new("p:sldId")
            .with_attr("id", "256")
            .with_attr("r:id", "rId7");
        assert_eq!(relationship_id(&el), Some("rId7".to_string()));
    }

    #[test]
    fn test_rejects_non_pptx() {
        assert!(matches!(
            Presentation::from_bytes(b"not a deck"),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(matches!(
            Presentation::from_bytes(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0]),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(matches!(
            Presentation::from_bytes(b"PK\x03\x04garbage"),
            Err(Error::ZipError(_))
        ));
    }
}
