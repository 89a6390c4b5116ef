//! Slide shapes and DrawingML text bodies.
//!
//! A slide's shape tree holds text shapes (`p:sp` with a `p:txBody`), graphic
//! frames that may carry an `a:tbl`, and groups (`p:grpSp`) that nest more
//! shapes. [`Shape::classify`] maps an element to one of those so the walker
//! only has to match once.

use crate::xml::XmlElement;
use qbr_core::{Error, Result, TextFrame};

/// Line break marker inside a paragraph's text.
pub const LINE_BREAK: char = '\u{000B}';

/// A shape-tree child that can carry text.
pub enum Shape<'a> {
    Text(TextShape<'a>),
    Table(TableShape<'a>),
    Group(GroupShape<'a>),
    /// Pictures, connectors, charts and text-less shapes.
    Other(String),
}

pub struct TextShape<'a> {
    pub name: String,
    pub body: &'a mut XmlElement,
}

pub struct TableShape<'a> {
    pub name: String,
    pub table: &'a mut XmlElement,
}

pub struct GroupShape<'a> {
    pub name: String,
    pub tree: &'a mut XmlElement,
}

impl<'a> Shape<'a> {
    /// Classify a shape-tree child. Returns `None` for elements that are not
    /// shapes (`p:nvGrpSpPr`, `p:grpSpPr`, `p:extLst`).
    pub fn classify(el: &'a mut XmlElement) -> Option<Shape<'a>> {
        let name = shape_name(el);
        let local = el.local_name().to_string();
        let shape = match local.as_str() {
            "sp" => match el.child_mut("txBody") {
                Some(body) => Shape::Text(TextShape { name, body }),
                None => Shape::Other(name),
            },
            "grpSp" => Shape::Group(GroupShape { name, tree: el }),
            "graphicFrame" => match el.find_mut(&["graphic", "graphicData", "tbl"]) {
                Some(table) => Shape::Table(TableShape { name, table }),
                None => Shape::Other(name),
            },
            "pic" | "cxnSp" | "contentPart" | "AlternateContent" => Shape::Other(name),
            _ => return None,
        };
        Some(shape)
    }
}

impl TableShape<'_> {
    /// Text bodies of every cell, row by row. Cells without a body are skipped.
    pub fn cell_bodies(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.table
            .elements_mut()
            .filter(|el| el.local_name() == "tr")
            .flat_map(|row| row.elements_mut().filter(|el| el.local_name() == "tc"))
            .filter_map(|cell| cell.child_mut("txBody"))
    }
}

/// `name` attribute of the shape's non-visual properties, or `""`.
fn shape_name(el: &XmlElement) -> String {
    el.elements()
        .find(|child| child.local_name().starts_with("nv"))
        .and_then(|nv| nv.child("cNvPr"))
        .and_then(|c| c.attr("name"))
        .unwrap_or_default()
        .to_string()
}

/// A `txBody` element viewed as a [`TextFrame`].
pub struct TextBody<'a> {
    el: &'a mut XmlElement,
}

impl<'a> TextBody<'a> {
    /// Wrap a text body. A body without any paragraph is malformed.
    pub fn new(el: &'a mut XmlElement) -> Result<Self> {
        if !el.elements().any(is_paragraph) {
            return Err(Error::MalformedShape(
                "text body has no paragraphs".to_string(),
            ));
        }
        Ok(Self { el })
    }
}

impl TextFrame for TextBody<'_> {
    fn text(&self) -> Result<String> {
        body_text(self.el)
    }

    fn set_text(&mut self, text: &str) -> Result<()> {
        let first = self
            .el
            .elements()
            .find(|el| is_paragraph(el))
            .ok_or_else(|| Error::MalformedShape("text body has no paragraphs".to_string()))?;

        let p_name = first.name.clone();
        let p_pr = first.child("pPr").cloned();
        let end_pr = first.child("endParaRPr").cloned();
        let r_pr = self
            .el
            .elements()
            .filter(|el| is_paragraph(el))
            .flat_map(|p| p.elements().filter(|el| el.local_name() == "r"))
            .find_map(|r| r.child("rPr"))
            .cloned();

        self.el
            .retain_children(|child| child.map_or(true, |el| !is_paragraph(el)));

        for line in text.split('\n') {
            let mut p = XmlElement::new(p_name.clone());
            if let Some(p_pr) = &p_pr {
                p.push(p_pr.clone());
            }
            for (i, segment) in line.split(LINE_BREAK).enumerate() {
                if i > 0 {
                    let mut br = XmlElement::new(p.qualify("br"));
                    if let Some(r_pr) = &r_pr {
                        br.push(r_pr.clone());
                    }
                    p.push(br);
                }
                if segment.is_empty() {
                    continue;
                }
                let mut r = XmlElement::new(p.qualify("r"));
                if let Some(r_pr) = &r_pr {
                    r.push(r_pr.clone());
                }
                let mut t = XmlElement::new(p.qualify("t"));
                t.set_text(segment);
                r.push(t);
                p.push(r);
            }
            if let Some(end_pr) = &end_pr {
                p.push(end_pr.clone());
            }
            self.el.push(p);
        }

        Ok(())
    }

    fn runs(&self) -> Result<Vec<String>> {
        self.el
            .elements()
            .filter(|el| is_paragraph(el))
            .flat_map(|p| p.elements().filter(|el| el.local_name() == "r"))
            .map(|r| {
                r.child("t")
                    .map(XmlElement::text)
                    .ok_or_else(|| Error::MalformedShape("run has no text element".to_string()))
            })
            .collect()
    }

    fn set_runs(&mut self, runs: &[String]) -> Result<()> {
        let mut texts = runs.iter();
        for p in self.el.elements_mut().filter(|el| is_paragraph(el)) {
            for r in p.elements_mut().filter(|el| el.local_name() == "r") {
                let text = texts
                    .next()
                    .ok_or_else(|| Error::MalformedShape("run count changed".to_string()))?;
                r.child_mut("t")
                    .ok_or_else(|| Error::MalformedShape("run has no text element".to_string()))?
                    .set_text(text);
            }
        }
        Ok(())
    }
}

/// Visible text of a `txBody`: paragraphs joined by `\n`, breaks as [`LINE_BREAK`].
pub fn body_text(body: &XmlElement) -> Result<String> {
    let paragraphs: Vec<String> = body
        .elements()
        .filter(|el| is_paragraph(el))
        .map(paragraph_text)
        .collect();
    if paragraphs.is_empty() {
        return Err(Error::MalformedShape(
            "text body has no paragraphs".to_string(),
        ));
    }
    Ok(paragraphs.join("\n"))
}

fn paragraph_text(p: &XmlElement) -> String {
    let mut text = String::new();
    for child in p.elements() {
        match child.local_name() {
            "r" | "fld" => {
                if let Some(t) = child.child("t") {
                    text.push_str(&t.text());
                }
            }
            "br" => text.push(LINE_BREAK),
            _ => {}
        }
    }
    text
}

fn is_paragraph(el: &XmlElement) -> bool {
    el.local_name() == "p"
}
