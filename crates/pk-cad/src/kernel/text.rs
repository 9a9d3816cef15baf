//! Glyph outline flattening for text extrusion

use std::path::Path;

use glam::DVec2;
use rusttype::{Font, OutlineBuilder, Scale, point};

use super::mesh::signed_area2;
use super::{CadError, CadResult};

/// A filled region: an outer ring and the holes cut into it
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Region {
    pub outer: Vec<DVec2>,
    pub holes: Vec<Vec<DVec2>>,
}

/// Collects flattened contours from glyph outlines
struct ContourBuilder {
    contours: Vec<Vec<DVec2>>,
    current: Vec<DVec2>,
    steps: usize,
    /// Pen position of the glyph being outlined, y-down
    origin: DVec2,
}

impl ContourBuilder {
    fn new(steps: usize) -> Self {
        Self {
            contours: Vec::new(),
            current: Vec::new(),
            steps: steps.max(1),
            origin: DVec2::ZERO,
        }
    }

    // Glyph coordinates are y-down; flip to y-up
    fn map(&self, x: f32, y: f32) -> DVec2 {
        let p = self.origin + DVec2::new(x as f64, y as f64);
        DVec2::new(p.x, -p.y)
    }

    fn last(&self) -> DVec2 {
        self.current.last().copied().unwrap_or(DVec2::ZERO)
    }

    fn push(&mut self, x: f32, y: f32) {
        let p = self.map(x, y);
        self.current.push(p);
    }
}

impl OutlineBuilder for ContourBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.close();
        self.push(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.push(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let p0 = self.last();
        let c = self.map(x1, y1);
        let p1 = self.map(x, y);
        for i in 1..=self.steps {
            let t = i as f64 / self.steps as f64;
            let u = 1.0 - t;
            self.current.push(p0 * (u * u) + c * (2.0 * u * t) + p1 * (t * t));
        }
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let p0 = self.last();
        let c1 = self.map(x1, y1);
        let c2 = self.map(x2, y2);
        let p1 = self.map(x, y);
        for i in 1..=self.steps {
            let t = i as f64 / self.steps as f64;
            let u = 1.0 - t;
            self.current.push(
                p0 * (u * u * u) + c1 * (3.0 * u * u * t) + c2 * (3.0 * u * t * t) + p1 * (t * t * t),
            );
        }
    }

    fn close(&mut self) {
        let mut contour = std::mem::take(&mut self.current);
        if contour.len() > 1 && contour.first() == contour.last() {
            contour.pop();
        }
        if contour.len() >= 3 {
            self.contours.push(contour);
        }
    }
}

/// Lay out `text` with the font file at `font_path` and flatten the glyph
/// outlines into contours, `steps` samples per curve. Contours are grouped
/// per glyph; glyphs without an outline (spaces) are skipped.
pub(crate) fn text_contours(
    text: &str,
    font_path: &Path,
    font_size: f64,
    steps: usize,
) -> CadResult<Vec<Vec<Vec<DVec2>>>> {
    let data = std::fs::read(font_path).map_err(|e| {
        CadError::MissingResource(format!("Font {}: {}", font_path.display(), e))
    })?;
    let font = Font::try_from_vec(data).ok_or_else(|| {
        CadError::MissingResource(format!("Unreadable font file: {}", font_path.display()))
    })?;

    if let Some(c) = text
        .chars()
        .find(|c| !c.is_whitespace() && font.glyph(*c).id().0 == 0)
    {
        return Err(CadError::UnsupportedOperation(format!(
            "Font {} has no glyph for {:?}",
            font_path.display(),
            c
        )));
    }

    let mut glyphs = Vec::new();
    for glyph in font.layout(text, Scale::uniform(font_size as f32), point(0.0, 0.0)) {
        let position = glyph.position();
        let mut builder = ContourBuilder::new(steps);
        builder.origin = DVec2::new(position.x as f64, position.y as f64);
        glyph.unpositioned().build_outline(&mut builder);
        builder.close();
        if !builder.contours.is_empty() {
            glyphs.push(builder.contours);
        }
    }
    Ok(glyphs)
}

fn contains(ring: &[DVec2], p: DVec2) -> bool {
    let mut inside = false;
    for (i, a) in ring.iter().enumerate() {
        let b = ring[(i + ring.len() - 1) % ring.len()];
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
    }
    inside
}

/// Group contours into filled regions by nesting depth: even depth is
/// solid, odd depth is a hole in the innermost enclosing solid contour.
pub(crate) fn group_regions(contours: Vec<Vec<DVec2>>) -> Vec<Region> {
    let parents: Vec<Vec<usize>> = contours
        .iter()
        .enumerate()
        .map(|(i, c)| {
            (0..contours.len())
                .filter(|&j| j != i && contains(&contours[j], c[0]))
                .collect()
        })
        .collect();

    let mut regions: Vec<(usize, Region)> = Vec::new();
    for (i, contour) in contours.iter().enumerate() {
        if parents[i].len() % 2 == 0 {
            regions.push((
                i,
                Region {
                    outer: contour.clone(),
                    holes: Vec::new(),
                },
            ));
        }
    }
    for (i, contour) in contours.iter().enumerate() {
        if parents[i].len() % 2 == 1 {
            let owner = parents[i]
                .iter()
                .copied()
                .filter(|&j| parents[j].len() == parents[i].len() - 1)
                .min_by(|&a, &b| {
                    signed_area2(&contours[a])
                        .abs()
                        .total_cmp(&signed_area2(&contours[b]).abs())
                });
            if let Some(owner) = owner
                && let Some((_, region)) = regions.iter_mut().find(|(k, _)| *k == owner)
            {
                region.holes.push(contour.clone());
            }
        }
    }
    regions.into_iter().map(|(_, r)| r).collect()
}
